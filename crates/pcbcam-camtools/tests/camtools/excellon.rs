use pcbcam_camtools::excellon::{
    export_excellon, parse_excellon, ExcellonDocument, ExcellonExportSettings, ExcellonParseOptions,
};
use pcbcam_core::geometry::Point;
use pcbcam_core::{CoordinateStyle, DrillTool, FormatConfig, Slot, SlotStyle, Units, ZeroSuppression};

fn board() -> ExcellonDocument {
    let mut doc = ExcellonDocument::new(Units::Mm);
    let mut small = DrillTool::new(0.8, 4);
    small.drills = vec![Point::new(1.27, 2.54), Point::new(10.16, 2.54)];
    let mut large = DrillTool::new(1.2, 4);
    large.drills = vec![Point::new(20.0, 15.5)];
    large.slots = vec![Slot {
        start: Point::new(30.0, 5.0),
        end: Point::new(30.0, 9.0),
    }];
    doc.tools.insert_with_id(1, small);
    doc.tools.insert_with_id(2, large);
    doc
}

fn same_hits(a: &ExcellonDocument, b: &ExcellonDocument, tolerance: f64) {
    for ((ia, ta), (ib, tb)) in a.tools.iter().zip(b.tools.iter()) {
        assert_eq!(ia, ib);
        assert!((ta.diameter - tb.diameter).abs() < 0.01);
        assert_eq!(ta.drills.len(), tb.drills.len());
        for (p, q) in ta.drills.iter().zip(&tb.drills) {
            assert!(p.approx_eq(q, tolerance), "{:?} != {:?}", p, q);
        }
        for (s, t) in ta.slots.iter().zip(&tb.slots) {
            assert!(s.start.approx_eq(&t.start, tolerance));
            assert!(s.end.approx_eq(&t.end, tolerance));
        }
    }
}

#[test]
fn fixed_format_round_trip_both_suppressions() {
    let doc = board();
    for zeros in [ZeroSuppression::Leading, ZeroSuppression::Trailing] {
        let settings = ExcellonExportSettings {
            format: FormatConfig::new(Units::Mm, 3, 3, zeros),
            coordinates: CoordinateStyle::Fixed,
            slots: SlotStyle::G85,
        };
        let text = export_excellon(&doc, &settings).unwrap();
        let back = parse_excellon(&text, &ExcellonParseOptions::default()).unwrap();
        assert_eq!(back.units, Units::Mm);
        assert_eq!(back.total_drills(), 4);
        same_hits(&doc, &back, 1e-9);
    }
}

#[test]
fn inch_export_of_metric_board() {
    let doc = board();
    let settings = ExcellonExportSettings {
        format: FormatConfig::new(Units::Inch, 2, 4, ZeroSuppression::Leading),
        ..Default::default()
    };
    let text = export_excellon(&doc, &settings).unwrap();
    assert!(text.contains("INCH,TZ"));
    assert!(text.contains("X500Y1000\n"));

    let mut back = parse_excellon(&text, &ExcellonParseOptions::default()).unwrap();
    assert_eq!(back.units, Units::Inch);
    back.convert_units(Units::Mm);
    same_hits(&doc, &back, 0.003);
}

#[test]
fn tool_unload_and_unit_switch() {
    let text = "M48\nINCH\nT1C0.0315\n%\nM71\nT1\nX1.0Y1.0\nT0\nT1\nX2.0Y1.0\nM30\n";
    let doc = parse_excellon(text, &ExcellonParseOptions::default()).unwrap();
    assert_eq!(doc.tools.get(1).unwrap().drills.len(), 2);
}

#[test]
fn drill_geometry_covers_hits() {
    let doc = board();
    let solid = doc.solid_geometry();
    assert_eq!(solid.len(), 4);
    assert!(solid.iter().any(|p| p.contains(&Point::new(30.0, 7.0))));
}
