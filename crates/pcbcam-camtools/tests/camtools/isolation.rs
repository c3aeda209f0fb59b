use pcbcam_camtools::CamToolError;
use pcbcam_camtools::gerber::{parse_gerber, GerberParseOptions};
use pcbcam_camtools::isolation::{generate_isolation, isolate_gerber, offset_amount, IsolationParams};
use pcbcam_core::geometry::{Polygon, Shape};
use pcbcam_core::{IsolationType, OffsetKind};
use proptest::prelude::*;

proptest! {
    #[test]
    fn offsets_grow_with_each_pass(tool in 0.01f64..3.0, overlap in 0.0f64..0.99, pass in 0usize..10) {
        let here = offset_amount(pass, tool, overlap);
        let next = offset_amount(pass + 1, tool, overlap);
        prop_assert!(here > 0.0);
        prop_assert!(next > here);
        prop_assert!((next - here - (1.0 - overlap) * tool).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]
    #[test]
    fn later_passes_enclose_earlier_ones(size in 1.0f64..20.0, tool in 0.1f64..1.5) {
        let pad = Polygon::rectangle(0.0, 0.0, size, size);
        let params = IsolationParams {
            tool_diameter: tool,
            passes: 3,
            overlap: 0.2,
            isolation_type: IsolationType::Exteriors,
            ..Default::default()
        };
        let tables = generate_isolation(&[pad], &params).unwrap();
        let rings = &tables[0].get(1).unwrap().solid_geometry;
        prop_assert_eq!(rings.len(), 3);
        for pair in rings.windows(2) {
            let inner = pair[0].bounds().unwrap();
            let outer = pair[1].bounds().unwrap();
            prop_assert!(outer.min_x < inner.min_x && outer.max_x > inner.max_x);
            prop_assert!(outer.min_y < inner.min_y && outer.max_y > inner.max_y);
        }
    }
}

#[test]
fn track_isolation_from_gerber() {
    let text = "%FSLAX24Y24*%\n%MOMM*%\n%ADD11C,0.5*%\nD11*\nX0Y0D02*\nX100000Y0D01*\nM02*\n";
    let doc = parse_gerber(text, &GerberParseOptions::default()).unwrap();
    let tables = isolate_gerber(&doc, &IsolationParams::default()).unwrap();
    let ring = &tables[0].get(1).unwrap().solid_geometry[0];
    let b = ring.bounds().unwrap();
    assert!((b.width() - (10.0 + 0.5 + 0.1)).abs() < 0.01);
    assert!((b.height() - 0.6).abs() < 0.01);
}

#[test]
fn follow_mode_keeps_centre_line() {
    let text = "%FSLAX24Y24*%\n%MOMM*%\n%ADD11C,0.5*%\nD11*\nX0Y0D02*\nX100000Y0D01*\nX100000Y50000D01*\nM02*\n";
    let doc = parse_gerber(text, &GerberParseOptions::default()).unwrap();
    let params = IsolationParams {
        follow: true,
        ..Default::default()
    };
    let tables = isolate_gerber(&doc, &params).unwrap();
    let tool = tables[0].get(1).unwrap();
    assert_eq!(tool.offset, OffsetKind::Path);
    let Shape::Line(points) = &tool.solid_geometry[0] else {
        panic!("expected a polyline");
    };
    assert_eq!(points.len(), 3);
}

#[test]
fn separate_passes_give_separate_tables() {
    let pad = Polygon::rectangle(0.0, 0.0, 4.0, 4.0);
    let params = IsolationParams {
        tool_diameter: 0.4,
        passes: 3,
        combine_passes: false,
        ..Default::default()
    };
    let tables = generate_isolation(&[pad], &params).unwrap();
    assert_eq!(tables.len(), 3);
    assert!(tables.iter().all(|t| t.len() == 1));
}

#[test]
fn empty_copper_is_an_error() {
    assert!(generate_isolation(&[], &IsolationParams::default()).is_err());
}

#[test]
fn hole_narrower_than_the_tool_is_rejected() {
    let mut frame = Polygon::rectangle(0.0, 0.0, 20.0, 20.0);
    let mut hole = Polygon::rectangle(9.9, 9.9, 0.2, 0.2).exterior;
    hole.reverse();
    frame.interiors.push(hole);
    let params = IsolationParams {
        tool_diameter: 1.0,
        isolation_type: IsolationType::Both,
        ..Default::default()
    };
    let result = generate_isolation(std::slice::from_ref(&frame), &params);
    assert!(matches!(result, Err(CamToolError::Isolation(_))));

    let params = IsolationParams {
        isolation_type: IsolationType::Exteriors,
        ..params
    };
    let tables = generate_isolation(&[frame], &params).unwrap();
    assert_eq!(tables[0].get(1).unwrap().solid_geometry.len(), 1);
}
