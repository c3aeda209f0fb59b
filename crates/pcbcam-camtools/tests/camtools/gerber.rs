use pcbcam_camtools::error::ParseError;
use pcbcam_camtools::gerber::{
    export_gerber, parse_gerber, ApertureElement, ApertureId, ApertureShape, GerberParseOptions,
    Polarity,
};
use pcbcam_camtools::GerberDocument;
use pcbcam_core::geometry::{Axis, Point, Shape};
use pcbcam_core::{FormatConfig, Units, ZeroSuppression};
use proptest::prelude::*;
use std::f64::consts::PI;

const HEADER: &str = "%FSLAX24Y24*%\n%MOMM*%\n";

fn parse(body: &str) -> Result<pcbcam_camtools::GerberDocument, ParseError> {
    parse_gerber(&format!("{}{}", HEADER, body), &GerberParseOptions::default())
}

fn area(doc: &pcbcam_camtools::GerberDocument) -> f64 {
    doc.solid_geometry().iter().map(|p| p.area()).sum()
}

#[test]
fn track_and_pads() {
    let doc = parse(
        "%ADD10C,1.0*%\n%ADD11R,2.0X1.0*%\nD10*\nX0Y0D02*\nX100000Y0D01*\nD11*\nX200000Y0D03*\nM02*\n",
    )
    .unwrap();
    assert_eq!(doc.units, Units::Mm);
    assert_eq!(doc.element_count(), 2);
    let expected = 10.0 * 1.0 + PI * 0.25 + 2.0;
    assert!((area(&doc) - expected).abs() < 0.01);
}

#[test]
fn clear_polarity_cuts_earlier_copper() {
    let doc = parse(
        "%ADD10R,4.0X4.0*%\n%ADD11C,1.0*%\nD10*\nX0Y0D03*\n%LPC*%\nD11*\nX0Y0D03*\n%LPD*%\nM02*\n",
    )
    .unwrap();
    assert!((area(&doc) - (16.0 - PI * 0.25)).abs() < 0.01);
}

#[test]
fn multi_quadrant_arc() {
    let doc = parse(
        "%ADD10C,0.1*%\nD10*\nG75*\nX100000Y0D02*\nG03X-100000Y0I-100000J0D01*\nM02*\n",
    )
    .unwrap();
    let b = doc.bounds().unwrap();
    assert!((b.max_y - 10.05).abs() < 0.01);
    assert!((b.min_x + 10.05).abs() < 0.01);
}

#[test]
fn repeated_units_keep_the_first() {
    let doc = parse_gerber(
        "%FSLAX24Y24*%\n%MOMM*%\n%MOIN*%\n%ADD10C,1.0*%\nD10*\nX10000Y0D03*\nM02*\n",
        &GerberParseOptions::default(),
    )
    .unwrap();
    assert_eq!(doc.units, Units::Mm);
}

#[test]
fn errors_carry_line_numbers() {
    let err = parse("%ADD10C,1.0*%\nD10*\nG99*\nM02*\n").unwrap_err();
    assert_eq!(err, ParseError::unknown(5, "G99"));

    let err = parse("D12*\nM02*\n").unwrap_err();
    assert_eq!(err, ParseError::UndefinedAperture { line: 3, id: 12 });
}

#[test]
fn unsupported_features_are_rejected() {
    let err = parse("%AMTHERMAL*1,1,1.0,0,0*%\n%ADD10THERMAL*%\nD10*\nX0Y0D03*\nM02*\n").unwrap_err();
    assert!(matches!(err, ParseError::Unsupported { .. }));

    let err = parse("G91*\nM02*\n").unwrap_err();
    assert!(matches!(err, ParseError::Unsupported { .. }));

    let err = parse("%SRX2Y2I5.0J5.0*%\nM02*\n").unwrap_err();
    assert!(matches!(err, ParseError::Unsupported { .. }));
}

#[test]
fn export_then_parse_keeps_copper() {
    let doc = parse(
        "%ADD10C,0.5*%\n%ADD11O,2.0X1.0*%\nD10*\nX0Y0D02*\nX50000Y0D01*\nX50000Y50000D01*\nD11*\nX100000Y100000D03*\nM02*\n",
    )
    .unwrap();
    for config in [
        FormatConfig::new(Units::Mm, 3, 5, ZeroSuppression::Leading),
        FormatConfig::new(Units::Mm, 3, 5, ZeroSuppression::Trailing),
        FormatConfig::new(Units::Inch, 2, 6, ZeroSuppression::Leading),
    ] {
        let text = export_gerber(&doc, &config).unwrap();
        let mut back = parse_gerber(&text, &GerberParseOptions::default()).unwrap();
        back.convert_units(Units::Mm);
        assert!((area(&back) - area(&doc)).abs() < 1e-3, "config {:?}", config);
    }
}

#[test]
fn transforms_move_every_element() {
    let mut doc = parse("%ADD10C,1.0*%\nD10*\nX10000Y20000D03*\nM02*\n").unwrap();
    doc.mirror(Axis::X, Point::new(0.0, 0.0));
    let b = doc.bounds().unwrap();
    assert!((b.center().y + 2.0).abs() < 1e-6);

    doc.add_flash(
        pcbcam_camtools::gerber::ApertureShape::Circle {
            diameter: 1.0,
            hole: None,
        },
        Point::new(5.0, 5.0),
    );
    assert_eq!(doc.apertures.get(ApertureId(10)).unwrap().elements.len(), 2);
}

#[test]
fn optional_stop_does_not_end_the_file() {
    let doc = parse("%ADD10C,1.0*%\nD10*\nX0Y0D03*\nM00*\nX20000Y0D03*\nM02*\n").unwrap();
    assert_eq!(doc.element_count(), 2);

    let doc = parse("%ADD10C,1.0*%\nD10*\nX0Y0D03*\nM02*\nX20000Y0D03*\n").unwrap();
    assert_eq!(doc.element_count(), 1);
}

#[test]
fn polygon_apertures_are_validated() {
    let doc = parse("%ADD10P,1.0X12*%\nD10*\nX0Y0D03*\nM02*\n").unwrap();
    assert_eq!(doc.element_count(), 1);

    for (definition, reason) in [
        ("%ADD10P,1.0X1000000*%", "vertices"),
        ("%ADD10P,1.0X2*%", "vertices"),
        ("%ADD10P,1.0X4.5*%", "vertices"),
        ("%ADD10P,0X6*%", "diameter"),
        ("%ADD10P,-1.0X6*%", "diameter"),
    ] {
        let err = parse(&format!("{}\nM02*\n", definition)).unwrap_err();
        match err {
            ParseError::Malformed { line, reason: message, .. } => {
                assert_eq!(line, 3, "{}", definition);
                assert!(message.contains(reason), "{}: {}", definition, message);
            }
            other => panic!("{}: unexpected {:?}", definition, other),
        }
    }

    let err = parse("%ADD10C,-0.5*%\nM02*\n").unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
}

/// Sizes in thousandths, so every definition fits three decimals.
fn size() -> impl Strategy<Value = f64> {
    (50u32..3000).prop_map(|k| k as f64 / 1000.0)
}

fn aperture() -> impl Strategy<Value = ApertureShape> {
    prop_oneof![
        size().prop_map(|diameter| ApertureShape::Circle { diameter, hole: None }),
        (size(), size()).prop_map(|(width, height)| ApertureShape::Rectangle {
            width,
            height,
            hole: None,
        }),
        (size(), size()).prop_map(|(width, height)| ApertureShape::Obround {
            width,
            height,
            hole: None,
        }),
        (size(), 3u32..=12, 0u32..360).prop_map(|(diameter, vertices, rotation)| {
            ApertureShape::Polygon {
                diameter,
                vertices,
                rotation: rotation as f64,
                hole: None,
            }
        }),
    ]
}

/// A flash at the first point, or a draw to the second.
#[derive(Debug, Clone)]
struct Stroke {
    aperture: usize,
    draw: bool,
    start: (i64, i64),
    end: (i64, i64),
}

fn stroke() -> impl Strategy<Value = Stroke> {
    // Micrometres inside the +/-999 mm range of three integer digits.
    let coord = -200_000_000i64..200_000_000;
    (0usize..4, any::<bool>(), (coord.clone(), coord.clone()), (1i64..5_000_000, coord)).prop_map(
        |(aperture, draw, start, (dx, y))| Stroke {
            aperture,
            draw,
            start,
            end: (start.0 + dx, y),
        },
    )
}

fn quantize(micro: i64, dec_digits: u8) -> f64 {
    let step = 10f64.powi(dec_digits as i32);
    (micro as f64 / 1e6 * step).round() / step
}

fn points(shape: &Shape) -> Vec<Point> {
    match shape {
        Shape::Point(p) => vec![*p],
        Shape::Line(points) | Shape::Ring(points) => points.clone(),
        Shape::Polygon(poly) => poly.exterior.clone(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]
    #[test]
    fn export_then_parse_keeps_apertures_and_coordinates(
        shapes in prop::collection::vec(aperture(), 4),
        strokes in prop::collection::vec(stroke(), 1..10),
        dec_digits in 3u8..=6,
        trailing in any::<bool>(),
    ) {
        let mut doc = GerberDocument::new(Units::Mm);
        for s in &strokes {
            let shape = shapes[s.aperture].clone();
            let start = Point::new(quantize(s.start.0, dec_digits), quantize(s.start.1, dec_digits));
            if s.draw {
                // Shift the end by one quantum when rounding lands it on the start.
                let mut end = Point::new(quantize(s.end.0, dec_digits), quantize(s.end.1, dec_digits));
                if end.approx_eq(&start, 1e-9) {
                    end.x += 10f64.powi(-(dec_digits as i32));
                }
                let seq = doc.apertures.max_seq().map_or(0, |last| last + 1);
                doc.apertures.add_or_merge(
                    shape,
                    ApertureElement::new(Shape::Line(vec![start, end]), Vec::new(), Polarity::Dark, seq),
                );
            } else {
                doc.add_flash(shape, start);
            }
        }

        let zeros = if trailing { ZeroSuppression::Trailing } else { ZeroSuppression::Leading };
        let config = FormatConfig::new(Units::Mm, 3, dec_digits, zeros);
        let text = export_gerber(&doc, &config).unwrap();
        let back = parse_gerber(&text, &GerberParseOptions::default()).unwrap();

        prop_assert_eq!(back.units, Units::Mm);
        prop_assert_eq!(back.apertures.len(), doc.apertures.len());
        for (id, aperture) in doc.apertures.iter() {
            let parsed = back.apertures.get(id);
            prop_assert!(parsed.is_some(), "D{} missing", id.0);
            let parsed = parsed.unwrap();
            prop_assert_eq!(
                parsed.shape.definition(1.0, dec_digits as usize),
                aperture.shape.definition(1.0, dec_digits as usize)
            );
            prop_assert_eq!(parsed.elements.len(), aperture.elements.len());
        }

        let tolerance = 10f64.powi(-(dec_digits as i32));
        let expected = doc.follow_geometry();
        let actual = back.follow_geometry();
        prop_assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(&expected) {
            let (a, e) = (points(a), points(e));
            prop_assert_eq!(a.len(), e.len());
            for (p, q) in a.iter().zip(&e) {
                prop_assert!(p.distance(q) < tolerance, "{:?} vs {:?}", p, q);
            }
        }
    }
}
