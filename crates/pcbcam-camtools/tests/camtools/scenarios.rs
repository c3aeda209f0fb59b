use pcbcam_camtools::cncjob::{assemble_toolpath, AssemblerOptions, SourceKind};
use pcbcam_camtools::excellon::{parse_excellon, ExcellonParseOptions};
use pcbcam_camtools::gerber::{export_gerber, parse_gerber, GerberParseOptions};
use pcbcam_camtools::isolation::{generate_isolation, IsolationParams};
use pcbcam_core::geometry::{point_in_ring, Point, Polygon, Shape};
use pcbcam_core::{FormatConfig, GeometryTools, MachiningParams, Tool, Units, ZeroSuppression};

#[test]
fn flash_exports_with_aperture_select() {
    let text = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.2*%\nD10*\nX100000Y100000D03*\nM02*\n";
    let doc = parse_gerber(text, &GerberParseOptions::default()).unwrap();
    let config = FormatConfig::new(Units::Mm, 2, 4, ZeroSuppression::Leading);
    let out = export_gerber(&doc, &config).unwrap();

    assert!(out.contains("%ADD10C,0.2000*%"));
    let select = out.find("D10*\n").unwrap();
    let flash = out.find("X100000Y100000D03*").unwrap();
    assert!(select < flash);
}

#[test]
fn two_combined_passes_enclose_square_pad() {
    let pad = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
    let params = IsolationParams {
        tool_diameter: 1.0,
        passes: 2,
        overlap: 0.0,
        combine_passes: true,
        ..Default::default()
    };
    let tables = generate_isolation(&[pad.clone()], &params).unwrap();
    assert_eq!(tables.len(), 1);
    let tool = tables[0].get(1).unwrap();
    assert_eq!(tool.solid_geometry.len(), 2);

    let mut widths = Vec::new();
    for shape in &tool.solid_geometry {
        let Shape::Ring(ring) = shape else {
            panic!("expected a ring, got {:?}", shape);
        };
        for corner in &pad.exterior {
            assert!(point_in_ring(corner, ring));
        }
        widths.push(shape.bounds().unwrap().width());
    }
    assert!((widths[0] - 11.0).abs() < 1e-6);
    assert!((widths[1] - 13.0).abs() < 1e-6);
}

#[test]
fn drill_job_plunges_in_tool_order() {
    let text = "M48\nMETRIC\nT1C0.8\nT2C1.0\n%\nT1\nX0.0Y0.0\nX5.0Y5.0\nT2\nX2.0Y2.0\nM30\n";
    let doc = parse_excellon(text, &ExcellonParseOptions::default()).unwrap();
    let job = assemble_toolpath(
        &SourceKind::Excellon(doc.tools),
        "",
        "",
        &AssemblerOptions::default(),
    )
    .unwrap();
    let out = job.source_text();

    let plunges = out.lines().filter(|l| l.starts_with("G01 Z")).count();
    assert_eq!(plunges, 3);
    let a = out.find("G00 X0.0000 Y0.0000").unwrap();
    let b = out.find("G00 X5.0000 Y5.0000").unwrap();
    let c = out.find("G00 X2.0000 Y2.0000").unwrap();
    assert!(a < b && b < c);
    assert_eq!(job.blocks().len(), 2);
}

#[test]
fn hpgl_moves_are_truncated() {
    let params = MachiningParams {
        preprocessor: "hpgl".into(),
        ..Default::default()
    };
    let mut table = GeometryTools::new();
    table.insert(
        Tool::new(0.2, 4)
            .with_params(params)
            .with_geometry(vec![Shape::Line(vec![Point::new(12.7, 8.3), Point::new(20.0, 10.0)])]),
    );
    let job = assemble_toolpath(
        &SourceKind::Geometry(table),
        "",
        "",
        &AssemblerOptions::default(),
    )
    .unwrap();
    let out = job.source_text();

    assert!(out.contains("PA12,8;"));
    assert!(!out.contains("PA12.7"));
    assert!(out.starts_with("CO \""));
    assert!(out.contains("IN;"));
}
