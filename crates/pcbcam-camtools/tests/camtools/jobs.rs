use pcbcam_camtools::cncjob::{
    AssemblerOptions, PreprocessorRegistry, SourceKind, ToolpathAssembler, DEFAULT_PREPROCESSOR,
};
use pcbcam_camtools::excellon::{parse_excellon, ExcellonParseOptions};
use pcbcam_camtools::gerber::{parse_gerber, GerberParseOptions};
use pcbcam_camtools::io::{read_text, write_atomic};
use pcbcam_camtools::isolation::{isolate_gerber, IsolationParams};
use pcbcam_core::MachiningParams;
use tempfile::TempDir;

const PADS: &str = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10R,2.0X2.0*%\nD10*\nX0Y0D03*\nX100000Y0D03*\nM02*\n";

#[test]
fn gerber_file_to_isolation_program() {
    let dir = TempDir::new().unwrap();
    let gbr = dir.path().join("top.gbr");
    write_atomic(&gbr, PADS).unwrap();

    let doc = parse_gerber(&read_text(&gbr).unwrap(), &GerberParseOptions::default()).unwrap();
    let params = IsolationParams {
        tool_diameter: 0.2,
        passes: 2,
        machining: MachiningParams {
            cut_z: -0.05,
            spindle_speed: Some(12000.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let tables = isolate_gerber(&doc, &params).unwrap();
    let options = AssemblerOptions {
        name: "top".into(),
        preamble: "(operator: check zero)".into(),
        ..Default::default()
    };
    let job = ToolpathAssembler::new(options)
        .assemble(&SourceKind::Geometry(tables.into_iter().next().unwrap()))
        .unwrap();

    // two pads, two passes
    let plunges = job.source_text().lines().filter(|l| l.starts_with("G01 Z-0.0500")).count();
    assert_eq!(plunges, 4);
    assert!(job.source_text().contains("M03 S12000"));
    assert!(job.header().contains("(Name: top)"));

    let bounds = job.bounds().unwrap();
    assert!(bounds.min_x < -1.0 && bounds.max_x > 11.0);

    let out = dir.path().join("top.nc");
    job.export(&out).unwrap();
    assert_eq!(read_text(&out).unwrap(), job.source_text());
}

#[test]
fn drill_program_with_toolchanges() {
    let text = "M48\nMETRIC\nT1C0.8\nT2C1.0\nT3C3.0\n%\nT1\nX1.0Y1.0\nT2\nX2.0Y2.0\nX3.0Y3.0\nM30\n";
    let doc = parse_excellon(text, &ExcellonParseOptions::default()).unwrap();
    let job = ToolpathAssembler::new(AssemblerOptions::default())
        .assemble(&SourceKind::Excellon(doc.tools))
        .unwrap();

    assert_eq!(job.blocks().iter().map(|b| b.tool_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(job.block(1).unwrap().gcode().contains("T1\nM5\nM6"));
    assert!(job.block(2).unwrap().gcode().contains("T2\nM5\nM6"));
    assert_eq!(job.source_text().matches("M6\n").count(), 2);
}

#[test]
fn reexport_with_new_preamble_keeps_blocks() {
    let doc = parse_gerber(PADS, &GerberParseOptions::default()).unwrap();
    let tables = isolate_gerber(&doc, &IsolationParams::default()).unwrap();
    let source = SourceKind::Geometry(tables.into_iter().next().unwrap());
    let mut job = ToolpathAssembler::new(AssemblerOptions::default())
        .assemble(&source)
        .unwrap();
    let before = job.blocks().to_vec();

    job.set_preamble("G54");
    job.set_postamble("M30");
    assert_eq!(job.blocks(), before.as_slice());
    assert!(job.source_text().contains("\nG54\nG21\n"));
    assert!(job.source_text().ends_with("M30\nM02\n"));
}

#[test]
fn unknown_dialect_falls_back() {
    let registry = PreprocessorRegistry::default();
    let pp = registry.resolve("Haas_VF2");
    assert_eq!(pp.name(), DEFAULT_PREPROCESSOR);
    assert!(registry.list_registered().contains(&"marlin"));
}
