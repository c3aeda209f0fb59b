//! File to file operations behind the command line.
//!
//! Each function reads one input, runs it through the camtools pipeline
//! with the settings of a [`Config`] and writes one output.

use anyhow::{Context, Result};
use pcbcam_camtools::cncjob::{CncJob, SourceKind, ToolpathAssembler};
use pcbcam_camtools::io::{read_text, write_atomic};
use pcbcam_camtools::{
    export_excellon, export_gerber, isolate_gerber, parse_excellon, parse_gerber,
    ExcellonDocument, GerberDocument,
};
use pcbcam_core::{Bounds, GeometryTools, Units};
use pcbcam_settings::Config;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Command line overrides of the isolation defaults.
#[derive(Debug, Clone, Default)]
pub struct IsolateOverrides {
    pub tool_diameter: Option<f64>,
    pub passes: Option<usize>,
    pub follow: bool,
}

fn job_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string())
}

pub fn load_gerber(config: &Config, path: &Path) -> Result<GerberDocument> {
    let text = read_text(path)?;
    let doc = parse_gerber(&text, &config.geometry.gerber_parse_options())
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        "Loaded {} elements from {}",
        doc.element_count(),
        path.display()
    );
    Ok(doc)
}

pub fn load_excellon(config: &Config, path: &Path) -> Result<ExcellonDocument> {
    let text = read_text(path)?;
    let doc = parse_excellon(&text, &config.excellon_parse_options())
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!("Loaded {} drill hits from {}", doc.total_drills(), path.display());
    Ok(doc)
}

/// Pass tables as one table, tools renumbered in pass order.
fn merge_passes(tables: Vec<GeometryTools>) -> GeometryTools {
    let mut merged = GeometryTools::new();
    for table in tables {
        for (_, tool) in table.iter() {
            merged.insert(tool.clone());
        }
    }
    merged
}

/// Isolation routing program for a copper layer.
pub fn isolate(
    config: &Config,
    input: &Path,
    output: &Path,
    units: Units,
    overrides: &IsolateOverrides,
) -> Result<CncJob> {
    let mut doc = load_gerber(config, input)?;
    doc.convert_units(units);

    let mut params = config.isolation_params();
    if let Some(dia) = overrides.tool_diameter {
        params.tool_diameter = dia;
    }
    if let Some(passes) = overrides.passes {
        params.passes = passes;
    }
    params.follow = overrides.follow;

    let tables = isolate_gerber(&doc, &params)?;
    let source = SourceKind::Geometry(merge_passes(tables));
    let options = config.cnc.assembler_options(&job_name(input), units);
    let job = ToolpathAssembler::new(options).assemble(&source)?;
    job.export(output)?;
    Ok(job)
}

/// Drilling program for a drill file.
pub fn drill(config: &Config, input: &Path, output: &Path, units: Units) -> Result<CncJob> {
    let mut doc = load_excellon(config, input)?;
    doc.convert_units(units);

    let params = config.cnc.drilling_params();
    for (_, tool) in doc.tools.iter_mut() {
        tool.params = params.clone();
    }

    let options = config.cnc.assembler_options(&job_name(input), units);
    let job = ToolpathAssembler::new(options).assemble(&SourceKind::Excellon(doc.tools))?;
    job.export(output)?;
    Ok(job)
}

/// Rewrite a Gerber file in the configured export format.
pub fn convert_gerber(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let doc = load_gerber(config, input)?;
    let text = export_gerber(&doc, &config.gerber_export)?;
    write_atomic(output, &text)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Rewrite a drill file in the configured export format.
pub fn convert_excellon(config: &Config, input: &Path, output: &Path) -> Result<()> {
    let doc = load_excellon(config, input)?;
    let text = export_excellon(&doc, &config.excellon_export)?;
    write_atomic(output, &text)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Summary printed by `pcbcam info`.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub kind: &'static str,
    pub units: Units,
    pub tools: usize,
    pub elements: usize,
    pub bounds: Option<Bounds>,
}

/// Summarize a Gerber or drill file, picked by extension.
pub fn summarize(config: &Config, input: &Path) -> Result<FileSummary> {
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if matches!(ext.as_str(), "drl" | "xln" | "exc" | "txt") {
        let doc = load_excellon(config, input)?;
        return Ok(FileSummary {
            kind: "excellon",
            units: doc.units,
            tools: doc.tools.len(),
            elements: doc.total_drills(),
            bounds: doc.bounds(),
        });
    }
    let doc = load_gerber(config, input)?;
    Ok(FileSummary {
        kind: "gerber",
        units: doc.units,
        tools: doc.apertures.len(),
        elements: doc.element_count(),
        bounds: doc.bounds(),
    })
}
