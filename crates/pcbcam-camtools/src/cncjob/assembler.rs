//! Toolpath assembly
//!
//! Turns a tool table into a [`CncJob`]. Tools are emitted one after the
//! other in table insertion order. Each tool block runs: optional tool
//! change, rise to travel height, spindle start, then a plunge / cut /
//! retract cycle per path and depth level.

use super::preprocessor::{HeaderStyle, Preprocessor, PreprocessorRegistry, ToolContext};
use super::{CncJob, JobKind, JobSections, ToolBlock};
use crate::error::{CamToolError, CamToolResult};
use chrono::Local;
use pcbcam_core::geometry::{open_ring, Point, Shape};
use pcbcam_core::{DrillTools, GeometryTools, MachiningParams, Slot, ToolEntry, Units};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static RE_HPGL_ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PA(-?\d+(?:\.\d*)?),(-?\d+(?:\.\d*)?)").expect("invalid regex pattern")
});

/// Tool table a job is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// Milling tools with the paths they follow
    Geometry(GeometryTools),
    /// Drill tools with hits and slots
    Excellon(DrillTools),
}

impl SourceKind {
    fn job_kind(&self) -> JobKind {
        match self {
            SourceKind::Geometry(_) => JobKind::Geometry,
            SourceKind::Excellon(_) => JobKind::Excellon,
        }
    }
}

/// Order in which drill hits of one tool are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrdering {
    #[default]
    AsDrawn,
    /// Greedy shortest hop from the previous hit
    NearestNeighbor,
}

/// Job wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerOptions {
    /// Program name written to the header
    pub name: String,
    /// Units of the tool table and of the emitted program
    pub units: Units,
    pub preamble: String,
    pub postamble: String,
    pub ordering: PathOrdering,
    /// Emit the tool change sequence even for a single tool
    pub force_toolchange: bool,
    pub coord_decimals: u8,
    pub feed_decimals: u8,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            name: "job".to_string(),
            units: Units::Mm,
            preamble: String::new(),
            postamble: String::new(),
            ordering: PathOrdering::AsDrawn,
            force_toolchange: false,
            coord_decimals: 4,
            feed_decimals: 3,
        }
    }
}

enum ToolPaths<'a> {
    Mill(Vec<Vec<Point>>),
    Drill { hits: &'a [Point], slots: &'a [Slot] },
}

struct PendingTool<'a> {
    id: u32,
    diameter: f64,
    params: MachiningParams,
    paths: ToolPaths<'a>,
}

/// Non-empty lines collected into one block of text.
#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, text: String) {
        if !text.is_empty() {
            self.0.push(text);
        }
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

/// Rewrites every `PA x,y` move to integer coordinates, truncating
/// towards zero.
pub fn truncate_hpgl_coordinates(text: &str) -> String {
    let truncate = |raw: &str| raw.parse::<f64>().map(|v| v.trunc() as i64).unwrap_or(0);
    RE_HPGL_ABSOLUTE
        .replace_all(text, |caps: &Captures| {
            format!("PA{},{}", truncate(&caps[1]), truncate(&caps[2]))
        })
        .into_owned()
}

/// Cut paths of one shape. Closed outlines end back on their first
/// point, followed by the extra cut when enabled.
fn shape_paths(shape: &Shape, params: &MachiningParams) -> Vec<Vec<Point>> {
    let closed = |ring: &[Point]| {
        let ring = open_ring(ring.to_vec());
        if ring.len() < 2 {
            return None;
        }
        let mut path = ring.clone();
        path.push(ring[0]);
        if params.extracut && params.extracut_length > 0.0 {
            path.extend(extra_cut(&ring, params.extracut_length));
        }
        Some(path)
    };
    match shape {
        Shape::Point(_) => Vec::new(),
        Shape::Line(points) if points.len() >= 2 => vec![points.clone()],
        Shape::Line(_) => Vec::new(),
        Shape::Ring(ring) => closed(ring).into_iter().collect(),
        Shape::Polygon(poly) => std::iter::once(&poly.exterior)
            .chain(poly.interiors.iter())
            .filter_map(|r| closed(r))
            .collect(),
    }
}

/// Points that continue `length` along an open ring past its start.
fn extra_cut(ring: &[Point], length: f64) -> Vec<Point> {
    let mut extra = Vec::new();
    let mut remaining = length;
    let n = ring.len();
    for i in 0..n {
        let (a, b) = (ring[i], ring[(i + 1) % n]);
        let seg = a.distance(&b);
        if seg <= 0.0 {
            continue;
        }
        if remaining <= seg {
            let t = remaining / seg;
            extra.push(Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
            return extra;
        }
        extra.push(b);
        remaining -= seg;
    }
    extra
}

fn nearest_neighbor(points: &[Point]) -> Vec<Point> {
    let mut left: Vec<Point> = points.to_vec();
    let mut ordered = Vec::with_capacity(left.len());
    let mut at = Point::new(0.0, 0.0);
    while !left.is_empty() {
        let (idx, _) = left
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p.distance(&at)))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        at = left.swap_remove(idx);
        ordered.push(at);
    }
    ordered
}

/// Builds [`CncJob`]s with a set of known dialects.
pub struct ToolpathAssembler {
    registry: PreprocessorRegistry,
    options: AssemblerOptions,
}

impl ToolpathAssembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self::with_registry(PreprocessorRegistry::with_builtins(), options)
    }

    pub fn with_registry(registry: PreprocessorRegistry, options: AssemblerOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    fn context<'a>(&self, tool: &'a PendingTool) -> ToolContext<'a> {
        ToolContext {
            tool_id: tool.id,
            diameter: tool.diameter,
            params: &tool.params,
            units: self.options.units,
            coord_decimals: self.options.coord_decimals,
            feed_decimals: self.options.feed_decimals,
        }
    }

    fn pending<'a>(source: &'a SourceKind) -> Vec<PendingTool<'a>> {
        let mut pending = Vec::new();
        match source {
            SourceKind::Geometry(table) => {
                for (id, tool) in table.iter() {
                    let mut params = tool.params.clone();
                    params.cut_z = tool.effective_cut_z();
                    let paths: Vec<Vec<Point>> = tool
                        .solid_geometry
                        .iter()
                        .flat_map(|s| shape_paths(s, &params))
                        .collect();
                    if paths.is_empty() {
                        debug!("Tool {} has no cuttable paths, skipped", id);
                        continue;
                    }
                    pending.push(PendingTool {
                        id,
                        diameter: tool.diameter,
                        params,
                        paths: ToolPaths::Mill(paths),
                    });
                }
            }
            SourceKind::Excellon(table) => {
                for (id, tool) in table.iter() {
                    if tool.hit_count() == 0 {
                        debug!("Tool {} has no hits, skipped", id);
                        continue;
                    }
                    pending.push(PendingTool {
                        id,
                        diameter: tool.diameter,
                        params: tool.params.clone(),
                        paths: ToolPaths::Drill {
                            hits: &tool.drills,
                            slots: &tool.slots,
                        },
                    });
                }
            }
        }
        for tool in pending.iter_mut() {
            if tool.params.cut_z > 0.0 {
                warn!(
                    "Tool {}: positive cut Z {} treated as {}",
                    tool.id, tool.params.cut_z, -tool.params.cut_z
                );
                tool.params.cut_z = -tool.params.cut_z;
            }
        }
        pending
    }

    /// Assemble the program for every tool of `source`.
    ///
    /// Tools without a cuttable path are skipped; the job fails only
    /// when none is left.
    pub fn assemble(&self, source: &SourceKind) -> CamToolResult<CncJob> {
        let kind = source.job_kind();
        let tools = Self::pending(source);
        let (Some(first), Some(last)) = (tools.first(), tools.last()) else {
            return Err(CamToolError::EmptyJob);
        };

        let lead = self.registry.resolve(&first.params.preprocessor);
        let tail = self.registry.resolve(&last.params.preprocessor);
        let toolchange = tools.len() > 1 || self.options.force_toolchange;
        let include_header = lead.include_header();

        let mut blocks = Vec::with_capacity(tools.len());
        for tool in &tools {
            let pp = self.registry.resolve(&tool.params.preprocessor);
            let mut text = self.tool_block(pp.as_ref(), tool, toolchange || tool.params.toolchange);
            if pp.style() == HeaderStyle::Hpgl {
                text = truncate_hpgl_coordinates(&text);
            }
            blocks.push(ToolBlock::new(tool.id, tool.diameter, pp.name(), text));
        }

        let sections = if include_header {
            let tail_ctx = self.context(last);
            let mut end = Lines::default();
            end.push(tail.end_code(&tail_ctx));
            end.push(tail.spindle_stop(&tail_ctx));
            let mut end_code = end.finish();
            if tail.style() == HeaderStyle::Hpgl {
                end_code = truncate_hpgl_coordinates(&end_code);
            }
            JobSections {
                header: self.header(lead.as_ref(), kind, &tools),
                start_code: lead.start_code(&self.context(first)),
                end_code,
                program_end: tail.program_end(),
            }
        } else {
            JobSections::default()
        };

        info!(
            "Assembled {} job '{}' with {} tools using '{}'",
            kind,
            self.options.name,
            blocks.len(),
            lead.name()
        );
        Ok(CncJob::from_sections(
            self.options.name.clone(),
            kind,
            self.options.units,
            sections,
            blocks,
            self.options.preamble.clone(),
            self.options.postamble.clone(),
        ))
    }

    fn header(&self, pp: &dyn Preprocessor, kind: JobKind, tools: &[PendingTool]) -> String {
        let style = pp.style();
        let mut lines = vec![
            format!("G-CODE GENERATED BY PCBCAM v{}", env!("CARGO_PKG_VERSION")),
            format!("Name: {}", self.options.name),
            format!("Type: {} CNC job", kind),
            format!("Units: {}", self.options.units.keyword()),
            format!("Preprocessor: {}", pp.name()),
            format!("Created on {}", Local::now().format("%A, %d %B %Y at %H:%M")),
            format!("Tools: {}", tools.len()),
        ];
        for tool in tools {
            let ctx = self.context(tool);
            lines.push(format!(
                "T{}: dia {} cut Z {} travel Z {} feed {}",
                tool.id,
                ctx.c(tool.diameter),
                ctx.c(tool.params.cut_z),
                ctx.c(tool.params.travel_z),
                ctx.f(tool.params.feedrate)
            ));
        }
        if pp.name().to_lowercase().contains("toolchange_probe") {
            lines.extend(
                [
                    "Tool height is set with a probe at every tool change.",
                    "After swapping the bit attach the probe clip and resume.",
                    "The machine probes down with G31 and zeroes Z with G92.",
                    "Remove the clip at the second pause before cutting starts.",
                ]
                .map(String::from),
            );
        }
        lines
            .iter()
            .map(|l| style.comment(l))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn tool_block(&self, pp: &dyn Preprocessor, tool: &PendingTool, toolchange: bool) -> String {
        let ctx = self.context(tool);
        let p = &tool.params;
        let levels = p.depth_levels();
        let mut out = Lines::default();

        if pp.include_header() {
            out.push(pp.comment(&format!("Tool {} dia {}", tool.id, ctx.c(tool.diameter))));
        }
        if toolchange {
            out.push(pp.toolchange_code(&ctx));
        }
        if let Some(start_z) = p.start_z {
            out.push(pp.travel_z(&ctx, start_z));
        }
        out.push(pp.travel_z(&ctx, p.travel_z));
        out.push(pp.spindle_start(&ctx));
        if p.dwell {
            out.push(pp.dwell(&ctx));
        }

        match &tool.paths {
            ToolPaths::Mill(paths) => {
                for path in paths {
                    for level in &levels {
                        out.push(pp.rapid_xy(&ctx, path[0]));
                        out.push(pp.plunge(&ctx, *level));
                        out.push(pp.cut_feed(&ctx));
                        for point in &path[1..] {
                            out.push(pp.feed_xy(&ctx, *point));
                        }
                        out.push(pp.travel_z(&ctx, p.travel_z));
                    }
                }
            }
            ToolPaths::Drill { hits, slots } => {
                let hits = match self.options.ordering {
                    PathOrdering::AsDrawn => hits.to_vec(),
                    PathOrdering::NearestNeighbor => nearest_neighbor(hits),
                };
                for hit in hits {
                    out.push(pp.rapid_xy(&ctx, hit));
                    for level in &levels {
                        out.push(pp.plunge(&ctx, *level));
                        out.push(pp.travel_z(&ctx, p.travel_z));
                    }
                }
                for slot in slots.iter() {
                    for level in &levels {
                        out.push(pp.rapid_xy(&ctx, slot.start));
                        out.push(pp.plunge(&ctx, *level));
                        out.push(pp.cut_feed(&ctx));
                        out.push(pp.feed_xy(&ctx, slot.end));
                        out.push(pp.travel_z(&ctx, p.travel_z));
                    }
                }
            }
        }
        out.finish()
    }
}

/// Assemble `source` with the built-in dialects.
pub fn assemble_toolpath(
    source: &SourceKind,
    preamble: &str,
    postamble: &str,
    options: &AssemblerOptions,
) -> CamToolResult<CncJob> {
    let options = AssemblerOptions {
        preamble: preamble.to_string(),
        postamble: postamble.to_string(),
        ..options.clone()
    };
    ToolpathAssembler::new(options).assemble(source)
}
