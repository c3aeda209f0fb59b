//! CNC jobs
//!
//! A [`CncJob`] is the machine program for one geometry or drill source.
//! It keeps the program as separate sections (header, user preamble,
//! start code, one block per tool, end code, user postamble, program
//! end) and the complete text is rebuilt whenever a section changes.

pub mod assembler;
pub mod motion;
pub mod preprocessor;

pub use assembler::{assemble_toolpath, AssemblerOptions, PathOrdering, SourceKind, ToolpathAssembler};
pub use motion::{parse_gcode_motion, parse_hpgl_motion, MotionSegment, Point3D};
pub use preprocessor::{
    HeaderStyle, Preprocessor, PreprocessorHandle, PreprocessorRegistry, ToolContext,
    DEFAULT_PREPROCESSOR,
};

use crate::error::CamToolResult;
use crate::io::write_atomic;
use crate::polygon_ops::{stroke_segment, union_all};
use pcbcam_core::geometry::{Bounds, Point, Polygon, Shape};
use pcbcam_core::{ToolTableError, Units};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// What a job was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Geometry,
    Excellon,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Geometry => write!(f, "Geometry"),
            JobKind::Excellon => write!(f, "Excellon"),
        }
    }
}

/// Program text of one tool and the motion it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBlock {
    pub tool_id: u32,
    pub diameter: f64,
    pub preprocessor: String,
    gcode: String,
    segments: Vec<MotionSegment>,
}

impl ToolBlock {
    pub fn new(tool_id: u32, diameter: f64, preprocessor: impl Into<String>, gcode: String) -> Self {
        let mut block = Self {
            tool_id,
            diameter,
            preprocessor: preprocessor.into(),
            gcode: String::new(),
            segments: Vec::new(),
        };
        block.set_gcode(gcode);
        block
    }

    fn set_gcode(&mut self, gcode: String) {
        self.segments = match HeaderStyle::for_preprocessor(&self.preprocessor) {
            HeaderStyle::Hpgl => parse_hpgl_motion(&gcode),
            _ => parse_gcode_motion(&gcode),
        };
        self.gcode = gcode;
    }

    pub fn gcode(&self) -> &str {
        &self.gcode
    }

    pub fn segments(&self) -> &[MotionSegment] {
        &self.segments
    }

    /// Cutting moves as polylines, one per uninterrupted run.
    pub fn cut_paths(&self) -> Vec<Shape> {
        let mut paths = Vec::new();
        let mut run: Vec<Point> = Vec::new();
        for seg in &self.segments {
            if seg.rapid || seg.is_vertical() {
                if run.len() >= 2 {
                    paths.push(Shape::Line(std::mem::take(&mut run)));
                }
                run.clear();
                continue;
            }
            if run.is_empty() {
                run.push(seg.from.xy());
            }
            run.push(seg.to.xy());
        }
        if run.len() >= 2 {
            paths.push(Shape::Line(run));
        }
        paths
    }

    /// Area swept by the tool while cutting.
    pub fn display_geometry(&self, steps_per_circle: usize) -> Vec<Polygon> {
        let strokes: Vec<Polygon> = self
            .segments
            .iter()
            .filter(|s| !s.rapid)
            .map(|s| {
                if s.is_vertical() {
                    Polygon::circle(s.to.xy(), self.diameter / 2.0, steps_per_circle)
                } else {
                    stroke_segment(s.from.xy(), s.to.xy(), self.diameter, steps_per_circle)
                }
            })
            .collect();
        union_all(&strokes)
    }

    pub fn cut_length(&self) -> f64 {
        self.segments.iter().filter(|s| !s.rapid).map(|s| s.length()).sum()
    }
}

/// Fixed sections produced by the assembler around the tool blocks.
#[derive(Debug, Clone, Default)]
pub(crate) struct JobSections {
    pub header: String,
    pub start_code: String,
    pub end_code: String,
    pub program_end: String,
}

/// Machine program with its per tool breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CncJob {
    pub name: String,
    pub kind: JobKind,
    pub units: Units,
    header: String,
    preamble: String,
    start_code: String,
    blocks: Vec<ToolBlock>,
    end_code: String,
    postamble: String,
    program_end: String,
    #[serde(skip)]
    source_text: String,
}

fn push_section(out: &mut String, section: &str) {
    if section.is_empty() {
        return;
    }
    out.push_str(section);
    if !section.ends_with('\n') {
        out.push('\n');
    }
}

impl CncJob {
    pub(crate) fn from_sections(
        name: String,
        kind: JobKind,
        units: Units,
        sections: JobSections,
        blocks: Vec<ToolBlock>,
        preamble: String,
        postamble: String,
    ) -> Self {
        let mut job = Self {
            name,
            kind,
            units,
            header: sections.header,
            preamble,
            start_code: sections.start_code,
            blocks,
            end_code: sections.end_code,
            postamble,
            program_end: sections.program_end,
            source_text: String::new(),
        };
        job.regenerate();
        job
    }

    fn regenerate(&mut self) {
        let mut out = String::new();
        push_section(&mut out, &self.header);
        push_section(&mut out, &self.preamble);
        push_section(&mut out, &self.start_code);
        for block in &self.blocks {
            push_section(&mut out, &block.gcode);
        }
        push_section(&mut out, &self.end_code);
        push_section(&mut out, &self.postamble);
        push_section(&mut out, &self.program_end);
        self.source_text = out;
    }

    /// The complete program.
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn postamble(&self) -> &str {
        &self.postamble
    }

    pub fn blocks(&self) -> &[ToolBlock] {
        &self.blocks
    }

    pub fn block(&self, tool_id: u32) -> Option<&ToolBlock> {
        self.blocks.iter().find(|b| b.tool_id == tool_id)
    }

    pub fn set_preamble(&mut self, preamble: impl Into<String>) {
        self.preamble = preamble.into();
        self.regenerate();
    }

    pub fn set_postamble(&mut self, postamble: impl Into<String>) {
        self.postamble = postamble.into();
        self.regenerate();
    }

    /// Swap in hand-edited text for one tool.
    pub fn replace_tool_gcode(&mut self, tool_id: u32, gcode: impl Into<String>) -> CamToolResult<()> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.tool_id == tool_id)
            .ok_or(ToolTableError::UnknownTool(tool_id))?;
        block.set_gcode(gcode.into());
        self.regenerate();
        Ok(())
    }

    /// Every motion segment in program order.
    pub fn segments(&self) -> impl Iterator<Item = &MotionSegment> {
        self.blocks.iter().flat_map(|b| b.segments.iter())
    }

    pub fn cut_length(&self) -> f64 {
        self.blocks.iter().map(|b| b.cut_length()).sum()
    }

    /// XY extent of the cutting moves.
    pub fn bounds(&self) -> Option<Bounds> {
        let segments: Vec<MotionSegment> = self.segments().copied().collect();
        motion::cut_bounds(&segments)
    }

    /// Write the program to `path`.
    pub fn export(&self, path: impl AsRef<Path>) -> CamToolResult<()> {
        let path = path.as_ref();
        write_atomic(path, &self.source_text)?;
        info!("Exported {} job '{}' to {}", self.kind, self.name, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CncJob {
        let blocks = vec![
            ToolBlock::new(1, 0.2, "default", "G00 X0 Y0\nG01 Z-0.1\nG01 X10 Y0\n".into()),
            ToolBlock::new(2, 0.8, "default", "G00 X5 Y5\nG01 Z-0.1\n".into()),
        ];
        CncJob::from_sections(
            "board".into(),
            JobKind::Geometry,
            Units::Mm,
            JobSections {
                header: "(HEADER)".into(),
                start_code: "G21\nG90".into(),
                end_code: "M05".into(),
                program_end: "M02".into(),
            },
            blocks,
            String::new(),
            String::new(),
        )
    }

    #[test]
    fn test_source_text_sections() {
        let job = job();
        assert_eq!(
            job.source_text(),
            "(HEADER)\nG21\nG90\nG00 X0 Y0\nG01 Z-0.1\nG01 X10 Y0\nG00 X5 Y5\nG01 Z-0.1\nM05\nM02\n"
        );
    }

    #[test]
    fn test_set_preamble_regenerates() {
        let mut job = job();
        job.set_preamble("(user start)");
        job.set_postamble("(user end)");
        assert!(job.source_text().starts_with("(HEADER)\n(user start)\nG21"));
        assert!(job.source_text().ends_with("M05\n(user end)\nM02\n"));
    }

    #[test]
    fn test_replace_tool_gcode() {
        let mut job = job();
        job.replace_tool_gcode(2, "G00 X1 Y1\nG01 X2 Y1").unwrap();
        assert!(job.source_text().contains("G01 X2 Y1\nM05"));
        assert_eq!(job.block(2).unwrap().segments().len(), 2);
        assert!(job.replace_tool_gcode(9, "").is_err());
    }

    #[test]
    fn test_cut_paths_and_length() {
        let job = job();
        let block = job.block(1).unwrap();
        assert_eq!(block.cut_paths().len(), 1);
        assert!((job.cut_length() - 10.2).abs() < 1e-9);
        let area: f64 = block.display_geometry(32).iter().map(|p| p.area()).sum();
        assert!(area > 10.0 * 0.2 && area < 10.0 * 0.2 + 0.05);
    }
}
