//! NC drill reader
//!
//! Line based. `M48` opens the header where units, zero handling and
//! tools are declared; `%` or `M95` closes it. The body selects tools and
//! issues hits, G85 slots and routed (M15/M16) slots.

use super::ExcellonDocument;
use crate::error::{ParseError, ParseResult};
use pcbcam_core::geometry::Point;
use pcbcam_core::{CoordinateCodec, DrillTool, Slot, Units, ZeroSuppression};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static RE_UNITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(METRIC|INCH)(?:,(LZ|TZ))?(?:,(0*)\.(0*))?$").expect("invalid regex pattern")
});
static RE_FILE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^;\s*FILE_FORMAT\s*=\s*(\d+)\s*:\s*(\d+)").expect("invalid regex pattern")
});
static RE_TOOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^T0*(\d+)((?:[A-Z][+-]?[\d.]+)*)$").expect("invalid regex pattern")
});
static RE_TOOL_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z])([+-]?[\d.]+)").expect("invalid regex pattern"));
static RE_COORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:X([+-]?[\d.]+))?(?:Y([+-]?[\d.]+))?$").expect("invalid regex pattern")
});

const HEADER_IGNORED: [&str; 8] = ["FMAT", "VER", "ICI", "ATC", "DETECT", "G90", "G05", "OFF"];

/// Fallbacks for drill files that do not declare their format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcellonParseOptions {
    pub default_units: Units,
    /// Integer and decimal digits assumed for inch files
    pub inch_digits: (u8, u8),
    /// Integer and decimal digits assumed for metric files
    pub metric_digits: (u8, u8),
    /// Zero suppression assumed when neither LZ nor TZ is given
    pub zeros: ZeroSuppression,
    pub steps_per_circle: usize,
}

impl Default for ExcellonParseOptions {
    fn default() -> Self {
        Self {
            default_units: Units::Inch,
            inch_digits: (2, 4),
            metric_digits: (3, 3),
            zeros: ZeroSuppression::Trailing,
            steps_per_circle: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Drill,
    Rout,
}

struct ExcellonParser {
    options: ExcellonParseOptions,
    doc: ExcellonDocument,
    units: Option<Units>,
    zeros: Option<ZeroSuppression>,
    digits: Option<(u8, u8)>,
    in_header: bool,
    current: Option<u32>,
    pos: Point,
    mode: Mode,
    tool_down: bool,
    finished: bool,
}

impl ExcellonParser {
    fn new(options: ExcellonParseOptions) -> Self {
        let mut doc = ExcellonDocument::new(options.default_units);
        doc.steps_per_circle = options.steps_per_circle;
        Self {
            options,
            doc,
            units: None,
            zeros: None,
            digits: None,
            in_header: false,
            current: None,
            pos: Point::default(),
            mode: Mode::Drill,
            tool_down: false,
            finished: false,
        }
    }

    fn parse(mut self, text: &str) -> ParseResult<ExcellonDocument> {
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let cmd = raw.trim();
            if cmd.is_empty() {
                continue;
            }
            if self.finished {
                warn!("Ignoring content after M30 on line {}", line);
                break;
            }
            if cmd.starts_with(';') {
                self.comment(cmd);
                continue;
            }
            let cmd: String = cmd.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
            if self.in_header {
                self.header(line, &cmd)?;
            } else {
                self.body(line, &cmd)?;
            }
        }
        if !self.finished {
            warn!("Excellon file has no M30 end of program");
        }
        self.doc.units = self.units.unwrap_or(self.options.default_units);
        info!(
            "Parsed Excellon: {} tools, {} hits, units {}",
            self.doc.tools.len(),
            self.doc.total_drills(),
            self.doc.units
        );
        Ok(self.doc)
    }

    fn comment(&mut self, cmd: &str) {
        if let Some(caps) = RE_FILE_FORMAT.captures(cmd) {
            let int = caps[1].parse::<u8>().ok();
            let dec = caps[2].parse::<u8>().ok();
            if let (Some(int), Some(dec)) = (int, dec) {
                debug!("Excellon FILE_FORMAT {}:{}", int, dec);
                self.digits = Some((int, dec));
            }
        }
    }

    fn set_units(&mut self, line: usize, units: Units) {
        match self.units {
            None => self.units = Some(units),
            Some(existing) if existing != units => warn!(
                "line {}: ignoring repeated units declaration ({}), keeping {}",
                line, units, existing
            ),
            Some(_) => {}
        }
    }

    fn header(&mut self, line: usize, cmd: &str) -> ParseResult<()> {
        if cmd == "%" || cmd == "M95" {
            self.in_header = false;
            return Ok(());
        }
        if let Some(caps) = RE_UNITS.captures(cmd) {
            let units = if &caps[1] == "METRIC" { Units::Mm } else { Units::Inch };
            self.set_units(line, units);
            if let Some(z) = caps.get(2) {
                self.set_zeros(z.as_str());
            }
            if let (Some(int), Some(dec)) = (caps.get(3), caps.get(4)) {
                self.digits = Some((int.as_str().len() as u8, dec.as_str().len() as u8));
            }
            return Ok(());
        }
        match cmd {
            "M71" => self.set_units(line, Units::Mm),
            "M72" => self.set_units(line, Units::Inch),
            "LZ" | "TZ" => self.set_zeros(cmd),
            _ if cmd.starts_with('T') => self.tool(line, cmd, true)?,
            _ if HEADER_IGNORED.iter().any(|k| cmd.starts_with(k)) => {
                debug!("line {}: ignoring header directive {}", line, cmd)
            }
            _ => return Err(ParseError::unknown(line, cmd)),
        }
        Ok(())
    }

    fn set_zeros(&mut self, keyword: &str) {
        // LZ keeps leading zeros, so the trailing ones are the suppressed ones.
        self.zeros = Some(match keyword {
            "LZ" => ZeroSuppression::Trailing,
            _ => ZeroSuppression::Leading,
        });
    }

    fn codec(&self) -> CoordinateCodec {
        let units = self.units.unwrap_or(self.options.default_units);
        let (int, dec) = self.digits.unwrap_or(match units {
            Units::Mm => self.options.metric_digits,
            Units::Inch => self.options.inch_digits,
        });
        CoordinateCodec::new(int, dec, self.zeros.unwrap_or(self.options.zeros))
    }

    /// Tool definition (`T1C0.8`) or, in the body, a tool change (`T1`).
    fn tool(&mut self, line: usize, cmd: &str, in_header: bool) -> ParseResult<()> {
        let caps = RE_TOOL
            .captures(cmd)
            .ok_or_else(|| ParseError::unknown(line, cmd))?;
        let id: u32 = caps[1]
            .parse()
            .map_err(|_| ParseError::malformed(line, cmd, "bad tool number"))?;

        let mut diameter = None;
        for field in RE_TOOL_FIELD.captures_iter(&caps[2]) {
            if &field[1] == "C" {
                let raw = &field[2];
                let value = if raw.contains('.') {
                    raw.parse::<f64>()
                        .map_err(|_| ParseError::malformed(line, cmd, "bad tool diameter"))?
                } else {
                    self.codec()
                        .decode(raw)
                        .map_err(|source| ParseError::InvalidCoordinate {
                            line,
                            command: cmd.to_string(),
                            source,
                        })?
                };
                diameter = Some(value);
            }
        }

        match diameter {
            Some(d) => {
                if d <= 0.0 {
                    return Err(ParseError::malformed(line, cmd, "tool diameter must be positive"));
                }
                debug!("line {}: tool T{} diameter {}", line, id, d);
                self.doc.tools.insert_with_id(id, DrillTool::new(d, 4));
                if !in_header {
                    self.current = Some(id);
                }
            }
            None if in_header => {
                return Err(ParseError::malformed(line, cmd, "tool definition without diameter"))
            }
            None if id == 0 => self.current = None,
            None => {
                if !self.doc.tools.contains(id) {
                    return Err(ParseError::UndefinedTool { line, tool: id });
                }
                self.current = Some(id);
            }
        }
        Ok(())
    }

    fn body(&mut self, line: usize, cmd: &str) -> ParseResult<()> {
        match cmd {
            "M48" => {
                self.in_header = true;
                return Ok(());
            }
            "M30" | "M00" => {
                self.finished = true;
                return Ok(());
            }
            "%" | "G81" | "G90" | "M47" => return Ok(()),
            "G05" => {
                self.mode = Mode::Drill;
                return Ok(());
            }
            "M71" => {
                self.set_units(line, Units::Mm);
                return Ok(());
            }
            "M72" => {
                self.set_units(line, Units::Inch);
                return Ok(());
            }
            "M15" => {
                self.tool_down = true;
                return Ok(());
            }
            "M16" | "M17" => {
                self.tool_down = false;
                return Ok(());
            }
            _ => {}
        }

        if cmd.starts_with('T') {
            return self.tool(line, cmd, false);
        }
        if let Some((first, second)) = cmd.split_once("G85") {
            let start = self.coordinate(line, cmd, first)?;
            let end = self.coordinate(line, cmd, second)?;
            self.pos = end;
            return self.push_slot(line, cmd, start, end);
        }
        if let Some(rest) = cmd.strip_prefix("G00") {
            self.mode = Mode::Rout;
            self.tool_down = false;
            if !rest.is_empty() {
                self.pos = self.coordinate(line, cmd, rest)?;
            }
            return Ok(());
        }
        if let Some(rest) = cmd.strip_prefix("G01") {
            let target = self.coordinate(line, cmd, rest)?;
            return self.route_to(line, cmd, target);
        }
        if cmd.starts_with('X') || cmd.starts_with('Y') {
            let target = self.coordinate(line, cmd, cmd)?;
            if self.mode == Mode::Rout && self.tool_down {
                return self.route_to(line, cmd, target);
            }
            self.mode = Mode::Drill;
            self.pos = target;
            let id = self.current_tool(line, cmd)?;
            if let Some(tool) = self.doc.tools.get_mut(id) {
                tool.drills.push(target);
            }
            return Ok(());
        }
        Err(ParseError::unknown(line, cmd))
    }

    fn route_to(&mut self, line: usize, cmd: &str, target: Point) -> ParseResult<()> {
        let start = self.pos;
        self.pos = target;
        if self.tool_down {
            self.push_slot(line, cmd, start, target)
        } else {
            Ok(())
        }
    }

    fn current_tool(&self, line: usize, cmd: &str) -> ParseResult<u32> {
        self.current
            .ok_or_else(|| ParseError::malformed(line, cmd, "no tool selected"))
    }

    fn push_slot(&mut self, line: usize, cmd: &str, start: Point, end: Point) -> ParseResult<()> {
        let id = self.current_tool(line, cmd)?;
        if let Some(tool) = self.doc.tools.get_mut(id) {
            tool.slots.push(Slot { start, end });
        }
        Ok(())
    }

    /// Modal `X..Y..`: a missing axis keeps its previous value.
    fn coordinate(&self, line: usize, cmd: &str, text: &str) -> ParseResult<Point> {
        let caps = RE_COORD
            .captures(text)
            .ok_or_else(|| ParseError::unknown(line, cmd))?;
        let codec = self.codec();
        let decode = |i: usize| -> ParseResult<Option<f64>> {
            caps.get(i)
                .map(|m| codec.decode(m.as_str()))
                .transpose()
                .map_err(|source| ParseError::InvalidCoordinate {
                    line,
                    command: cmd.to_string(),
                    source,
                })
        };
        Ok(Point::new(
            decode(1)?.unwrap_or(self.pos.x),
            decode(2)?.unwrap_or(self.pos.y),
        ))
    }
}

/// Parse NC drill text into a document.
pub fn parse_excellon(text: &str, options: &ExcellonParseOptions) -> ParseResult<ExcellonDocument> {
    ExcellonParser::new(*options).parse(text)
}
