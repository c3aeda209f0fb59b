//! RS-274X reader
//!
//! The source is split into `*`-terminated words and `%...%` extended
//! blocks, then replayed through a small state machine that tracks the
//! current point, aperture, interpolation mode, polarity and region.

use super::aperture::{ApertureElement, ApertureId, ApertureShape, Polarity};
use super::GerberDocument;
use crate::error::{ParseError, ParseResult};
use crate::polygon_ops::{arc_points, stroke_arc, stroke_segment, sweep_convex, union_all};
use pcbcam_core::geometry::{open_ring, Point, Polygon, Shape};
use pcbcam_core::{CoordinateCodec, Units, ZeroSuppression};
use regex::Regex;
use std::collections::HashSet;
use std::f64::consts::PI;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static RE_FORMAT_SPEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^FS([LTD])([AI])X(\d)(\d)Y(\d)(\d)$").expect("invalid regex pattern")
});
static RE_APERTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ADD(\d+)([._$a-zA-Z][._$a-zA-Z0-9]*)(?:,(.*))?$").expect("invalid regex pattern")
});
static RE_OPERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:G0*(\d+))?(?:X([+-]?[\d.]+))?(?:Y([+-]?[\d.]+))?(?:I([+-]?[\d.]+))?(?:J([+-]?[\d.]+))?(?:D0*(\d+))?$",
    )
    .expect("invalid regex pattern")
});
static RE_IDENTITY_TRANSFORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:OFA0*(?:\.0*)?B0*(?:\.0*)?|SFA1(?:\.0*)?B1(?:\.0*)?|MIA0B0|ASAXBY|IR0|SR|SRX1Y1I0(?:\.0*)?J0(?:\.0*)?)$")
        .expect("invalid regex pattern")
});

/// Parse settings that do not come from the file itself.
#[derive(Debug, Clone, Copy)]
pub struct GerberParseOptions {
    /// Segments used to approximate a full circle
    pub steps_per_circle: usize,
    /// Units assumed when the file never declares any
    pub default_units: Units,
}

impl Default for GerberParseOptions {
    fn default() -> Self {
        Self {
            steps_per_circle: 64,
            default_units: Units::Inch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Word(String),
    Extended(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    line: usize,
    block: Block,
}

fn push_word(words: &mut Vec<String>, buf: &mut String) {
    let raw = std::mem::take(buf);
    let word = if is_comment(&raw) {
        raw.trim_end().to_string()
    } else {
        raw.chars().filter(|c| !c.is_whitespace()).collect()
    };
    if !word.is_empty() {
        words.push(word);
    }
}

fn is_comment(word: &str) -> bool {
    word.starts_with("G04") || word == "G4" || word.starts_with("G4 ")
}

fn tokenize(text: &str) -> ParseResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut line = 1;
    let mut word_line = 1;
    let mut extended: Option<(usize, Vec<String>)> = None;

    for c in text.chars() {
        match c {
            '\n' => line += 1,
            '\r' => {}
            '%' => match extended.take() {
                Some((start, mut words)) => {
                    push_word(&mut words, &mut buf);
                    tokens.push(Token {
                        line: start,
                        block: Block::Extended(words),
                    });
                }
                None => {
                    if !buf.trim().is_empty() {
                        return Err(ParseError::malformed(word_line, buf.trim(), "missing '*'"));
                    }
                    buf.clear();
                    extended = Some((line, Vec::new()));
                }
            },
            '*' => match extended.as_mut() {
                Some((_, words)) => push_word(words, &mut buf),
                None => {
                    let mut words = Vec::new();
                    push_word(&mut words, &mut buf);
                    if let Some(word) = words.pop() {
                        tokens.push(Token {
                            line: word_line,
                            block: Block::Word(word),
                        });
                    }
                }
            },
            ' ' | '\t' if buf.is_empty() => {}
            _ => {
                if buf.is_empty() {
                    word_line = line;
                }
                buf.push(c);
            }
        }
    }

    if extended.is_some() {
        return Err(ParseError::UnexpectedEof("unterminated '%' block".to_string()));
    }
    if !buf.trim().is_empty() {
        return Err(ParseError::UnexpectedEof(format!(
            "unterminated command '{}'",
            buf.trim()
        )));
    }
    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Linear,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuadrantMode {
    Single,
    Multi,
}

/// A run of consecutive D01 draws with one aperture.
struct PathState {
    aperture: ApertureId,
    points: Vec<Point>,
    strokes: Vec<Polygon>,
}

struct Coordinates {
    x: Option<f64>,
    y: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
}

struct GerberParser {
    options: GerberParseOptions,
    doc: GerberDocument,
    codecs: Option<(CoordinateCodec, CoordinateCodec)>,
    units: Option<Units>,
    macros: HashSet<String>,
    current: Option<ApertureId>,
    interpolation: Interpolation,
    quadrant: QuadrantMode,
    polarity: Polarity,
    pos: Point,
    last_op: Option<u32>,
    path: Option<PathState>,
    /// Closed contours of the open region, and the one being traced
    region: Option<(Vec<Vec<Point>>, Vec<Point>)>,
    seq: u64,
    finished: bool,
}

impl GerberParser {
    fn new(options: GerberParseOptions) -> Self {
        Self {
            options,
            doc: GerberDocument::new(options.default_units),
            codecs: None,
            units: None,
            macros: HashSet::new(),
            current: None,
            interpolation: Interpolation::Linear,
            quadrant: QuadrantMode::Single,
            polarity: Polarity::Dark,
            pos: Point::default(),
            last_op: None,
            path: None,
            region: None,
            seq: 0,
            finished: false,
        }
    }

    fn next_seq(&mut self) -> u64 {
        let s = self.seq;
        self.seq += 1;
        s
    }

    fn parse(mut self, text: &str) -> ParseResult<GerberDocument> {
        for token in tokenize(text)? {
            if self.finished {
                warn!("Ignoring content after M02 on line {}", token.line);
                break;
            }
            match token.block {
                Block::Extended(words) => self.extended(token.line, &words)?,
                Block::Word(word) => self.word(token.line, &word)?,
            }
        }
        self.flush_path();
        if self.region.is_some() {
            return Err(ParseError::UnexpectedEof("region not closed with G37".to_string()));
        }
        if !self.finished {
            warn!("Gerber file has no M02 end of program");
        }
        self.doc.units = self.units.unwrap_or(self.options.default_units);
        info!(
            "Parsed Gerber: {} apertures, {} elements, units {}",
            self.doc.apertures.len(),
            self.seq,
            self.doc.units
        );
        Ok(self.doc)
    }

    fn set_units(&mut self, line: usize, units: Units) {
        match self.units {
            None => self.units = Some(units),
            Some(existing) => warn!(
                "line {}: ignoring repeated units declaration ({}), keeping {}",
                line, units, existing
            ),
        }
    }

    fn extended(&mut self, line: usize, words: &[String]) -> ParseResult<()> {
        for word in words {
            let code = word.get(..2).unwrap_or(word.as_str());
            match code {
                "FS" => self.format_spec(line, word)?,
                "MO" => match word.as_str() {
                    "MOIN" => self.set_units(line, Units::Inch),
                    "MOMM" => self.set_units(line, Units::Mm),
                    _ => return Err(ParseError::malformed(line, word, "expected MOIN or MOMM")),
                },
                "AD" => self.aperture_definition(line, word)?,
                "AM" => {
                    // Primitives follow in the same block; only the name is kept.
                    let name = word[2..].to_string();
                    debug!("line {}: aperture macro {}", line, name);
                    self.macros.insert(name);
                    return Ok(());
                }
                "LP" => {
                    self.flush_path();
                    self.polarity = match word.as_str() {
                        "LPD" => Polarity::Dark,
                        "LPC" => Polarity::Clear,
                        _ => return Err(ParseError::malformed(line, word, "expected LPD or LPC")),
                    };
                }
                "TF" | "TA" | "TO" | "TD" | "IN" | "IP" | "LN" => {
                    debug!("line {}: ignoring {}", line, word);
                }
                _ if RE_IDENTITY_TRANSFORM.is_match(word) => {
                    debug!("line {}: ignoring identity {}", line, word);
                }
                "SR" => return Err(ParseError::unsupported(line, word, "step and repeat")),
                "OF" | "SF" | "MI" | "AS" | "IR" => {
                    return Err(ParseError::unsupported(line, word, "image transform"))
                }
                _ => return Err(ParseError::unknown(line, word)),
            }
        }
        Ok(())
    }

    fn format_spec(&mut self, line: usize, word: &str) -> ParseResult<()> {
        if self.codecs.is_some() {
            warn!("line {}: ignoring repeated format specification {}", line, word);
            return Ok(());
        }
        let caps = RE_FORMAT_SPEC
            .captures(word)
            .ok_or_else(|| ParseError::malformed(line, word, "bad format specification"))?;
        if &caps[2] == "I" {
            return Err(ParseError::unsupported(line, word, "incremental coordinates"));
        }
        let zeros = match &caps[1] {
            "T" => ZeroSuppression::Trailing,
            _ => ZeroSuppression::Leading,
        };
        let digit = |i: usize| caps[i].parse::<u8>().unwrap_or(0);
        self.codecs = Some((
            CoordinateCodec::new(digit(3), digit(4), zeros),
            CoordinateCodec::new(digit(5), digit(6), zeros),
        ));
        debug!(
            "line {}: format {}.{} {} zeros suppressed",
            line,
            digit(3),
            digit(4),
            zeros
        );
        Ok(())
    }

    fn aperture_definition(&mut self, line: usize, word: &str) -> ParseResult<()> {
        let caps = RE_APERTURE
            .captures(word)
            .ok_or_else(|| ParseError::malformed(line, word, "bad aperture definition"))?;
        let id: u32 = caps[1]
            .parse()
            .map_err(|_| ParseError::malformed(line, word, "bad aperture number"))?;
        if id < ApertureId::FIRST_CUSTOM {
            return Err(ParseError::malformed(line, word, "aperture numbers start at 10"));
        }
        let template = &caps[2];
        let params = caps
            .get(3)
            .map(|m| {
                m.as_str()
                    .split('X')
                    .map(|p| p.trim().parse::<f64>())
                    .collect::<Result<Vec<f64>, _>>()
            })
            .transpose()
            .map_err(|_| ParseError::malformed(line, word, "bad aperture parameter"))?
            .unwrap_or_default();
        let need = |n: usize| {
            if params.len() < n {
                Err(ParseError::malformed(
                    line,
                    word,
                    format!("expected at least {} parameters", n),
                ))
            } else {
                Ok(())
            }
        };

        let sizes = match template {
            "C" => 1,
            "R" | "O" => 2,
            _ => 0,
        };
        if let Some(bad) = params.iter().take(sizes).find(|v| **v < 0.0) {
            return Err(ParseError::malformed(
                line,
                word,
                format!("negative aperture size {}", bad),
            ));
        }

        let shape = match template {
            "C" => {
                need(1)?;
                ApertureShape::Circle {
                    diameter: params[0],
                    hole: params.get(1).copied(),
                }
            }
            "R" | "O" => {
                need(2)?;
                let (width, height, hole) = (params[0], params[1], params.get(2).copied());
                if template == "R" {
                    ApertureShape::Rectangle { width, height, hole }
                } else {
                    ApertureShape::Obround { width, height, hole }
                }
            }
            "P" => {
                need(2)?;
                if params[0] <= 0.0 {
                    return Err(ParseError::malformed(
                        line,
                        word,
                        format!("polygon diameter must be positive, got {}", params[0]),
                    ));
                }
                let vertices = params[1];
                if vertices.fract() != 0.0 || !(3.0..=12.0).contains(&vertices) {
                    return Err(ParseError::malformed(
                        line,
                        word,
                        format!("polygon needs 3 to 12 vertices, got {}", vertices),
                    ));
                }
                ApertureShape::Polygon {
                    diameter: params[0],
                    vertices: vertices as u32,
                    rotation: params.get(2).copied().unwrap_or(0.0),
                    hole: params.get(3).copied(),
                }
            }
            name if self.macros.contains(name) => ApertureShape::Macro {
                name: name.to_string(),
            },
            name => {
                return Err(ParseError::malformed(
                    line,
                    word,
                    format!("undefined aperture macro '{}'", name),
                ))
            }
        };
        debug!("line {}: D{} = {:?}", line, id, shape);
        self.doc.apertures.define(ApertureId(id), shape);
        Ok(())
    }

    fn word(&mut self, line: usize, word: &str) -> ParseResult<()> {
        if is_comment(word) {
            return Ok(());
        }
        match word {
            "M02" => {
                self.finished = true;
                return Ok(());
            }
            "M00" | "M01" => return Ok(()),
            _ => {}
        }

        let caps = RE_OPERATION
            .captures(word)
            .ok_or_else(|| ParseError::unknown(line, word))?;

        if let Some(g) = caps.get(1) {
            let g: u32 = g.as_str().parse().map_err(|_| ParseError::unknown(line, word))?;
            self.g_code(line, word, g)?;
        }

        let raw = |i: usize| caps.get(i).map(|m| m.as_str());
        let has_coords = (2..=5).any(|i| raw(i).is_some());
        let coords = if has_coords {
            let (cx, cy) = self.codecs.ok_or_else(|| ParseError::MissingFormat {
                line,
                command: word.to_string(),
            })?;
            let decode = |codec: &CoordinateCodec, v: Option<&str>| -> ParseResult<Option<f64>> {
                v.map(|s| codec.decode(s))
                    .transpose()
                    .map_err(|source| ParseError::InvalidCoordinate {
                        line,
                        command: word.to_string(),
                        source,
                    })
            };
            Some(Coordinates {
                x: decode(&cx, raw(2))?,
                y: decode(&cy, raw(3))?,
                i: decode(&cx, raw(4))?,
                j: decode(&cy, raw(5))?,
            })
        } else {
            None
        };

        let d = match caps.get(6) {
            Some(m) => Some(
                m.as_str()
                    .parse::<u32>()
                    .map_err(|_| ParseError::unknown(line, word))?,
            ),
            None => None,
        };

        match d {
            Some(id) if id >= ApertureId::FIRST_CUSTOM => {
                if coords.is_some() {
                    return Err(ParseError::malformed(line, word, "coordinates with aperture select"));
                }
                self.select_aperture(line, ApertureId(id))
            }
            Some(op @ 1..=3) => {
                self.last_op = Some(op);
                self.operation(line, word, op, coords)
            }
            Some(_) => Err(ParseError::unknown(line, word)),
            None if coords.is_some() => {
                // Deprecated modal form: coordinates repeat the previous operation.
                let op = self
                    .last_op
                    .ok_or_else(|| ParseError::malformed(line, word, "coordinates without operation"))?;
                self.operation(line, word, op, coords)
            }
            None => Ok(()),
        }
    }

    fn g_code(&mut self, line: usize, word: &str, g: u32) -> ParseResult<()> {
        match g {
            1 => self.interpolation = Interpolation::Linear,
            2 => self.interpolation = Interpolation::Clockwise,
            3 => self.interpolation = Interpolation::CounterClockwise,
            74 => self.quadrant = QuadrantMode::Single,
            75 => self.quadrant = QuadrantMode::Multi,
            36 => {
                self.flush_path();
                if self.region.is_some() {
                    return Err(ParseError::malformed(line, word, "nested region"));
                }
                self.region = Some((Vec::new(), Vec::new()));
            }
            37 => self.end_region(line, word)?,
            70 => self.set_units(line, Units::Inch),
            71 => self.set_units(line, Units::Mm),
            90 | 54 | 55 => {}
            91 => return Err(ParseError::unsupported(line, word, "incremental coordinates")),
            _ => return Err(ParseError::unknown(line, word)),
        }
        Ok(())
    }

    fn select_aperture(&mut self, line: usize, id: ApertureId) -> ParseResult<()> {
        if !self.doc.apertures.contains(id) {
            return Err(ParseError::UndefinedAperture { line, id: id.0 });
        }
        if self.current != Some(id) {
            self.flush_path();
        }
        self.current = Some(id);
        Ok(())
    }

    fn current_shape(&self, line: usize, word: &str) -> ParseResult<(ApertureId, ApertureShape)> {
        let id = self
            .current
            .ok_or_else(|| ParseError::malformed(line, word, "no aperture selected"))?;
        let aperture = self
            .doc
            .apertures
            .get(id)
            .ok_or(ParseError::UndefinedAperture { line, id: id.0 })?;
        if let ApertureShape::Macro { name } = &aperture.shape {
            return Err(ParseError::unsupported(
                line,
                word,
                &format!("aperture macro '{}'", name),
            ));
        }
        Ok((id, aperture.shape.clone()))
    }

    fn operation(
        &mut self,
        line: usize,
        word: &str,
        op: u32,
        coords: Option<Coordinates>,
    ) -> ParseResult<()> {
        let target = Point::new(
            coords.as_ref().and_then(|c| c.x).unwrap_or(self.pos.x),
            coords.as_ref().and_then(|c| c.y).unwrap_or(self.pos.y),
        );
        let offset = (
            coords.as_ref().and_then(|c| c.i).unwrap_or(0.0),
            coords.as_ref().and_then(|c| c.j).unwrap_or(0.0),
        );

        match op {
            1 => self.interpolate(line, word, target, offset)?,
            2 => {
                self.flush_path();
                if let Some((contours, contour)) = self.region.as_mut() {
                    let done = std::mem::take(contour);
                    if done.len() >= 3 {
                        contours.push(done);
                    }
                    contour.push(target);
                }
            }
            3 => {
                self.flush_path();
                if self.region.is_some() {
                    return Err(ParseError::malformed(line, word, "flash inside region"));
                }
                let (id, shape) = self.current_shape(line, word)?;
                let area = shape
                    .flash(target, self.options.steps_per_circle)
                    .unwrap_or_default();
                let seq = self.next_seq();
                self.doc.apertures.push_element(
                    id,
                    ApertureElement::new(Shape::Point(target), area, self.polarity, seq),
                );
            }
            _ => return Err(ParseError::unknown(line, word)),
        }
        self.pos = target;
        Ok(())
    }

    fn interpolate(
        &mut self,
        line: usize,
        word: &str,
        target: Point,
        offset: (f64, f64),
    ) -> ParseResult<()> {
        let steps = self.options.steps_per_circle;
        let start = self.pos;
        let arc = match self.interpolation {
            Interpolation::Linear => None,
            Interpolation::Clockwise => Some(true),
            Interpolation::CounterClockwise => Some(false),
        };
        let arc = arc.map(|cw| (cw, self.arc_center(start, target, offset, cw)));

        if let Some((_, contour)) = self.region.as_mut() {
            if contour.is_empty() {
                contour.push(start);
            }
            match arc {
                None => contour.push(target),
                Some((cw, center)) => {
                    contour.extend(arc_points(start, target, center, cw, steps).into_iter().skip(1))
                }
            }
            return Ok(());
        }

        let (id, shape) = self.current_shape(line, word)?;
        if self.path.as_ref().map(|p| p.aperture) != Some(id) {
            self.flush_path();
            self.path = Some(PathState {
                aperture: id,
                points: vec![start],
                strokes: Vec::new(),
            });
        }

        let (points, strokes) = match (arc, &shape) {
            (None, ApertureShape::Circle { diameter, .. }) => {
                (vec![target], vec![stroke_segment(start, target, *diameter, steps)])
            }
            (Some((cw, center)), ApertureShape::Circle { diameter, .. }) => (
                arc_points(start, target, center, cw, steps)
                    .into_iter()
                    .skip(1)
                    .collect(),
                stroke_arc(start, target, center, *diameter, cw, steps),
            ),
            (arc, _) => {
                let pen = shape.outline(steps).unwrap_or_default();
                let pts = match arc {
                    None => vec![start, target],
                    Some((cw, center)) => arc_points(start, target, center, cw, steps),
                };
                let strokes: Vec<Polygon> = pts.windows(2).map(|w| sweep_convex(&pen, w[0], w[1])).collect();
                (pts.into_iter().skip(1).collect(), strokes)
            }
        };

        if let Some(path) = self.path.as_mut() {
            path.points.extend(points);
            path.strokes.extend(strokes);
        }
        Ok(())
    }

    fn arc_center(&self, start: Point, end: Point, (i, j): (f64, f64), clockwise: bool) -> Point {
        if self.quadrant == QuadrantMode::Multi {
            return Point::new(start.x + i, start.y + j);
        }
        // Single quadrant: offsets are unsigned, pick the sign pair giving a
        // consistent radius and a sweep of at most 90 degrees.
        let mut best: Option<(f64, Point)> = None;
        for (si, sj) in [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)] {
            let c = Point::new(start.x + si * i.abs(), start.y + sj * j.abs());
            let sweep = sweep_angle(start, end, c, clockwise);
            if sweep > PI / 2.0 + 1e-6 {
                continue;
            }
            let err = (start.distance(&c) - end.distance(&c)).abs();
            if best.map_or(true, |(e, _)| err < e) {
                best = Some((err, c));
            }
        }
        best.map(|(_, c)| c)
            .unwrap_or(Point::new(start.x + i, start.y + j))
    }

    fn end_region(&mut self, line: usize, word: &str) -> ParseResult<()> {
        let (mut contours, contour) = self
            .region
            .take()
            .ok_or_else(|| ParseError::malformed(line, word, "G37 without G36"))?;
        if contour.len() >= 3 {
            contours.push(contour);
        }
        for ring in contours {
            let ring = open_ring(ring);
            if ring.len() < 3 {
                continue;
            }
            let area = union_all(&[Polygon::new(ring.clone(), Vec::new())]);
            let seq = self.next_seq();
            self.doc.apertures.add_or_merge(
                ApertureShape::Region,
                ApertureElement::new(Shape::Ring(ring), area, self.polarity, seq),
            );
        }
        Ok(())
    }

    fn flush_path(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        if path.points.len() < 2 {
            return;
        }
        let closed = path.points.len() > 3
            && path.points[0].approx_eq(&path.points[path.points.len() - 1], 1e-9);
        let follow = if closed {
            Shape::Ring(open_ring(path.points))
        } else {
            Shape::Line(path.points)
        };
        let area = union_all(&path.strokes);
        let seq = self.next_seq();
        self.doc
            .apertures
            .push_element(path.aperture, ApertureElement::new(follow, area, self.polarity, seq));
    }
}

fn sweep_angle(start: Point, end: Point, center: Point, clockwise: bool) -> f64 {
    let a0 = (start.y - center.y).atan2(start.x - center.x);
    let a1 = (end.y - center.y).atan2(end.x - center.x);
    let d = if clockwise { a0 - a1 } else { a1 - a0 };
    d.rem_euclid(2.0 * PI)
}

/// Parse RS-274X text into a document.
pub fn parse_gerber(text: &str, options: &GerberParseOptions) -> ParseResult<GerberDocument> {
    GerberParser::new(*options).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_blocks_and_lines() {
        let text = "G04 hello world*\n%FSLAX24Y24*\nMOMM*%\nD10*\nX100Y\n200D01*";
        let tokens = tokenize(text).unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].block, Block::Word("G04 hello world".to_string()));
        assert_eq!(
            tokens[1].block,
            Block::Extended(vec!["FSLAX24Y24".to_string(), "MOMM".to_string()])
        );
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[3].block, Block::Word("X100Y200D01".to_string()));
        assert_eq!(tokens[3].line, 5);
    }

    #[test]
    fn test_tokenize_unterminated() {
        assert!(matches!(
            tokenize("%FSLAX24Y24*"),
            Err(ParseError::UnexpectedEof(_))
        ));
        assert!(tokenize("D10").is_err());
    }

    #[test]
    fn test_sweep_angle() {
        let c = Point::new(0.0, 0.0);
        let a = sweep_angle(Point::new(1.0, 0.0), Point::new(0.0, 1.0), c, false);
        assert!((a - PI / 2.0).abs() < 1e-12);
        let b = sweep_angle(Point::new(1.0, 0.0), Point::new(0.0, 1.0), c, true);
        assert!((b - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_quadrant_center() {
        let parser = GerberParser::new(GerberParseOptions::default());
        // Quarter arc from (1,0) to (0,1) counter-clockwise around the origin.
        let c = parser.arc_center(Point::new(1.0, 0.0), Point::new(0.0, 1.0), (1.0, 0.0), false);
        assert!(c.approx_eq(&Point::new(0.0, 0.0), 1e-12));
    }
}
