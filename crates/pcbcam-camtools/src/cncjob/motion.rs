//! Motion extraction
//!
//! Reads generated program text back into straight segments so a job can
//! be previewed and measured without a controller.

use pcbcam_core::geometry::{Bounds, Point};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|;.*").expect("invalid regex pattern"));
static RE_HPGL_PA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PA\s*(-?[\d.]+)\s*,\s*(-?[\d.]+)").expect("invalid regex pattern")
});

/// Machine position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn xy(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One straight move of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSegment {
    pub from: Point3D,
    pub to: Point3D,
    pub rapid: bool,
}

impl MotionSegment {
    /// True for moves that only change Z.
    pub fn is_vertical(&self) -> bool {
        self.from.x == self.to.x && self.from.y == self.to.y
    }

    pub fn length(&self) -> f64 {
        let (dx, dy, dz) = (
            self.to.x - self.from.x,
            self.to.y - self.from.y,
            self.to.z - self.from.z,
        );
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Straight segments of G-code `text`, starting from the origin.
///
/// Only G0/G1 motion is followed; the motion mode is modal so bare
/// coordinate words continue the last move type.
pub fn parse_gcode_motion(text: &str) -> Vec<MotionSegment> {
    let mut segments = Vec::new();
    let mut pos = Point3D::default();
    let mut rapid = true;

    for raw in text.lines() {
        let line = RE_COMMENT.replace_all(raw, "").to_uppercase();
        let mut next = pos;
        let mut moved = false;
        for word in line.split_whitespace() {
            let Some(letter) = word.chars().next() else {
                continue;
            };
            let Ok(value) = word[1..].parse::<f64>() else {
                continue;
            };
            match letter {
                'G' if value == 0.0 => rapid = true,
                'G' if value == 1.0 => rapid = false,
                'X' => {
                    next.x = value;
                    moved = true;
                }
                'Y' => {
                    next.y = value;
                    moved = true;
                }
                'Z' => {
                    next.z = value;
                    moved = true;
                }
                _ => {}
            }
        }
        if moved && next != pos {
            segments.push(MotionSegment {
                from: pos,
                to: next,
                rapid,
            });
            pos = next;
        }
    }
    segments
}

/// Segments of HP-GL `text`: pen up moves are rapids, pen down moves cut.
pub fn parse_hpgl_motion(text: &str) -> Vec<MotionSegment> {
    let mut segments = Vec::new();
    let mut pos = Point3D::default();
    let mut pen_down = false;

    for statement in text.split(';') {
        let statement = statement.trim().to_uppercase();
        if statement.starts_with("PU") {
            pen_down = false;
        } else if statement.starts_with("PD") {
            pen_down = true;
        }
        if let Some(caps) = RE_HPGL_PA.captures(&statement) {
            let (Ok(x), Ok(y)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
                continue;
            };
            let next = Point3D::new(x, y, 0.0);
            if next != pos {
                segments.push(MotionSegment {
                    from: pos,
                    to: next,
                    rapid: !pen_down,
                });
                pos = next;
            }
        }
    }
    segments
}

/// XY extent of all cutting moves.
pub fn cut_bounds(segments: &[MotionSegment]) -> Option<Bounds> {
    let points: Vec<Point> = segments
        .iter()
        .filter(|s| !s.rapid)
        .flat_map(|s| [s.from.xy(), s.to.xy()])
        .collect();
    Bounds::from_points(&points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_gcode_motion() {
        let text = "(header)\nG21\nG00 Z2.0\nG00 X1 Y1\nG01 Z-0.1 F60\nX5 ; comment\nY4\nG00 Z2";
        let segs = parse_gcode_motion(text);
        assert_eq!(segs.len(), 6);
        assert!(segs[1].rapid);
        assert!(!segs[2].rapid && segs[2].is_vertical());
        assert_eq!(segs[3].to, Point3D::new(5.0, 1.0, -0.1));
        assert!(!segs[4].rapid);
        assert!(segs[5].rapid);

        let b = cut_bounds(&segs).unwrap();
        assert_eq!((b.min_x, b.max_x, b.max_y), (1.0, 5.0, 4.0));
    }

    #[test]
    fn test_printer_words() {
        let segs = parse_gcode_motion("G0 X1 Y2 F1500\nG1 X3 Y2 F120");
        assert_eq!(segs.len(), 2);
        assert!((segs[1].length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_hpgl_motion() {
        let segs = parse_hpgl_motion("IN;SP1;PU;PA10,0;PD;PA20,0;PA20,5;PU;PA0,0;");
        assert_eq!(segs.len(), 4);
        assert!(segs[0].rapid);
        assert!(!segs[1].rapid && !segs[2].rapid);
        assert!(segs[3].rapid);
    }
}
