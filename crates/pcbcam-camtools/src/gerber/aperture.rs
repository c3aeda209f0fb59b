//! Aperture table
//!
//! Apertures are keyed by their numeric D-code. Id `0` is reserved for
//! region (G36/G37) geometry; custom apertures start at `10` so they
//! never collide with the RS-274X built-in operation codes.

use crate::polygon_ops::place;
use pcbcam_core::geometry::{Axis, Point, Polygon, Shape};
use pcbcam_core::ConvertUnits;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

const SIZE_EPS: f64 = 1e-9;

/// Gerber D-code of an aperture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApertureId(pub u32);

impl ApertureId {
    /// Reserved id holding region geometry.
    pub const REGION: ApertureId = ApertureId(0);
    /// First id handed out to user apertures.
    pub const FIRST_CUSTOM: u32 = 10;

    pub fn is_region(self) -> bool {
        self == Self::REGION
    }
}

impl fmt::Display for ApertureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Stamp shape of an aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ApertureShape {
    Circle {
        diameter: f64,
        hole: Option<f64>,
    },
    Rectangle {
        width: f64,
        height: f64,
        hole: Option<f64>,
    },
    Obround {
        width: f64,
        height: f64,
        hole: Option<f64>,
    },
    /// Regular polygon inscribed in `diameter`, first vertex at `rotation` degrees.
    Polygon {
        diameter: f64,
        vertices: u32,
        rotation: f64,
        hole: Option<f64>,
    },
    /// Filled G36/G37 contours
    Region,
    /// `%AM` macro by name
    Macro { name: String },
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < SIZE_EPS
}

fn close_opt(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => close(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl ApertureShape {
    /// Same kind and size.
    pub fn same_as(&self, other: &ApertureShape) -> bool {
        use ApertureShape::*;
        match (self, other) {
            (Circle { diameter: a, hole: ha }, Circle { diameter: b, hole: hb }) => {
                close(*a, *b) && close_opt(*ha, *hb)
            }
            (
                Rectangle { width: wa, height: ha, hole: xa },
                Rectangle { width: wb, height: hb, hole: xb },
            )
            | (
                Obround { width: wa, height: ha, hole: xa },
                Obround { width: wb, height: hb, hole: xb },
            ) => close(*wa, *wb) && close(*ha, *hb) && close_opt(*xa, *xb),
            (
                Polygon { diameter: da, vertices: va, rotation: ra, hole: xa },
                Polygon { diameter: db, vertices: vb, rotation: rb, hole: xb },
            ) => close(*da, *db) && va == vb && close(*ra, *rb) && close_opt(*xa, *xb),
            (Region, Region) => true,
            (Macro { name: a }, Macro { name: b }) => a == b,
            _ => false,
        }
    }

    fn hole(&self) -> Option<f64> {
        match self {
            ApertureShape::Circle { hole, .. }
            | ApertureShape::Rectangle { hole, .. }
            | ApertureShape::Obround { hole, .. }
            | ApertureShape::Polygon { hole, .. } => *hole,
            ApertureShape::Region | ApertureShape::Macro { .. } => None,
        }
    }

    /// Outline of the stamp centred on the origin, without its hole.
    ///
    /// `None` for regions and macros, which have no fixed outline.
    pub fn outline(&self, steps_per_circle: usize) -> Option<Vec<Point>> {
        let ring = match *self {
            ApertureShape::Circle { diameter, .. } => {
                Polygon::circle(Point::new(0.0, 0.0), diameter / 2.0, steps_per_circle).exterior
            }
            ApertureShape::Rectangle { width, height, .. } => {
                Polygon::rectangle(-width / 2.0, -height / 2.0, width, height).exterior
            }
            ApertureShape::Obround { width, height, .. } => {
                obround_ring(width, height, steps_per_circle)
            }
            ApertureShape::Polygon {
                diameter,
                vertices,
                rotation,
                ..
            } => {
                let n = vertices.max(3) as usize;
                let r = diameter / 2.0;
                let start = rotation.to_radians();
                (0..n)
                    .map(|i| {
                        let a = start + 2.0 * PI * i as f64 / n as f64;
                        Point::new(r * a.cos(), r * a.sin())
                    })
                    .collect()
            }
            ApertureShape::Region | ApertureShape::Macro { .. } => return None,
        };
        Some(ring)
    }

    /// Filled stamp flashed at `at`.
    pub fn flash(&self, at: Point, steps_per_circle: usize) -> Option<Vec<Polygon>> {
        let exterior = self.outline(steps_per_circle)?;
        let interiors = self
            .hole()
            .filter(|h| *h > 0.0)
            .map(|h| {
                let mut ring =
                    Polygon::circle(Point::new(0.0, 0.0), h / 2.0, steps_per_circle).exterior;
                ring.reverse();
                vec![ring]
            })
            .unwrap_or_default();
        Some(place(&[Polygon::new(exterior, interiors)], at, 0.0))
    }

    /// Width of the stroke a draw with this aperture leaves.
    pub fn stroke_width(&self) -> Option<f64> {
        match *self {
            ApertureShape::Circle { diameter, .. } => Some(diameter),
            ApertureShape::Polygon { diameter, .. } => Some(diameter),
            ApertureShape::Rectangle { width, height, .. }
            | ApertureShape::Obround { width, height, .. } => Some(width.min(height)),
            ApertureShape::Region | ApertureShape::Macro { .. } => None,
        }
    }

    /// Scale the aperture sizes.
    pub fn scale(&mut self, sx: f64, sy: f64) {
        let (sx, sy) = (sx.abs(), sy.abs());
        let mean = (sx + sy) / 2.0;
        match self {
            ApertureShape::Circle { diameter, hole } => {
                *diameter *= mean;
                hole.convert_units(mean);
            }
            ApertureShape::Rectangle { width, height, hole }
            | ApertureShape::Obround { width, height, hole } => {
                *width *= sx;
                *height *= sy;
                hole.convert_units(mean);
            }
            ApertureShape::Polygon { diameter, hole, .. } => {
                *diameter *= mean;
                hole.convert_units(mean);
            }
            ApertureShape::Region | ApertureShape::Macro { .. } => {}
        }
    }

    /// Follow a mirror of the elements drawn with it. Only polygon
    /// rotations change; every other stamp is symmetric about both axes.
    pub fn mirror(&mut self, axis: Axis) {
        if let ApertureShape::Polygon { rotation, .. } = self {
            let flipped = match axis {
                Axis::X => -*rotation,
                Axis::Y => 180.0 - *rotation,
            };
            *rotation = flipped.rem_euclid(360.0);
        }
    }

    /// Body of an `%ADD` statement after the id, sizes multiplied by `factor`.
    pub fn definition(&self, factor: f64, decimals: usize) -> Option<String> {
        let f = |v: f64| format!("{:.*}", decimals, v * factor);
        let with_hole = |mut s: String, hole: Option<f64>| {
            if let Some(h) = hole {
                s.push('X');
                s.push_str(&f(h));
            }
            s
        };
        let body = match self {
            ApertureShape::Circle { diameter, hole } => with_hole(format!("C,{}", f(*diameter)), *hole),
            ApertureShape::Rectangle { width, height, hole } => {
                with_hole(format!("R,{}X{}", f(*width), f(*height)), *hole)
            }
            ApertureShape::Obround { width, height, hole } => {
                with_hole(format!("O,{}X{}", f(*width), f(*height)), *hole)
            }
            ApertureShape::Polygon {
                diameter,
                vertices,
                rotation,
                hole,
            } => {
                let mut s = format!("P,{}X{}", f(*diameter), vertices);
                if *rotation != 0.0 || hole.is_some() {
                    s.push_str(&format!("X{}", rotation));
                }
                with_hole(s, *hole)
            }
            ApertureShape::Region | ApertureShape::Macro { .. } => return None,
        };
        Some(body)
    }
}

impl ConvertUnits for ApertureShape {
    fn convert_units(&mut self, factor: f64) {
        match self {
            ApertureShape::Circle { diameter, hole } => {
                *diameter *= factor;
                hole.convert_units(factor);
            }
            ApertureShape::Rectangle { width, height, hole }
            | ApertureShape::Obround { width, height, hole } => {
                *width *= factor;
                *height *= factor;
                hole.convert_units(factor);
            }
            ApertureShape::Polygon { diameter, hole, .. } => {
                *diameter *= factor;
                hole.convert_units(factor);
            }
            ApertureShape::Region | ApertureShape::Macro { .. } => {}
        }
    }
}

fn obround_ring(width: f64, height: f64, steps_per_circle: usize) -> Vec<Point> {
    let r = width.min(height) / 2.0;
    let half_steps = (steps_per_circle / 2).max(2);
    // Centres of the two end caps
    let (c1, c2, base) = if width >= height {
        let d = width / 2.0 - r;
        (Point::new(d, 0.0), Point::new(-d, 0.0), -PI / 2.0)
    } else {
        let d = height / 2.0 - r;
        (Point::new(0.0, d), Point::new(0.0, -d), 0.0)
    };
    let mut ring = Vec::with_capacity(2 * half_steps + 2);
    for (center, offset) in [(c1, 0.0), (c2, PI)] {
        for i in 0..=half_steps {
            let a = base + offset + PI * i as f64 / half_steps as f64;
            ring.push(Point::new(center.x + r * a.cos(), center.y + r * a.sin()));
        }
    }
    ring
}

/// Drawing polarity of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

/// One drawn or flashed object.
///
/// `follow` is the as-drawn centre line (a point for flashes). Dark
/// objects add `area` to the copper, clear objects remove it from copper
/// drawn before them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureElement {
    pub follow: Shape,
    #[serde(default)]
    pub area: Vec<Polygon>,
    #[serde(default)]
    pub polarity: Polarity,
    /// Global draw order across all apertures
    pub seq: u64,
}

impl ApertureElement {
    pub fn new(follow: Shape, area: Vec<Polygon>, polarity: Polarity, seq: u64) -> Self {
        Self {
            follow,
            area,
            polarity,
            seq,
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn area(&self) -> &[Polygon] {
        &self.area
    }

    pub fn map_points(&mut self, f: &impl Fn(Point) -> Point) {
        self.follow.map_points(f);
        for p in self.area.iter_mut() {
            p.map_points(f);
        }
    }
}

impl ConvertUnits for ApertureElement {
    fn convert_units(&mut self, factor: f64) {
        self.follow.convert_units(factor);
        self.area.convert_units(factor);
    }
}

/// An aperture with everything drawn through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aperture {
    pub shape: ApertureShape,
    #[serde(default)]
    pub elements: Vec<ApertureElement>,
}

impl Aperture {
    pub fn new(shape: ApertureShape) -> Self {
        Self {
            shape,
            elements: Vec::new(),
        }
    }
}

/// Apertures by D-code.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApertureTable {
    apertures: BTreeMap<ApertureId, Aperture>,
}

impl ApertureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.apertures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apertures.is_empty()
    }

    pub fn get(&self, id: ApertureId) -> Option<&Aperture> {
        self.apertures.get(&id)
    }

    pub fn get_mut(&mut self, id: ApertureId) -> Option<&mut Aperture> {
        self.apertures.get_mut(&id)
    }

    pub fn contains(&self, id: ApertureId) -> bool {
        self.apertures.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApertureId, &Aperture)> {
        self.apertures.iter().map(|(id, a)| (*id, a))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ApertureId, &mut Aperture)> {
        self.apertures.iter_mut().map(|(id, a)| (*id, a))
    }

    /// Define (or redefine) an aperture under a fixed id.
    pub fn define(&mut self, id: ApertureId, shape: ApertureShape) {
        self.apertures.insert(id, Aperture::new(shape));
    }

    /// Next free custom id.
    pub fn next_id(&self) -> ApertureId {
        let max = self
            .apertures
            .keys()
            .map(|id| id.0)
            .filter(|id| *id >= ApertureId::FIRST_CUSTOM)
            .max();
        ApertureId(max.map_or(ApertureId::FIRST_CUSTOM, |m| m + 1))
    }

    /// Add `element` to the aperture with this shape, creating it if needed.
    pub fn add_or_merge(&mut self, shape: ApertureShape, element: ApertureElement) -> ApertureId {
        let id = if shape == ApertureShape::Region {
            ApertureId::REGION
        } else {
            self.apertures
                .iter()
                .find(|(id, a)| !id.is_region() && a.shape.same_as(&shape))
                .map(|(id, _)| *id)
                .unwrap_or_else(|| self.next_id())
        };
        self.apertures
            .entry(id)
            .or_insert_with(|| Aperture::new(shape))
            .elements
            .push(element);
        id
    }

    /// Append an element to an existing aperture.
    pub fn push_element(&mut self, id: ApertureId, element: ApertureElement) -> bool {
        match self.apertures.get_mut(&id) {
            Some(a) => {
                a.elements.push(element);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: ApertureId) -> Option<Aperture> {
        self.apertures.remove(&id)
    }

    /// All elements, in draw order, with their aperture id.
    pub fn elements_in_order(&self) -> Vec<(ApertureId, &ApertureElement)> {
        let mut all: Vec<(ApertureId, &ApertureElement)> = self
            .apertures
            .iter()
            .flat_map(|(id, a)| a.elements.iter().map(move |e| (*id, e)))
            .collect();
        all.sort_by_key(|(_, e)| e.seq);
        all
    }

    pub fn max_seq(&self) -> Option<u64> {
        self.apertures
            .values()
            .flat_map(|a| a.elements.iter().map(|e| e.seq))
            .max()
    }
}

impl ConvertUnits for ApertureTable {
    fn convert_units(&mut self, factor: f64) {
        for aperture in self.apertures.values_mut() {
            aperture.shape.convert_units(factor);
            aperture.elements.convert_units(factor);
        }
    }
}
