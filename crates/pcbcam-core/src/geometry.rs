//! 2-D geometry value types
//!
//! Rings are stored open: the closing vertex is implied and never
//! repeated. Boolean and offset operations live in the camtools crate;
//! this module only holds the values and the cheap per-point math.

use crate::units::ConvertUnits;
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-9;

/// A point in document units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl ConvertUnits for Point {
    fn convert_units(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
    }
}

/// Mirror axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Flip across a horizontal line (y changes sign)
    X,
    /// Flip across a vertical line (x changes sign)
    Y,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        Some(b)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn merge(a: Option<Bounds>, b: Option<Bounds>) -> Option<Bounds> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, None) => a,
            (None, b) => b,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Shoelace signed area; positive for counter-clockwise rings.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

pub fn is_ccw(ring: &[Point]) -> bool {
    signed_area(ring) > 0.0
}

/// Even-odd point in ring test.
pub fn point_in_ring(p: &Point, ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Drop a repeated closing vertex and consecutive duplicates.
pub fn open_ring(mut ring: Vec<Point>) -> Vec<Point> {
    ring.dedup_by(|a, b| a.approx_eq(b, EPS));
    while ring.len() > 1 && ring[0].approx_eq(&ring[ring.len() - 1], EPS) {
        ring.pop();
    }
    ring
}

/// A filled area: one outer boundary with zero or more holes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    #[serde(default)]
    pub interiors: Vec<Vec<Point>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Point>, interiors: Vec<Vec<Point>>) -> Self {
        Self {
            exterior: open_ring(exterior),
            interiors: interiors.into_iter().map(open_ring).collect(),
        }
    }

    /// Axis-aligned rectangle from a corner and a size.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            vec![
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
            Vec::new(),
        )
    }

    /// Regular polygon approximation of a circle.
    pub fn circle(center: Point, radius: f64, steps: usize) -> Self {
        let steps = steps.max(3);
        let exterior = (0..steps)
            .map(|i| {
                let a = 2.0 * std::f64::consts::PI * i as f64 / steps as f64;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect();
        Self::new(exterior, Vec::new())
    }

    /// Filled area (exterior minus holes).
    pub fn area(&self) -> f64 {
        let holes: f64 = self.interiors.iter().map(|r| signed_area(r).abs()).sum();
        signed_area(&self.exterior).abs() - holes
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.len() < 3
    }

    pub fn contains(&self, p: &Point) -> bool {
        point_in_ring(p, &self.exterior) && !self.interiors.iter().any(|h| point_in_ring(p, h))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.exterior)
    }

    /// Exterior counter-clockwise, holes clockwise.
    pub fn normalized(mut self) -> Self {
        if !is_ccw(&self.exterior) {
            self.exterior.reverse();
        }
        for hole in self.interiors.iter_mut() {
            if is_ccw(hole) {
                hole.reverse();
            }
        }
        self
    }

    /// Reverse the exterior winding, leaving holes as they are.
    pub fn reversed_exterior(mut self) -> Self {
        self.exterior.reverse();
        self
    }

    /// Apply `f` to every vertex.
    pub fn map_points(&mut self, f: &impl Fn(Point) -> Point) {
        for p in self.exterior.iter_mut() {
            *p = f(*p);
        }
        for hole in self.interiors.iter_mut() {
            for p in hole.iter_mut() {
                *p = f(*p);
            }
        }
    }
}

impl ConvertUnits for Polygon {
    fn convert_units(&mut self, factor: f64) {
        self.map_points(&|p| Point::new(p.x * factor, p.y * factor));
    }
}

/// One piece of geometry owned by an aperture, a tool or a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Shape {
    /// Zero-size location (flash point, drill hit)
    Point(Point),
    /// Open polyline
    Line(Vec<Point>),
    /// Closed outline without fill
    Ring(Vec<Point>),
    /// Filled area
    Polygon(Polygon),
}

impl Shape {
    pub fn points(&self) -> Box<dyn Iterator<Item = &Point> + '_> {
        match self {
            Shape::Point(p) => Box::new(std::iter::once(p)),
            Shape::Line(pts) | Shape::Ring(pts) => Box::new(pts.iter()),
            Shape::Polygon(poly) => Box::new(
                poly.exterior
                    .iter()
                    .chain(poly.interiors.iter().flat_map(|h| h.iter())),
            ),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.points())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Point(_) => false,
            Shape::Line(pts) => pts.len() < 2,
            Shape::Ring(pts) => pts.len() < 3,
            Shape::Polygon(poly) => poly.is_empty(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Shape::Ring(_) | Shape::Polygon(_))
    }

    /// Apply `f` to every vertex.
    pub fn map_points(&mut self, f: &impl Fn(Point) -> Point) {
        match self {
            Shape::Point(p) => *p = f(*p),
            Shape::Line(pts) | Shape::Ring(pts) => {
                for p in pts.iter_mut() {
                    *p = f(*p);
                }
            }
            Shape::Polygon(poly) => poly.map_points(f),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.map_points(&translation(dx, dy));
    }

    pub fn scale(&mut self, sx: f64, sy: f64, origin: Point) {
        self.map_points(&scaling(sx, sy, origin));
    }

    pub fn mirror(&mut self, axis: Axis, origin: Point) {
        self.map_points(&mirroring(axis, origin));
    }
}

/// Vertex mapping for a translation.
pub fn translation(dx: f64, dy: f64) -> impl Fn(Point) -> Point {
    move |p| Point::new(p.x + dx, p.y + dy)
}

/// Vertex mapping for a scale about `origin`.
pub fn scaling(sx: f64, sy: f64, origin: Point) -> impl Fn(Point) -> Point {
    move |p| {
        Point::new(
            origin.x + (p.x - origin.x) * sx,
            origin.y + (p.y - origin.y) * sy,
        )
    }
}

/// Vertex mapping for a mirror through `origin`.
pub fn mirroring(axis: Axis, origin: Point) -> impl Fn(Point) -> Point {
    move |p| match axis {
        Axis::X => Point::new(p.x, 2.0 * origin.y - p.y),
        Axis::Y => Point::new(2.0 * origin.x - p.x, p.y),
    }
}

impl ConvertUnits for Shape {
    fn convert_units(&mut self, factor: f64) {
        self.map_points(&|p| Point::new(p.x * factor, p.y * factor));
    }
}

/// Combined bounds of a shape list.
pub fn bounds_of(shapes: &[Shape]) -> Option<Bounds> {
    shapes
        .iter()
        .fold(None, |acc, s| Bounds::merge(acc, s.bounds()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::rectangle(0.0, 0.0, 10.0, 10.0)
    }

    #[test]
    fn test_signed_area_orientation() {
        let sq = square();
        assert_eq!(signed_area(&sq.exterior), 100.0);
        assert!(is_ccw(&sq.exterior));
        let rev = sq.reversed_exterior();
        assert_eq!(signed_area(&rev.exterior), -100.0);
    }

    #[test]
    fn test_open_ring_drops_closing_vertex() {
        let ring = open_ring(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_polygon_area_with_hole() {
        let hole = Polygon::rectangle(2.0, 2.0, 2.0, 2.0).exterior;
        let poly = Polygon::new(square().exterior, vec![hole]);
        assert_eq!(poly.area(), 96.0);
        assert!(poly.contains(&Point::new(1.0, 1.0)));
        assert!(!poly.contains(&Point::new(3.0, 3.0)));
    }

    #[test]
    fn test_normalized_orients_rings() {
        let mut hole = Polygon::rectangle(2.0, 2.0, 2.0, 2.0).exterior;
        hole.reverse();
        let poly = Polygon::new(square().reversed_exterior().exterior, vec![hole]).normalized();
        assert!(is_ccw(&poly.exterior));
        assert!(!is_ccw(&poly.interiors[0]));
    }

    #[test]
    fn test_shape_transforms() {
        let mut s = Shape::Polygon(square());
        s.translate(5.0, -5.0);
        let b = s.bounds().unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (5.0, -5.0, 15.0, 5.0));

        s.scale(2.0, 2.0, Point::new(5.0, -5.0));
        assert_eq!(s.bounds().unwrap().width(), 20.0);

        s.mirror(Axis::Y, Point::new(0.0, 0.0));
        assert_eq!(s.bounds().unwrap().max_x, -5.0);
    }

    #[test]
    fn test_bounds_of_mixed_shapes() {
        let shapes = vec![
            Shape::Point(Point::new(-1.0, 0.0)),
            Shape::Line(vec![Point::new(0.0, 0.0), Point::new(3.0, 4.0)]),
        ];
        let b = bounds_of(&shapes).unwrap();
        assert_eq!(b.min_x, -1.0);
        assert_eq!(b.max_y, 4.0);
        assert!(bounds_of(&[]).is_none());
    }

    #[test]
    fn test_convert_units_shape() {
        let mut s = Shape::Point(Point::new(1.0, 2.0));
        s.convert_units(25.4);
        assert_eq!(s, Shape::Point(Point::new(25.4, 50.8)));
    }
}
