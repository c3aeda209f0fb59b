//! Polygon booleans and offsets
//!
//! Thin adapter between the core [`Polygon`] values and the two geometry
//! libraries: `geo` boolean ops for union/difference and
//! `cavalier_contours` polylines for parallel offsets.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use geo::{AffineOps, AffineTransform, BooleanOps, Coord, LineString, MultiPolygon, Polygon as GeoPolygon};
use pcbcam_core::geometry::{is_ccw, open_ring, Point, Polygon};
use std::f64::consts::PI;
use std::panic;
use tracing::warn;

const POS_EPS: f64 = 1e-5;

/// Drop repeated vertices and an explicit closing vertex.
pub fn clean_polyline(mut pline: Polyline<f64>) -> Polyline<f64> {
    pline.remove_repeat_pos(POS_EPS);
    if pline.is_closed() && pline.vertex_count() > 1 {
        if let (Some(first), Some(last)) = (pline.get(0), pline.get(pline.vertex_count() - 1)) {
            if (first.x - last.x).abs() < POS_EPS && (first.y - last.y).abs() < POS_EPS {
                pline.remove(pline.vertex_count() - 1);
            }
        }
    }
    pline
}

/// Closed polyline through the ring vertices.
pub fn ring_to_polyline(ring: &[Point]) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for p in ring {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    clean_polyline(pline)
}

/// Flatten a polyline, replacing bulge arcs with chords.
pub fn polyline_to_ring(pline: &Polyline<f64>, steps_per_circle: usize) -> Vec<Point> {
    let mut points = Vec::new();
    let count = pline.vertex_count();
    if count < 2 {
        return points;
    }
    let last = if pline.is_closed() { count } else { count - 1 };

    for i in 0..last {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % count);
        points.push(Point::new(v1.x, v1.y));

        if v1.bulge.abs() <= POS_EPS {
            continue;
        }
        let theta = 4.0 * v1.bulge.atan();
        let chord_len = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
        if chord_len <= POS_EPS {
            continue;
        }
        let radius = (chord_len / (2.0 * (theta / 2.0).sin())).abs();
        let dist_to_center = radius * (theta.abs() / 2.0).cos();
        let (mx, my) = ((v1.x + v2.x) / 2.0, (v1.y + v2.y) / 2.0);
        let (nx, ny) = (-(v2.y - v1.y) / chord_len, (v2.x - v1.x) / chord_len);
        let sign = v1.bulge.signum();
        let (cx, cy) = (mx + nx * dist_to_center * sign, my + ny * dist_to_center * sign);

        let start_angle = (v1.y - cy).atan2(v1.x - cx);
        let sweep = theta;
        let segments = ((sweep.abs() / (2.0 * PI) * steps_per_circle as f64).ceil() as usize).max(2);
        for j in 1..segments {
            let angle = start_angle + sweep * j as f64 / segments as f64;
            points.push(Point::new(cx + radius * angle.cos(), cy + radius * angle.sin()));
        }
    }
    if !pline.is_closed() {
        let v = pline.at(count - 1);
        points.push(Point::new(v.x, v.y));
        points
    } else {
        open_ring(points)
    }
}

/// Offset a closed ring; positive `delta` grows the enclosed area.
///
/// Returns `None` when the offset engine fails on the input. An empty
/// vector means the ring collapsed.
pub fn offset_ring(ring: &[Point], delta: f64, steps_per_circle: usize) -> Option<Vec<Vec<Point>>> {
    let mut ccw = ring.to_vec();
    if !is_ccw(&ccw) {
        ccw.reverse();
    }
    let pline = ring_to_polyline(&ccw);
    if pline.vertex_count() < 3 {
        return Some(Vec::new());
    }
    if delta == 0.0 {
        return Some(vec![ccw]);
    }

    let offset_res = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(-delta)));
    match offset_res {
        Ok(offsets) => Some(
            offsets
                .iter()
                .filter(|p| p.is_closed())
                .map(|p| polyline_to_ring(p, steps_per_circle))
                .filter(|r| r.len() >= 3)
                .collect(),
        ),
        Err(_) => {
            warn!("Panic during parallel offset of ring with {} vertices", ring.len());
            None
        }
    }
}

fn ring_line(ring: &[Point]) -> LineString<f64> {
    LineString::from(ring.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
}

/// `geo` polygon of a core polygon.
pub fn to_geo(poly: &Polygon) -> GeoPolygon<f64> {
    GeoPolygon::new(
        ring_line(&poly.exterior),
        poly.interiors
            .iter()
            .filter(|h| h.len() >= 3)
            .map(|h| ring_line(h))
            .collect(),
    )
}

fn to_multi(polys: &[Polygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(
        polys
            .iter()
            .filter(|p| p.exterior.len() >= 3)
            .map(to_geo)
            .collect(),
    )
}

/// Polygons of a `geo` result, normalised to CCW exteriors and CW holes.
pub fn from_geo(mp: &MultiPolygon<f64>) -> Vec<Polygon> {
    let points = |line: &LineString<f64>| -> Vec<Point> {
        open_ring(line.0.iter().map(|c| Point::new(c.x, c.y)).collect())
    };
    let mut out = Vec::new();
    for poly in &mp.0 {
        let polygon = Polygon::new(
            points(poly.exterior()),
            poly.interiors().iter().map(points).collect(),
        );
        if polygon.is_empty() {
            continue;
        }
        let mut polygon = polygon.normalized();
        polygon.interiors.retain(|h| h.len() >= 3);
        out.push(polygon);
    }
    out
}

fn merge(polys: &[Polygon]) -> MultiPolygon<f64> {
    let mut merged = MultiPolygon::new(Vec::new());
    for poly in polys.iter().filter(|p| p.exterior.len() >= 3) {
        merged = merged.union(&to_geo(poly));
    }
    merged
}

/// Union of all polygons.
pub fn union_all(polys: &[Polygon]) -> Vec<Polygon> {
    match polys.len() {
        0 => Vec::new(),
        1 => vec![polys[0].clone().normalized()],
        _ => from_geo(&merge(polys)),
    }
}

/// `a` minus `b`.
pub fn difference(a: &[Polygon], b: &[Polygon]) -> Vec<Polygon> {
    if b.is_empty() {
        return a.iter().cloned().map(Polygon::normalized).collect();
    }
    from_geo(&to_multi(a).difference(&to_multi(b)))
}

/// Move polygons defined around the origin to `at`, rotating them
/// counter-clockwise by `rotation_deg` first.
pub fn place(polys: &[Polygon], at: Point, rotation_deg: f64) -> Vec<Polygon> {
    if rotation_deg.abs() < 1e-12 {
        return polys
            .iter()
            .map(|p| {
                let shift = |r: &Vec<Point>| -> Vec<Point> {
                    r.iter().map(|q| Point::new(q.x + at.x, q.y + at.y)).collect()
                };
                Polygon {
                    exterior: shift(&p.exterior),
                    interiors: p.interiors.iter().map(shift).collect(),
                }
            })
            .collect();
    }
    let transform = AffineTransform::rotate(rotation_deg, Coord { x: 0.0, y: 0.0 })
        .translated(at.x, at.y);
    from_geo(&to_multi(polys).affine_transform(&transform))
}

/// Grow (positive `delta`) every polygon: exteriors move out, holes shrink.
///
/// Errors with a reason when an exterior ring degenerates or the offset
/// engine fails. With `keep_holes` a hole that shrinks to nothing is an
/// error too; otherwise it is filled in.
pub fn buffer(
    polys: &[Polygon],
    delta: f64,
    steps_per_circle: usize,
    keep_holes: bool,
) -> Result<Vec<Polygon>, String> {
    let mut grown = Vec::new();
    let mut shrunk_holes = Vec::new();

    for (i, poly) in polys.iter().enumerate() {
        let rings = offset_ring(&poly.exterior, delta, steps_per_circle)
            .ok_or_else(|| format!("offset engine failed on polygon {}", i))?;
        if rings.is_empty() {
            return Err(format!("polygon {} exterior collapsed", i));
        }
        grown.extend(rings.into_iter().map(|r| Polygon::new(r, Vec::new())));

        for (j, hole) in poly.interiors.iter().enumerate() {
            let rings = offset_ring(hole, -delta, steps_per_circle)
                .ok_or_else(|| format!("offset engine failed on a hole of polygon {}", i))?;
            if rings.is_empty() && keep_holes {
                return Err(format!("hole {} of polygon {} collapsed", j, i));
            }
            shrunk_holes.extend(rings.into_iter().map(|r| Polygon::new(r, Vec::new())));
        }
    }

    let merged = union_all(&grown);
    if shrunk_holes.is_empty() {
        return Ok(merged);
    }
    Ok(difference(&merged, &shrunk_holes))
}

/// Stadium polygon covering a straight stroke of a round pen.
pub fn stroke_segment(p1: Point, p2: Point, width: f64, steps_per_circle: usize) -> Polygon {
    let r = width / 2.0;
    let len = p1.distance(&p2);
    if len < 1e-9 {
        return Polygon::circle(p1, r, steps_per_circle);
    }
    let angle = (p2.y - p1.y).atan2(p2.x - p1.x);
    let half_steps = (steps_per_circle / 2).max(2);
    let mut ring = Vec::with_capacity(2 * half_steps + 2);
    // Cap around p2 from -90 to +90 degrees, then around p1 from +90 to +270.
    for i in 0..=half_steps {
        let a = angle - PI / 2.0 + PI * i as f64 / half_steps as f64;
        ring.push(Point::new(p2.x + r * a.cos(), p2.y + r * a.sin()));
    }
    for i in 0..=half_steps {
        let a = angle + PI / 2.0 + PI * i as f64 / half_steps as f64;
        ring.push(Point::new(p1.x + r * a.cos(), p1.y + r * a.sin()));
    }
    Polygon::new(ring, Vec::new())
}

/// Convex hull (monotone chain), counter-clockwise.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| a.approx_eq(b, 1e-12));
    if pts.len() < 3 {
        return pts;
    }
    let cross = |o: &Point, a: &Point, b: &Point| (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x);

    let mut lower: Vec<Point> = Vec::new();
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Sweep of a polygonal pen (rectangle aperture) along a straight segment.
pub fn sweep_convex(pen: &[Point], p1: Point, p2: Point) -> Polygon {
    let mut pts: Vec<Point> = pen.iter().map(|p| Point::new(p.x + p1.x, p.y + p1.y)).collect();
    pts.extend(pen.iter().map(|p| Point::new(p.x + p2.x, p.y + p2.y)));
    Polygon::new(convex_hull(&pts), Vec::new())
}

/// Ring covering a circular stroke of a round pen.
pub fn stroke_arc(
    p1: Point,
    p2: Point,
    center: Point,
    width: f64,
    clockwise: bool,
    steps_per_circle: usize,
) -> Vec<Polygon> {
    let radius = p1.distance(&center);
    let start_angle = (p1.y - center.y).atan2(p1.x - center.x);
    let mut end_angle = (p2.y - center.y).atan2(p2.x - center.x);

    if clockwise {
        if end_angle >= start_angle {
            end_angle -= 2.0 * PI;
        }
    } else if end_angle <= start_angle {
        end_angle += 2.0 * PI;
    }

    let diff = end_angle - start_angle;
    let segments = ((diff.abs() / (2.0 * PI) * steps_per_circle as f64).ceil() as usize).max(2);

    let r_outer = radius + width / 2.0;
    let r_inner = (radius - width / 2.0).max(0.0);
    let mut outer_pts = Vec::with_capacity(segments + 1);
    let mut inner_pts = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let angle = start_angle + diff * i as f64 / segments as f64;
        let (s, c) = angle.sin_cos();
        outer_pts.push(Point::new(center.x + r_outer * c, center.y + r_outer * s));
        inner_pts.push(Point::new(center.x + r_inner * c, center.y + r_inner * s));
    }

    // Outer points then inner points reversed
    inner_pts.reverse();
    outer_pts.extend(inner_pts);
    let band = Polygon::new(outer_pts, Vec::new());
    let c1 = Polygon::circle(p1, width / 2.0, steps_per_circle);
    let c2 = Polygon::circle(p2, width / 2.0, steps_per_circle);

    union_all(&[band, c1, c2])
}

/// Linearised arc centreline from `p1` to `p2`.
pub fn arc_points(
    p1: Point,
    p2: Point,
    center: Point,
    clockwise: bool,
    steps_per_circle: usize,
) -> Vec<Point> {
    let radius = p1.distance(&center);
    let start_angle = (p1.y - center.y).atan2(p1.x - center.x);
    let mut end_angle = (p2.y - center.y).atan2(p2.x - center.x);
    if clockwise {
        if end_angle >= start_angle {
            end_angle -= 2.0 * PI;
        }
    } else if end_angle <= start_angle {
        end_angle += 2.0 * PI;
    }
    let diff = end_angle - start_angle;
    let segments = ((diff.abs() / (2.0 * PI) * steps_per_circle as f64).ceil() as usize).max(2);
    let mut pts: Vec<Point> = (0..segments)
        .map(|i| {
            let angle = start_angle + diff * i as f64 / segments as f64;
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect();
    pts.push(p2);
    pts
}
