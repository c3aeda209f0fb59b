//! Isolation routing
//!
//! Offsets the copper area outward by half a tool width (and one step
//! further per extra pass) and keeps the resulting boundary rings as
//! tool centre lines.

use crate::error::{CamToolError, CamToolResult, IsolationError};
use crate::gerber::GerberDocument;
use crate::polygon_ops::buffer;
use pcbcam_core::geometry::{Polygon, Shape};
use pcbcam_core::{
    GeometryTools, IsolationType, MachiningParams, MillingDirection, OffsetKind, Tool, ToolRole,
    ToolShape,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Isolation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationParams {
    pub tool_diameter: f64,
    pub passes: usize,
    /// Fraction of the tool width shared by neighbouring passes, in `[0, 1)`
    pub overlap: f64,
    pub direction: MillingDirection,
    pub isolation_type: IsolationType,
    /// Skip offsetting and cut along the as-drawn centre lines
    pub follow: bool,
    /// One tool holding every pass instead of one tool table per pass
    pub combine_passes: bool,
    pub tool_shape: ToolShape,
    pub machining: MachiningParams,
    pub steps_per_circle: usize,
    /// Decimals the tool diameter is rounded to
    pub decimals: u8,
}

impl Default for IsolationParams {
    fn default() -> Self {
        Self {
            tool_diameter: 0.1,
            passes: 1,
            overlap: 0.1,
            direction: MillingDirection::Climb,
            isolation_type: IsolationType::Both,
            follow: false,
            combine_passes: true,
            tool_shape: ToolShape::C1,
            machining: MachiningParams::default(),
            steps_per_circle: 64,
            decimals: 4,
        }
    }
}

impl IsolationParams {
    fn tool(&self, geometry: Vec<Shape>) -> Tool {
        Tool::new(self.tool_diameter, self.decimals)
            .with_role(ToolRole::Iso)
            .with_shape(self.tool_shape)
            .with_params(self.machining.clone())
            .with_geometry(geometry)
    }
}

/// Distance from the copper edge to the tool centre on pass `pass`.
///
/// Pass 0 sits half a tool width out; every further pass steps out by
/// `(1 - overlap) * tool_dia`.
pub fn offset_amount(pass: usize, tool_dia: f64, overlap: f64) -> f64 {
    let i = pass as f64;
    tool_dia * (2.0 * i + 1.0) / 2.0 - i * overlap * tool_dia
}

fn pass_rings(polys: &[Polygon], kind: IsolationType, reverse_exteriors: bool) -> Vec<Shape> {
    let mut rings = Vec::new();
    for poly in polys {
        if matches!(kind, IsolationType::Exteriors | IsolationType::Both) {
            let mut exterior = poly.exterior.clone();
            if reverse_exteriors {
                exterior.reverse();
            }
            rings.push(Shape::Ring(exterior));
        }
        if matches!(kind, IsolationType::Interiors | IsolationType::Both) {
            rings.extend(poly.interiors.iter().cloned().map(Shape::Ring));
        }
    }
    rings
}

/// Isolation passes around `solid`.
///
/// Returns one tool table holding a single tool with every pass when
/// `combine_passes` is set, otherwise one table per pass. Any pass that
/// degenerates aborts the whole request.
pub fn generate_isolation(solid: &[Polygon], params: &IsolationParams) -> CamToolResult<Vec<GeometryTools>> {
    if params.tool_diameter <= 0.0 {
        return Err(CamToolError::InvalidParameters(format!(
            "tool diameter must be positive, got {}",
            params.tool_diameter
        )));
    }
    if !(0.0..1.0).contains(&params.overlap) {
        return Err(CamToolError::InvalidParameters(format!(
            "overlap must be in [0, 1), got {}",
            params.overlap
        )));
    }
    if solid.is_empty() {
        return Err(IsolationError {
            pass: 0,
            reason: "no copper geometry to isolate".to_string(),
        }
        .into());
    }

    let passes = params.passes.max(1);
    let mut per_pass = Vec::with_capacity(passes);
    for pass in 0..passes {
        let delta = offset_amount(pass, params.tool_diameter, params.overlap);
        let keep_holes = matches!(params.isolation_type, IsolationType::Interiors | IsolationType::Both);
        let grown = buffer(solid, delta, params.steps_per_circle, keep_holes)
            .map_err(|reason| IsolationError { pass, reason })?;
        let reverse = pass == 0 && params.direction == MillingDirection::Conventional;
        let rings = pass_rings(&grown, params.isolation_type, reverse);
        if rings.is_empty() {
            return Err(IsolationError {
                pass,
                reason: format!("no {:?} rings left after offset {:.4}", params.isolation_type, delta),
            }
            .into());
        }
        debug!("Isolation pass {}: offset {:.4}, {} rings", pass, delta, rings.len());
        per_pass.push(rings);
    }

    let tables: Vec<GeometryTools> = if params.combine_passes {
        let mut table = GeometryTools::new();
        table.insert(params.tool(per_pass.into_iter().flatten().collect()));
        vec![table]
    } else {
        per_pass
            .into_iter()
            .map(|rings| {
                let mut table = GeometryTools::new();
                table.insert(params.tool(rings));
                table
            })
            .collect()
    };

    info!(
        "Generated {} isolation passes with a {} tool ({})",
        passes, params.tool_diameter, params.direction
    );
    Ok(tables)
}

/// Cut along the as-drawn centre lines without offsetting.
pub fn follow_paths(follow: &[Shape], params: &IsolationParams) -> GeometryTools {
    let paths: Vec<Shape> = follow
        .iter()
        .filter(|s| !matches!(s, Shape::Point(_)) && !s.is_empty())
        .cloned()
        .collect();
    let mut tool = params.tool(paths);
    tool.offset = OffsetKind::Path;
    let mut table = GeometryTools::new();
    table.insert(tool);
    table
}

/// Isolation of a Gerber layer, honouring follow mode.
pub fn isolate_gerber(doc: &GerberDocument, params: &IsolationParams) -> CamToolResult<Vec<GeometryTools>> {
    if params.follow {
        return Ok(vec![follow_paths(&doc.follow_geometry(), params)]);
    }
    generate_isolation(&doc.solid_geometry(), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbcam_core::geometry::{is_ccw, Point};

    #[test]
    fn test_offset_amount() {
        assert_eq!(offset_amount(0, 1.0, 0.0), 0.5);
        assert_eq!(offset_amount(1, 1.0, 0.0), 1.5);
        assert!((offset_amount(1, 1.0, 0.25) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_conventional_reverses_first_pass() {
        let square = Polygon::rectangle(0.0, 0.0, 10.0, 10.0);
        let params = IsolationParams {
            tool_diameter: 1.0,
            passes: 2,
            overlap: 0.0,
            direction: MillingDirection::Conventional,
            combine_passes: false,
            ..Default::default()
        };
        let tables = generate_isolation(&[square], &params).unwrap();
        assert_eq!(tables.len(), 2);
        let ring = |t: &GeometryTools| match &t.get(1).unwrap().solid_geometry[0] {
            Shape::Ring(r) => r.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert!(!is_ccw(&ring(&tables[0])));
        assert!(is_ccw(&ring(&tables[1])));
    }

    #[test]
    fn test_interiors_only() {
        let mut frame = Polygon::rectangle(0.0, 0.0, 20.0, 20.0);
        let mut hole = Polygon::rectangle(5.0, 5.0, 10.0, 10.0).exterior;
        hole.reverse();
        frame.interiors.push(hole);
        let params = IsolationParams {
            tool_diameter: 1.0,
            isolation_type: IsolationType::Interiors,
            ..Default::default()
        };
        let tables = generate_isolation(&[frame], &params).unwrap();
        let tool = tables[0].get(1).unwrap();
        assert_eq!(tool.solid_geometry.len(), 1);
        let b = tool.solid_geometry[0].bounds().unwrap();
        assert!((b.width() - 9.0).abs() < 1e-6);
        assert!(tool.solid_geometry[0].points().all(|p| p.x > 5.0 && p.x < 15.0));
    }

    #[test]
    fn test_collapsed_hole_is_an_error() {
        let mut frame = Polygon::rectangle(0.0, 0.0, 20.0, 20.0);
        let mut hole = Polygon::rectangle(9.9, 9.9, 0.2, 0.2).exterior;
        hole.reverse();
        frame.interiors.push(hole);
        let params = IsolationParams {
            tool_diameter: 1.0,
            isolation_type: IsolationType::Interiors,
            ..Default::default()
        };
        let err = generate_isolation(&[frame], &params).unwrap_err();
        assert!(err.to_string().starts_with("Isolation pass 0 failed"));
    }

    #[test]
    fn test_follow_mode() {
        let follow = vec![
            Shape::Point(Point::new(0.0, 0.0)),
            Shape::Line(vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0)]),
        ];
        let table = follow_paths(&follow, &IsolationParams::default());
        let tool = table.get(1).unwrap();
        assert_eq!(tool.solid_geometry.len(), 1);
        assert_eq!(tool.offset, OffsetKind::Path);
        assert_eq!(tool.role, ToolRole::Iso);
    }

    #[test]
    fn test_invalid_overlap() {
        let params = IsolationParams {
            overlap: 1.0,
            ..Default::default()
        };
        let square = Polygon::rectangle(0.0, 0.0, 1.0, 1.0);
        assert!(generate_isolation(&[square], &params).is_err());
    }
}
