//! Excellon (NC drill) documents
//!
//! Drill hits and slots are kept per tool in a [`DrillTools`] table whose
//! ids are the T-numbers of the source file.

pub mod parser;
pub mod writer;

pub use parser::{parse_excellon, ExcellonParseOptions};
pub use writer::{export_excellon, ExcellonExportSettings};

use crate::polygon_ops::{stroke_segment, union_all};
use pcbcam_core::geometry::{mirroring, scaling, translation, Axis, Bounds, Point, Polygon};
use pcbcam_core::{ConvertUnits, DrillTools, Units};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parsed or generated drill file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcellonDocument {
    pub units: Units,
    pub tools: DrillTools,
    pub steps_per_circle: usize,
}

impl ExcellonDocument {
    pub fn new(units: Units) -> Self {
        Self {
            units,
            tools: DrillTools::new(),
            steps_per_circle: 64,
        }
    }

    /// Drilled area: a disc per hit and a stadium per slot.
    pub fn solid_geometry(&self) -> Vec<Polygon> {
        let steps = self.steps_per_circle;
        let mut polys = Vec::new();
        for (_, tool) in self.tools.iter() {
            let r = tool.diameter / 2.0;
            polys.extend(tool.drills.iter().map(|p| Polygon::circle(*p, r, steps)));
            polys.extend(
                tool.slots
                    .iter()
                    .map(|s| stroke_segment(s.start, s.end, tool.diameter, steps)),
            );
        }
        union_all(&polys)
    }

    /// Number of hits and slots over all tools.
    pub fn total_drills(&self) -> usize {
        self.tools.iter().map(|(_, t)| t.hit_count()).sum()
    }

    /// Rescale to `target` units; a no-op when already there.
    pub fn convert_units(&mut self, target: Units) {
        if self.units == target {
            return;
        }
        debug!("Converting Excellon from {} to {}", self.units, target);
        self.tools.convert_units(self.units.factor_to(target));
        self.units = target;
    }

    fn map_points(&mut self, f: &impl Fn(Point) -> Point) {
        for (_, tool) in self.tools.iter_mut() {
            for p in tool.drills.iter_mut() {
                *p = f(*p);
            }
            for slot in tool.slots.iter_mut() {
                slot.start = f(slot.start);
                slot.end = f(slot.end);
            }
        }
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.map_points(&translation(dx, dy));
    }

    /// Scale hit positions about `origin`. Drill diameters are physical
    /// bits and keep their size.
    pub fn scale(&mut self, sx: f64, sy: f64, origin: Point) {
        self.map_points(&scaling(sx, sy, origin));
    }

    pub fn mirror(&mut self, axis: Axis, origin: Point) {
        self.map_points(&mirroring(axis, origin));
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<Point> = self
            .tools
            .iter()
            .flat_map(|(_, t)| {
                t.drills
                    .iter()
                    .copied()
                    .chain(t.slots.iter().flat_map(|s| [s.start, s.end]))
            })
            .collect();
        Bounds::from_points(&points)
    }
}
