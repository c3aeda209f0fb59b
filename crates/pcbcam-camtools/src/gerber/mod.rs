//! Gerber (RS-274X) documents
//!
//! A [`GerberDocument`] owns an [`ApertureTable`] whose elements carry
//! both the as-drawn centre lines and the filled copper they produce.
//! Reading and writing RS-274X text live in [`parser`] and [`writer`].

pub mod aperture;
pub mod parser;
pub mod writer;

pub use aperture::{Aperture, ApertureElement, ApertureId, ApertureShape, ApertureTable, Polarity};
pub use parser::{parse_gerber, GerberParseOptions};
pub use writer::export_gerber;

use crate::polygon_ops::{difference, union_all};
use pcbcam_core::geometry::{mirroring, scaling, translation, Axis, Bounds, Point, Polygon, Shape};
use pcbcam_core::{ConvertUnits, Units};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parsed or generated Gerber layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GerberDocument {
    /// Units of every coordinate and aperture size in the document
    pub units: Units,
    pub apertures: ApertureTable,
    /// Segments used when flashing round shapes
    pub steps_per_circle: usize,
}

impl GerberDocument {
    pub fn new(units: Units) -> Self {
        Self {
            units,
            apertures: ApertureTable::new(),
            steps_per_circle: 64,
        }
    }

    fn next_seq(&self) -> u64 {
        self.apertures.max_seq().map_or(0, |s| s + 1)
    }

    /// Copper area: dark elements unioned and clear elements subtracted,
    /// in draw order.
    pub fn solid_geometry(&self) -> Vec<Polygon> {
        let mut result: Vec<Polygon> = Vec::new();
        let mut dark: Vec<Polygon> = Vec::new();
        let mut clear: Vec<Polygon> = Vec::new();

        for (_, element) in self.apertures.elements_in_order() {
            match element.polarity() {
                Polarity::Dark => {
                    if !clear.is_empty() {
                        result = difference(&result, &clear);
                        clear.clear();
                    }
                    dark.extend(element.area().iter().cloned());
                }
                Polarity::Clear => {
                    if !dark.is_empty() {
                        result.append(&mut dark);
                        result = union_all(&result);
                    }
                    clear.extend(element.area().iter().cloned());
                }
            }
        }
        if !dark.is_empty() {
            result.append(&mut dark);
            result = union_all(&result);
        }
        if !clear.is_empty() {
            result = difference(&result, &clear);
        }
        result
    }

    /// As-drawn centre lines and flash points in draw order.
    pub fn follow_geometry(&self) -> Vec<Shape> {
        self.apertures
            .elements_in_order()
            .into_iter()
            .map(|(_, e)| e.follow.clone())
            .collect()
    }

    /// Flash `shape` at `at` with dark polarity, reusing a matching aperture.
    pub fn add_flash(&mut self, shape: ApertureShape, at: Point) -> Option<ApertureId> {
        let area = shape.flash(at, self.steps_per_circle)?;
        let seq = self.next_seq();
        let element = ApertureElement::new(Shape::Point(at), area, Polarity::Dark, seq);
        Some(self.apertures.add_or_merge(shape, element))
    }

    pub fn remove_aperture(&mut self, id: ApertureId) -> Option<Aperture> {
        self.apertures.remove(id)
    }

    /// Rescale to `target` units. Calling it again with the same target
    /// is a no-op.
    pub fn convert_units(&mut self, target: Units) {
        if self.units == target {
            return;
        }
        let factor = self.units.factor_to(target);
        debug!("Converting Gerber from {} to {}", self.units, target);
        self.apertures.convert_units(factor);
        self.units = target;
    }

    fn map_elements(&mut self, f: &impl Fn(Point) -> Point) {
        for (_, aperture) in self.apertures.iter_mut() {
            for element in aperture.elements.iter_mut() {
                element.map_points(f);
            }
        }
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.map_elements(&translation(dx, dy));
    }

    /// Scale geometry about `origin`; aperture sizes follow.
    pub fn scale(&mut self, sx: f64, sy: f64, origin: Point) {
        self.map_elements(&scaling(sx, sy, origin));
        for (_, aperture) in self.apertures.iter_mut() {
            aperture.shape.scale(sx, sy);
        }
    }

    /// Mirror geometry about `origin`; rotated polygon apertures flip
    /// with it.
    pub fn mirror(&mut self, axis: Axis, origin: Point) {
        self.map_elements(&mirroring(axis, origin));
        for (_, aperture) in self.apertures.iter_mut() {
            aperture.shape.mirror(axis);
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.apertures
            .elements_in_order()
            .into_iter()
            .flat_map(|(_, e)| e.area().iter().filter_map(|p| p.bounds()).chain(e.follow.bounds()))
            .reduce(|a, b| a.union(&b))
    }

    pub fn element_count(&self) -> usize {
        self.apertures.iter().map(|(_, a)| a.elements.len()).sum()
    }
}
