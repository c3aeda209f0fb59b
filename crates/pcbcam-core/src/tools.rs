//! Tool tables and machining parameters
//!
//! A [`ToolTable`] maps small integer ids to tool entries. Ids are unique
//! within one table only, the table keeps insertion order (that order is
//! the program order of a generated job), and removing a tool renumbers
//! the rest densely from 1.
//!
//! On the wire a table is `{ "tools": [{ "id": 1, "tool": {..} }], "ungrouped": [..] }`.
//! Older files keyed tools by string (`{ "tools": { "2": {..} } }`); those
//! keys are coerced to integers on load and anything non-integral is
//! rejected.

use crate::error::{ToolTableError, ToolTableResult};
use crate::geometry::{Point, Shape};
use crate::units::{round_to, ConvertUnits};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the tool centre line relates to the drawn geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum OffsetKind {
    /// Cut on the line
    #[default]
    Path,
    /// Cut inside the outline
    In,
    /// Cut outside the outline
    Out,
    /// Cut at an explicit distance (positive is outside)
    Custom(f64),
}

/// Machining role shown in the tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolRole {
    #[default]
    Rough,
    Finish,
    Iso,
    Polish,
}

/// Cutter profile. `C1`..`C4` are flat end mills by flute count, `B` is a
/// ball nose and `V` a V-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolShape {
    #[default]
    C1,
    C2,
    C3,
    C4,
    B,
    V,
}

/// Which copper boundaries an isolation job follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IsolationType {
    Exteriors,
    Interiors,
    #[default]
    Both,
}

/// Cutting direction relative to the material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MillingDirection {
    #[default]
    Climb,
    Conventional,
}

impl fmt::Display for MillingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Climb => write!(f, "climb"),
            Self::Conventional => write!(f, "conventional"),
        }
    }
}

/// Preprocessor specific options that only some dialects read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorExtras {
    /// Z depth to probe down to on tool change
    pub probe_z: f64,
    /// Feed rate for the probe move
    pub probe_feedrate: f64,
    /// Laser power (S word) for laser dialects, 0..=1000
    pub laser_power: f64,
}

impl Default for PreprocessorExtras {
    fn default() -> Self {
        Self {
            probe_z: -1.0,
            probe_feedrate: 75.0,
            laser_power: 0.0,
        }
    }
}

impl ConvertUnits for PreprocessorExtras {
    fn convert_units(&mut self, factor: f64) {
        self.probe_z *= factor;
        self.probe_feedrate *= factor;
    }
}

/// Per tool cutting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachiningParams {
    pub cut_z: f64,
    pub travel_z: f64,
    pub multidepth: bool,
    pub depth_per_pass: f64,
    pub feedrate: f64,
    pub feedrate_z: f64,
    pub feedrate_rapid: f64,
    pub spindle_speed: Option<f64>,
    pub dwell: bool,
    /// Seconds
    pub dwell_time: f64,
    pub toolchange: bool,
    pub toolchange_z: f64,
    pub toolchange_xy: Option<Point>,
    pub start_z: Option<f64>,
    pub end_z: f64,
    pub end_xy: Option<Point>,
    pub extracut: bool,
    pub extracut_length: f64,
    pub vtip_diameter: f64,
    /// Included angle in degrees
    pub vtip_angle: f64,
    pub preprocessor: String,
    pub extras: PreprocessorExtras,
}

impl Default for MachiningParams {
    fn default() -> Self {
        Self {
            cut_z: -0.1,
            travel_z: 2.0,
            multidepth: false,
            depth_per_pass: 0.8,
            feedrate: 120.0,
            feedrate_z: 60.0,
            feedrate_rapid: 1500.0,
            spindle_speed: None,
            dwell: false,
            dwell_time: 1.0,
            toolchange: false,
            toolchange_z: 15.0,
            toolchange_xy: None,
            start_z: None,
            end_z: 15.0,
            end_xy: None,
            extracut: false,
            extracut_length: 0.1,
            vtip_diameter: 0.1,
            vtip_angle: 30.0,
            preprocessor: "default".to_string(),
            extras: PreprocessorExtras::default(),
        }
    }
}

impl MachiningParams {
    /// Z level of every cutting pass, shallowest first.
    ///
    /// With multidepth enabled the cut is split into
    /// `ceil(|cut_z| / depth_per_pass)` passes and the last one lands
    /// exactly on `cut_z`.
    pub fn depth_levels(&self) -> Vec<f64> {
        let target = self.cut_z;
        if !self.multidepth || self.depth_per_pass <= 0.0 || target == 0.0 {
            return vec![target];
        }
        let depth = target.abs();
        // A ratio a rounding error above a whole number is that number.
        let passes = ((depth / self.depth_per_pass - 1e-9).ceil() as usize).max(1);
        let sign = target.signum();
        let mut levels: Vec<f64> = (1..passes)
            .map(|i| sign * (i as f64 * self.depth_per_pass).min(depth))
            .collect();
        levels.push(target);
        levels
    }
}

impl ConvertUnits for MachiningParams {
    fn convert_units(&mut self, factor: f64) {
        self.cut_z *= factor;
        self.travel_z *= factor;
        self.depth_per_pass *= factor;
        self.feedrate *= factor;
        self.feedrate_z *= factor;
        self.feedrate_rapid *= factor;
        self.toolchange_z *= factor;
        self.toolchange_xy.convert_units(factor);
        self.start_z.convert_units(factor);
        self.end_z *= factor;
        self.end_xy.convert_units(factor);
        self.extracut_length *= factor;
        self.vtip_diameter *= factor;
        self.extras.convert_units(factor);
    }
}

/// Behaviour a tool table needs from its entries.
pub trait ToolEntry {
    /// True when `other` describes the same physical tool.
    fn same_tool(&self, other: &Self) -> bool;

    /// Take over the geometry of `other`.
    fn absorb(&mut self, other: Self);

    /// Move all geometry out of the entry.
    fn take_geometry(&mut self) -> Vec<Shape>;

    fn has_geometry(&self) -> bool;

    fn diameter(&self) -> f64;
}

/// A milling tool with the geometry it cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub diameter: f64,
    #[serde(default)]
    pub offset: OffsetKind,
    #[serde(default)]
    pub role: ToolRole,
    #[serde(default)]
    pub shape: ToolShape,
    #[serde(default)]
    pub params: MachiningParams,
    #[serde(default)]
    pub solid_geometry: Vec<Shape>,
}

impl Tool {
    /// New tool, diameter rounded to `decimals`.
    pub fn new(diameter: f64, decimals: u8) -> Self {
        Self {
            diameter: round_to(diameter, decimals),
            offset: OffsetKind::default(),
            role: ToolRole::default(),
            shape: ToolShape::default(),
            params: MachiningParams::default(),
            solid_geometry: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: ToolRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_shape(mut self, shape: ToolShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_params(mut self, params: MachiningParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_geometry(mut self, geometry: Vec<Shape>) -> Self {
        self.solid_geometry = geometry;
        self
    }

    /// Cut depth actually used for this tool.
    ///
    /// A V-bit cuts a groove as wide as `diameter` only at the depth where
    /// the cone reaches that width, so the depth is derived from the tip
    /// diameter and included angle instead of taken from `cut_z`.
    pub fn effective_cut_z(&self) -> f64 {
        if self.shape != ToolShape::V {
            return self.params.cut_z;
        }
        let half_angle = (self.params.vtip_angle / 2.0).to_radians();
        if half_angle <= 0.0 || self.diameter <= self.params.vtip_diameter {
            return self.params.cut_z;
        }
        -(self.diameter - self.params.vtip_diameter) / (2.0 * half_angle.tan())
    }
}

impl ToolEntry for Tool {
    fn same_tool(&self, other: &Self) -> bool {
        (self.diameter - other.diameter).abs() < 1e-9
            && self.shape == other.shape
            && self.role == other.role
            && self.offset == other.offset
    }

    fn absorb(&mut self, other: Self) {
        self.solid_geometry.extend(other.solid_geometry);
    }

    fn take_geometry(&mut self) -> Vec<Shape> {
        std::mem::take(&mut self.solid_geometry)
    }

    fn has_geometry(&self) -> bool {
        self.solid_geometry.iter().any(|s| !s.is_empty())
    }

    fn diameter(&self) -> f64 {
        self.diameter
    }
}

impl ConvertUnits for Tool {
    fn convert_units(&mut self, factor: f64) {
        self.diameter *= factor;
        if let OffsetKind::Custom(d) = &mut self.offset {
            *d *= factor;
        }
        self.params.convert_units(factor);
        self.solid_geometry.convert_units(factor);
    }
}

/// A straight slot between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Point,
    pub end: Point,
}

impl ConvertUnits for Slot {
    fn convert_units(&mut self, factor: f64) {
        self.start.convert_units(factor);
        self.end.convert_units(factor);
    }
}

/// A drill bit with its hits and slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillTool {
    pub diameter: f64,
    #[serde(default)]
    pub drills: Vec<Point>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub params: MachiningParams,
}

impl DrillTool {
    pub fn new(diameter: f64, decimals: u8) -> Self {
        Self {
            diameter: round_to(diameter, decimals),
            drills: Vec::new(),
            slots: Vec::new(),
            params: MachiningParams::default(),
        }
    }

    pub fn hit_count(&self) -> usize {
        self.drills.len() + self.slots.len()
    }
}

impl ToolEntry for DrillTool {
    fn same_tool(&self, other: &Self) -> bool {
        (self.diameter - other.diameter).abs() < 1e-9
    }

    fn absorb(&mut self, other: Self) {
        self.drills.extend(other.drills);
        self.slots.extend(other.slots);
    }

    fn take_geometry(&mut self) -> Vec<Shape> {
        let mut out: Vec<Shape> = self.drills.drain(..).map(Shape::Point).collect();
        out.extend(
            self.slots
                .drain(..)
                .map(|s| Shape::Line(vec![s.start, s.end])),
        );
        out
    }

    fn has_geometry(&self) -> bool {
        !self.drills.is_empty() || !self.slots.is_empty()
    }

    fn diameter(&self) -> f64 {
        self.diameter
    }
}

impl ConvertUnits for DrillTool {
    fn convert_units(&mut self, factor: f64) {
        self.diameter *= factor;
        self.drills.convert_units(factor);
        self.slots.convert_units(factor);
        self.params.convert_units(factor);
    }
}

/// Insertion ordered id -> tool map.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolTable<T> {
    entries: Vec<(u32, T)>,
    ungrouped: Vec<Shape>,
}

pub type GeometryTools = ToolTable<Tool>;
pub type DrillTools = ToolTable<DrillTool>;

impl<T> Default for ToolTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ungrouped: Vec::new(),
        }
    }
}

impl<T: ToolEntry> ToolTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|(i, _)| *i == id)
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(i, _)| *i == id)
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.entries.iter().map(|(id, t)| (*id, t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.entries.iter_mut().map(|(id, t)| (*id, t))
    }

    /// Id the next inserted tool will get.
    pub fn next_id(&self) -> u32 {
        self.entries.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1
    }

    /// Append a tool under a fresh id.
    pub fn insert(&mut self, tool: T) -> u32 {
        let id = self.next_id();
        self.entries.push((id, tool));
        id
    }

    /// Put a tool under a caller chosen id, replacing any tool already there.
    pub fn insert_with_id(&mut self, id: u32, tool: T) {
        match self.entries.iter_mut().find(|(i, _)| *i == id) {
            Some(slot) => slot.1 = tool,
            None => self.entries.push((id, tool)),
        }
    }

    /// Merge into an identical tool if there is one, else append.
    pub fn add_or_merge(&mut self, tool: T) -> u32 {
        if let Some((id, existing)) = self.entries.iter_mut().find(|(_, t)| t.same_tool(&tool)) {
            existing.absorb(tool);
            return *id;
        }
        self.insert(tool)
    }

    /// Remove a tool and renumber the rest.
    ///
    /// When the removed tool is the last one its geometry moves to the
    /// ungrouped list, so the owner never loses geometry.
    pub fn remove(&mut self, id: u32) -> ToolTableResult<T> {
        let idx = self
            .entries
            .iter()
            .position(|(i, _)| *i == id)
            .ok_or(ToolTableError::UnknownTool(id))?;
        let (_, mut tool) = self.entries.remove(idx);
        if self.entries.is_empty() {
            self.ungrouped.extend(tool.take_geometry());
        }
        self.renumber();
        Ok(tool)
    }

    /// Reassign ids 1..=n in table order.
    pub fn renumber(&mut self) {
        for (n, (id, _)) in self.entries.iter_mut().enumerate() {
            *id = n as u32 + 1;
        }
    }

    /// Move a tool to a new position in the program order.
    pub fn move_to(&mut self, id: u32, index: usize) -> ToolTableResult<()> {
        let from = self
            .entries
            .iter()
            .position(|(i, _)| *i == id)
            .ok_or(ToolTableError::UnknownTool(id))?;
        let entry = self.entries.remove(from);
        let index = index.min(self.entries.len());
        self.entries.insert(index, entry);
        Ok(())
    }

    pub fn ungrouped(&self) -> &[Shape] {
        &self.ungrouped
    }

    pub fn push_ungrouped(&mut self, shape: Shape) {
        self.ungrouped.push(shape);
    }

    /// True when no tool holds any geometry.
    pub fn all_empty(&self) -> bool {
        self.entries.iter().all(|(_, t)| !t.has_geometry())
    }
}

impl<T: ConvertUnits> ConvertUnits for ToolTable<T> {
    fn convert_units(&mut self, factor: f64) {
        for (_, tool) in self.entries.iter_mut() {
            tool.convert_units(factor);
        }
        self.ungrouped.convert_units(factor);
    }
}

/// Coerce a persisted tool key to an integer id.
///
/// Accepts `2`, `"2"` and legacy float forms `2.0` / `"2.0"`.
pub fn coerce_tool_key(raw: &str) -> ToolTableResult<u32> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<u32>() {
        return Ok(id);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(ToolTableError::InvalidKey(raw.to_string())),
    }
}

#[derive(Serialize)]
struct WireEntryRef<'a, T> {
    id: u32,
    tool: &'a T,
}

#[derive(Serialize)]
struct WireTableRef<'a, T> {
    tools: Vec<WireEntryRef<'a, T>>,
    ungrouped: &'a [Shape],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(u64),
    Float(f64),
    Text(String),
}

impl WireId {
    fn coerce(&self) -> ToolTableResult<u32> {
        match self {
            WireId::Int(i) => {
                u32::try_from(*i).map_err(|_| ToolTableError::InvalidKey(i.to_string()))
            }
            WireId::Float(f) => coerce_tool_key(&f.to_string()),
            WireId::Text(s) => coerce_tool_key(s),
        }
    }
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct WireEntry<T> {
    id: WireId,
    tool: T,
}

#[derive(Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
enum WireTools<T> {
    List(Vec<WireEntry<T>>),
    Legacy(BTreeMap<String, T>),
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct WireTable<T> {
    tools: WireTools<T>,
    #[serde(default)]
    ungrouped: Vec<Shape>,
}

impl<T: Serialize> Serialize for ToolTable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireTableRef {
            tools: self
                .entries
                .iter()
                .map(|(id, tool)| WireEntryRef { id: *id, tool })
                .collect(),
            ungrouped: &self.ungrouped,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ToolTable<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireTable::<T>::deserialize(deserializer)?;
        let entries: Vec<(u32, T)> = match wire.tools {
            WireTools::List(list) => list
                .into_iter()
                .map(|e| e.id.coerce().map(|id| (id, e.tool)))
                .collect::<ToolTableResult<_>>()
                .map_err(de::Error::custom)?,
            WireTools::Legacy(map) => {
                let mut v = map
                    .into_iter()
                    .map(|(k, t)| coerce_tool_key(&k).map(|id| (id, t)))
                    .collect::<ToolTableResult<Vec<_>>>()
                    .map_err(de::Error::custom)?;
                v.sort_by_key(|(id, _)| *id);
                v
            }
        };

        let mut seen = std::collections::HashSet::new();
        for (id, _) in entries.iter() {
            if !seen.insert(*id) {
                return Err(de::Error::custom(ToolTableError::InvalidKey(id.to_string())));
            }
        }

        Ok(ToolTable {
            entries,
            ungrouped: wire.ungrouped,
        })
    }
}
