//! # PCBCam Core
//!
//! Value types shared by the CAM crates: units and their conversion,
//! fixed-point coordinate formats, 2-D geometry and tool tables with
//! typed machining parameters. Nothing in here touches the filesystem.

pub mod error;
pub mod format;
pub mod geometry;
pub mod tools;
pub mod units;

pub use error::{FormatError, FormatResult, ToolTableError, ToolTableResult};
pub use format::{
    CoordinateCodec, CoordinateStyle, FormatConfig, SlotStyle, ZeroSuppression,
};
pub use geometry::{Axis, Bounds, Point, Polygon, Shape};
pub use tools::{
    DrillTool, DrillTools, GeometryTools, IsolationType, MachiningParams, MillingDirection,
    OffsetKind, PreprocessorExtras, Slot, Tool, ToolEntry, ToolRole, ToolShape, ToolTable,
};
pub use units::{round_to, ConvertUnits, Units, MM_PER_INCH};
