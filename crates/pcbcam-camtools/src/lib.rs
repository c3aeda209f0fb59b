//! # PCBCam CAM Tools
//!
//! The machining side of PCBCam: reading and writing the fabrication
//! formats, deriving isolation toolpaths and assembling machine programs.
//!
//! ## Pipeline
//!
//! - **Gerber**: RS-274X copper layers into an aperture table and back
//! - **Excellon**: NC drill files into a drill tool table and back
//! - **Isolation**: offset passes around the copper of a Gerber layer
//! - **CNC jobs**: per tool G-code (or HP-GL) blocks in one program,
//!   rendered by a named machine dialect
//!
//! All entry points are synchronous and take their formatting options
//! explicitly.

pub mod cncjob;
pub mod error;
pub mod excellon;
pub mod gerber;
pub mod io;
pub mod isolation;
pub mod polygon_ops;

pub use cncjob::{
    assemble_toolpath, AssemblerOptions, CncJob, JobKind, PathOrdering, PreprocessorRegistry,
    SourceKind, ToolBlock, ToolpathAssembler,
};
pub use error::{CamToolError, CamToolResult, IsolationError, ParseError, ParseResult};
pub use excellon::{
    export_excellon, parse_excellon, ExcellonDocument, ExcellonExportSettings,
    ExcellonParseOptions,
};
pub use gerber::{export_gerber, parse_gerber, GerberDocument, GerberParseOptions};
pub use isolation::{generate_isolation, isolate_gerber, IsolationParams};
