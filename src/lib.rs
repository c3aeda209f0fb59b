//! # PCBCam
//!
//! Command line CAM for printed circuit boards: reads Gerber copper layers
//! and Excellon drill files, derives isolation toolpaths and writes
//! machine programs in a choice of G-code or HP-GL dialects.
//!
//! ## Architecture
//!
//! PCBCam is organized as a workspace with multiple crates:
//!
//! 1. **pcbcam-core** - Units, coordinate formats, geometry, tool tables
//! 2. **pcbcam-camtools** - Gerber/Excellon codecs, isolation, CNC jobs
//! 3. **pcbcam-settings** - Persisted configuration
//! 4. **pcbcam** - Command line binary that integrates all crates

pub mod pipeline;

pub use pcbcam_camtools::{
    assemble_toolpath, export_excellon, export_gerber, generate_isolation, isolate_gerber,
    parse_excellon, parse_gerber, AssemblerOptions, CamToolError, CncJob, ExcellonDocument,
    GerberDocument, IsolationParams, JobKind, PreprocessorRegistry, SourceKind, ToolBlock,
};
pub use pcbcam_camtools::cncjob::Preprocessor;
pub use pcbcam_core::{FormatConfig, GeometryTools, MachiningParams, Units, ZeroSuppression};
pub use pcbcam_settings::{Config, SettingsError};
pub use pipeline::{FileSummary, IsolateOverrides};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, keeping stdout free for program text
/// - RUST_LOG environment variable support
/// - `default_level` when RUST_LOG is unset
pub fn init_logging(default_level: tracing::Level) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
