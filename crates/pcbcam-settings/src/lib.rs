//! PCBCam Settings Crate
//!
//! Persisted defaults for the codecs, isolation routing and CNC job
//! assembly. Nothing in the CAM crates reads these directly; the caller
//! turns a [`Config`] into explicit options for every call.

pub mod config;
pub mod error;

pub use config::{CncDefaults, Config, ExcellonImportDefaults, GeometrySettings, IsolationDefaults};
pub use error::{SettingsError, SettingsResult};
