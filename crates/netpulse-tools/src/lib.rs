//! NetPulse Tools - Diagnostic Tool Catalog and Collaborator Endpoints
//!
//! This crate provides the network-test side of NetPulse:
//! - Catalog: the closed set of diagnostic tools and their parameter schemas
//! - Transport: invoking a tool's collaborator endpoint
//! - Runner: parameter validation, defaults, and timeouts around a transport
//! - Capture: status / stop / analyze endpoints for background captures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capture;
pub mod catalog;
pub mod error;
pub mod runner;
pub mod transport;

pub use capture::{AnalysisResponse, CaptureBackend, CaptureStatus, HttpCaptureBackend, StopResponse};
pub use catalog::{
    ParamType, ParameterSpec, ToolCatalog, ToolCategory, ToolDefinition, ToolKind, ToolPriority,
    ToolTier,
};
pub use error::{Error, Result};
pub use runner::{RunnerConfig, ToolResult, ToolRunner};
pub use transport::{HttpTransport, ToolTransport};
