pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod state;

pub use error::{ReportError, WireError};
pub use model::{BundleDescriptor, ErrorInfo, ExecutionEvent, NodeId, NodeSpec, TestNode, TestTree};
pub use report::{PortReporter, Reporter, ReporterSpec, XmlReporter};
