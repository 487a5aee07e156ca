// Errors raised by the reporting channel itself (never by the tests it reports)

use crate::model::NodeId;
use thiserror::Error;

/// Internal reporting error, accumulated per session and handed back by
/// `end()`/`aborted()` instead of being thrown at the test driver.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report channel I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write XML report: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("reporting session already started")]
    AlreadyStarted,

    #[error("reporting session has not been started")]
    NotStarted,

    #[error("report channel is already closed")]
    Closed,

    #[error("node {0} was not announced when the session started")]
    UnknownNode(NodeId),

    #[error("end of node {0} without a matching start")]
    Unbalanced(NodeId),

    #[error("invalid reporter '{0}': expected port:<number> or file:<path>")]
    InvalidSpec(String),
}

/// Malformed line received from a reporting socket
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("line too short for a message key: {0:?}")]
    MissingKey(String),

    #[error("unknown message key {0:?}")]
    UnknownKey(String),

    #[error("malformed payload for {key:?}: {payload:?}")]
    BadPayload { key: String, payload: String },
}
