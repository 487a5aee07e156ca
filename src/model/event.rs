// Execution events and the error payload carried by errors and failures

use super::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Error or assertion failure raised by a test.
///
/// `trace` holds the frames of the stack dump without the header line;
/// [`ErrorInfo::render`] puts both together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Type name of the error, e.g. `junit.framework.AssertionFailedError`
    pub kind: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub trace: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            message,
            trace: String::new(),
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }

    /// Build from a Rust error, recording its `source()` chain as the trace.
    ///
    /// `kind` is the static type name of `E`, so the error must be concrete;
    /// a boxed `dyn Error` would only ever report the trait object type.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let mut trace = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = writeln!(trace, "Caused by: {}", cause);
            source = cause.source();
        }

        Self {
            kind: std::any::type_name::<E>().to_string(),
            message: Some(error.to_string()),
            trace,
        }
    }

    /// `kind: message`, or just `kind` when there is no message
    pub fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.kind, message),
            None => self.kind.clone(),
        }
    }

    /// Full stack dump, always newline-terminated
    pub fn render(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        if !self.trace.is_empty() {
            out.push_str(&self.trace);
            if !self.trace.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// One reporter callback, addressed by node handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Start {
        node: NodeId,
    },
    End {
        node: NodeId,
    },
    Error {
        node: NodeId,
        #[serde(flatten)]
        error: ErrorInfo,
    },
    Failure {
        node: NodeId,
        #[serde(flatten)]
        error: ErrorInfo,
    },
}

impl ExecutionEvent {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Start { node }
            | Self::End { node }
            | Self::Error { node, .. }
            | Self::Failure { node, .. } => *node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_render_with_message_and_trace() {
        let info = ErrorInfo::new("java.lang.IllegalStateException", Some("boom".into()))
            .with_trace("\tat Foo.bar(Foo.java:10)");
        assert_eq!(
            info.render(),
            "java.lang.IllegalStateException: boom\n\tat Foo.bar(Foo.java:10)\n"
        );
    }

    #[test]
    fn test_render_without_message() {
        let info = ErrorInfo::new("AssertionFailedError", None);
        assert_eq!(info.header(), "AssertionFailedError");
        assert_eq!(info.render(), "AssertionFailedError\n");
    }

    #[test]
    fn test_from_error_records_source_chain() {
        let err = Outer(std::io::Error::other("disk gone"));
        let info = ErrorInfo::from_error(&err);
        assert!(info.kind.ends_with("Outer"));
        assert_eq!(info.message.as_deref(), Some("outer failure"));
        assert_eq!(info.trace, "Caused by: disk gone\n");
    }

    #[test]
    fn test_event_json_shape() {
        let event: ExecutionEvent = serde_json::from_str(
            r#"{"event": "failure", "node": 2, "kind": "AssertionError", "message": "expected 1"}"#,
        )
        .unwrap();

        let node = NodeId::new(2).unwrap();
        assert_eq!(event.node(), node);
        assert_eq!(
            event,
            ExecutionEvent::Failure {
                node,
                error: ErrorInfo::new("AssertionError", Some("expected 1".into())),
            }
        );
    }
}
