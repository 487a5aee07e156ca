// Report module - the reporter capability and its two sinks

pub mod connect;
pub mod port;
pub mod wire;
pub mod xml;

use crate::error::ReportError;
use crate::model::{BundleDescriptor, ErrorInfo, ExecutionEvent, TestNode, TestTree};
pub use connect::{CancelToken, ConnectPolicy};
pub use port::PortReporter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
pub use xml::XmlReporter;

/// Reporter trait
///
/// Call order per session: `begin` once, then any interleaving of
/// `start_test`/`add_error`/`add_failure`/`end_test` from any number of
/// threads, then `end` (or `aborted`). Problems in the reporting channel are
/// collected and handed back by `end`/`aborted`, never raised mid-run.
pub trait Reporter: Send + Sync {
    /// Announce the host module snapshot and the flattened tree.
    ///
    /// Fails only if the session cannot be opened at all.
    fn begin(
        &self,
        bundles: &[BundleDescriptor],
        tree: &TestTree,
        real_count: usize,
    ) -> Result<(), ReportError>;

    /// Called when a test or suite starts
    fn start_test(&self, node: &TestNode);

    /// Called when a test or suite finishes
    fn end_test(&self, node: &TestNode);

    /// The test raised an unexpected error
    fn add_error(&self, node: &TestNode, error: &ErrorInfo);

    /// The test failed an assertion
    fn add_failure(&self, node: &TestNode, failure: &ErrorInfo);

    /// The run stopped early. Returns the errors collected so far.
    fn aborted(&self) -> Vec<ReportError>;

    /// Finish the session and release the sink. Safe to call repeatedly;
    /// returns the errors collected since the previous `end`/`aborted`.
    fn end(&self) -> Vec<ReportError>;
}

/// Forward one event to `reporter`, resolving its node through `tree`
pub fn dispatch(
    reporter: &dyn Reporter,
    tree: &TestTree,
    event: &ExecutionEvent,
) -> Result<(), ReportError> {
    let node = tree
        .get(event.node())
        .ok_or(ReportError::UnknownNode(event.node()))?;

    match event {
        ExecutionEvent::Start { .. } => reporter.start_test(node),
        ExecutionEvent::End { .. } => reporter.end_test(node),
        ExecutionEvent::Error { error, .. } => reporter.add_error(node, error),
        ExecutionEvent::Failure { error, .. } => reporter.add_failure(node, error),
    }
    Ok(())
}

/// Which sink a session reports to: `port:<number>` or `file:<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterSpec {
    Port(u16),
    File(PathBuf),
}

impl ReporterSpec {
    /// Open the sink. `None` means no listener could be reached on the port.
    pub fn open(&self, policy: &ConnectPolicy, cancel: &CancelToken) -> Option<Box<dyn Reporter>> {
        match self {
            Self::Port(port) => PortReporter::connect(*port, policy, cancel)
                .map(|reporter| Box::new(reporter) as Box<dyn Reporter>),
            Self::File(path) => Some(Box::new(XmlReporter::new(path.clone()))),
        }
    }
}

impl FromStr for ReporterSpec {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::InvalidSpec(s.to_string());
        let (scheme, value) = s.split_once(':').ok_or_else(invalid)?;

        match scheme.trim() {
            "port" => value
                .trim()
                .parse()
                .map(Self::Port)
                .map_err(|_| invalid()),
            "file" if !value.trim().is_empty() => Ok(Self::File(PathBuf::from(value.trim()))),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for ReporterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port(port) => write!(f, "port:{}", port),
            Self::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeSpec};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl Recording {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Reporter for Recording {
        fn begin(&self, _: &[BundleDescriptor], tree: &TestTree, count: usize) -> Result<(), ReportError> {
            self.push(format!("begin {} {}", tree.len(), count));
            Ok(())
        }

        fn start_test(&self, node: &TestNode) {
            self.push(format!("start {}", node.id()));
        }

        fn end_test(&self, node: &TestNode) {
            self.push(format!("end {}", node.id()));
        }

        fn add_error(&self, node: &TestNode, error: &ErrorInfo) {
            self.push(format!("error {} {}", node.id(), error.kind));
        }

        fn add_failure(&self, node: &TestNode, failure: &ErrorInfo) {
            self.push(format!("failure {} {}", node.id(), failure.kind));
        }

        fn aborted(&self) -> Vec<ReportError> {
            Vec::new()
        }

        fn end(&self) -> Vec<ReportError> {
            Vec::new()
        }
    }

    #[test]
    fn test_parse_reporter_spec() {
        assert_eq!("port:5001".parse::<ReporterSpec>().unwrap(), ReporterSpec::Port(5001));
        assert_eq!(
            "file:reports/out.xml".parse::<ReporterSpec>().unwrap(),
            ReporterSpec::File(PathBuf::from("reports/out.xml"))
        );
        assert_eq!(ReporterSpec::Port(5001).to_string(), "port:5001");
    }

    #[test]
    fn test_parse_reporter_spec_invalid() {
        for input in ["5001", "port:", "port:99999", "file:", "socket:1"] {
            assert!(
                matches!(input.parse::<ReporterSpec>(), Err(ReportError::InvalidSpec(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_dispatch_routes_events() {
        let tree = TestTree::new([NodeSpec::case("testA")]);
        let node = NodeId::new(1).unwrap();
        let reporter = Recording::default();

        let events = [
            ExecutionEvent::Start { node },
            ExecutionEvent::Error {
                node,
                error: ErrorInfo::new("IOError", None),
            },
            ExecutionEvent::Failure {
                node,
                error: ErrorInfo::new("AssertionError", None),
            },
            ExecutionEvent::End { node },
        ];
        for event in &events {
            dispatch(&reporter, &tree, event).unwrap();
        }

        assert_eq!(
            *reporter.calls.lock().unwrap(),
            vec!["start 1", "error 1 IOError", "failure 1 AssertionError", "end 1"]
        );
    }

    #[test]
    fn test_dispatch_unknown_node() {
        let tree = TestTree::new([NodeSpec::case("testA")]);
        let reporter = Recording::default();
        let event = ExecutionEvent::Start {
            node: NodeId::new(7).unwrap(),
        };

        let result = dispatch(&reporter, &tree, &event);
        assert!(matches!(result, Err(ReportError::UnknownNode(id)) if id.position() == 7));
        assert!(reporter.calls.lock().unwrap().is_empty());
    }
}
