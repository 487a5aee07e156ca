// Port reporter - streams the run to a listening IDE over a loopback socket

use super::Reporter;
use super::connect::{CancelToken, ConnectPolicy, connect_loopback};
use super::wire::{self, MessageKey, encode_frame};
use crate::error::ReportError;
use crate::model::{BundleDescriptor, ErrorInfo, NodeId, TestNode, TestTree};
use crate::state::{ErrorLog, SessionClock};
use std::io::{BufWriter, Read, Write};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, trace};

type Outbound = Box<dyn Write + Send>;
type Inbound = Box<dyn Read + Send>;

#[derive(Debug, Clone, Copy)]
struct PortSession {
    announced: usize,
    clock: SessionClock,
}

/// Reporter writing the `%KEY` line protocol to a duplex channel.
///
/// All frames go through one mutex-guarded writer; each logical message
/// (a single frame, or an error/failure frame with its trace block) is
/// written and flushed under one lock acquisition, so messages from
/// concurrent test threads never interleave.
pub struct PortReporter {
    output: Mutex<Option<Outbound>>,
    input: Mutex<Option<Inbound>>,
    session: Mutex<Option<PortSession>>,
    current: Mutex<Option<NodeId>>,
    errors: ErrorLog,
}

impl PortReporter {
    /// Connect to a listener on the loopback `port`.
    ///
    /// Returns `None` when no listener could be reached; the run goes on
    /// without live reporting.
    pub fn connect(port: u16, policy: &ConnectPolicy, cancel: &CancelToken) -> Option<Self> {
        let stream = connect_loopback(port, policy, cancel)?;
        let reader = match stream.try_clone() {
            Ok(reader) => reader,
            Err(e) => {
                error!("Error connecting to reporting socket: {}", e);
                return None;
            }
        };

        debug!("Connected to reporting socket on port {}", port);
        Some(Self::from_streams(reader, BufWriter::new(stream)))
    }

    /// Report over an already established channel
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            output: Mutex::new(Some(Box::new(writer))),
            input: Mutex::new(Some(Box::new(reader))),
            session: Mutex::new(None),
            current: Mutex::new(None),
            errors: ErrorLog::new(),
        }
    }

    /// The node most recently started. Advisory only: with parallel test
    /// threads this is whichever `start_test` ran last.
    pub fn current_test(&self) -> Option<NodeId> {
        *lock(&self.current)
    }

    fn message(&self, key: MessageKey, payload: &str) {
        self.write_block(&encode_frame(key, payload));
        trace!("{}{}", key, payload);
    }

    fn write_block(&self, block: &str) {
        let mut output = lock(&self.output);
        match output.as_mut() {
            Some(out) => {
                if let Err(e) = out.write_all(block.as_bytes()).and_then(|()| out.flush()) {
                    self.errors.record(e);
                }
            }
            None => self.errors.record(ReportError::Closed),
        }
    }

    /// Check that `node` belongs to the announced tree
    fn announced(&self, node: &TestNode) -> bool {
        match *lock(&self.session) {
            Some(session) if node.id().position() <= session.announced => true,
            Some(_) => {
                self.errors.record(ReportError::UnknownNode(node.id()));
                false
            }
            None => {
                self.errors.record(ReportError::NotStarted);
                false
            }
        }
    }

    fn node_message(&self, key: MessageKey, node: &TestNode) {
        if self.announced(node) {
            self.message(key, &wire::node_payload(node.id(), node.name()));
        }
    }

    /// Problem frame plus its trace block, written as one unit
    fn problem(&self, key: MessageKey, node: &TestNode, error: &ErrorInfo) {
        if !self.announced(node) {
            return;
        }

        let payload = wire::node_payload(node.id(), node.name());
        let mut block = encode_frame(key, &payload);
        block.push_str(&encode_frame(wire::TRACE_START, ""));
        block.push_str(&error.render());
        block.push('\n');
        block.push_str(&encode_frame(wire::TRACE_END, ""));

        self.write_block(&block);
        trace!("{}{}", key, payload);
    }
}

impl Reporter for PortReporter {
    fn begin(
        &self,
        _bundles: &[BundleDescriptor],
        tree: &TestTree,
        real_count: usize,
    ) -> Result<(), ReportError> {
        let mut session = lock(&self.session);
        if session.is_some() {
            return Err(ReportError::AlreadyStarted);
        }

        self.message(wire::TEST_COUNT, &wire::test_count_payload(real_count));
        for node in tree {
            self.message(
                wire::TEST_TREE,
                &wire::tree_payload(node.id(), node.name(), node.is_suite(), node.case_count()),
            );
        }

        *session = Some(PortSession {
            announced: tree.len(),
            clock: SessionClock::start(),
        });
        debug!("Announced {} node(s), {} test(s)", tree.len(), real_count);
        Ok(())
    }

    fn start_test(&self, node: &TestNode) {
        *lock(&self.current) = Some(node.id());
        self.node_message(wire::TEST_START, node);
    }

    fn end_test(&self, node: &TestNode) {
        self.node_message(wire::TEST_END, node);
    }

    fn add_error(&self, node: &TestNode, error: &ErrorInfo) {
        self.problem(wire::ERROR, node, error);
    }

    fn add_failure(&self, node: &TestNode, failure: &ErrorInfo) {
        self.problem(wire::FAILED, node, failure);
    }

    /// Same wire output as a normal end: listeners see `%RUNTIME` last either way.
    fn aborted(&self) -> Vec<ReportError> {
        debug!("Run aborted, closing reporting socket");
        self.end()
    }

    fn end(&self) -> Vec<ReportError> {
        let session = *lock(&self.session);
        let elapsed = session
            .map(|session| session.clock.elapsed_millis())
            .unwrap_or(0);

        {
            let mut output = lock(&self.output);
            if let Some(mut out) = output.take() {
                let frame = encode_frame(wire::RUNTIME, &elapsed.to_string());
                if let Err(e) = out.write_all(frame.as_bytes()).and_then(|()| out.flush()) {
                    self.errors.record(e);
                }
                trace!("{}{}", wire::RUNTIME, elapsed);
                drop(out);
            }
        }

        // Close-time problems on the inbound side are not worth reporting.
        drop(lock(&self.input).take());

        self.errors.drain()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
