// XML reporter - streams a static report document while the run progresses

use super::Reporter;
use crate::error::ReportError;
use crate::model::{BundleDescriptor, ErrorInfo, NodeId, TestNode, TestTree};
use crate::state::{ErrorLog, SessionClock};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const ELEM_TESTREPORT: &str = "testreport";
const ELEM_BUNDLE: &str = "bundle";
const ELEM_TEST: &str = "test";
const ELEM_ERROR: &str = "error";
const ELEM_FAILURE: &str = "failure";
const ELEM_ABORTED: &str = "aborted";

const ATTR_TIME: &str = "time";
const ATTR_NAME: &str = "name";
const ATTR_CLASS: &str = "class";
const ATTR_TYPE: &str = "type";
const ATTR_MESSAGE: &str = "message";

type Sink = Box<dyn Write + Send>;

enum Target {
    Path(PathBuf),
    Writer(Sink),
}

struct Document {
    target: Option<Target>,
    writer: Option<Writer<Sink>>,
    /// `test` elements opened and not yet closed, innermost last
    open_tests: Vec<NodeId>,
    finished: bool,
}

/// Reporter producing one XML document per run.
///
/// Elements are written as the callbacks arrive, so memory use does not grow
/// with the size of the suite:
///
/// ```text
/// <testreport time="...">
///   <bundle location=".." modified=".." state=".." id=".." bsn=".." version=".."/>
///   <test name="testA" class="com.example.FooTest">
///     <failure name=".." type=".." message=".."><![CDATA[trace]]></failure>
///   </test>
///   <aborted/>
/// </testreport>
/// ```
pub struct XmlReporter {
    document: Mutex<Document>,
    errors: ErrorLog,
}

impl XmlReporter {
    /// Report into `path`; the file is created by `begin`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_target(Target::Path(path.into()))
    }

    /// Report into an arbitrary writer
    pub fn with_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::with_target(Target::Writer(Box::new(writer)))
    }

    fn with_target(target: Target) -> Self {
        Self {
            document: Mutex::new(Document {
                target: Some(target),
                writer: None,
                open_tests: Vec::new(),
                finished: false,
            }),
            errors: ErrorLog::new(),
        }
    }

    /// Run `write` against the open document, recording any failure
    fn write<F>(&self, write: F)
    where
        F: FnOnce(&mut Writer<Sink>, &mut Vec<NodeId>) -> Result<(), ReportError>,
    {
        let mut guard = self.lock();
        let document = &mut *guard;
        match document.writer.as_mut() {
            Some(writer) => {
                if let Err(e) = write(writer, &mut document.open_tests) {
                    self.errors.record(e);
                }
            }
            None if document.finished => self.errors.record(ReportError::Closed),
            None => self.errors.record(ReportError::NotStarted),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for XmlReporter {
    fn begin(
        &self,
        bundles: &[BundleDescriptor],
        tree: &TestTree,
        real_count: usize,
    ) -> Result<(), ReportError> {
        let mut document = self.lock();
        let target = document.target.take().ok_or(ReportError::AlreadyStarted)?;

        let sink: Sink = match target {
            Target::Path(path) => {
                debug!("Writing XML report to {}", path.display());
                Box::new(BufWriter::new(File::create(&path)?))
            }
            Target::Writer(writer) => writer,
        };

        let mut writer = Writer::new(sink);
        if let Err(e) = write_header(&mut writer, bundles, &SessionClock::start()) {
            self.errors.record(e);
        }
        document.writer = Some(writer);

        debug!("XML report started: {} node(s), {} test(s)", tree.len(), real_count);
        Ok(())
    }

    fn start_test(&self, node: &TestNode) {
        let (name, class) = node.name_and_class();
        self.write(|writer, open| {
            let start = BytesStart::new(ELEM_TEST)
                .with_attributes([(ATTR_NAME, name), (ATTR_CLASS, class)]);
            writer.write_event(Event::Start(start))?;
            open.push(node.id());
            Ok(())
        });
    }

    fn end_test(&self, node: &TestNode) {
        self.write(|writer, open| {
            let Some(innermost) = open.pop() else {
                return Err(ReportError::Unbalanced(node.id()));
            };
            if innermost != node.id() {
                debug!(
                    "Closing test {} while test {} is innermost open",
                    node.id(),
                    innermost
                );
            }
            writer.write_event(Event::End(BytesEnd::new(ELEM_TEST)))?;
            Ok(())
        });
    }

    fn add_error(&self, node: &TestNode, error: &ErrorInfo) {
        let kind = error.header();
        self.write(|writer, _| {
            let start = BytesStart::new(ELEM_ERROR)
                .with_attributes([(ATTR_NAME, node.name()), (ATTR_TYPE, kind.as_str())]);
            write_problem(writer, start, ELEM_ERROR, &error.render())
        });
    }

    fn add_failure(&self, node: &TestNode, failure: &ErrorInfo) {
        let message = failure.message.as_deref().unwrap_or("");
        self.write(|writer, _| {
            let start = BytesStart::new(ELEM_FAILURE).with_attributes([
                (ATTR_NAME, node.name()),
                (ATTR_TYPE, failure.kind.as_str()),
                (ATTR_MESSAGE, message),
            ]);
            write_problem(writer, start, ELEM_FAILURE, &failure.render())
        });
    }

    fn aborted(&self) -> Vec<ReportError> {
        self.write(|writer, open| {
            close_open_tests(writer, open)?;
            writer.write_event(Event::Empty(BytesStart::new(ELEM_ABORTED)))?;
            Ok(())
        });
        debug!("XML report marked as aborted");
        self.errors.drain()
    }

    fn end(&self) -> Vec<ReportError> {
        let mut document = self.lock();
        match document.writer.take() {
            Some(mut writer) => {
                if let Err(e) = close_document(&mut writer, &mut document.open_tests) {
                    self.errors.record(e);
                }
                if let Err(e) = writer.into_inner().flush() {
                    self.errors.record(e);
                }
                document.finished = true;
                debug!("XML report finished");
            }
            None if document.finished => {}
            None => {
                document.target = None;
                document.finished = true;
                self.errors.record(ReportError::NotStarted);
            }
        }
        drop(document);

        self.errors.drain()
    }
}

fn write_header(
    writer: &mut Writer<Sink>,
    bundles: &[BundleDescriptor],
    clock: &SessionClock,
) -> Result<(), ReportError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let time = clock.timestamp();
    let root = BytesStart::new(ELEM_TESTREPORT).with_attributes([(ATTR_TIME, time.as_str())]);
    writer.write_event(Event::Start(root))?;

    for bundle in bundles {
        let modified = bundle.last_modified.to_string();
        let state = bundle.state.to_string();
        let id = bundle.id.to_string();
        let element = BytesStart::new(ELEM_BUNDLE).with_attributes([
            ("location", bundle.location.as_str()),
            ("modified", modified.as_str()),
            ("state", state.as_str()),
            ("id", id.as_str()),
            ("bsn", bundle.symbolic_name.as_str()),
            ("version", bundle.version.as_deref().unwrap_or("")),
        ]);
        writer.write_event(Event::Empty(element))?;
    }

    Ok(())
}

fn write_problem(
    writer: &mut Writer<Sink>,
    start: BytesStart<'_>,
    element: &str,
    trace: &str,
) -> Result<(), ReportError> {
    writer.write_event(Event::Start(start))?;
    write_cdata(writer, trace)?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

/// Write `text` as CDATA, splitting sections around any `]]>` it contains
fn write_cdata(writer: &mut Writer<Sink>, text: &str) -> Result<(), ReportError> {
    let mut rest = text;
    while let Some(pos) = rest.find("]]>") {
        let (head, tail) = rest.split_at(pos + 2);
        writer.write_event(Event::CData(BytesCData::new(head)))?;
        rest = tail;
    }
    writer.write_event(Event::CData(BytesCData::new(rest)))?;
    Ok(())
}

fn close_document(writer: &mut Writer<Sink>, open: &mut Vec<NodeId>) -> Result<(), ReportError> {
    close_open_tests(writer, open)?;
    writer.write_event(Event::End(BytesEnd::new(ELEM_TESTREPORT)))?;
    Ok(())
}

fn close_open_tests(writer: &mut Writer<Sink>, open: &mut Vec<NodeId>) -> Result<(), ReportError> {
    while open.pop().is_some() {
        writer.write_event(Event::End(BytesEnd::new(ELEM_TEST)))?;
    }
    Ok(())
}
