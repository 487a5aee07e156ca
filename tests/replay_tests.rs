// Tests for replaying session scripts into both reporters

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use testwire::commands::replay::{SessionScript, replay};
use testwire::report::wire::{Frame, FrameDecoder};
use testwire::{PortReporter, XmlReporter};

const SCRIPT: &str = r#"{
    "bundles": [
        {"location": "System Bundle", "id": 0, "symbolic_name": "org.eclipse.osgi", "state": 32}
    ],
    "nodes": [
        {"name": "AllTests", "suite": true, "cases": 3},
        {"name": "testA(FooTest)"},
        {"name": "testB(FooTest)"},
        {"name": "testC(FooTest)"}
    ],
    "events": [
        {"event": "start", "node": 1},
        {"event": "start", "node": 2},
        {"event": "end", "node": 2},
        {"event": "start", "node": 3},
        {"event": "failure", "node": 3, "kind": "AssertionFailedError", "message": "expected 1", "trace": "\tat FooTest.testB"},
        {"event": "end", "node": 3},
        {"event": "start", "node": 4},
        {"event": "error", "node": 4, "kind": "java.io.IOException"},
        {"event": "end", "node": 4},
        {"event": "end", "node": 1}
    ]
}"#;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn decode(text: &str) -> Vec<Frame> {
    let mut decoder = FrameDecoder::new();
    text.lines().map(|l| decoder.decode(l).unwrap()).collect()
}

#[test]
fn test_replay_sequential_into_port() {
    // Arrange
    let script = SessionScript::parse(SCRIPT).unwrap();
    let capture = Capture::default();
    let reporter = PortReporter::from_streams(io::empty(), capture.clone());

    // Act
    let errors = replay(&reporter, &script, 1).unwrap();

    // Assert
    assert!(errors.is_empty());
    let lines: Vec<String> = capture.text().lines().map(str::to_string).collect();
    assert_eq!(lines[0], "%TESTC  3 v2");
    assert_eq!(lines[1], "%TSTTREE1,AllTests,true,3");
    assert_eq!(lines[5], "%TESTS  1,AllTests");
    assert!(lines.contains(&"%FAILED 3,testB(FooTest)".to_string()));
    assert!(lines.contains(&"%ERROR  4,testC(FooTest)".to_string()));
    assert!(lines.last().unwrap().starts_with("%RUNTIME"));
}

#[test]
fn test_replay_parallel_keeps_frames_whole() {
    // Arrange
    let script = SessionScript::parse(SCRIPT).unwrap();
    let capture = Capture::default();
    let reporter = PortReporter::from_streams(io::empty(), capture.clone());

    // Act
    let errors = replay(&reporter, &script, 4).unwrap();

    // Assert
    assert!(errors.is_empty());
    let frames = decode(&capture.text());
    let started: Vec<usize> = frames
        .iter()
        .filter_map(|f| match f {
            Frame::Started { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 4);
    assert_eq!(started[0], 1);

    let ended: Vec<usize> = frames
        .iter()
        .filter_map(|f| match f {
            Frame::Ended { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(ended.last(), Some(&1));
    assert!(matches!(frames.last(), Some(Frame::Runtime { .. })));
}

#[test]
fn test_replay_aborted_into_xml() {
    // Arrange
    let mut script = SessionScript::parse(SCRIPT).unwrap();
    script.events.truncate(4);
    script.aborted = true;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("report.xml");
    let reporter = XmlReporter::new(&path);

    // Act
    let errors = replay(&reporter, &script, 1).unwrap();

    // Assert
    assert!(errors.is_empty());
    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.contains(r#"<bundle location="System Bundle""#));
    assert!(xml.contains(r#"<test name="testB" class="FooTest"></test></test><aborted/></testreport>"#));
}

#[test]
fn test_replay_reports_unknown_nodes() {
    let script = SessionScript::parse(
        r#"{"nodes": [{"name": "testA"}], "events": [{"event": "start", "node": 5}]}"#,
    )
    .unwrap();
    let reporter = PortReporter::from_streams(io::empty(), Capture::default());

    let errors = replay(&reporter, &script, 1).unwrap();

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], testwire::ReportError::UnknownNode(_)));
}

#[test]
fn test_script_with_node_zero_is_rejected() {
    let result = SessionScript::parse(
        r#"{"nodes": [{"name": "testA"}], "events": [{"event": "start", "node": 0}]}"#,
    );

    let err = result.expect_err("position 0 is not a node");
    assert!(err.to_string().contains("node positions start at 1"), "{}", err);
}
