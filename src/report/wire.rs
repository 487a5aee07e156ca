// Line protocol spoken to IDE test views
//
// Every frame is an 8-character key immediately followed by its payload and a
// newline. Stack traces travel as raw lines between %TRACES and %TRACEE.

use crate::error::WireError;
use crate::model::NodeId;
use serde::Serialize;
use std::fmt;

/// Width of every message key
pub const KEY_LEN: usize = 8;

/// Protocol revision announced with the test count
pub const PROTOCOL_VERSION: &str = "v2";

/// A message key, guaranteed to be exactly [`KEY_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey(&'static str);

impl MessageKey {
    /// Panics unless `key` is exactly 8 bytes. A bad key is a bug in the
    /// reporter, not a condition to recover from.
    pub const fn new(key: &'static str) -> Self {
        assert!(key.len() == KEY_LEN, "message key must be 8 characters");
        Self(key)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub const TEST_COUNT: MessageKey = MessageKey::new("%TESTC  ");
pub const TEST_TREE: MessageKey = MessageKey::new("%TSTTREE");
pub const TEST_START: MessageKey = MessageKey::new("%TESTS  ");
pub const TEST_END: MessageKey = MessageKey::new("%TESTE  ");
pub const ERROR: MessageKey = MessageKey::new("%ERROR  ");
pub const FAILED: MessageKey = MessageKey::new("%FAILED ");
pub const TRACE_START: MessageKey = MessageKey::new("%TRACES ");
pub const TRACE_END: MessageKey = MessageKey::new("%TRACEE ");
pub const RUNTIME: MessageKey = MessageKey::new("%RUNTIME");

/// Encode one frame, newline included
pub fn encode_frame(key: MessageKey, payload: &str) -> String {
    let mut line = String::with_capacity(KEY_LEN + payload.len() + 1);
    line.push_str(key.as_str());
    line.push_str(payload);
    line.push('\n');
    line
}

pub fn test_count_payload(count: usize) -> String {
    format!("{} {}", count, PROTOCOL_VERSION)
}

pub fn tree_payload(id: NodeId, name: &str, is_suite: bool, case_count: usize) -> String {
    format!("{},{},{},{}", id, name, is_suite, case_count)
}

pub fn node_payload(id: NodeId, name: &str) -> String {
    format!("{},{}", id, name)
}

/// A decoded line, as seen by a listener.
///
/// Lines that do not start with a known key are only legal inside a trace
/// block; [`FrameDecoder`] tracks that context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    TestCount {
        count: usize,
        version: String,
    },
    Tree {
        index: usize,
        name: String,
        suite: bool,
        cases: usize,
    },
    Started {
        index: usize,
        name: String,
    },
    Ended {
        index: usize,
        name: String,
    },
    Error {
        index: usize,
        name: String,
    },
    Failed {
        index: usize,
        name: String,
    },
    TraceStart,
    TraceLine {
        line: String,
    },
    TraceEnd,
    Runtime {
        millis: u128,
    },
}

impl Frame {
    /// Parse a keyed line (without its newline)
    pub fn parse(line: &str) -> Result<Self, WireError> {
        if line.len() < KEY_LEN || !line.is_char_boundary(KEY_LEN) {
            return Err(WireError::MissingKey(line.to_string()));
        }
        let (key, payload) = line.split_at(KEY_LEN);

        let bad = || WireError::BadPayload {
            key: key.to_string(),
            payload: payload.to_string(),
        };

        match key {
            k if k == TEST_COUNT.as_str() => {
                let (count, version) = payload.split_once(' ').ok_or_else(bad)?;
                Ok(Self::TestCount {
                    count: count.parse().map_err(|_| bad())?,
                    version: version.to_string(),
                })
            }
            k if k == TEST_TREE.as_str() => {
                // Names may contain commas; index is first, flags are last.
                let (index, rest) = payload.split_once(',').ok_or_else(bad)?;
                let mut tail = rest.rsplitn(3, ',');
                let cases = tail.next().ok_or_else(bad)?;
                let suite = tail.next().ok_or_else(bad)?;
                let name = tail.next().ok_or_else(bad)?;
                Ok(Self::Tree {
                    index: index.parse().map_err(|_| bad())?,
                    name: name.to_string(),
                    suite: suite.parse().map_err(|_| bad())?,
                    cases: cases.parse().map_err(|_| bad())?,
                })
            }
            k if k == TEST_START.as_str() => {
                let (index, name) = parse_node(payload).ok_or_else(bad)?;
                Ok(Self::Started { index, name })
            }
            k if k == TEST_END.as_str() => {
                let (index, name) = parse_node(payload).ok_or_else(bad)?;
                Ok(Self::Ended { index, name })
            }
            k if k == ERROR.as_str() => {
                let (index, name) = parse_node(payload).ok_or_else(bad)?;
                Ok(Self::Error { index, name })
            }
            k if k == FAILED.as_str() => {
                let (index, name) = parse_node(payload).ok_or_else(bad)?;
                Ok(Self::Failed { index, name })
            }
            k if k == TRACE_START.as_str() => Ok(Self::TraceStart),
            k if k == TRACE_END.as_str() => Ok(Self::TraceEnd),
            k if k == RUNTIME.as_str() => Ok(Self::Runtime {
                millis: payload.parse().map_err(|_| bad())?,
            }),
            _ => Err(WireError::UnknownKey(key.to_string())),
        }
    }
}

fn parse_node(payload: &str) -> Option<(usize, String)> {
    let (index, name) = payload.split_once(',')?;
    Some((index.parse().ok()?, name.to_string()))
}

/// Stateful line decoder: raw lines inside a trace block become
/// [`Frame::TraceLine`] instead of parse errors.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    in_trace: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, line: &str) -> Result<Frame, WireError> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);

        if self.in_trace {
            if line == TRACE_END.as_str() {
                self.in_trace = false;
                return Ok(Frame::TraceEnd);
            }
            return Ok(Frame::TraceLine {
                line: line.to_string(),
            });
        }

        let frame = Frame::parse(line)?;
        if frame == Frame::TraceStart {
            self.in_trace = true;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(position: usize) -> NodeId {
        NodeId::new(position).unwrap()
    }

    #[test]
    fn test_all_keys_are_eight_chars() {
        for key in [
            TEST_COUNT,
            TEST_TREE,
            TEST_START,
            TEST_END,
            ERROR,
            FAILED,
            TRACE_START,
            TRACE_END,
            RUNTIME,
        ] {
            assert_eq!(key.as_str().len(), KEY_LEN, "{:?}", key);
        }
    }

    #[test]
    #[should_panic(expected = "message key must be 8 characters")]
    fn test_short_key_panics() {
        let _ = MessageKey::new(std::hint::black_box("%TESTC"));
    }

    #[test]
    #[should_panic(expected = "message key must be 8 characters")]
    fn test_long_key_panics() {
        let _ = MessageKey::new(std::hint::black_box("%RUNTIMES"));
    }

    #[test]
    fn test_encode_frames() {
        assert_eq!(
            encode_frame(TEST_COUNT, &test_count_payload(2)),
            "%TESTC  2 v2\n"
        );
        assert_eq!(
            encode_frame(TEST_TREE, &tree_payload(id(1), "testA", false, 1)),
            "%TSTTREE1,testA,false,1\n"
        );
        assert_eq!(
            encode_frame(TEST_START, &node_payload(id(1), "testA")),
            "%TESTS  1,testA\n"
        );
        assert_eq!(encode_frame(TRACE_END, ""), "%TRACEE \n");
    }

    #[test]
    fn test_parse_tree_name_with_commas() {
        let frame = Frame::parse("%TSTTREE3,testSum(a, b),false,1").unwrap();
        assert_eq!(
            frame,
            Frame::Tree {
                index: 3,
                name: "testSum(a, b)".to_string(),
                suite: false,
                cases: 1,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Frame::parse("%TES"),
            Err(WireError::MissingKey("%TES".to_string()))
        );
        assert_eq!(
            Frame::parse("%BOGUS  1,x"),
            Err(WireError::UnknownKey("%BOGUS  ".to_string()))
        );
        assert!(matches!(
            Frame::parse("%TESTS  one,x"),
            Err(WireError::BadPayload { .. })
        ));
        assert!(matches!(
            Frame::parse("%TSTTREE1,name"),
            Err(WireError::BadPayload { .. })
        ));
    }

    #[test]
    fn test_decoder_passes_trace_lines_through() {
        let mut decoder = FrameDecoder::new();
        let lines = [
            "%FAILED 2,testB\n",
            "%TRACES \n",
            "junit.framework.AssertionFailedError: expected 1\n",
            "%TESTS  9,not a frame here\n",
            "\n",
            "%TRACEE \n",
            "%RUNTIME15\n",
        ];
        let frames: Vec<Frame> = lines
            .iter()
            .map(|line| decoder.decode(line).unwrap())
            .collect();

        assert_eq!(
            frames,
            vec![
                Frame::Failed {
                    index: 2,
                    name: "testB".to_string()
                },
                Frame::TraceStart,
                Frame::TraceLine {
                    line: "junit.framework.AssertionFailedError: expected 1".to_string()
                },
                Frame::TraceLine {
                    line: "%TESTS  9,not a frame here".to_string()
                },
                Frame::TraceLine {
                    line: String::new()
                },
                Frame::TraceEnd,
                Frame::Runtime { millis: 15 },
            ]
        );
    }
}
