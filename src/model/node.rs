// Test nodes and the flattened tree announced at session start

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a node: its 1-based position in the flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct NodeId(usize);

impl NodeId {
    /// Handle for the node at 1-based `position`. Position 0 is never valid.
    pub fn new(position: usize) -> Option<Self> {
        (position > 0).then_some(Self(position))
    }

    /// The 1-based position used on the wire
    pub fn position(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for NodeId {
    type Error = String;

    fn try_from(position: usize) -> Result<Self, Self::Error> {
        Self::new(position).ok_or_else(|| "node positions start at 1".to_string())
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Description of a node before it is placed into a tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,

    #[serde(default)]
    pub suite: bool,

    /// Number of leaf tests below this node (1 for a leaf)
    #[serde(default = "default_cases")]
    pub cases: usize,
}

fn default_cases() -> usize {
    1
}

impl NodeSpec {
    pub fn case(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suite: false,
            cases: 1,
        }
    }

    pub fn suite(name: impl Into<String>, cases: usize) -> Self {
        Self {
            name: name.into(),
            suite: true,
            cases,
        }
    }
}

/// One test or suite, immutable for the whole session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    id: NodeId,
    name: String,
    is_suite: bool,
    case_count: usize,
}

impl TestNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_suite(&self) -> bool {
        self.is_suite
    }

    pub fn case_count(&self) -> usize {
        self.case_count
    }

    /// Split a display name of the form `name(class)`.
    ///
    /// Names without a trailing `(...)`, or starting with `(`, are returned
    /// whole with an empty class.
    pub fn name_and_class(&self) -> (&str, &str) {
        let full = self.name.as_str();
        match full.find('(') {
            Some(open) if open > 0 && full.ends_with(')') => {
                (&full[..open], &full[open + 1..full.len() - 1])
            }
            _ => (full, ""),
        }
    }
}

impl fmt::Display for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The flattened test tree: every suite and test of a run in announcement order.
///
/// Ids are assigned once at construction, so resolving a node for an event is
/// an index operation rather than a search by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestTree {
    nodes: Vec<TestNode>,
}

impl TestTree {
    pub fn new<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = NodeSpec>,
    {
        let nodes = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| TestNode {
                id: NodeId(index + 1),
                name: spec.name,
                is_suite: spec.suite,
                case_count: spec.cases,
            })
            .collect();

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&TestNode> {
        id.0.checked_sub(1).and_then(|index| self.nodes.get(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestNode> {
        self.nodes.iter()
    }

    /// Number of executable tests in the run
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| !node.is_suite)
            .map(|node| node.case_count)
            .sum()
    }
}

impl<'a> IntoIterator for &'a TestTree {
    type Item = &'a TestNode;
    type IntoIter = std::slice::Iter<'a, TestNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
