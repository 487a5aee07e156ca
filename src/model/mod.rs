// Model module - test tree, host module snapshot and execution events

pub mod bundle;
pub mod event;
pub mod node;

pub use bundle::BundleDescriptor;
pub use event::{ErrorInfo, ExecutionEvent};
pub use node::{NodeId, NodeSpec, TestNode, TestTree};
