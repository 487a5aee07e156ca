// Host module snapshot taken once at session start

use serde::{Deserialize, Serialize};

/// Point-in-time description of one loaded module of the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDescriptor {
    pub location: String,

    /// Last modification, milliseconds since the epoch
    #[serde(default)]
    pub last_modified: i64,

    /// Numeric lifecycle state as reported by the host
    #[serde(default)]
    pub state: i32,

    pub id: i64,

    pub symbolic_name: String,

    #[serde(default)]
    pub version: Option<String>,
}
