//! Rank (tier definition) models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A tier definition from `GET /loyalty/ranks/`
///
/// The backend owns this schema. Only the identifying fields are typed;
/// everything else is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Rank {
    /// Look up a backend field that is not modelled explicitly
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
