//! Loyalty profile models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A member's loyalty profile from `GET /loyalty/profiles/`
///
/// Point balance and history as the backend reports them; fields beyond the
/// id and balance are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}
