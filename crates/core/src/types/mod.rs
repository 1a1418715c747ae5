//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend identifier of a loyalty profile (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub i64);

impl From<i64> for ProfileId {
    fn from(id: i64) -> Self {
        ProfileId(id)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
