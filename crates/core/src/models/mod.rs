//! Data models for loyalty program entities

mod adjustment;
mod profile;
mod rank;

pub use adjustment::*;
pub use profile::*;
pub use rank::*;
