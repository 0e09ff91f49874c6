//! Common types shared by the REST and stream clients.

pub mod common;
pub mod serde_helpers;

pub use common::*;
