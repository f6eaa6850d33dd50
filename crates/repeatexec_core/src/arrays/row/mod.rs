//! Fixed-layout encoded records.

pub mod batch;
pub mod encoding;
pub mod layout;
