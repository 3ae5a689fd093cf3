//! Shared helpers for pipeline steps.

pub mod archive;
pub mod checksum;
pub mod fs;
pub mod http;
