//! Integration test support.

pub mod common;
