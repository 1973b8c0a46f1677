//! Unit tests - Schema synthesis and SQL generation without a database
//!
//! These tests drive the public pipeline end to end: hand-built catalog
//! snapshots in, filter schemas and rendered SQL out.

mod synthesis_tests;
mod validation_tests;
