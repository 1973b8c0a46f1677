//! pglens - A typed REST window onto a live Postgres catalog
//!
//! This crate turns catalog metadata into a queryable HTTP surface:
//! - Catalog introspection into an immutable startup snapshot
//! - Per-relation response and filter schema synthesis
//! - Parameterized SQL built from validated filter bodies
//! - REST endpoints for discovery and row queries

pub mod catalog;
pub mod config;
pub mod schema;
pub mod server;
pub mod sql;
