//! End-to-end tests - The full HTTP stack over a hand-built catalog
//!
//! These tests assemble the real router, middleware and state, then drive
//! it request by request. The pool points at a closed port, so everything
//! up to query execution is exercised for real and execution itself fails
//! fast and predictably. Live-database coverage lives in the integration
//! suite.

mod api_flow_tests;
