//! Materialization of recurring event series into concrete instance rows.
//!
//! The flow is `scheduler` driving `materializer` over a `store`: the
//! scheduler picks the window and fans out across series, the materializer
//! expands one series and writes the instances that are missing, and the
//! store hides whether rows live in Postgres or in memory.

pub mod error;
pub mod materializer;
pub mod scheduler;
pub mod store;
