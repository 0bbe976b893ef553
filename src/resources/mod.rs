//! Resource families: builder configuration, conversion and JSON outputter.
//!
//! Each family module carries:
//! 1. A configuration record plus its accumulation operations
//! 2. A finalize step resolving sibling references
//! 3. Canonical resource structs and an `arm_json` outputter

pub mod functions;
pub mod insights;
pub mod search;
pub mod sql;
pub mod storage;
pub mod web;
