//! Armlet compiles typed resource builders into deployment templates.
//!
//! Builders fold configuration operations, finalize sibling references,
//! convert into canonical resources and assemble one template document.
//! Pure, deterministic and in-memory.

pub mod cli;
pub mod core;
pub mod resources;
