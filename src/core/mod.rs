//! Core compiler pipeline.

pub mod builder;
pub mod codegen;
pub mod emit;
pub mod error;
pub mod expression;
pub mod manifest;
pub mod resolver;
pub mod template;
pub mod types;
