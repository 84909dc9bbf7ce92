//! NEXUS Dupes - semantic duplicate detection for JavaScript and TypeScript
//!
//! Source files are carved into component, hook and function chunks, embedded
//! through a local model and stored as a flat vector index. A lint pass then
//! flags chunks that closely match code elsewhere in the project.

pub mod chunk;
pub mod config;
pub mod core;
pub mod embed;
pub mod index;
pub mod lint;
pub mod search;
