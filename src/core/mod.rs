//! Core functionality: parsing and index caching

pub mod cache;
pub mod parser;
