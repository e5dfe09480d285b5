//! Implementation of the `drop_gen` generator that scans C headers for
//! structs tagged with a reflection marker member and produces a C source
//! file with field metadata for each of them.
//!
//! A struct opts in by embedding a `struct drop_meta_type_s` member whose
//! name is the owner struct's name followed by `_meta`. The generator
//! parses every matched header with libclang, resolves field types
//! through direct struct typedefs and renders the collected data through
//! a user-supplied template.

pub mod c_decl;
pub mod c_parser;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod drop_data;
pub mod errors;
pub mod extract;
pub mod file_utils;
pub mod generator;
pub mod render;
pub mod scan;

#[cfg(test)]
mod tests;
