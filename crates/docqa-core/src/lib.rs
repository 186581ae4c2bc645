#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! Shared building blocks: errors, configuration, chunking, score fusion and
//! the generation seam.

pub mod chunker;
pub mod config;
pub mod error;
pub mod prompt;
pub mod scoring;
pub mod traits;
pub mod types;
