//! Library surface of the `assay` binary; split out so wiring and config
//! parsing stay testable.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
