//! sqlgate CLI - Command-line interface for the sqlgate query gateway.
//!
//! This crate provides the `sqlgate` binary, which runs statements and
//! connectivity probes against PostgreSQL, MySQL and SQL Server and prints
//! normalized JSON results.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
