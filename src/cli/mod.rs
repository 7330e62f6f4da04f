//! Command-line interface for interview-coach.
//!
//! One subcommand per view: sign in, list, create, edit, delete, watch,
//! answer and read feedback.

mod commands;

pub use commands::{is_reported, parse_cli, run, run_with_cli, Cli, Commands};
