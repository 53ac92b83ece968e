//! Command-line interface for guidepair.
//!
//! This module provides the CLI structure for the `guidepair` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    Click, ConfigCommand, EventCommand, PairCommand, PairingsCommand, PersonCommand, RoleArg,
    RosterCommand, SelectCommand, SignupCommand, SortArg, StatusArg, StatusCommand,
};

use crate::logging::Verbosity;

/// guidepair - Pair athletes with guides for running events
///
/// Keeps each event's sign-ups and pairing document, and applies the same
/// validation rules as the interactive pairing screen.
#[derive(Debug, Parser)]
#[command(name = "guidepair")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage events
    #[command(subcommand)]
    Event(EventCommand),

    /// Manage people
    #[command(subcommand)]
    Person(PersonCommand),

    /// Sign a person up for an event
    Signup(SignupCommand),

    /// Show selectable athletes and unpaired guides
    Roster(RosterCommand),

    /// Add a guide or athlete to an athlete's group
    Pair(PairCommand),

    /// Remove a guide or athlete from an athlete's group
    Unpair(PairCommand),

    /// Replay row clicks through the selection rules
    Select(SelectCommand),

    /// Show an event's stored pairings
    Pairings(PairingsCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            return Verbosity::Quiet;
        }
        match self.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }
}
