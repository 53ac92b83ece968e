//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::pace::Pace;
use crate::projector::SortDirection;
use crate::roster::{PersonId, Role, RsvpStatus};
use crate::selection::SelectionEvent;

/// Event directory commands.
#[derive(Debug, Subcommand)]
pub enum EventCommand {
    /// Create or rename an event
    Add {
        /// Event identifier
        id: String,

        /// Display name
        name: String,

        /// Day of the event (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List events
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Person directory commands.
#[derive(Debug, Subcommand)]
pub enum PersonCommand {
    /// Create or update a person
    Add {
        /// Person identifier
        id: String,

        /// Display name
        name: String,

        /// Default role
        #[arg(short, long, value_enum)]
        role: RoleArg,

        /// Usual pace per mile (M:SS)
        #[arg(short, long, value_parser = parse_pace)]
        pace: Option<Pace>,
    },
}

/// Sign-up command arguments.
#[derive(Debug, Args)]
pub struct SignupCommand {
    /// Event identifier
    pub event: String,

    /// Person identifier
    pub person: String,

    /// Role for this event
    #[arg(short, long, value_enum)]
    pub role: RoleArg,

    /// RSVP status
    #[arg(short, long, value_enum, default_value = "yes")]
    pub status: StatusArg,
}

/// Roster command arguments.
#[derive(Debug, Args)]
pub struct RosterCommand {
    /// Event identifier
    pub event: String,

    /// Sort direction (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub sort: Option<SortArg>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Arguments shared by `pair` and `unpair`.
#[derive(Debug, Args)]
pub struct PairCommand {
    /// Event identifier
    pub event: String,

    /// Head athlete of the group
    pub target: String,

    /// Guide or athlete joining or leaving the group
    pub candidate: String,
}

/// Select command arguments.
#[derive(Debug, Args)]
pub struct SelectCommand {
    /// Event identifier
    pub event: String,

    /// Clicks to replay: `a:<id>` for an athlete, `g:<id>` for a guide, `esc` to clear
    #[arg(required = true, value_parser = parse_click)]
    pub clicks: Vec<Click>,

    /// Replay without saving
    #[arg(long)]
    pub dry_run: bool,
}

/// Pairings command arguments.
#[derive(Debug, Args)]
pub struct PairingsCommand {
    /// Event identifier
    pub event: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Runs with a guide
    Athlete,
    /// Runs alongside an athlete
    Guide,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Athlete => Role::Athlete,
            RoleArg::Guide => Role::Guide,
        }
    }
}

/// RSVP status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Attending
    Yes,
    /// Possibly attending
    Maybe,
    /// Not attending
    No,
}

impl From<StatusArg> for RsvpStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Yes => RsvpStatus::Yes,
            StatusArg::Maybe => RsvpStatus::Maybe,
            StatusArg::No => RsvpStatus::No,
        }
    }
}

/// Sort direction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Slowest first
    #[value(alias = "asc")]
    Ascending,
    /// Fastest first
    #[value(alias = "desc")]
    Descending,
}

impl From<SortArg> for SortDirection {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Ascending => SortDirection::Ascending,
            SortArg::Descending => SortDirection::Descending,
        }
    }
}

/// One replayed click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Click {
    /// Athlete row clicked.
    Athlete(PersonId),
    /// Guide row clicked.
    Guide(PersonId),
    /// Escape pressed.
    Escape,
}

impl From<Click> for SelectionEvent {
    fn from(click: Click) -> Self {
        match click {
            Click::Athlete(id) => SelectionEvent::AthleteClicked(id),
            Click::Guide(id) => SelectionEvent::GuideClicked(id),
            Click::Escape => SelectionEvent::Cleared,
        }
    }
}

impl FromStr for Click {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("esc") {
            return Ok(Self::Escape);
        }
        match s.split_once(':') {
            Some(("a", id)) if !id.is_empty() => Ok(Self::Athlete(PersonId::new(id))),
            Some(("g", id)) if !id.is_empty() => Ok(Self::Guide(PersonId::new(id))),
            _ => Err(format!("invalid click '{s}': expected a:<id>, g:<id> or esc")),
        }
    }
}

impl fmt::Display for Click {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Athlete(id) => write!(f, "a:{id}"),
            Self::Guide(id) => write!(f, "g:{id}"),
            Self::Escape => write!(f, "esc"),
        }
    }
}

fn parse_click(s: &str) -> Result<Click, String> {
    s.parse()
}

fn parse_pace(s: &str) -> Result<Pace, String> {
    s.parse::<Pace>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(Role::from(RoleArg::Athlete), Role::Athlete);
        assert_eq!(Role::from(RoleArg::Guide), Role::Guide);
    }

    #[test]
    fn test_status_arg_conversion() {
        assert_eq!(RsvpStatus::from(StatusArg::Yes), RsvpStatus::Yes);
        assert_eq!(RsvpStatus::from(StatusArg::Maybe), RsvpStatus::Maybe);
        assert_eq!(RsvpStatus::from(StatusArg::No), RsvpStatus::No);
    }

    #[test]
    fn test_sort_arg_conversion() {
        assert_eq!(SortDirection::from(SortArg::Ascending), SortDirection::Ascending);
        assert_eq!(SortDirection::from(SortArg::Descending), SortDirection::Descending);
    }

    #[test]
    fn test_parse_clicks() {
        assert_eq!("a:A1".parse::<Click>(), Ok(Click::Athlete(PersonId::new("A1"))));
        assert_eq!("g:G1".parse::<Click>(), Ok(Click::Guide(PersonId::new("G1"))));
        assert_eq!("esc".parse::<Click>(), Ok(Click::Escape));
        assert_eq!("ESC".parse::<Click>(), Ok(Click::Escape));
    }

    #[test]
    fn test_parse_click_keeps_colons_in_id() {
        assert_eq!(
            "a:team:7".parse::<Click>(),
            Ok(Click::Athlete(PersonId::new("team:7")))
        );
    }

    #[test]
    fn test_parse_invalid_clicks() {
        assert!("x:A1".parse::<Click>().is_err());
        assert!("a:".parse::<Click>().is_err());
        assert!("A1".parse::<Click>().is_err());
    }

    #[test]
    fn test_click_display() {
        assert_eq!(Click::Athlete(PersonId::new("A1")).to_string(), "a:A1");
        assert_eq!(Click::Escape.to_string(), "esc");
    }

    #[test]
    fn test_click_to_selection_event() {
        assert_eq!(
            SelectionEvent::from(Click::Guide(PersonId::new("G1"))),
            SelectionEvent::GuideClicked(PersonId::new("G1"))
        );
        assert_eq!(SelectionEvent::from(Click::Escape), SelectionEvent::Cleared);
    }

    #[test]
    fn test_parse_pace_arg() {
        assert_eq!(parse_pace("8:30"), Ok(Pace::new(8, 30)));
        assert!(parse_pace("8.5").is_err());
    }
}
