//! `guidepair` - Athlete and guide pairing for running events
//!
//! Event organisers pair visually impaired athletes with sighted guides (and
//! occasionally group athletes together) before each run. This library holds
//! the pairing rules: pace compatibility scoring, pairing validation, the
//! click-driven selection flow, sorted roster projections, and the editing
//! session that loads and saves an event's pairing document.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod assignment;
pub mod cli;
pub mod compat;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod pace;
pub mod projector;
pub mod roster;
pub mod selection;
pub mod session;
pub mod storage;
pub mod validator;

pub use assignment::{PairingAssignment, PairingEntry, Removed};
pub use compat::{PaceThresholds, Severity};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{MemoryGateway, PersistenceGateway};
pub use logging::init_logging;
pub use pace::Pace;
pub use projector::{AthleteRow, GuideRow, Projection, RosterProjector, SortDirection};
pub use roster::{Person, PersonId, Role, Roster, RosterMember, RsvpStatus, SignUp};
pub use selection::{Selection, SelectionEvent, SelectionStateMachine};
pub use session::{ClickOutcome, PairingSession, SessionSettings};
pub use storage::{Event, Storage, StorageStats};
pub use validator::{can_pair, Rejection};
