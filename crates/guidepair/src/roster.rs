//! People, event sign-ups and the per-event roster.
//!
//! The roster is read-only to the pairing core. It is rebuilt from storage
//! at session start and only answers "who is this id, in what role, at what
//! pace" questions.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pace::Pace;

/// Opaque identifier for a person (athlete or guide).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PersonId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The part a person plays at an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Needs a guide.
    Athlete,
    /// Runs with an athlete's group.
    Guide,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Athlete => write!(f, "athlete"),
            Self::Guide => write!(f, "guide"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "athlete" => Ok(Self::Athlete),
            "guide" => Ok(Self::Guide),
            other => Err(Error::invalid_value("role", other)),
        }
    }
}

/// RSVP answer on a sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    /// Attending.
    Yes,
    /// Possibly attending.
    Maybe,
    /// Not attending.
    No,
}

impl RsvpStatus {
    /// Whether this sign-up takes part in pairing.
    #[must_use]
    pub fn participates(self, include_maybe: bool) -> bool {
        match self {
            Self::Yes => true,
            Self::Maybe => include_maybe,
            Self::No => false,
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::Maybe => write!(f, "maybe"),
            Self::No => write!(f, "no"),
        }
    }
}

impl FromStr for RsvpStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yes" => Ok(Self::Yes),
            "maybe" => Ok(Self::Maybe),
            "no" => Ok(Self::No),
            other => Err(Error::invalid_value("status", other)),
        }
    }
}

/// A person known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Identifier.
    pub id: PersonId,
    /// Name shown in lists and announcements.
    pub display_name: String,
    /// Global role. An event sign-up may override it.
    pub role: Role,
    /// Usual pace, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<Pace>,
}

/// A person's registration for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUp {
    /// Event being signed up for.
    pub event_id: String,
    /// Who signed up.
    pub person_id: PersonId,
    /// Role at this event.
    pub role: Role,
    /// RSVP answer.
    pub status: RsvpStatus,
}

/// One participant in an event, as the pairing core sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterMember {
    /// Identifier.
    pub id: PersonId,
    /// Name shown in lists and announcements.
    pub display_name: String,
    /// Role at this event (taken from the sign-up).
    pub role: Role,
    /// Pace, if known.
    pub pace: Option<Pace>,
    /// RSVP answer.
    pub status: RsvpStatus,
}

impl RosterMember {
    /// Build a member from a person and their sign-up.
    #[must_use]
    pub fn from_signup(person: &Person, signup: &SignUp) -> Self {
        Self {
            id: person.id.clone(),
            display_name: person.display_name.clone(),
            role: signup.role,
            pace: person.pace,
            status: signup.status,
        }
    }

    /// Convenience constructor used by tests and the in-memory gateway.
    #[must_use]
    pub fn new(id: impl Into<PersonId>, display_name: &str, role: Role, pace: Option<Pace>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.to_string(),
            role,
            pace,
            status: RsvpStatus::Yes,
        }
    }

    /// Same member with a different RSVP answer.
    #[must_use]
    pub fn with_status(mut self, status: RsvpStatus) -> Self {
        self.status = status;
        self
    }
}

/// Everyone signed up for one event.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<RosterMember>,
    index: HashMap<PersonId, usize>,
    include_maybe: bool,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Roster {
    /// Build a roster in which `yes` and `maybe` sign-ups participate.
    #[must_use]
    pub fn new(members: Vec<RosterMember>) -> Self {
        Self::with_maybe(members, true)
    }

    /// Build a roster, choosing whether `maybe` sign-ups participate.
    ///
    /// A later member with the same id replaces an earlier one.
    #[must_use]
    pub fn with_maybe(members: Vec<RosterMember>, include_maybe: bool) -> Self {
        let mut roster = Self {
            members: Vec::with_capacity(members.len()),
            index: HashMap::new(),
            include_maybe,
        };
        for member in members {
            if let Some(&slot) = roster.index.get(&member.id) {
                roster.members[slot] = member;
            } else {
                roster.index.insert(member.id.clone(), roster.members.len());
                roster.members.push(member);
            }
        }
        roster
    }

    /// Look up any member, participating or not.
    #[must_use]
    pub fn get(&self, id: &PersonId) -> Option<&RosterMember> {
        self.index.get(id).map(|&i| &self.members[i])
    }

    /// Look up a member who takes part in pairing.
    #[must_use]
    pub fn participant(&self, id: &PersonId) -> Option<&RosterMember> {
        self.get(id).filter(|m| m.status.participates(self.include_maybe))
    }

    /// All members taking part in pairing, in sign-up order.
    pub fn participants(&self) -> impl Iterator<Item = &RosterMember> {
        self.members
            .iter()
            .filter(move |m| m.status.participates(self.include_maybe))
    }

    /// Participating members with the given role.
    pub fn participants_with_role(&self, role: Role) -> impl Iterator<Item = &RosterMember> {
        self.participants().filter(move |m| m.role == role)
    }

    /// Display name for an id, falling back to the id itself for stale entries.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a PersonId) -> &'a str {
        self.get(id).map_or(id.as_str(), |m| m.display_name.as_str())
    }

    /// Number of members, participating or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster has no members at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
