//! Read-only projections of the roster for display.
//!
//! Two lists are derived: athletes that can still be selected (everyone not
//! absorbed into another group) and guides not yet serving any group. Both
//! are sorted by pace, with unknown paces always last.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assignment::PairingAssignment;
use crate::compat::{PaceThresholds, Severity};
use crate::error::{Error, Result};
use crate::pace::Pace;
use crate::roster::{PersonId, Role, Roster, RosterMember};

/// Order in which list rows are sorted by pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Slowest first (largest pace value first).
    Ascending,
    /// Fastest first.
    #[default]
    Descending,
}

impl SortDirection {
    /// The other direction.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn compare(self, a: Option<Pace>, b: Option<Pace>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => match self {
                Self::Ascending => b.total_seconds().cmp(&a.total_seconds()),
                Self::Descending => a.total_seconds().cmp(&b.total_seconds()),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "ascending"),
            Self::Descending => write!(f, "descending"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ascending" | "asc" => Ok(Self::Ascending),
            "descending" | "desc" => Ok(Self::Descending),
            other => Err(Error::invalid_value("sort direction", other)),
        }
    }
}

/// Stable sort of rows by pace in the given direction, unknown paces last.
pub fn sort_by_pace<T>(rows: &mut [T], direction: SortDirection, pace: impl Fn(&T) -> Option<Pace>) {
    rows.sort_by(|a, b| direction.compare(pace(a), pace(b)));
}

/// An athlete that can be selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteRow {
    /// Identifier.
    pub id: PersonId,
    /// Display name.
    pub display_name: String,
    /// Pace, if known.
    pub pace: Option<Pace>,
    /// Guides in this athlete's group.
    pub guides: Vec<PersonId>,
    /// Athletes absorbed into this athlete's group.
    pub athletes: Vec<PersonId>,
    /// Whether this athlete is currently armed.
    pub selected: bool,
    /// Accessible label.
    pub label: String,
}

/// A guide not yet serving any group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideRow {
    /// Identifier.
    pub id: PersonId,
    /// Display name.
    pub display_name: String,
    /// Pace, if known.
    pub pace: Option<Pace>,
    /// Compatibility with the armed athlete; `None` when no athlete is armed.
    pub severity: Severity,
    /// Whether this guide is currently armed.
    pub selected: bool,
    /// Accessible label, including the severity suffix.
    pub label: String,
}

/// Both display lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// Selectable athletes.
    pub athletes: Vec<AthleteRow>,
    /// Unpaired guides.
    pub guides: Vec<GuideRow>,
    /// Sort direction used.
    pub sort: SortDirection,
}

/// Derives display lists from a roster and an assignment.
#[derive(Debug, Clone, Copy)]
pub struct RosterProjector<'a> {
    roster: &'a Roster,
    assignment: &'a PairingAssignment,
    sort: SortDirection,
    thresholds: PaceThresholds,
    armed_athlete: Option<&'a PersonId>,
    armed_guide: Option<&'a PersonId>,
}

impl<'a> RosterProjector<'a> {
    /// A projector over the given state, sorted fastest first.
    #[must_use]
    pub fn new(roster: &'a Roster, assignment: &'a PairingAssignment) -> Self {
        Self {
            roster,
            assignment,
            sort: SortDirection::default(),
            thresholds: PaceThresholds::default(),
            armed_athlete: None,
            armed_guide: None,
        }
    }

    /// Use the given sort direction.
    #[must_use]
    pub fn sorted(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    /// Use the given compatibility thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: PaceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Mark the currently armed people, used for highlighting and scoring.
    #[must_use]
    pub fn with_selection(
        mut self,
        athlete: Option<&'a PersonId>,
        guide: Option<&'a PersonId>,
    ) -> Self {
        self.armed_athlete = athlete;
        self.armed_guide = guide;
        self
    }

    /// Participating athletes not absorbed into another group.
    #[must_use]
    pub fn athletes_list(&self) -> Vec<AthleteRow> {
        let absorbed = self.assignment.absorbed_athletes();
        let mut rows: Vec<AthleteRow> = self
            .roster
            .participants_with_role(Role::Athlete)
            .filter(|m| !absorbed.contains(&m.id))
            .map(|m| self.athlete_row(m))
            .collect();
        sort_by_pace(&mut rows, self.sort, |row| row.pace);
        rows
    }

    /// Participating guides not listed in any group.
    #[must_use]
    pub fn unpaired_guides_list(&self) -> Vec<GuideRow> {
        let assigned = self.assignment.assigned_guides();
        let armed_pace = self
            .armed_athlete
            .and_then(|id| self.roster.get(id))
            .and_then(|m| m.pace);
        let mut rows: Vec<GuideRow> = self
            .roster
            .participants_with_role(Role::Guide)
            .filter(|m| !assigned.contains(&m.id))
            .map(|m| {
                let severity = if self.armed_athlete.is_some() {
                    self.thresholds.severity(armed_pace, m.pace)
                } else {
                    Severity::None
                };
                GuideRow {
                    id: m.id.clone(),
                    display_name: m.display_name.clone(),
                    pace: m.pace,
                    severity,
                    selected: self.armed_guide == Some(&m.id),
                    label: guide_label(m, severity),
                }
            })
            .collect();
        sort_by_pace(&mut rows, self.sort, |row| row.pace);
        rows
    }

    /// Both lists at once.
    #[must_use]
    pub fn project(&self) -> Projection {
        Projection {
            athletes: self.athletes_list(),
            guides: self.unpaired_guides_list(),
            sort: self.sort,
        }
    }

    fn athlete_row(&self, member: &RosterMember) -> AthleteRow {
        let (guides, athletes) = self
            .assignment
            .entry(&member.id)
            .map(|e| (e.guides.clone(), e.athletes.clone()))
            .unwrap_or_default();

        let mut label = member.display_name.clone();
        if let Some(pace) = member.pace {
            label.push_str(&format!(", pace {pace}"));
        }
        let partners: Vec<&str> = guides
            .iter()
            .chain(athletes.iter())
            .map(|id| self.roster.display_name(id))
            .collect();
        if partners.is_empty() {
            label.push_str(", unpaired");
        } else {
            label.push_str(&format!(", paired with {}", partners.join(", ")));
        }

        AthleteRow {
            id: member.id.clone(),
            display_name: member.display_name.clone(),
            pace: member.pace,
            guides,
            athletes,
            selected: self.armed_athlete == Some(&member.id),
            label,
        }
    }
}

fn guide_label(member: &RosterMember, severity: Severity) -> String {
    let mut label = member.display_name.clone();
    if let Some(pace) = member.pace {
        label.push_str(&format!(", pace {pace}"));
    }
    if let Some(suffix) = severity.label_suffix() {
        label.push_str(", ");
        label.push_str(suffix);
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::PairingEntry;
    use crate::roster::RsvpStatus;

    fn id(s: &str) -> PersonId {
        PersonId::new(s)
    }

    fn ids<T>(rows: &[T], get: impl Fn(&T) -> &PersonId) -> Vec<String> {
        rows.iter().map(|r| get(r).to_string()).collect()
    }

    #[test]
    fn test_sort_with_missing_pace() {
        let roster = Roster::new(vec![
            RosterMember::new("A", "A", Role::Athlete, Some(Pace::new(8, 0))),
            RosterMember::new("B", "B", Role::Athlete, None),
            RosterMember::new("C", "C", Role::Athlete, Some(Pace::new(7, 0))),
        ]);
        let pairings = PairingAssignment::new();
        let projector = RosterProjector::new(&roster, &pairings);

        let fastest_first = projector.sorted(SortDirection::Descending).athletes_list();
        assert_eq!(ids(&fastest_first, |r| &r.id), ["C", "A", "B"]);

        let slowest_first = projector.sorted(SortDirection::Ascending).athletes_list();
        assert_eq!(ids(&slowest_first, |r| &r.id), ["A", "C", "B"]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut rows = vec![
            ("x", None),
            ("y", Some(Pace::new(9, 0))),
            ("z", None),
            ("w", Some(Pace::new(9, 0))),
        ];
        sort_by_pace(&mut rows, SortDirection::Descending, |r| r.1);
        let order: Vec<_> = rows.iter().map(|r| r.0).collect();
        assert_eq!(order, ["y", "w", "x", "z"]);
    }

    #[test]
    fn test_absorbed_athletes_hidden() {
        let roster = Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, None),
            RosterMember::new("a2", "Alan", Role::Athlete, None),
            RosterMember::new("a3", "Barbara", Role::Athlete, None),
        ]);
        let pairings: PairingAssignment = [(
            id("a2"),
            PairingEntry {
                guides: vec![],
                athletes: vec![id("a3")],
            },
        )]
        .into_iter()
        .collect();

        let rows = RosterProjector::new(&roster, &pairings).athletes_list();
        assert_eq!(ids(&rows, |r| &r.id), ["a1", "a2"]);
        assert_eq!(rows[1].athletes, vec![id("a3")]);
        assert_eq!(rows[1].label, "Alan, paired with Barbara");
        assert_eq!(rows[0].label, "Ada, unpaired");
    }

    #[test]
    fn test_paired_guides_hidden() {
        let roster = Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, None),
            RosterMember::new("g1", "Grace", Role::Guide, None),
            RosterMember::new("g2", "Edsger", Role::Guide, None),
        ]);
        let pairings: PairingAssignment = [(
            id("a1"),
            PairingEntry {
                guides: vec![id("g1")],
                athletes: vec![],
            },
        )]
        .into_iter()
        .collect();

        let guides = RosterProjector::new(&roster, &pairings).unpaired_guides_list();
        assert_eq!(ids(&guides, |r| &r.id), ["g2"]);
    }

    #[test]
    fn test_non_participants_excluded() {
        let roster = Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, None),
            RosterMember::new("a2", "Alan", Role::Athlete, None).with_status(RsvpStatus::No),
            RosterMember::new("g1", "Grace", Role::Guide, None).with_status(RsvpStatus::Maybe),
        ]);
        let pairings = PairingAssignment::new();
        let projection = RosterProjector::new(&roster, &pairings).project();
        assert_eq!(ids(&projection.athletes, |r| &r.id), ["a1"]);
        assert_eq!(ids(&projection.guides, |r| &r.id), ["g1"]);
    }

    #[test]
    fn test_guide_severity_against_armed_athlete() {
        let roster = Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, Some(Pace::new(9, 0))),
            RosterMember::new("g1", "Grace", Role::Guide, Some(Pace::new(9, 30))),
            RosterMember::new("g2", "Edsger", Role::Guide, Some(Pace::new(10, 0))),
            RosterMember::new("g3", "Linus", Role::Guide, Some(Pace::new(8, 0))),
        ]);
        let pairings = PairingAssignment::new();
        let armed = id("a1");

        let idle = RosterProjector::new(&roster, &pairings).unpaired_guides_list();
        assert!(idle.iter().all(|g| g.severity == Severity::None));

        let guides = RosterProjector::new(&roster, &pairings)
            .with_selection(Some(&armed), None)
            .unpaired_guides_list();
        let by_id = |s: &str| guides.iter().find(|g| g.id == id(s)).unwrap();
        assert_eq!(by_id("g1").severity, Severity::Slight);
        assert_eq!(by_id("g1").label, "Grace, pace 9:30, slightly slower pace");
        assert_eq!(by_id("g2").severity, Severity::Significant);
        assert_eq!(by_id("g3").severity, Severity::None);
        assert_eq!(by_id("g3").label, "Linus, pace 8:00");
    }

    #[test]
    fn test_selected_flags() {
        let roster = Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, None),
            RosterMember::new("g1", "Grace", Role::Guide, None),
        ]);
        let pairings = PairingAssignment::new();
        let guide = id("g1");
        let projection = RosterProjector::new(&roster, &pairings)
            .with_selection(None, Some(&guide))
            .project();
        assert!(!projection.athletes[0].selected);
        assert!(projection.guides[0].selected);
    }

    #[test]
    fn test_sort_direction_parse_and_toggle() {
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Ascending);
        assert_eq!(
            "descending".parse::<SortDirection>().unwrap(),
            SortDirection::Descending
        );
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
        assert_eq!(SortDirection::default(), SortDirection::Descending);
    }
}
