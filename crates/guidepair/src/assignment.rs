//! The pairing assignment for one event.
//!
//! An assignment maps a "head" athlete to the guides and athletes grouped
//! under them. It is loaded whole, mutated locally through validated
//! operations, and written back whole.
//!
//! # Invariants
//!
//! After every mutation:
//!
//! - an athlete absorbed into another group has no entry of its own;
//! - no id appears in more than one member list (so a guide serves one
//!   group at a time);
//! - no entry lists its own head;
//! - removing the last member of a group deletes the group.
//!
//! Empty entries can still exist as placeholders for athletes released from
//! another group. They carry no pairing information, are ignored by
//! equality, and are dropped when the assignment is persisted.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::Result;
use crate::roster::{PersonId, Role, Roster};
use crate::validator::{can_pair, Rejection};

/// The members grouped under one head athlete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingEntry {
    /// Guides running with this group.
    #[serde(default)]
    pub guides: Vec<PersonId>,
    /// Other athletes absorbed into this group.
    #[serde(default)]
    pub athletes: Vec<PersonId>,
}

impl PairingEntry {
    /// Whether the entry has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guides.is_empty() && self.athletes.is_empty()
    }

    /// Whether the id is listed in either member list.
    #[must_use]
    pub fn contains(&self, id: &PersonId) -> bool {
        self.guides.contains(id) || self.athletes.contains(id)
    }

    /// Every member, guides first.
    pub fn members(&self) -> impl Iterator<Item = &PersonId> {
        self.guides.iter().chain(self.athletes.iter())
    }

    fn member_count(&self) -> usize {
        self.guides.len() + self.athletes.len()
    }
}

/// What a successful removal took out of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    /// A guide was released.
    Guide,
    /// An absorbed athlete was released and is independent again.
    Athlete,
    /// The candidate was not in the target's group; nothing changed.
    Nothing,
}

/// A broken assignment invariant, reported by [`PairingAssignment::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An absorbed athlete still has a non-empty entry of its own.
    #[error("athlete {athlete} is grouped under {head} but still heads a group")]
    AbsorbedHeadsGroup {
        /// The absorbed athlete.
        athlete: PersonId,
        /// The group it was absorbed into.
        head: PersonId,
    },
    /// An absorbed athlete still has an entry at all.
    #[error("athlete {athlete} is grouped under {head} but still has its own entry")]
    AbsorbedHasEntry {
        /// The absorbed athlete.
        athlete: PersonId,
        /// The group it was absorbed into.
        head: PersonId,
    },
    /// An id is listed more than once across all member lists.
    #[error("{id} is assigned more than once")]
    DoubleAssignment {
        /// The repeated id.
        id: PersonId,
    },
    /// A group lists its own head.
    #[error("{id} is paired with itself")]
    SelfPairing {
        /// The head athlete.
        id: PersonId,
    },
    /// A listed id has the wrong role for the list it is in.
    #[error("{id} is listed as a {listed_as} but signed up as a {role}")]
    RoleMismatch {
        /// The misplaced id.
        id: PersonId,
        /// Which list it appears in.
        listed_as: Role,
        /// Its role on the roster.
        role: Role,
    },
}

/// Pairings for one event, keyed by head athlete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairingAssignment {
    entries: BTreeMap<PersonId, PairingEntry>,
}

impl PairingAssignment {
    /// An assignment with no pairings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted `pairings` document.
    ///
    /// An empty string or `null` is treated as "no pairings yet".
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON of the expected shape.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let parsed: Option<Self> = serde_json::from_str(json)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Render the persisted `pairings` document, without placeholder entries.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.normalized())?)
    }

    /// Copy with empty placeholder entries dropped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(_, entry)| !entry.is_empty())
                .map(|(head, entry)| (head.clone(), entry.clone()))
                .collect(),
        }
    }

    /// BLAKE3 fingerprint of the pairings, independent of member order.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (head, (guides, athletes)) in self.canonical() {
            hasher.update(head.as_str().as_bytes());
            hasher.update(b"\0g");
            for guide in guides {
                hasher.update(guide.as_str().as_bytes());
                hasher.update(b"\0");
            }
            hasher.update(b"\0a");
            for athlete in athletes {
                hasher.update(athlete.as_str().as_bytes());
                hasher.update(b"\0");
            }
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// The entry headed by `head`, if any.
    #[must_use]
    pub fn entry(&self, head: &PersonId) -> Option<&PairingEntry> {
        self.entries.get(head)
    }

    /// All entries, including placeholders, in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&PersonId, &PairingEntry)> {
        self.entries.iter()
    }

    /// Number of groups that actually have members.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_empty()).count()
    }

    /// Whether there are no pairings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.group_count() == 0
    }

    /// Whether `target`'s group already lists `candidate`.
    #[must_use]
    pub fn contains_pair(&self, target: &PersonId, candidate: &PersonId) -> bool {
        self.entries
            .get(target)
            .is_some_and(|entry| entry.contains(candidate))
    }

    /// Whether the athlete heads a group with at least one member.
    #[must_use]
    pub fn has_own_pairings(&self, athlete: &PersonId) -> bool {
        self.entries.get(athlete).is_some_and(|e| !e.is_empty())
    }

    /// The head of the group whose guides include `guide`.
    #[must_use]
    pub fn guide_head(&self, guide: &PersonId) -> Option<&PersonId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.guides.contains(guide))
            .map(|(head, _)| head)
    }

    /// The head of the group that absorbed `athlete`.
    #[must_use]
    pub fn absorbing_head(&self, athlete: &PersonId) -> Option<&PersonId> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.athletes.contains(athlete))
            .map(|(head, _)| head)
    }

    /// The head of any group listing `id` as a member, excluding `except`.
    #[must_use]
    pub fn member_of_other(&self, id: &PersonId, except: &PersonId) -> Option<&PersonId> {
        self.entries
            .iter()
            .find(|(head, entry)| *head != except && entry.contains(id))
            .map(|(head, _)| head)
    }

    /// Every id currently assigned as a guide.
    #[must_use]
    pub fn assigned_guides(&self) -> BTreeSet<&PersonId> {
        self.entries.values().flat_map(|e| e.guides.iter()).collect()
    }

    /// Every athlete currently absorbed into another group.
    #[must_use]
    pub fn absorbed_athletes(&self) -> BTreeSet<&PersonId> {
        self.entries
            .values()
            .flat_map(|e| e.athletes.iter())
            .collect()
    }

    /// Validate and apply a pairing of `candidate` into `target`'s group.
    ///
    /// An athlete candidate loses its own (necessarily empty) entry: it is
    /// absorbed into the target's group.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] if the pairing is not allowed. The
    /// assignment is unchanged in that case.
    pub fn create_pairing(
        &mut self,
        target: &PersonId,
        candidate: &PersonId,
        roster: &Roster,
    ) -> std::result::Result<Role, Rejection> {
        let role = can_pair(target, candidate, self, roster)?;

        let entry = match role {
            Role::Guide => {
                let entry = self.entries.entry(target.clone()).or_default();
                entry.guides.push(candidate.clone());
                entry
            }
            Role::Athlete => {
                if self.entries.remove(candidate).is_some() {
                    debug!(athlete = %candidate, head = %target, "Absorbing athlete entry");
                }
                let entry = self.entries.entry(target.clone()).or_default();
                entry.athletes.push(candidate.clone());
                entry
            }
        };

        debug!(
            target = %target,
            candidate = %candidate,
            role = %role,
            members = entry.member_count(),
            "Pairing created"
        );
        Ok(role)
    }

    /// Remove `candidate` from `target`'s group.
    ///
    /// A released athlete gets an empty placeholder entry so it lists as an
    /// independent athlete again. A group left with no members is deleted.
    /// Removing a candidate that is not in the group is a no-op.
    pub fn remove_pairing(&mut self, target: &PersonId, candidate: &PersonId) -> Removed {
        let Some(entry) = self.entries.get_mut(target) else {
            return Removed::Nothing;
        };

        let removed = if let Some(pos) = entry.guides.iter().position(|g| g == candidate) {
            entry.guides.remove(pos);
            Removed::Guide
        } else if let Some(pos) = entry.athletes.iter().position(|a| a == candidate) {
            entry.athletes.remove(pos);
            Removed::Athlete
        } else {
            return Removed::Nothing;
        };

        if entry.is_empty() {
            self.entries.remove(target);
            debug!(head = %target, "Group emptied and deleted");
        }

        if removed == Removed::Athlete {
            self.entries.entry(candidate.clone()).or_default();
        }

        debug!(target = %target, candidate = %candidate, ?removed, "Pairing removed");
        removed
    }

    /// Check every assignment invariant, plus role consistency against the roster.
    ///
    /// Ids unknown to the roster are not role-checked; stale ids are expected.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self, roster: &Roster) -> std::result::Result<(), InvariantViolation> {
        let mut seen: BTreeSet<&PersonId> = BTreeSet::new();

        for (head, entry) in &self.entries {
            if entry.contains(head) {
                return Err(InvariantViolation::SelfPairing { id: head.clone() });
            }

            for id in entry.members() {
                if !seen.insert(id) {
                    return Err(InvariantViolation::DoubleAssignment { id: id.clone() });
                }
            }

            for (list, listed_as) in [(&entry.guides, Role::Guide), (&entry.athletes, Role::Athlete)] {
                for id in list {
                    if let Some(member) = roster.get(id) {
                        if member.role != listed_as {
                            return Err(InvariantViolation::RoleMismatch {
                                id: id.clone(),
                                listed_as,
                                role: member.role,
                            });
                        }
                    }
                }
            }

            for athlete in &entry.athletes {
                if let Some(own) = self.entries.get(athlete) {
                    let athlete = athlete.clone();
                    let head = head.clone();
                    return Err(if own.is_empty() {
                        InvariantViolation::AbsorbedHasEntry { athlete, head }
                    } else {
                        InvariantViolation::AbsorbedHeadsGroup { athlete, head }
                    });
                }
            }
        }

        Ok(())
    }

    /// Order-independent view of the non-empty entries.
    fn canonical(&self) -> BTreeMap<&PersonId, (BTreeSet<&PersonId>, BTreeSet<&PersonId>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_empty())
            .map(|(head, entry)| {
                (
                    head,
                    (
                        entry.guides.iter().collect(),
                        entry.athletes.iter().collect(),
                    ),
                )
            })
            .collect()
    }
}

impl PartialEq for PairingAssignment {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for PairingAssignment {}

impl FromIterator<(PersonId, PairingEntry)> for PairingAssignment {
    fn from_iter<I: IntoIterator<Item = (PersonId, PairingEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pace::Pace;
    use crate::roster::RosterMember;

    fn id(s: &str) -> PersonId {
        PersonId::new(s)
    }

    fn roster() -> Roster {
        Roster::new(vec![
            RosterMember::new("a1", "Ada", Role::Athlete, Some(Pace::new(8, 0))),
            RosterMember::new("a2", "Alan", Role::Athlete, Some(Pace::new(9, 0))),
            RosterMember::new("a3", "Barbara", Role::Athlete, None),
            RosterMember::new("g1", "Grace", Role::Guide, Some(Pace::new(8, 30))),
            RosterMember::new("g2", "Edsger", Role::Guide, None),
        ])
    }

    fn entry(guides: &[&str], athletes: &[&str]) -> PairingEntry {
        PairingEntry {
            guides: guides.iter().map(|s| id(s)).collect(),
            athletes: athletes.iter().map(|s| id(s)).collect(),
        }
    }

    #[test]
    fn test_create_guide_pairing() {
        let roster = roster();
        let mut pairings = PairingAssignment::new();

        let role = pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap();
        assert_eq!(role, Role::Guide);
        assert_eq!(pairings.entry(&id("a1")), Some(&entry(&["g1"], &[])));
        assert_eq!(pairings.guide_head(&id("g1")), Some(&id("a1")));
        assert!(pairings.check_invariants(&roster).is_ok());
    }

    #[test]
    fn test_create_athlete_pairing_absorbs_entry() {
        let roster = roster();
        let mut pairings: PairingAssignment =
            [(id("a3"), PairingEntry::default())].into_iter().collect();

        let role = pairings.create_pairing(&id("a2"), &id("a3"), &roster).unwrap();
        assert_eq!(role, Role::Athlete);
        assert!(pairings.entry(&id("a3")).is_none());
        assert_eq!(pairings.absorbing_head(&id("a3")), Some(&id("a2")));
        assert!(pairings.check_invariants(&roster).is_ok());
    }

    #[test]
    fn test_rejected_pairing_leaves_assignment_untouched() {
        let roster = roster();
        let mut pairings = PairingAssignment::new();
        pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap();
        let before = pairings.clone();

        let err = pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap_err();
        assert_eq!(err, Rejection::AlreadyPaired);
        assert_eq!(pairings, before);
    }

    #[test]
    fn test_remove_guide_deletes_empty_group() {
        let roster = roster();
        let mut pairings = PairingAssignment::new();
        pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap();

        assert_eq!(pairings.remove_pairing(&id("a1"), &id("g1")), Removed::Guide);
        assert!(pairings.entry(&id("a1")).is_none());
        assert!(pairings.is_empty());
    }

    #[test]
    fn test_remove_athlete_restores_placeholder() {
        let roster = roster();
        let mut pairings = PairingAssignment::new();
        pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap();
        pairings.create_pairing(&id("a1"), &id("a2"), &roster).unwrap();

        assert_eq!(pairings.remove_pairing(&id("a1"), &id("a2")), Removed::Athlete);
        assert_eq!(pairings.entry(&id("a2")), Some(&PairingEntry::default()));
        assert_eq!(pairings.entry(&id("a1")), Some(&entry(&["g1"], &[])));
        assert!(pairings.absorbing_head(&id("a2")).is_none());
        assert!(pairings.check_invariants(&roster).is_ok());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let roster = roster();
        let mut pairings = PairingAssignment::new();
        pairings.create_pairing(&id("a1"), &id("g1"), &roster).unwrap();
        pairings.create_pairing(&id("a2"), &id("a3"), &roster).unwrap();

        pairings.remove_pairing(&id("a2"), &id("a3"));
        let once = pairings.clone();
        assert_eq!(pairings.remove_pairing(&id("a2"), &id("a3")), Removed::Nothing);
        assert_eq!(pairings, once);
        assert_eq!(pairings.entries().count(), once.entries().count());
    }

    #[test]
    fn test_remove_from_unknown_group_is_noop() {
        let mut pairings = PairingAssignment::new();
        assert_eq!(pairings.remove_pairing(&id("a1"), &id("g1")), Removed::Nothing);
        assert!(pairings.is_empty());
    }

    #[test]
    fn test_equality_ignores_order_and_placeholders() {
        let left: PairingAssignment = [
            (id("a1"), entry(&["g1", "g2"], &[])),
            (id("a3"), PairingEntry::default()),
        ]
        .into_iter()
        .collect();
        let right: PairingAssignment = [(id("a1"), entry(&["g2", "g1"], &[]))]
            .into_iter()
            .collect();
        assert_eq!(left, right);
        assert_eq!(left.fingerprint(), right.fingerprint());

        let different: PairingAssignment = [(id("a1"), entry(&["g1"], &[]))].into_iter().collect();
        assert_ne!(left, different);
        assert_ne!(left.fingerprint(), different.fingerprint());
    }

    #[test]
    fn test_json_round_trip_drops_placeholders() {
        let pairings: PairingAssignment = [
            (id("a1"), entry(&["g1"], &[])),
            (id("a2"), entry(&[], &["a3"])),
            (id("a4"), PairingEntry::default()),
        ]
        .into_iter()
        .collect();

        let json = pairings.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"a1":{"guides":["g1"],"athletes":[]},"a2":{"guides":[],"athletes":["a3"]}}"#
        );
        assert_eq!(PairingAssignment::from_json(&json).unwrap(), pairings);
    }

    #[test]
    fn test_from_json_absent_field() {
        assert!(PairingAssignment::from_json("").unwrap().is_empty());
        assert!(PairingAssignment::from_json("null").unwrap().is_empty());
        assert!(PairingAssignment::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn test_from_json_missing_arrays_default() {
        let pairings = PairingAssignment::from_json(r#"{"a1":{"guides":["g1"]}}"#).unwrap();
        assert_eq!(pairings.entry(&id("a1")), Some(&entry(&["g1"], &[])));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(PairingAssignment::from_json("[1,2,3]").is_err());
    }

    #[test]
    fn test_check_invariants_detects_violations() {
        let roster = roster();

        let double: PairingAssignment = [
            (id("a1"), entry(&["g1"], &[])),
            (id("a2"), entry(&["g1"], &[])),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            double.check_invariants(&roster),
            Err(InvariantViolation::DoubleAssignment { id: id("g1") })
        );

        let selfish: PairingAssignment = [(id("a1"), entry(&[], &["a1"]))].into_iter().collect();
        assert!(matches!(
            selfish.check_invariants(&roster),
            Err(InvariantViolation::SelfPairing { .. })
        ));

        let absorbed_head: PairingAssignment = [
            (id("a1"), entry(&[], &["a2"])),
            (id("a2"), entry(&["g1"], &[])),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            absorbed_head.check_invariants(&roster),
            Err(InvariantViolation::AbsorbedHeadsGroup { .. })
        ));

        let wrong_list: PairingAssignment = [(id("a1"), entry(&["a2"], &[]))].into_iter().collect();
        assert!(matches!(
            wrong_list.check_invariants(&roster),
            Err(InvariantViolation::RoleMismatch { .. })
        ));
    }

    #[test]
    fn test_assigned_and_absorbed_sets() {
        let pairings: PairingAssignment = [
            (id("a1"), entry(&["g1"], &[])),
            (id("a2"), entry(&["g2"], &["a3"])),
        ]
        .into_iter()
        .collect();
        let guides = pairings.assigned_guides();
        assert!(guides.contains(&id("g1")) && guides.contains(&id("g2")));
        assert_eq!(pairings.absorbed_athletes().len(), 1);
        assert_eq!(pairings.member_of_other(&id("a3"), &id("a1")), Some(&id("a2")));
        assert_eq!(pairings.member_of_other(&id("a3"), &id("a2")), None);
        assert_eq!(pairings.group_count(), 2);
    }
}
