//! A single administrator's editing session for one event's pairings.
//!
//! The session owns the live assignment and a baseline snapshot taken at
//! load (or at the last successful save). Unsaved changes are detected by
//! structural comparison of the two. There is no conflict detection: the
//! last session to save wins.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::assignment::{PairingAssignment, Removed};
use crate::compat::PaceThresholds;
use crate::error::Result;
use crate::gateway::PersistenceGateway;
use crate::projector::{AthleteRow, GuideRow, Projection, RosterProjector, SortDirection};
use crate::roster::{PersonId, Role, Roster};
use crate::selection::{Selection, SelectionEvent, SelectionStateMachine, Transition};
use crate::validator::Rejection;

/// Per-session display and scoring settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSettings {
    /// Initial sort direction of both lists.
    pub sort: SortDirection,
    /// Compatibility thresholds for guide highlighting.
    pub thresholds: PaceThresholds,
}

/// Result of a click or an explicit clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A person is now armed.
    Armed {
        /// Who.
        id: PersonId,
        /// Their role.
        role: Role,
    },
    /// The armed person was released.
    Disarmed {
        /// Who.
        id: PersonId,
    },
    /// Selection was cleared.
    Cleared,
    /// A pairing was created.
    Paired {
        /// Head athlete.
        target: PersonId,
        /// Who joined the group.
        candidate: PersonId,
        /// The candidate's role.
        role: Role,
    },
    /// A pairing was attempted and refused. Selection is cleared regardless.
    Rejected {
        /// Head athlete of the attempt.
        target: PersonId,
        /// Who would have joined.
        candidate: PersonId,
        /// Why it was refused.
        reason: Rejection,
    },
}

impl ClickOutcome {
    /// Whether the assignment changed.
    #[must_use]
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::Paired { .. })
    }
}

/// Editing state for one event.
#[derive(Debug, Clone)]
pub struct PairingSession {
    event_id: String,
    roster: Roster,
    live: PairingAssignment,
    baseline: PairingAssignment,
    selection: SelectionStateMachine,
    settings: SessionSettings,
    directory: HashMap<PersonId, String>,
}

impl PairingSession {
    /// Start a session from already-loaded state.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        roster: Roster,
        pairings: PairingAssignment,
        settings: SessionSettings,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            roster,
            baseline: pairings.clone(),
            live: pairings,
            selection: SelectionStateMachine::new(),
            settings,
            directory: HashMap::new(),
        }
    }

    /// Load the roster and stored pairings for an event.
    ///
    /// Ids in the stored pairings that the roster no longer covers are kept
    /// as-is and their names are resolved through the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if either load fails.
    pub async fn load(
        gateway: &dyn PersistenceGateway,
        event_id: &str,
        settings: SessionSettings,
    ) -> Result<Self> {
        let roster = gateway.load_roster(event_id).await?;
        let pairings = gateway.load_pairings(event_id).await?;

        let stale: Vec<PersonId> = pairings
            .entries()
            .flat_map(|(head, entry)| std::iter::once(head).chain(entry.members()))
            .filter(|id| roster.get(id).is_none())
            .cloned()
            .collect();

        let mut session = Self::new(event_id, roster, pairings, settings);
        for id in stale {
            if session.directory.contains_key(&id) {
                continue;
            }
            warn!(event_id, person = %id, "Stored pairing references a person not on the roster");
            if let Some(name) = gateway.display_name(&id).await? {
                session.directory.insert(id, name);
            }
        }

        info!(
            event_id,
            people = session.roster.len(),
            groups = session.live.group_count(),
            "Pairing session loaded"
        );
        Ok(session)
    }

    /// The event being edited.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// The roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The live assignment.
    #[must_use]
    pub fn pairings(&self) -> &PairingAssignment {
        &self.live
    }

    /// The current selection.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        self.selection.state()
    }

    /// Current sort direction.
    #[must_use]
    pub fn sort(&self) -> SortDirection {
        self.settings.sort
    }

    /// Flip the sort direction.
    pub fn toggle_sort(&mut self) -> SortDirection {
        self.settings.sort = self.settings.sort.toggled();
        debug!(sort = %self.settings.sort, "Sort toggled");
        self.settings.sort
    }

    /// Name for an id: roster first, then names resolved at load, then the id.
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a PersonId) -> &'a str {
        if let Some(member) = self.roster.get(id) {
            return &member.display_name;
        }
        self.directory.get(id).map_or(id.as_str(), String::as_str)
    }

    /// An athlete row was clicked.
    pub fn click_athlete(&mut self, id: PersonId) -> ClickOutcome {
        self.handle(SelectionEvent::AthleteClicked(id))
    }

    /// A guide row was clicked.
    pub fn click_guide(&mut self, id: PersonId) -> ClickOutcome {
        self.handle(SelectionEvent::GuideClicked(id))
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) -> ClickOutcome {
        self.handle(SelectionEvent::Cleared)
    }

    /// Feed one selection event through the state machine.
    pub fn handle(&mut self, event: SelectionEvent) -> ClickOutcome {
        match self.selection.handle(event) {
            Transition::Armed { id, role } => ClickOutcome::Armed { id, role },
            Transition::Disarmed { id } => ClickOutcome::Disarmed { id },
            Transition::Cleared => ClickOutcome::Cleared,
            Transition::PairRequested { target, candidate } => {
                match self.create_pairing(&target, &candidate) {
                    Ok(role) => ClickOutcome::Paired {
                        target,
                        candidate,
                        role,
                    },
                    Err(reason) => ClickOutcome::Rejected {
                        target,
                        candidate,
                        reason,
                    },
                }
            }
        }
    }

    /// Validate and apply a pairing. Clears the selection either way.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] if the pairing is not allowed.
    pub fn create_pairing(
        &mut self,
        target: &PersonId,
        candidate: &PersonId,
    ) -> std::result::Result<Role, Rejection> {
        self.selection.clear();
        self.live.create_pairing(target, candidate, &self.roster)
    }

    /// Remove `candidate` from `target`'s group.
    pub fn remove_pairing(&mut self, target: &PersonId, candidate: &PersonId) -> Removed {
        self.live.remove_pairing(target, candidate)
    }

    /// Selectable athletes in the current sort order.
    #[must_use]
    pub fn athletes_list(&self) -> Vec<AthleteRow> {
        self.projector().athletes_list()
    }

    /// Unpaired guides in the current sort order, scored against the armed athlete.
    #[must_use]
    pub fn unpaired_guides_list(&self) -> Vec<GuideRow> {
        self.projector().unpaired_guides_list()
    }

    /// Both lists.
    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projector().project()
    }

    fn projector(&self) -> RosterProjector<'_> {
        RosterProjector::new(&self.roster, &self.live)
            .sorted(self.settings.sort)
            .with_thresholds(self.settings.thresholds)
            .with_selection(self.selection.selected_athlete(), self.selection.selected_guide())
    }

    /// Whether the live assignment differs from the last loaded or saved state.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.live != self.baseline
    }

    /// Throw away local edits and return to the baseline.
    pub fn discard_changes(&mut self) {
        self.live = self.baseline.clone();
        self.selection.clear();
        debug!(event_id = %self.event_id, "Local changes discarded");
    }

    /// Write the live assignment back to storage.
    ///
    /// On success the baseline moves to the saved state. On failure nothing
    /// in the session changes, so the caller can simply retry.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error if the save fails.
    pub async fn save(&mut self, gateway: &dyn PersistenceGateway) -> Result<()> {
        match gateway.save_pairings(&self.event_id, &self.live).await {
            Ok(()) => {
                self.baseline = self.live.clone();
                info!(
                    event_id = %self.event_id,
                    groups = self.live.group_count(),
                    "Pairings saved"
                );
                Ok(())
            }
            Err(err) => {
                warn!(event_id = %self.event_id, error = %err, "Saving pairings failed");
                Err(err)
            }
        }
    }

    /// Human-readable announcement for a click outcome.
    #[must_use]
    pub fn announce(&self, outcome: &ClickOutcome) -> String {
        match outcome {
            ClickOutcome::Armed { id, .. } => format!("{} selected", self.display_name(id)),
            ClickOutcome::Disarmed { id } => format!("{} deselected", self.display_name(id)),
            ClickOutcome::Cleared => "Selection cleared".to_string(),
            ClickOutcome::Paired {
                target, candidate, ..
            } => format!(
                "{} paired with {}",
                self.display_name(target),
                self.display_name(candidate)
            ),
            ClickOutcome::Rejected { reason, .. } => format!("Cannot pair: {reason}"),
        }
    }
}
