//! Click-driven selection for building pairings.
//!
//! At most one person is "armed" at a time. A second click on a compatible
//! person turns the two selections into a pairing request and returns the
//! machine to idle. The machine only decides *what* was asked for; the
//! session validates and applies the request.

use tracing::debug;

use crate::roster::{PersonId, Role};

/// Current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing armed.
    #[default]
    Idle,
    /// An athlete is armed, waiting for a guide or another athlete.
    AthleteArmed(PersonId),
    /// A guide is armed, waiting for an athlete.
    GuideArmed(PersonId),
}

/// Input to the selection machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// An athlete row was clicked.
    AthleteClicked(PersonId),
    /// A guide row was clicked.
    GuideClicked(PersonId),
    /// Selection was explicitly cleared (for example with Escape).
    Cleared,
}

/// What a click resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A person is now armed (possibly replacing an armed guide).
    Armed {
        /// Who was armed.
        id: PersonId,
        /// Their role.
        role: Role,
    },
    /// The armed person was clicked again and is no longer armed.
    Disarmed {
        /// Who was released.
        id: PersonId,
    },
    /// Selection was cleared explicitly.
    Cleared,
    /// Two selections resolved into a pairing request: `candidate` joins
    /// `target`'s group.
    PairRequested {
        /// The head athlete.
        target: PersonId,
        /// The guide or athlete joining the group.
        candidate: PersonId,
    },
}

/// Tracks which single athlete or guide is armed.
#[derive(Debug, Clone, Default)]
pub struct SelectionStateMachine {
    state: Selection,
}

impl SelectionStateMachine {
    /// A machine with nothing armed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current selection.
    #[must_use]
    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// The armed athlete, if any.
    #[must_use]
    pub fn selected_athlete(&self) -> Option<&PersonId> {
        match &self.state {
            Selection::AthleteArmed(id) => Some(id),
            _ => None,
        }
    }

    /// The armed guide, if any.
    #[must_use]
    pub fn selected_guide(&self) -> Option<&PersonId> {
        match &self.state {
            Selection::GuideArmed(id) => Some(id),
            _ => None,
        }
    }

    /// Return to idle.
    pub fn clear(&mut self) {
        self.state = Selection::Idle;
    }

    /// Feed one event through the machine.
    pub fn handle(&mut self, event: SelectionEvent) -> Transition {
        let state = std::mem::take(&mut self.state);

        let (next, transition) = match (state, event) {
            (_, SelectionEvent::Cleared) => (Selection::Idle, Transition::Cleared),

            (Selection::Idle, SelectionEvent::AthleteClicked(id)) => (
                Selection::AthleteArmed(id.clone()),
                Transition::Armed {
                    id,
                    role: Role::Athlete,
                },
            ),
            (Selection::AthleteArmed(armed), SelectionEvent::AthleteClicked(id)) => {
                if armed == id {
                    (Selection::Idle, Transition::Disarmed { id })
                } else {
                    // The second athlete clicked heads the group.
                    (
                        Selection::Idle,
                        Transition::PairRequested {
                            target: id,
                            candidate: armed,
                        },
                    )
                }
            }
            (Selection::GuideArmed(guide), SelectionEvent::AthleteClicked(id)) => (
                Selection::Idle,
                Transition::PairRequested {
                    target: id,
                    candidate: guide,
                },
            ),

            (Selection::Idle, SelectionEvent::GuideClicked(id)) => (
                Selection::GuideArmed(id.clone()),
                Transition::Armed {
                    id,
                    role: Role::Guide,
                },
            ),
            (Selection::GuideArmed(armed), SelectionEvent::GuideClicked(id)) => {
                if armed == id {
                    (Selection::Idle, Transition::Disarmed { id })
                } else {
                    // Guides never pair with guides: the new guide replaces the old.
                    (
                        Selection::GuideArmed(id.clone()),
                        Transition::Armed {
                            id,
                            role: Role::Guide,
                        },
                    )
                }
            }
            (Selection::AthleteArmed(athlete), SelectionEvent::GuideClicked(id)) => (
                Selection::Idle,
                Transition::PairRequested {
                    target: athlete,
                    candidate: id,
                },
            ),
        };

        debug!(state = ?next, ?transition, "Selection transition");
        self.state = next;
        transition
    }
}
