//! Rules deciding whether a candidate may join a target athlete's group.
//!
//! A rejection is an ordinary outcome, not a fault: the roster can be stale
//! during a live session and administrators misclick. Callers surface the
//! reason and carry on.

use thiserror::Error;
use tracing::warn;

use crate::assignment::PairingAssignment;
use crate::roster::{PersonId, Role, Roster};

/// Why a pairing was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Target and candidate are the same person.
    #[error("cannot pair with self")]
    SelfPairing,
    /// The candidate is not a participating roster member.
    #[error("candidate not found")]
    CandidateNotFound,
    /// The target is not a participating roster member.
    #[error("target not found")]
    TargetNotFound,
    /// The target signed up as a guide.
    #[error("target is not an athlete")]
    TargetNotAthlete,
    /// The target is itself grouped under another athlete.
    #[error("target athlete is grouped under another athlete")]
    TargetAbsorbed,
    /// The target's group already lists the candidate.
    #[error("pairing already exists")]
    AlreadyPaired,
    /// The guide already serves another group.
    #[error("guide already paired with another athlete")]
    GuideAlreadyPaired,
    /// The candidate athlete heads a group of their own.
    #[error("athlete already has their own pairings")]
    AthleteHasOwnPairings,
    /// The candidate athlete is already a member of another group.
    #[error("athlete already paired with another athlete")]
    AthleteAlreadyPaired,
}

/// Decide whether `candidate` may join `target`'s group.
///
/// Rules run in a fixed order and the first failure wins. On success the
/// candidate's event role is returned, which tells the caller which member
/// list to use.
///
/// # Errors
///
/// Returns the [`Rejection`] describing the first rule that failed.
pub fn can_pair(
    target: &PersonId,
    candidate: &PersonId,
    assignment: &PairingAssignment,
    roster: &Roster,
) -> Result<Role, Rejection> {
    let verdict = check(target, candidate, assignment, roster);
    if let Err(reason) = &verdict {
        warn!(target = %target, candidate = %candidate, %reason, "Pairing rejected");
    }
    verdict
}

fn check(
    target: &PersonId,
    candidate: &PersonId,
    assignment: &PairingAssignment,
    roster: &Roster,
) -> Result<Role, Rejection> {
    if candidate == target {
        return Err(Rejection::SelfPairing);
    }

    let candidate_member = roster
        .participant(candidate)
        .ok_or(Rejection::CandidateNotFound)?;

    let target_member = roster.participant(target).ok_or(Rejection::TargetNotFound)?;
    if target_member.role != Role::Athlete {
        return Err(Rejection::TargetNotAthlete);
    }
    if assignment.absorbing_head(target).is_some() {
        return Err(Rejection::TargetAbsorbed);
    }

    if assignment.contains_pair(target, candidate) {
        return Err(Rejection::AlreadyPaired);
    }

    match candidate_member.role {
        Role::Guide => {
            if assignment.guide_head(candidate).is_some() {
                return Err(Rejection::GuideAlreadyPaired);
            }
            Ok(Role::Guide)
        }
        Role::Athlete => {
            if assignment.has_own_pairings(candidate) {
                return Err(Rejection::AthleteHasOwnPairings);
            }
            if assignment.member_of_other(candidate, target).is_some() {
                return Err(Rejection::AthleteAlreadyPaired);
            }
            Ok(Role::Athlete)
        }
    }
}
