//! The persistence boundary of the pairing core.
//!
//! Loading a session and saving its result are the only asynchronous
//! operations. Everything between them is synchronous and in memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::assignment::PairingAssignment;
use crate::error::{Error, Result};
use crate::roster::{PersonId, Roster, RosterMember};

/// Storage collaborator for a pairing session.
///
/// Saves are whole-document writes of the event's `pairings` field with
/// last-write-wins semantics.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Everyone signed up for the event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event does not exist or storage fails.
    async fn load_roster(&self, event_id: &str) -> Result<Roster>;

    /// The event's stored pairings; empty if none were ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the event does not exist or storage fails.
    async fn load_pairings(&self, event_id: &str) -> Result<PairingAssignment>;

    /// Replace the event's stored pairings.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. Callers must treat the stored
    /// state as unchanged in that case.
    async fn save_pairings(&self, event_id: &str, pairings: &PairingAssignment) -> Result<()>;

    /// Display name for a person id, for ids the roster no longer covers.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    async fn display_name(&self, person_id: &PersonId) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
struct MemoryEvent {
    members: Vec<RosterMember>,
    pairings: String,
}

/// In-process gateway.
///
/// Pairings are kept as their serialized document so that loads always
/// hand out an independent copy.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    events: Mutex<HashMap<String, MemoryEvent>>,
    names: Mutex<HashMap<PersonId, String>>,
    fail_next_save: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryGateway {
    /// An empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event and its roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn insert_event(&self, event_id: &str, members: Vec<RosterMember>) -> Result<()> {
        let mut names = self.lock_names()?;
        for member in &members {
            names.insert(member.id.clone(), member.display_name.clone());
        }
        self.lock_events()?.insert(
            event_id.to_string(),
            MemoryEvent {
                members,
                pairings: String::new(),
            },
        );
        Ok(())
    }

    /// Register a name for an id that is not on any roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn insert_name(&self, person_id: PersonId, name: &str) -> Result<()> {
        self.lock_names()?.insert(person_id, name.to_string());
        Ok(())
    }

    /// Make the next save fail once.
    pub fn fail_next_save(&self) {
        self.fail_next_save.store(true, Ordering::SeqCst);
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock_events(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryEvent>>> {
        self.events
            .lock()
            .map_err(|_| Error::internal("memory gateway event lock poisoned"))
    }

    fn lock_names(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PersonId, String>>> {
        self.names
            .lock()
            .map_err(|_| Error::internal("memory gateway name lock poisoned"))
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn load_roster(&self, event_id: &str) -> Result<Roster> {
        let events = self.lock_events()?;
        let event = events
            .get(event_id)
            .ok_or_else(|| Error::EventNotFound(event_id.to_string()))?;
        Ok(Roster::new(event.members.clone()))
    }

    async fn load_pairings(&self, event_id: &str) -> Result<PairingAssignment> {
        let events = self.lock_events()?;
        let event = events
            .get(event_id)
            .ok_or_else(|| Error::EventNotFound(event_id.to_string()))?;
        PairingAssignment::from_json(&event.pairings)
    }

    async fn save_pairings(&self, event_id: &str, pairings: &PairingAssignment) -> Result<()> {
        if self.fail_next_save.swap(false, Ordering::SeqCst) {
            return Err(Error::save_failed(event_id, "simulated failure"));
        }
        let json = pairings.to_json()?;
        let mut events = self.lock_events()?;
        let event = events
            .get_mut(event_id)
            .ok_or_else(|| Error::EventNotFound(event_id.to_string()))?;
        event.pairings = json;
        self.saves.fetch_add(1, Ordering::SeqCst);
        debug!(event_id, groups = pairings.group_count(), "Saved pairings in memory");
        Ok(())
    }

    async fn display_name(&self, person_id: &PersonId) -> Result<Option<String>> {
        Ok(self.lock_names()?.get(person_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::PairingEntry;
    use crate::roster::Role;

    fn gateway() -> MemoryGateway {
        let gateway = MemoryGateway::new();
        gateway
            .insert_event(
                "spring-5k",
                vec![
                    RosterMember::new("a1", "Ada", Role::Athlete, None),
                    RosterMember::new("g1", "Grace", Role::Guide, None),
                ],
            )
            .unwrap();
        gateway
    }

    #[tokio::test]
    async fn test_load_unknown_event() {
        let gateway = gateway();
        let err = gateway.load_roster("autumn-10k").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(gateway.load_pairings("autumn-10k").await.is_err());
    }

    #[tokio::test]
    async fn test_fresh_event_has_no_pairings() {
        let gateway = gateway();
        assert!(gateway.load_pairings("spring-5k").await.unwrap().is_empty());
        assert_eq!(gateway.load_roster("spring-5k").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let gateway = gateway();
        let pairings: PairingAssignment = [(
            PersonId::new("a1"),
            PairingEntry {
                guides: vec![PersonId::new("g1")],
                athletes: vec![],
            },
        )]
        .into_iter()
        .collect();

        gateway.save_pairings("spring-5k", &pairings).await.unwrap();
        assert_eq!(gateway.save_count(), 1);
        assert_eq!(gateway.load_pairings("spring-5k").await.unwrap(), pairings);
    }

    #[tokio::test]
    async fn test_fail_next_save_only_once() {
        let gateway = gateway();
        let pairings = PairingAssignment::new();
        gateway.fail_next_save();

        let err = gateway.save_pairings("spring-5k", &pairings).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(gateway.save_count(), 0);

        gateway.save_pairings("spring-5k", &pairings).await.unwrap();
        assert_eq!(gateway.save_count(), 1);
    }

    #[tokio::test]
    async fn test_display_name() {
        let gateway = gateway();
        gateway.insert_name(PersonId::new("x9"), "Former Guide").unwrap();
        assert_eq!(
            gateway.display_name(&PersonId::new("a1")).await.unwrap(),
            Some("Ada".to_string())
        );
        assert_eq!(
            gateway.display_name(&PersonId::new("x9")).await.unwrap(),
            Some("Former Guide".to_string())
        );
        assert_eq!(gateway.display_name(&PersonId::new("nope")).await.unwrap(), None);
    }
}
