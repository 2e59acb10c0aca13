use log::debug;

use crate::session::{ScheduledSession, Session, generate_id};
use crate::steps::{StepId, StepPatch, StepRecords};

/// Partial data for every wizard step plus the active-step pointer.
///
/// The host owns the store and hands it to the wizard functions by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardStore {
    current: StepId,
    edit_mode: bool,
    event_id: Option<String>,
    records: StepRecords,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardStore {
    pub fn new() -> Self {
        Self {
            current: StepId::EventType,
            edit_mode: false,
            event_id: None,
            records: StepRecords::default(),
        }
    }

    pub fn current_step(&self) -> StepId {
        self.current
    }

    pub fn records(&self) -> &StepRecords {
        &self.records
    }

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn edit_target(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn sessions(&self) -> &[ScheduledSession] {
        self.records.single_event_sessions.list()
    }

    pub fn set_step(&mut self, step: StepId) {
        debug!("wizard step {} -> {}", self.current, step);
        self.current = step;
    }

    /// Merges a partial record into its step; fields absent from the patch are kept.
    pub fn set_data(&mut self, patch: StepPatch) {
        let step = patch.step_id();
        match patch {
            StepPatch::EventType(patch) => self.records.event_type.merge(patch),
            StepPatch::Details(patch) => {
                let change = self.records.single_event_details.merge(patch);
                if change.game_changed {
                    debug!("game changed, cleared car and track");
                }
                if change.date_changed && self.records.single_event_sessions.sessions.is_some() {
                    self.records.single_event_sessions.sessions = None;
                    debug!("event date changed, cleared sessions");
                }
            }
            StepPatch::Team(patch) => self.records.single_event_team.merge(patch),
            StepPatch::Sessions(patch) => self.records.single_event_sessions.merge(patch),
            StepPatch::Reminders(patch) => self.records.reminders.merge(patch),
        }
        debug!("merged data into step {step}");
    }

    /// Appends a validated session and returns the id it was given.
    pub fn add_session(&mut self, session: Session) -> String {
        let id = generate_id();
        self.records
            .single_event_sessions
            .sessions
            .get_or_insert_with(Vec::new)
            .push(ScheduledSession {
                id: id.clone(),
                session,
            });
        debug!("added session {id}");
        id
    }

    pub fn remove_session(&mut self, session_id: &str) -> Option<ScheduledSession> {
        let sessions = self.records.single_event_sessions.sessions.as_mut()?;
        let index = sessions.iter().position(|scheduled| scheduled.id == session_id)?;
        debug!("removed session {session_id}");
        Some(sessions.remove(index))
    }

    /// Loads an existing event's records and switches to edit mode on the first step.
    pub fn begin_edit(&mut self, event_id: impl Into<String>, records: StepRecords) {
        let event_id = event_id.into();
        debug!("editing event {event_id}");
        self.records = records;
        self.edit_mode = true;
        self.event_id = Some(event_id);
        self.current = StepId::EventType;
    }

    pub fn reset(&mut self) {
        debug!("wizard reset");
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::session::{SessionDraft, validate};
    use crate::steps::{DetailsRecord, EventType, EventTypeRecord, StepId, StepPatch, StepRecords, TeamRecord};

    use super::WizardStore;

    fn details(patch: DetailsRecord) -> StepPatch {
        StepPatch::Details(patch)
    }

    fn practice() -> crate::session::Session {
        validate(&SessionDraft {
            session_type: Some("practice".to_string()),
            start: Some("18:00".to_string()),
            end: Some("19:00".to_string()),
            ..SessionDraft::default()
        })
        .expect("practice should validate")
    }

    #[test]
    fn set_data_merges_instead_of_replacing() {
        let mut store = WizardStore::new();
        store.set_data(details(DetailsRecord {
            name: Some("A".to_string()),
            ..DetailsRecord::default()
        }));
        store.set_data(details(DetailsRecord {
            game: Some("X".to_string()),
            ..DetailsRecord::default()
        }));

        let record = &store.records().single_event_details;
        assert_eq!(record.name.as_deref(), Some("A"));
        assert_eq!(record.game.as_deref(), Some("X"));
    }

    #[test]
    fn changing_event_date_clears_sessions() {
        let mut store = WizardStore::new();
        store.set_data(details(DetailsRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 10),
            ..DetailsRecord::default()
        }));
        store.add_session(practice());
        assert_eq!(store.sessions().len(), 1);

        store.set_data(details(DetailsRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 10),
            name: Some("Same day".to_string()),
            ..DetailsRecord::default()
        }));
        assert_eq!(store.sessions().len(), 1);

        store.set_data(details(DetailsRecord {
            date: NaiveDate::from_ymd_opt(2024, 5, 11),
            ..DetailsRecord::default()
        }));
        assert!(store.sessions().is_empty());
    }

    #[test]
    fn sessions_are_removed_by_id() {
        let mut store = WizardStore::new();
        let first = store.add_session(practice());
        let second = store.add_session(practice());
        assert_ne!(first, second);

        let removed = store.remove_session(&first).expect("session exists");
        assert_eq!(removed.id, first);
        assert!(store.remove_session(&first).is_none());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, second);
    }

    #[test]
    fn team_change_clears_roster_and_drivers() {
        let mut store = WizardStore::new();
        store.set_data(StepPatch::Team(TeamRecord {
            team_id: Some("T1".to_string()),
            roster_id: Some("R1".to_string()),
            driver_ids: Some(vec!["D1".to_string()]),
        }));
        store.set_data(StepPatch::Team(TeamRecord {
            team_id: Some("T2".to_string()),
            ..TeamRecord::default()
        }));
        let team = &store.records().single_event_team;
        assert_eq!(team.team_id.as_deref(), Some("T2"));
        assert_eq!(team.roster_id, None);
        assert_eq!(team.driver_ids, None);
    }

    #[test]
    fn reset_clears_records_and_edit_mode() {
        let mut store = WizardStore::new();
        let records = StepRecords {
            event_type: EventTypeRecord {
                event_type: Some(EventType::Single),
            },
            ..StepRecords::default()
        };
        store.begin_edit("evt1", records);
        store.set_step(StepId::SingleSessions);
        store.add_session(practice());
        assert!(store.is_edit_mode());
        assert_eq!(store.edit_target(), Some("evt1"));

        store.reset();
        assert!(!store.is_edit_mode());
        assert_eq!(store.edit_target(), None);
        assert_eq!(store.current_step(), StepId::EventType);
        assert_eq!(store.records(), &StepRecords::default());
    }
}
