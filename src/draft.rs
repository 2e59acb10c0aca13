//! Non-interactive wizard input: a TOML file with one table per step.
//!
//! ```toml
//! [event]
//! event_type = "single"
//!
//! [details]
//! name = "Sprint 1"
//! date = "2024-05-10"
//! game = "F1 23"
//!
//! [team]
//! team_id = "k3X9aQ2b"
//! roster_id = "Zp81LmQe"
//!
//! [[sessions]]
//! type = "race"
//! start = "19:00"
//! end = "20:30"
//! driver_ids = ["D1", "D2"]
//! ```

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::directory::{EventSink, TeamDirectory};
use crate::errors::DraftError;
use crate::session::{SessionDraft, validate};
use crate::steps::{
    DetailsRecord, EventTypeRecord, RemindersRecord, SessionsRecord, StepPatch, TeamRecord,
};
use crate::store::WizardStore;
use crate::wizard::{self, Advance, Submitted};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDraft {
    pub event: EventTypeRecord,
    pub details: DetailsRecord,
    pub team: TeamRecord,
    pub sessions: Vec<SessionDraft>,
    pub reminders: Option<RemindersRecord>,
}

pub fn load_draft(path: &Path) -> Result<EventDraft, DraftError> {
    let raw = fs::read_to_string(path).map_err(|source| DraftError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&raw)?)
}

/// Feeds a draft into the store step by step.
///
/// A draft without sessions keeps the sessions already in the store, which is
/// what an edit that only renames an event wants.
pub fn apply_draft<D: TeamDirectory + ?Sized>(
    store: &mut WizardStore,
    draft: EventDraft,
    directory: &D,
) -> Result<(), DraftError> {
    let mut sessions = Vec::with_capacity(draft.sessions.len());
    for (index, session) in draft.sessions.iter().enumerate() {
        let session = validate(session).map_err(|errors| DraftError::Session {
            index: index + 1,
            errors,
        })?;
        sessions.push(session);
    }

    store.set_data(StepPatch::EventType(draft.event));
    store.set_data(StepPatch::Details(draft.details));
    store.set_data(StepPatch::Team(draft.team));
    fill_roster_drivers(store, directory);

    if !sessions.is_empty() {
        store.set_data(StepPatch::Sessions(SessionsRecord {
            sessions: Some(Vec::new()),
        }));
        for session in sessions {
            store.add_session(session);
        }
    }

    if let Some(reminders) = draft.reminders {
        store.set_data(StepPatch::Reminders(reminders));
    }
    Ok(())
}

/// Applies a draft, walks every step and submits the result.
pub fn run_draft<P: TeamDirectory + EventSink + ?Sized>(
    store: &mut WizardStore,
    draft: EventDraft,
    paddock: &mut P,
) -> Result<Submitted, DraftError> {
    apply_draft(store, draft, &*paddock)?;

    store.set_step(crate::steps::StepId::EventType);
    while let Advance::Moved(step) = wizard::next(store)? {
        debug!("draft reached step {step}");
    }

    Ok(wizard::submit(store, paddock)?)
}

/// A roster picked without explicit drivers brings all of its members.
fn fill_roster_drivers<D: TeamDirectory + ?Sized>(store: &mut WizardStore, directory: &D) {
    let records = store.records();
    let team = &records.single_event_team;
    if team.driver_ids.is_some() {
        return;
    }
    let (Some(team_id), Some(roster_id)) = (team.team_id.clone(), team.roster_id.clone()) else {
        return;
    };

    let member_ids = wizard::team_choices(directory, records)
        .into_iter()
        .find(|candidate| candidate.id == team_id)
        .and_then(|candidate| candidate.roster(&roster_id).map(|roster| roster.member_ids()));

    if let Some(member_ids) = member_ids {
        store.set_data(StepPatch::Team(TeamRecord {
            driver_ids: Some(member_ids),
            ..TeamRecord::default()
        }));
    }
}
