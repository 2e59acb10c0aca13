use chrono::NaiveDate;
use log::{info, warn};

use crate::directory::{Driver, DriverDirectory, EventCommand, EventId, EventSink, Team, TeamDirectory};
use crate::errors::WizardError;
use crate::schedule::order_sessions;
use crate::session::FieldErrors;
use crate::steps::{
    DetailsRecord, EventType, EventTypeRecord, RemindersRecord, SessionsRecord, StepId,
    StepRecords, TeamRecord,
};
use crate::store::WizardStore;

const SINGLE_PATH: [StepId; 5] = [
    StepId::EventType,
    StepId::SingleDetails,
    StepId::SingleTeam,
    StepId::SingleSessions,
    StepId::Reminders,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(StepId),
    ReadyToSubmit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub event_id: EventId,
    /// Day the host should show after the wizard closes.
    pub date: NaiveDate,
    pub edited: bool,
}

/// Steps required by the branch chosen at step 1.
pub fn resolved_path(records: &StepRecords) -> Vec<StepId> {
    match records.event_type.event_type {
        Some(EventType::Championship) => vec![StepId::EventType, StepId::ChampionshipDetails],
        Some(EventType::Single) | None => SINGLE_PATH.to_vec(),
    }
}

pub fn is_first(store: &WizardStore) -> bool {
    store.current_step() == StepId::EventType
}

pub fn is_last(store: &WizardStore) -> bool {
    resolved_path(store.records()).last() == Some(&store.current_step())
}

pub fn check_step(records: &StepRecords, step: StepId) -> Result<(), FieldErrors> {
    match step {
        StepId::EventType => records.event_type.complete().map(|_| ()),
        StepId::SingleDetails => records.single_event_details.complete().map(|_| ()),
        StepId::ChampionshipDetails => Err(FieldErrors::form_error(
            "championship events are not available yet",
        )),
        StepId::SingleTeam => records.single_event_team.complete().map(|_| ()),
        StepId::SingleSessions => records.single_event_sessions.complete().map(|_| ()),
        StepId::Reminders => records.reminders.complete().map(|_| ()),
    }
}

/// Validates the active step and moves to the following one on the resolved path.
pub fn next(store: &mut WizardStore) -> Result<Advance, WizardError> {
    let current = store.current_step();
    check_step(store.records(), current)
        .map_err(|errors| WizardError::StepIncomplete { step: current, errors })?;

    if current == StepId::EventType
        && store.records().event_type.event_type == Some(EventType::Championship)
    {
        return Err(WizardError::BranchUnavailable);
    }

    let path = resolved_path(store.records());
    let index = path
        .iter()
        .position(|step| *step == current)
        .ok_or(WizardError::OffPath(current))?;

    match path.get(index + 1) {
        Some(step) => {
            store.set_step(*step);
            Ok(Advance::Moved(*step))
        }
        None => Ok(Advance::ReadyToSubmit),
    }
}

/// Moves back one step; does nothing on the first step.
pub fn prev(store: &mut WizardStore) -> StepId {
    if is_first(store) {
        return store.current_step();
    }

    let path = resolved_path(store.records());
    let previous = path
        .iter()
        .position(|step| *step == store.current_step())
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| path.get(index).copied())
        .unwrap_or(StepId::EventType);
    store.set_step(previous);
    previous
}

/// Jumps to a step on the resolved path once every step before it is complete.
pub fn go_to(store: &mut WizardStore, target: StepId) -> Result<(), WizardError> {
    let path = resolved_path(store.records());
    let index = path
        .iter()
        .position(|step| *step == target)
        .ok_or(WizardError::OffPath(target))?;

    for step in &path[..index] {
        check_step(store.records(), *step).map_err(|errors| WizardError::StepIncomplete {
            step: *step,
            errors,
        })?;
    }

    store.set_step(target);
    Ok(())
}

/// Assembles the command from every step on the resolved path.
pub fn build_command(records: &StepRecords) -> Result<EventCommand, WizardError> {
    let event_type = records
        .event_type
        .complete()
        .map_err(incomplete(StepId::EventType))?;
    if event_type == EventType::Championship {
        return Err(WizardError::BranchUnavailable);
    }

    let details = records
        .single_event_details
        .complete()
        .map_err(incomplete(StepId::SingleDetails))?;
    let team = records
        .single_event_team
        .complete()
        .map_err(incomplete(StepId::SingleTeam))?;
    let sessions = records
        .single_event_sessions
        .complete()
        .map_err(incomplete(StepId::SingleSessions))?;
    let reminders = records
        .reminders
        .complete()
        .map_err(incomplete(StepId::Reminders))?;

    Ok(EventCommand {
        event_type,
        sessions: order_sessions(&sessions, details.date),
        details,
        team,
        reminders,
    })
}

/// Sends the finished event to the sink; the store resets only when the sink accepts it.
pub fn submit<S: EventSink + ?Sized>(store: &mut WizardStore, sink: &mut S) -> Result<Submitted, WizardError> {
    let command = build_command(store.records())?;
    let edit_target = if store.is_edit_mode() {
        store.edit_target().map(str::to_string)
    } else {
        None
    };

    let result = match &edit_target {
        Some(event_id) => sink.edit_event(event_id, &command),
        None => sink.create_event(&command),
    };

    match result {
        Ok(event_id) => {
            info!(
                "{} event {event_id} ({}) with {} sessions",
                if edit_target.is_some() { "updated" } else { "created" },
                command.details.name,
                command.sessions.len()
            );
            store.reset();
            Ok(Submitted {
                event_id,
                date: command.details.date,
                edited: edit_target.is_some(),
            })
        }
        Err(err) => {
            warn!("event submission rejected: {err}");
            Err(err.into())
        }
    }
}

pub fn records_from_command(command: &EventCommand) -> StepRecords {
    StepRecords {
        event_type: EventTypeRecord {
            event_type: Some(command.event_type),
        },
        single_event_details: DetailsRecord::from(&command.details),
        single_event_team: TeamRecord::from(&command.team),
        single_event_sessions: SessionsRecord {
            sessions: Some(command.sessions.clone()),
        },
        reminders: RemindersRecord::from(&command.reminders),
    }
}

pub fn begin_edit(store: &mut WizardStore, event_id: &str, command: &EventCommand) {
    store.begin_edit(event_id, records_from_command(command));
}

/// Teams offered at step 3, filtered by the game picked at step 2.
pub fn team_choices<D: TeamDirectory + ?Sized>(directory: &D, records: &StepRecords) -> Vec<Team> {
    match records.single_event_details.game.as_deref() {
        Some(game) if !game.trim().is_empty() => directory.teams_with_rosters_by_game(game),
        _ => Vec::new(),
    }
}

/// Drivers that may be assigned to sessions: the ones selected at step 3.
pub fn session_driver_choices<D: DriverDirectory + ?Sized>(directory: &D, records: &StepRecords) -> Vec<Driver> {
    match &records.single_event_team.driver_ids {
        Some(driver_ids) if !driver_ids.is_empty() => directory.drivers_by_ids(driver_ids),
        _ => Vec::new(),
    }
}

fn incomplete(step: StepId) -> impl Fn(FieldErrors) -> WizardError {
    move |errors| WizardError::StepIncomplete { step, errors }
}
