use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::session::{FieldErrors, ScheduledSession};

/// Longest reminder lead time: one week.
pub const MAX_REMINDER_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    #[serde(rename = "1")]
    EventType,
    #[serde(rename = "2-single")]
    SingleDetails,
    #[serde(rename = "2-championship")]
    ChampionshipDetails,
    #[serde(rename = "3-single")]
    SingleTeam,
    #[serde(rename = "4-single")]
    SingleSessions,
    #[serde(rename = "5")]
    Reminders,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::EventType,
        StepId::SingleDetails,
        StepId::ChampionshipDetails,
        StepId::SingleTeam,
        StepId::SingleSessions,
        StepId::Reminders,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StepId::EventType => "1",
            StepId::SingleDetails => "2-single",
            StepId::ChampionshipDetails => "2-championship",
            StepId::SingleTeam => "3-single",
            StepId::SingleSessions => "4-single",
            StepId::Reminders => "5",
        }
    }

    /// Name of the record a step writes to; the championship branch has none yet.
    pub fn record_name(self) -> Option<&'static str> {
        match self {
            StepId::EventType => Some("eventType"),
            StepId::SingleDetails => Some("singleEventDetails"),
            StepId::ChampionshipDetails => None,
            StepId::SingleTeam => Some("singleEventTeam"),
            StepId::SingleSessions => Some("singleEventSessions"),
            StepId::Reminders => Some("reminders"),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepId::EventType => "Event type",
            StepId::SingleDetails => "Event details",
            StepId::ChampionshipDetails => "Championship details",
            StepId::SingleTeam => "Team and drivers",
            StepId::SingleSessions => "Sessions",
            StepId::Reminders => "Reminders",
        }
    }
}

impl Display for StepId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|step| step.key() == input.trim())
            .ok_or_else(|| format!("unknown step: {input}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Single,
    Championship,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTypeRecord {
    pub event_type: Option<EventType>,
}

impl EventTypeRecord {
    pub fn merge(&mut self, patch: EventTypeRecord) {
        if patch.event_type.is_some() {
            self.event_type = patch.event_type;
        }
    }

    pub fn complete(&self) -> Result<EventType, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.event_type.is_none() {
            errors.push("event_type", "choose an event type");
        }
        errors.into_result(self.event_type.unwrap_or(EventType::Single))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailsRecord {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub game: Option<String>,
    pub car: Option<String>,
    pub track: Option<String>,
    pub description: Option<String>,
}

/// What a details merge changed that other fields depend on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailsChange {
    pub game_changed: bool,
    pub date_changed: bool,
}

impl DetailsRecord {
    pub fn merge(&mut self, patch: DetailsRecord) -> DetailsChange {
        let change = DetailsChange {
            game_changed: patch.game.is_some() && patch.game != self.game,
            date_changed: patch.date.is_some() && patch.date != self.date,
        };

        if change.game_changed {
            self.car = None;
            self.track = None;
        }

        overwrite(&mut self.name, patch.name);
        overwrite(&mut self.date, patch.date);
        overwrite(&mut self.game, patch.game);
        overwrite_text(&mut self.car, patch.car);
        overwrite_text(&mut self.track, patch.track);
        overwrite_text(&mut self.description, patch.description);
        change
    }

    pub fn complete(&self) -> Result<EventDetails, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = required(&self.name, "name", "event name is required", &mut errors);
        let game = required(&self.game, "game", "choose a game", &mut errors);
        if self.date.is_none() {
            errors.push("date", "pick an event date");
        }

        let details = EventDetails {
            name,
            date: self.date.unwrap_or_default(),
            game,
            car: optional(&self.car),
            track: optional(&self.track),
            description: optional(&self.description),
        };
        errors.into_result(details)
    }
}

impl From<&EventDetails> for DetailsRecord {
    fn from(details: &EventDetails) -> Self {
        Self {
            name: Some(details.name.clone()),
            date: Some(details.date),
            game: Some(details.game.clone()),
            car: details.car.clone(),
            track: details.track.clone(),
            description: details.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub name: String,
    pub date: NaiveDate,
    pub game: String,
    #[serde(default)]
    pub car: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
    pub team_id: Option<String>,
    pub roster_id: Option<String>,
    pub driver_ids: Option<Vec<String>>,
}

impl TeamRecord {
    pub fn merge(&mut self, patch: TeamRecord) {
        let team_changed = patch.team_id.is_some() && patch.team_id != self.team_id;
        if team_changed {
            self.roster_id = None;
            self.driver_ids = None;
        }
        overwrite(&mut self.team_id, patch.team_id);

        let roster_changed = patch.roster_id.is_some() && patch.roster_id != self.roster_id;
        if roster_changed {
            self.driver_ids = None;
        }
        overwrite(&mut self.roster_id, patch.roster_id);
        overwrite(&mut self.driver_ids, patch.driver_ids);
    }

    pub fn complete(&self) -> Result<TeamSelection, FieldErrors> {
        let mut errors = FieldErrors::new();
        let team_id = required(&self.team_id, "team_id", "choose a team", &mut errors);
        let roster_id = required(&self.roster_id, "roster_id", "choose a roster", &mut errors);
        let driver_ids = self.driver_ids.clone().unwrap_or_default();
        if driver_ids.is_empty() {
            errors.push("driver_ids", "select at least one driver");
        }

        errors.into_result(TeamSelection {
            team_id,
            roster_id,
            driver_ids,
        })
    }
}

impl From<&TeamSelection> for TeamRecord {
    fn from(team: &TeamSelection) -> Self {
        Self {
            team_id: Some(team.team_id.clone()),
            roster_id: Some(team.roster_id.clone()),
            driver_ids: Some(team.driver_ids.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSelection {
    pub team_id: String,
    pub roster_id: String,
    pub driver_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsRecord {
    pub sessions: Option<Vec<ScheduledSession>>,
}

impl SessionsRecord {
    pub fn merge(&mut self, patch: SessionsRecord) {
        overwrite(&mut self.sessions, patch.sessions);
    }

    pub fn list(&self) -> &[ScheduledSession] {
        self.sessions.as_deref().unwrap_or_default()
    }

    pub fn complete(&self) -> Result<Vec<ScheduledSession>, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.list().is_empty() {
            errors.push("sessions", "add at least one session");
        }
        errors.into_result(self.list().to_vec())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersRecord {
    pub notify: Option<bool>,
    pub offsets_minutes: Option<Vec<u32>>,
    pub message: Option<String>,
}

impl RemindersRecord {
    pub fn merge(&mut self, patch: RemindersRecord) {
        overwrite(&mut self.notify, patch.notify);
        overwrite(&mut self.offsets_minutes, patch.offsets_minutes);
        overwrite_text(&mut self.message, patch.message);
    }

    pub fn complete(&self) -> Result<Reminders, FieldErrors> {
        let mut errors = FieldErrors::new();
        let notify = self.notify.unwrap_or(false);
        let mut offsets = self.offsets_minutes.clone().unwrap_or_default();
        offsets.sort_unstable_by(|left, right| right.cmp(left));
        offsets.dedup();

        if offsets
            .iter()
            .any(|offset| *offset == 0 || *offset > MAX_REMINDER_MINUTES)
        {
            errors.push(
                "offsets_minutes",
                format!("reminders must be between 1 and {MAX_REMINDER_MINUTES} minutes before start"),
            );
        }
        if notify && offsets.is_empty() {
            errors.push("offsets_minutes", "add at least one reminder");
        }

        errors.into_result(Reminders {
            notify,
            offsets_minutes: if notify { offsets } else { Vec::new() },
            message: optional(&self.message),
        })
    }
}

impl From<&Reminders> for RemindersRecord {
    fn from(reminders: &Reminders) -> Self {
        Self {
            notify: Some(reminders.notify),
            offsets_minutes: Some(reminders.offsets_minutes.clone()),
            message: reminders.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminders {
    pub notify: bool,
    /// Minutes before the first session, largest first.
    #[serde(default)]
    pub offsets_minutes: Vec<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One partial record per step, under the fixed step-to-record mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StepRecords {
    pub event_type: EventTypeRecord,
    pub single_event_details: DetailsRecord,
    pub single_event_team: TeamRecord,
    pub single_event_sessions: SessionsRecord,
    pub reminders: RemindersRecord,
}

/// Partial data for exactly one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step")]
pub enum StepPatch {
    #[serde(rename = "1")]
    EventType(EventTypeRecord),
    #[serde(rename = "2-single")]
    Details(DetailsRecord),
    #[serde(rename = "3-single")]
    Team(TeamRecord),
    #[serde(rename = "4-single")]
    Sessions(SessionsRecord),
    #[serde(rename = "5")]
    Reminders(RemindersRecord),
}

impl StepPatch {
    pub fn step_id(&self) -> StepId {
        match self {
            StepPatch::EventType(_) => StepId::EventType,
            StepPatch::Details(_) => StepId::SingleDetails,
            StepPatch::Team(_) => StepId::SingleTeam,
            StepPatch::Sessions(_) => StepId::SingleSessions,
            StepPatch::Reminders(_) => StepId::Reminders,
        }
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Like `overwrite`, but a blank string clears an optional text field.
fn overwrite_text(slot: &mut Option<String>, value: Option<String>) {
    match value {
        Some(text) if text.trim().is_empty() => *slot = None,
        Some(text) => *slot = Some(text),
        None => {}
    }
}

fn required(value: &Option<String>, field: &str, message: &str, errors: &mut FieldErrors) -> String {
    match optional(value) {
        Some(value) => value,
        None => {
            errors.push(field, message);
            String::new()
        }
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
