use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::clock::{self, TimeOfDay};

const ID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Briefing,
    Practice,
    Qualifying,
    Race,
}

impl SessionType {
    pub const ALL: [SessionType; 4] = [
        SessionType::Briefing,
        SessionType::Practice,
        SessionType::Qualifying,
        SessionType::Race,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SessionType::Briefing => "briefing",
            SessionType::Practice => "practice",
            SessionType::Qualifying => "qualifying",
            SessionType::Race => "race",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Briefing => "Briefing",
            SessionType::Practice => "Practice",
            SessionType::Qualifying => "Qualifying",
            SessionType::Race => "Race",
        }
    }
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        SessionType::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(input.trim()))
            .ok_or_else(|| format!("unknown session type: {input}"))
    }
}

/// Type-specific part of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionKind {
    Briefing,
    Practice {
        end: TimeOfDay,
    },
    Qualifying {
        end: TimeOfDay,
        driver_id: String,
    },
    Race {
        end: TimeOfDay,
        driver_ids: Vec<String>,
        #[serde(default)]
        ends_next_day: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// A validated session that has not been added to a schedule yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start: TimeOfDay,
    /// Custom day; the event date applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<NaiveDate>,
    #[serde(flatten)]
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerInfo>,
}

impl Session {
    pub fn session_type(&self) -> SessionType {
        match self.kind {
            SessionKind::Briefing => SessionType::Briefing,
            SessionKind::Practice { .. } => SessionType::Practice,
            SessionKind::Qualifying { .. } => SessionType::Qualifying,
            SessionKind::Race { .. } => SessionType::Race,
        }
    }

    pub fn end(&self) -> Option<TimeOfDay> {
        match &self.kind {
            SessionKind::Briefing => None,
            SessionKind::Practice { end }
            | SessionKind::Qualifying { end, .. }
            | SessionKind::Race { end, .. } => Some(*end),
        }
    }

    pub fn ends_next_day(&self) -> bool {
        matches!(
            self.kind,
            SessionKind::Race {
                ends_next_day: true,
                ..
            }
        )
    }

    pub fn driver_ids(&self) -> Vec<&str> {
        match &self.kind {
            SessionKind::Briefing | SessionKind::Practice { .. } => Vec::new(),
            SessionKind::Qualifying { driver_id, .. } => vec![driver_id.as_str()],
            SessionKind::Race { driver_ids, .. } => driver_ids.iter().map(String::as_str).collect(),
        }
    }

    pub fn anchor(&self, event_date: NaiveDate) -> NaiveDate {
        self.day.unwrap_or(event_date)
    }

    pub fn start_instant(&self, event_date: NaiveDate) -> NaiveDateTime {
        clock::to_instant(self.start, self.anchor(event_date))
    }

    pub fn end_instant(&self, event_date: NaiveDate) -> Option<NaiveDateTime> {
        self.end()
            .map(|end| clock::end_instant(end, self.anchor(event_date), self.ends_next_day()))
    }
}

/// A session that lives in the schedule and can be removed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSession {
    pub id: String,
    pub session: Session,
}

/// Raw form input for a session, every field possibly missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDraft {
    #[serde(rename = "type")]
    pub session_type: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub day: Option<NaiveDate>,
    pub driver_id: Option<String>,
    pub driver_ids: Option<Vec<String>>,
    pub ends_next_day: Option<bool>,
    pub weather: Option<String>,
    pub server_name: Option<String>,
    pub server_password: Option<String>,
}

impl From<&Session> for SessionDraft {
    fn from(session: &Session) -> Self {
        let mut draft = SessionDraft {
            session_type: Some(session.session_type().key().to_string()),
            start: Some(session.start.to_string()),
            end: session.end().map(|end| end.to_string()),
            day: session.day,
            weather: session.weather.clone(),
            server_name: session.server.as_ref().map(|server| server.name.clone()),
            server_password: session
                .server
                .as_ref()
                .and_then(|server| server.password.clone()),
            ..SessionDraft::default()
        };

        match &session.kind {
            SessionKind::Qualifying { driver_id, .. } => draft.driver_id = Some(driver_id.clone()),
            SessionKind::Race {
                driver_ids,
                ends_next_day,
                ..
            } => {
                draft.driver_ids = Some(driver_ids.clone());
                draft.ends_next_day = Some(*ends_next_day);
            }
            SessionKind::Briefing | SessionKind::Practice { .. } => {}
        }

        draft
    }
}

/// Validation messages keyed by field name, plus messages for the whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    form: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form_error(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push_form(message);
        errors
    }

    pub fn push_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }

    pub fn form_messages(&self) -> &[String] {
        &self.form
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, messages)| (name.as_str(), messages.as_slice()))
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts = self.form.clone();
        for (field, messages) in &self.fields {
            for message in messages {
                parts.push(format!("{field}: {message}"));
            }
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

/// Checks a draft and builds the matching session variant.
pub fn validate(draft: &SessionDraft) -> Result<Session, FieldErrors> {
    let session_type = present(&draft.session_type).and_then(|raw| raw.parse::<SessionType>().ok());
    let Some(session_type) = session_type else {
        return Err(FieldErrors::form_error("session type is required"));
    };

    let mut errors = FieldErrors::new();
    let start = parse_time(&draft.start, "start", &mut errors);
    let end = match session_type {
        SessionType::Briefing => None,
        SessionType::Practice | SessionType::Qualifying | SessionType::Race => {
            parse_time(&draft.end, "end", &mut errors)
        }
    };
    let ends_next_day = session_type == SessionType::Race && draft.ends_next_day.unwrap_or(false);

    // Only the wall clock and the overnight flag matter here, so any anchor works.
    if let (Some(start), Some(end)) = (start, end) {
        let anchor = draft.day.unwrap_or_default();
        if !ends_next_day
            && clock::end_instant(end, anchor, false) <= clock::to_instant(start, anchor)
        {
            errors.push("end", "end time must be after start time");
        }
    }

    let driver_id = match session_type {
        SessionType::Qualifying => match present(&draft.driver_id) {
            Some(driver_id) => Some(driver_id.to_string()),
            None => {
                errors.push("driver_id", "select a driver");
                None
            }
        },
        _ => None,
    };

    let driver_ids = match (session_type, &draft.driver_ids) {
        (SessionType::Race, None) => {
            errors.push("driver_ids", "drivers are required");
            Vec::new()
        }
        (SessionType::Race, Some(ids)) => {
            let ids = unique_ids(ids);
            if ids.is_empty() {
                errors.push("driver_ids", "select at least one driver");
            }
            ids
        }
        _ => Vec::new(),
    };

    let server = match (present(&draft.server_name), present(&draft.server_password)) {
        (Some(name), password) => Some(ServerInfo {
            name: name.to_string(),
            password: password.map(str::to_string),
        }),
        (None, Some(_)) => {
            errors.push("server_name", "server name is required when a password is set");
            None
        }
        (None, None) => None,
    };

    if !errors.is_empty() {
        return Err(errors);
    }
    let (Some(start), end) = (start, end) else {
        return Err(errors);
    };

    let kind = match (session_type, end) {
        (SessionType::Briefing, _) => SessionKind::Briefing,
        (SessionType::Practice, Some(end)) => SessionKind::Practice { end },
        (SessionType::Qualifying, Some(end)) => SessionKind::Qualifying {
            end,
            driver_id: driver_id.unwrap_or_default(),
        },
        (SessionType::Race, Some(end)) => SessionKind::Race {
            end,
            driver_ids,
            ends_next_day,
        },
        (_, None) => return Err(errors),
    };

    Ok(Session {
        start,
        day: draft.day,
        kind,
        weather: present(&draft.weather).map(str::to_string),
        server,
    })
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

fn parse_time(raw: &Option<String>, field: &str, errors: &mut FieldErrors) -> Option<TimeOfDay> {
    let Some(raw) = present(raw) else {
        errors.push(field, format!("{field} time is required"));
        return None;
    };

    match raw.parse() {
        Ok(time) => Some(time),
        Err(_) => {
            errors.push(field, format!("{field} time must be HH:MM"));
            None
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        if !unique.iter().any(|existing| existing == id) {
            unique.push(id.to_string());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::{SessionDraft, SessionKind, SessionType, validate};

    fn race(start: &str, end: &str, ends_next_day: bool) -> SessionDraft {
        SessionDraft {
            session_type: Some("race".to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            driver_ids: Some(vec!["D1".to_string(), "D2".to_string()]),
            ends_next_day: Some(ends_next_day),
            ..SessionDraft::default()
        }
    }

    #[test]
    fn missing_type_is_a_single_form_error() {
        let draft = SessionDraft {
            start: Some("nonsense".to_string()),
            ..SessionDraft::default()
        };
        let errors = validate(&draft).expect_err("type is missing");
        assert_eq!(errors.form_messages(), ["session type is required"]);
        assert_eq!(errors.fields().count(), 0);

        let unknown = SessionDraft {
            session_type: Some("warmup".to_string()),
            ..SessionDraft::default()
        };
        let errors = validate(&unknown).expect_err("type is unknown");
        assert_eq!(errors.form_messages(), ["session type is required"]);
    }

    #[test]
    fn session_type_parse_names_the_bad_input() {
        assert_eq!(" RACE ".parse::<SessionType>(), Ok(SessionType::Race));
        let err = "sprint".parse::<SessionType>().expect_err("sprint is not a session type");
        assert_eq!(err, "unknown session type: sprint");
    }

    #[test]
    fn briefing_needs_only_a_start() {
        let draft = SessionDraft {
            session_type: Some("briefing".to_string()),
            start: Some("18:30".to_string()),
            end: Some("garbage".to_string()),
            ..SessionDraft::default()
        };
        let session = validate(&draft).expect("briefing should validate");
        assert_eq!(session.kind, SessionKind::Briefing);
        assert_eq!(session.end(), None);
        assert!(!session.ends_next_day());
    }

    #[test]
    fn end_before_start_is_reported_on_end() {
        let errors = validate(&race("23:30", "00:30", false)).expect_err("end precedes start");
        assert_eq!(errors.field("end"), ["end time must be after start time"]);
        assert!(errors.form_messages().is_empty());

        let session = validate(&race("23:30", "00:30", true)).expect("overnight race is fine");
        assert!(session.ends_next_day());
    }

    #[test]
    fn equal_times_are_rejected() {
        let errors = validate(&race("20:00", "20:00", false)).expect_err("zero length race");
        assert_eq!(errors.field("end").len(), 1);
    }

    #[test]
    fn missing_end_skips_ordering_check() {
        let mut draft = race("20:00", "", false);
        draft.end = None;
        let errors = validate(&draft).expect_err("end is required");
        assert_eq!(errors.field("end"), ["end time is required"]);

        draft.end = Some("8pm".to_string());
        let errors = validate(&draft).expect_err("end is malformed");
        assert_eq!(errors.field("end"), ["end time must be HH:MM"]);
    }

    #[test]
    fn race_driver_set_rules() {
        let mut draft = race("19:00", "20:30", false);
        draft.driver_ids = None;
        let errors = validate(&draft).expect_err("drivers missing");
        assert_eq!(errors.field("driver_ids"), ["drivers are required"]);

        draft.driver_ids = Some(Vec::new());
        let errors = validate(&draft).expect_err("drivers empty");
        assert_eq!(errors.field("driver_ids"), ["select at least one driver"]);

        draft.driver_ids = Some(vec!["D1".to_string(), "D1".to_string(), "D2".to_string()]);
        let session = validate(&draft).expect("duplicates collapse");
        assert_eq!(session.driver_ids(), ["D1", "D2"]);
    }

    #[test]
    fn qualifying_needs_one_driver() {
        let mut draft = SessionDraft {
            session_type: Some("qualifying".to_string()),
            start: Some("18:00".to_string()),
            end: Some("18:20".to_string()),
            ..SessionDraft::default()
        };
        let errors = validate(&draft).expect_err("driver missing");
        assert_eq!(errors.field("driver_id"), ["select a driver"]);

        draft.driver_id = Some("D2".to_string());
        let session = validate(&draft).expect("qualifying should validate");
        assert_eq!(session.session_type(), SessionType::Qualifying);
        assert_eq!(session.driver_ids(), ["D2"]);
    }

    #[test]
    fn ends_next_day_only_applies_to_races() {
        let draft = SessionDraft {
            session_type: Some("practice".to_string()),
            start: Some("23:00".to_string()),
            end: Some("01:00".to_string()),
            ends_next_day: Some(true),
            ..SessionDraft::default()
        };
        let errors = validate(&draft).expect_err("practice cannot run overnight");
        assert_eq!(errors.field("end"), ["end time must be after start time"]);
    }

    #[test]
    fn custom_day_and_extras_carry_through() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 9).expect("valid date");
        let draft = SessionDraft {
            session_type: Some("practice".to_string()),
            start: Some("20:00".to_string()),
            end: Some("21:00".to_string()),
            day: Some(day),
            weather: Some(" dry, 22C ".to_string()),
            server_name: Some("Team server".to_string()),
            server_password: Some("pit".to_string()),
            ..SessionDraft::default()
        };
        let session = validate(&draft).expect("practice should validate");
        assert_eq!(session.day, Some(day));
        assert_eq!(session.weather.as_deref(), Some("dry, 22C"));
        let server = session.server.as_ref().expect("server info");
        assert_eq!(server.name, "Team server");
        assert_eq!(server.password.as_deref(), Some("pit"));

        let round_trip = validate(&SessionDraft::from(&session)).expect("draft rebuilds");
        assert_eq!(round_trip, session);
    }

    #[test]
    fn password_without_server_name_is_rejected() {
        let draft = SessionDraft {
            session_type: Some("briefing".to_string()),
            start: Some("18:00".to_string()),
            server_password: Some("secret".to_string()),
            ..SessionDraft::default()
        };
        let errors = validate(&draft).expect_err("server name missing");
        assert_eq!(errors.field("server_name").len(), 1);
    }

    proptest! {
        #[test]
        fn end_after_start_decides_validity(
            start in 0u32..1440,
            end in 0u32..1440,
            ends_next_day in any::<bool>(),
        ) {
            let fmt = |minutes: u32| format!("{:02}:{:02}", minutes / 60, minutes % 60);
            let result = validate(&race(&fmt(start), &fmt(end), ends_next_day));
            if ends_next_day || end > start {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
            }
        }
    }
}
