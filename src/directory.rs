//! Contracts of the collaborators the wizard talks to.
//!
//! Lookups are read-only. The only effect the wizard produces is one call to
//! [`EventSink::create_event`] or [`EventSink::edit_event`].

use serde::{Deserialize, Serialize};

use crate::errors::SinkError;
use crate::session::ScheduledSession;
use crate::steps::{EventDetails, EventType, Reminders, TeamSelection};

pub type EventId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub member_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<RosterMember>,
}

impl Roster {
    pub fn member_ids(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|member| member.member_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub game: String,
    #[serde(default)]
    pub rosters: Vec<Roster>,
}

impl Team {
    pub fn roster(&self, roster_id: &str) -> Option<&Roster> {
        self.rosters.iter().find(|roster| roster.id == roster_id)
    }
}

/// Everything needed to create or rewrite one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCommand {
    pub event_type: EventType,
    pub details: EventDetails,
    pub team: TeamSelection,
    /// Ordered by absolute start.
    pub sessions: Vec<ScheduledSession>,
    pub reminders: Reminders,
}

pub trait DriverDirectory {
    fn drivers_by_ids(&self, member_ids: &[String]) -> Vec<Driver>;
}

pub trait TeamDirectory {
    fn teams_with_rosters_by_game(&self, game: &str) -> Vec<Team>;
}

pub trait EventSink {
    fn create_event(&mut self, command: &EventCommand) -> Result<EventId, SinkError>;

    fn edit_event(&mut self, event_id: &str, command: &EventCommand) -> Result<EventId, SinkError>;
}
