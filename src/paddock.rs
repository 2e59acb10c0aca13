use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::{
    Driver, DriverDirectory, EventCommand, EventId, EventSink, Roster, RosterMember, Team,
    TeamDirectory,
};
use crate::errors::SinkError;
use crate::session::generate_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddockHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub drivers: Vec<Driver>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

impl PaddockHeader {
    pub fn new() -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            drivers: Vec::new(),
            teams: Vec::new(),
        }
    }
}

impl Default for PaddockHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// One revision of an event; later revisions with the same id replace earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub revision: u32,
    pub recorded_at: DateTime<Utc>,
    pub command: EventCommand,
}

impl EventRecord {
    /// Calendar days the event touches, including the morning after overnight sessions.
    pub fn days(&self) -> BTreeSet<NaiveDate> {
        let event_date = self.command.details.date;
        let mut days = BTreeSet::from([event_date]);
        for scheduled in &self.command.sessions {
            let session = &scheduled.session;
            days.insert(session.anchor(event_date));
            if let Some(end) = session.end_instant(event_date) {
                days.insert(end.date());
            }
        }
        days
    }
}

/// Local store of drivers, teams and the event log.
#[derive(Debug, Clone, Default)]
pub struct Paddock {
    pub header: PaddockHeader,
    pub records: Vec<EventRecord>,
}

impl Paddock {
    pub fn new() -> Self {
        Self {
            header: PaddockHeader::new(),
            records: Vec::new(),
        }
    }

    pub fn driver(&self, id: &str) -> Option<&Driver> {
        self.header.drivers.iter().find(|driver| driver.id == id)
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.header.teams.iter().find(|team| team.id == id)
    }

    pub fn add_driver(&mut self, name: String, number: Option<u32>) -> String {
        let id = generate_id();
        self.header.drivers.push(Driver {
            id: id.clone(),
            name,
            number,
        });
        id
    }

    pub fn add_team(&mut self, name: String, game: String) -> String {
        let id = generate_id();
        self.header.teams.push(Team {
            id: id.clone(),
            name,
            game,
            rosters: Vec::new(),
        });
        id
    }

    pub fn add_roster(&mut self, team_id: &str, name: String) -> Result<String, SinkError> {
        let team = self
            .header
            .teams
            .iter_mut()
            .find(|team| team.id == team_id)
            .ok_or_else(|| SinkError::TeamNotFound(team_id.to_string()))?;

        let id = generate_id();
        team.rosters.push(Roster {
            id: id.clone(),
            name,
            members: Vec::new(),
        });
        Ok(id)
    }

    pub fn add_member(&mut self, team_id: &str, roster_id: &str, driver_id: &str) -> Result<(), SinkError> {
        if self.driver(driver_id).is_none() {
            return Err(SinkError::DriverNotFound(driver_id.to_string()));
        }

        let roster = self
            .header
            .teams
            .iter_mut()
            .find(|team| team.id == team_id)
            .ok_or_else(|| SinkError::TeamNotFound(team_id.to_string()))?
            .rosters
            .iter_mut()
            .find(|roster| roster.id == roster_id)
            .ok_or_else(|| SinkError::RosterNotFound {
                team_id: team_id.to_string(),
                roster_id: roster_id.to_string(),
            })?;

        if !roster.members.iter().any(|member| member.member_id == driver_id) {
            roster.members.push(RosterMember {
                member_id: driver_id.to_string(),
            });
        }
        Ok(())
    }

    /// Latest revision of every event, in creation order.
    pub fn events(&self) -> Vec<EventRecord> {
        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, EventRecord> = HashMap::new();
        for record in &self.records {
            match latest.get(&record.event_id) {
                Some(existing) if existing.revision > record.revision => {}
                Some(_) => {
                    latest.insert(record.event_id.clone(), record.clone());
                }
                None => {
                    order.push(record.event_id.clone());
                    latest.insert(record.event_id.clone(), record.clone());
                }
            }
        }

        order
            .into_iter()
            .filter_map(|event_id| latest.remove(&event_id))
            .collect()
    }

    pub fn event(&self, event_id: &str) -> Option<EventRecord> {
        self.events()
            .into_iter()
            .find(|record| record.event_id == event_id)
    }

    pub fn events_on_day(&self, day: NaiveDate) -> Vec<EventRecord> {
        self.events()
            .into_iter()
            .filter(|record| record.days().contains(&day))
            .collect()
    }

    pub fn event_days(&self) -> BTreeSet<NaiveDate> {
        self.events()
            .iter()
            .flat_map(|record| record.days())
            .collect()
    }

    fn check_references(&self, command: &EventCommand) -> Result<(), SinkError> {
        let team_id = &command.team.team_id;
        let team = self
            .team(team_id)
            .ok_or_else(|| SinkError::TeamNotFound(team_id.clone()))?;
        if team.roster(&command.team.roster_id).is_none() {
            return Err(SinkError::RosterNotFound {
                team_id: team_id.clone(),
                roster_id: command.team.roster_id.clone(),
            });
        }

        let session_drivers = command
            .sessions
            .iter()
            .flat_map(|scheduled| scheduled.session.driver_ids());
        for driver_id in command.team.driver_ids.iter().map(String::as_str).chain(session_drivers) {
            if self.driver(driver_id).is_none() {
                return Err(SinkError::DriverNotFound(driver_id.to_string()));
            }
        }
        Ok(())
    }
}

impl DriverDirectory for Paddock {
    fn drivers_by_ids(&self, member_ids: &[String]) -> Vec<Driver> {
        member_ids
            .iter()
            .filter_map(|id| self.driver(id).cloned())
            .collect()
    }
}

impl TeamDirectory for Paddock {
    fn teams_with_rosters_by_game(&self, game: &str) -> Vec<Team> {
        self.header
            .teams
            .iter()
            .filter(|team| team.game.eq_ignore_ascii_case(game.trim()))
            .cloned()
            .collect()
    }
}

impl EventSink for Paddock {
    fn create_event(&mut self, command: &EventCommand) -> Result<EventId, SinkError> {
        self.check_references(command)?;
        let event_id = generate_id();
        self.records.push(EventRecord {
            event_id: event_id.clone(),
            revision: 1,
            recorded_at: Utc::now(),
            command: command.clone(),
        });
        Ok(event_id)
    }

    fn edit_event(&mut self, event_id: &str, command: &EventCommand) -> Result<EventId, SinkError> {
        let current = self
            .event(event_id)
            .ok_or_else(|| SinkError::EventNotFound(event_id.to_string()))?;
        self.check_references(command)?;
        self.records.push(EventRecord {
            event_id: event_id.to_string(),
            revision: current.revision + 1,
            recorded_at: Utc::now(),
            command: command.clone(),
        });
        Ok(event_id.to_string())
    }
}
