use chrono::NaiveDate;

use paddock_planner::directory::{
    Driver, DriverDirectory, EventCommand, EventId, EventSink, Roster, RosterMember, Team,
    TeamDirectory,
};
use paddock_planner::errors::SinkError;
use paddock_planner::schedule::format_span;
use paddock_planner::session::{SessionDraft, validate};
use paddock_planner::steps::{
    DetailsRecord, EventType, EventTypeRecord, StepId, StepPatch, TeamRecord,
};
use paddock_planner::store::WizardStore;
use paddock_planner::wizard::{self, Advance};

/// In-memory directory and sink that remembers every command it receives.
#[derive(Default)]
struct RecordingSink {
    created: Vec<EventCommand>,
    edited: Vec<(String, EventCommand)>,
}

impl EventSink for RecordingSink {
    fn create_event(&mut self, command: &EventCommand) -> Result<EventId, SinkError> {
        self.created.push(command.clone());
        Ok(format!("evt-{}", self.created.len()))
    }

    fn edit_event(&mut self, event_id: &str, command: &EventCommand) -> Result<EventId, SinkError> {
        self.edited.push((event_id.to_string(), command.clone()));
        Ok(event_id.to_string())
    }
}

impl TeamDirectory for RecordingSink {
    fn teams_with_rosters_by_game(&self, game: &str) -> Vec<Team> {
        if game != "F1 23" {
            return Vec::new();
        }
        vec![Team {
            id: "T1".to_string(),
            name: "Apex".to_string(),
            game: game.to_string(),
            rosters: vec![Roster {
                id: "R1".to_string(),
                name: "Main".to_string(),
                members: ["D1", "D2"]
                    .into_iter()
                    .map(|id| RosterMember {
                        member_id: id.to_string(),
                    })
                    .collect(),
            }],
        }]
    }
}

impl DriverDirectory for RecordingSink {
    fn drivers_by_ids(&self, member_ids: &[String]) -> Vec<Driver> {
        member_ids
            .iter()
            .map(|id| Driver {
                id: id.clone(),
                name: format!("Driver {id}"),
                number: None,
            })
            .collect()
    }
}

fn may_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).expect("valid date")
}

fn race(start: &str, end: &str, ends_next_day: bool) -> SessionDraft {
    SessionDraft {
        session_type: Some("race".to_string()),
        start: Some(start.to_string()),
        end: Some(end.to_string()),
        ends_next_day: Some(ends_next_day),
        driver_ids: Some(vec!["D1".to_string(), "D2".to_string()]),
        ..SessionDraft::default()
    }
}

#[test]
fn single_event_walks_every_step_and_creates_once() {
    let mut sink = RecordingSink::default();
    let mut store = WizardStore::new();

    store.set_data(StepPatch::EventType(EventTypeRecord {
        event_type: Some(EventType::Single),
    }));
    assert_eq!(wizard::next(&mut store), Ok(Advance::Moved(StepId::SingleDetails)));

    store.set_data(StepPatch::Details(DetailsRecord {
        name: Some("Sprint 1".to_string()),
        date: Some(may_10()),
        game: Some("F1 23".to_string()),
        ..DetailsRecord::default()
    }));
    assert_eq!(wizard::next(&mut store), Ok(Advance::Moved(StepId::SingleTeam)));

    let teams = wizard::team_choices(&sink, store.records());
    let roster = teams[0].roster("R1").expect("roster offered");
    store.set_data(StepPatch::Team(TeamRecord {
        team_id: Some(teams[0].id.clone()),
        roster_id: Some(roster.id.clone()),
        driver_ids: Some(roster.member_ids()),
    }));
    assert_eq!(wizard::next(&mut store), Ok(Advance::Moved(StepId::SingleSessions)));

    let choices = wizard::session_driver_choices(&sink, store.records());
    assert_eq!(choices.len(), 2);
    let session = validate(&race("19:00", "20:30", false)).expect("race should validate");
    let session_id = store.add_session(session);
    assert_eq!(wizard::next(&mut store), Ok(Advance::Moved(StepId::Reminders)));
    assert_eq!(wizard::next(&mut store), Ok(Advance::ReadyToSubmit));

    let submitted = wizard::submit(&mut store, &mut sink).expect("submit should succeed");
    assert_eq!(submitted.event_id, "evt-1");
    assert_eq!(submitted.date, may_10());
    assert!(!submitted.edited);

    assert_eq!(sink.created.len(), 1);
    let command = &sink.created[0];
    assert_eq!(command.event_type, EventType::Single);
    assert_eq!(command.details.name, "Sprint 1");
    assert_eq!(command.team.driver_ids, ["D1", "D2"]);
    assert_eq!(command.sessions.len(), 1);
    assert_eq!(command.sessions[0].id, session_id);
    assert_eq!(command.sessions[0].session.driver_ids(), ["D1", "D2"]);
    assert!(!command.reminders.notify);

    assert_eq!(store, WizardStore::new());
}

#[test]
fn overnight_race_needs_the_next_day_flag() {
    let errors = validate(&race("23:30", "00:30", false)).expect_err("end before start");
    assert_eq!(errors.field("end"), ["end time must be after start time"]);

    let session = validate(&race("23:30", "00:30", true)).expect("overnight race should validate");
    assert!(session.ends_next_day());
    assert_eq!(format_span(&session, may_10()), "10 - 11 May, Fri/Sat");

    let month_end = NaiveDate::from_ymd_opt(2024, 5, 31).expect("valid date");
    assert_eq!(format_span(&session, month_end), "31 - 1 May/Jun, Fri/Sat");
}

#[test]
fn changing_game_clears_car_and_track() {
    let mut store = WizardStore::new();
    store.set_data(StepPatch::Details(DetailsRecord {
        name: Some("Sprint 1".to_string()),
        date: Some(may_10()),
        game: Some("F1 23".to_string()),
        car: Some("RB19".to_string()),
        track: Some("Spa".to_string()),
        ..DetailsRecord::default()
    }));

    store.set_data(StepPatch::Details(DetailsRecord {
        game: Some("ACC".to_string()),
        ..DetailsRecord::default()
    }));

    let details = &store.records().single_event_details;
    assert_eq!(details.game.as_deref(), Some("ACC"));
    assert_eq!(details.car, None);
    assert_eq!(details.track, None);
    assert_eq!(details.name.as_deref(), Some("Sprint 1"));
}

#[test]
fn editing_moves_the_date_and_clears_the_car() {
    let mut sink = RecordingSink::default();
    let mut store = WizardStore::new();
    store.set_data(StepPatch::EventType(EventTypeRecord {
        event_type: Some(EventType::Single),
    }));
    store.set_data(StepPatch::Details(DetailsRecord {
        name: Some("Sprint 1".to_string()),
        date: Some(may_10()),
        game: Some("F1 23".to_string()),
        car: Some("RB19".to_string()),
        track: Some("Spa".to_string()),
        ..DetailsRecord::default()
    }));
    store.set_data(StepPatch::Team(TeamRecord {
        team_id: Some("T1".to_string()),
        roster_id: Some("R1".to_string()),
        driver_ids: Some(vec!["D1".to_string(), "D2".to_string()]),
    }));
    store.add_session(validate(&race("19:00", "20:30", false)).expect("race should validate"));
    let created = wizard::submit(&mut store, &mut sink).expect("create should succeed");
    let original = sink.created[0].clone();

    wizard::begin_edit(&mut store, &created.event_id, &original);
    let may_17 = NaiveDate::from_ymd_opt(2024, 5, 17).expect("valid date");
    store.set_data(StepPatch::Details(DetailsRecord {
        date: Some(may_17),
        car: Some(String::new()),
        ..DetailsRecord::default()
    }));
    assert!(store.sessions().is_empty());
    assert!(wizard::submit(&mut store, &mut sink).is_err());

    store.add_session(validate(&race("20:00", "21:00", false)).expect("race should validate"));
    let edited = wizard::submit(&mut store, &mut sink).expect("edit should succeed");
    assert!(edited.edited);
    assert_eq!(edited.event_id, created.event_id);
    assert_eq!(edited.date, may_17);

    assert_eq!(sink.created, [original]);
    let (event_id, command) = &sink.edited[0];
    assert_eq!(event_id, &created.event_id);
    assert_eq!(command.details.date, may_17);
    assert_eq!(command.details.car, None);
    assert_eq!(command.details.track.as_deref(), Some("Spa"));
    assert_eq!(command.sessions.len(), 1);
    assert_eq!(command.sessions[0].session.start.to_string(), "20:00");
}
