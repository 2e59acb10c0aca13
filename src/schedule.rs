use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::session::{ScheduledSession, Session, SessionType};

/// One line of an ordered schedule, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRow {
    pub id: String,
    pub title: String,
    pub span: String,
    pub time_range: String,
    pub session: Session,
}

/// Orders sessions by their absolute start; equal starts keep insertion order.
pub fn order_sessions(sessions: &[ScheduledSession], event_date: NaiveDate) -> Vec<ScheduledSession> {
    let mut ordered = sessions.to_vec();
    ordered.sort_by_key(|scheduled| scheduled.session.start_instant(event_date));
    ordered
}

/// Titles for an already ordered list: `Qualifying 1`, `Qualifying 2`, but a lone `Race`.
pub fn session_titles(ordered: &[ScheduledSession]) -> Vec<String> {
    let mut totals: HashMap<SessionType, usize> = HashMap::new();
    for scheduled in ordered {
        *totals.entry(scheduled.session.session_type()).or_default() += 1;
    }

    let mut seen: HashMap<SessionType, usize> = HashMap::new();
    ordered
        .iter()
        .map(|scheduled| {
            let session_type = scheduled.session.session_type();
            let ordinal = seen.entry(session_type).or_default();
            *ordinal += 1;
            if totals.get(&session_type).copied().unwrap_or_default() > 1 {
                format!("{} {}", session_type.label(), ordinal)
            } else {
                session_type.label().to_string()
            }
        })
        .collect()
}

pub fn format_span(session: &Session, event_date: NaiveDate) -> String {
    let first = session.anchor(event_date);
    let last = session
        .end_instant(event_date)
        .map(|end| end.date())
        .unwrap_or(first);
    format_day_range(first, last)
}

/// Date label covering every session; `None` for an empty schedule.
pub fn format_schedule_span(sessions: &[ScheduledSession], event_date: NaiveDate) -> Option<String> {
    let first = sessions
        .iter()
        .map(|scheduled| scheduled.session.anchor(event_date))
        .min()?;
    let last = sessions
        .iter()
        .map(|scheduled| {
            let session = &scheduled.session;
            session
                .end_instant(event_date)
                .map(|end| end.date())
                .unwrap_or_else(|| session.anchor(event_date))
        })
        .max()?;
    Some(format_day_range(first, last.max(first)))
}

/// Month names are merged when both days share a month; day numbers never are.
pub fn format_day_range(first: NaiveDate, last: NaiveDate) -> String {
    if first == last {
        return first.format("%-d %B, %A").to_string();
    }

    if first.year() == last.year() && first.month() == last.month() {
        format!(
            "{} - {} {}, {}/{}",
            first.day(),
            last.day(),
            first.format("%B"),
            first.format("%a"),
            last.format("%a")
        )
    } else {
        format!(
            "{} - {} {}/{}, {}/{}",
            first.day(),
            last.day(),
            first.format("%b"),
            last.format("%b"),
            first.format("%a"),
            last.format("%a")
        )
    }
}

pub fn format_time_range(session: &Session) -> String {
    match session.end() {
        None => session.start.to_string(),
        Some(end) if session.ends_next_day() => format!("{} - {} (+1)", session.start, end),
        Some(end) => format!("{} - {}", session.start, end),
    }
}

pub fn schedule_rows(sessions: &[ScheduledSession], event_date: NaiveDate) -> Vec<ScheduleRow> {
    let ordered = order_sessions(sessions, event_date);
    let titles = session_titles(&ordered);
    ordered
        .into_iter()
        .zip(titles)
        .map(|(scheduled, title)| ScheduleRow {
            span: format_span(&scheduled.session, event_date),
            time_range: format_time_range(&scheduled.session),
            id: scheduled.id,
            title,
            session: scheduled.session,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use crate::session::{ScheduledSession, Session, SessionDraft, validate};

    use super::{
        format_day_range, format_schedule_span, format_span, format_time_range, order_sessions,
        schedule_rows, session_titles,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn session(kind: &str, start: &str, end: &str) -> Session {
        validate(&SessionDraft {
            session_type: Some(kind.to_string()),
            start: Some(start.to_string()),
            end: Some(end.to_string()),
            driver_id: Some("D1".to_string()),
            driver_ids: Some(vec!["D1".to_string()]),
            ..SessionDraft::default()
        })
        .expect("session should validate")
    }

    fn scheduled(id: &str, session: Session) -> ScheduledSession {
        ScheduledSession {
            id: id.to_string(),
            session,
        }
    }

    #[test]
    fn orders_by_start_across_custom_days() {
        let event_date = date(2024, 5, 10);
        let mut practice = session("practice", "20:00", "21:00");
        practice.day = Some(date(2024, 5, 9));
        let sessions = vec![
            scheduled("race", session("race", "19:00", "20:30")),
            scheduled("quali", session("qualifying", "18:30", "18:50")),
            scheduled("practice", practice),
        ];

        let ordered = order_sessions(&sessions, event_date);
        let ids = ordered.iter().map(|s| s.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["practice", "quali", "race"]);
    }

    #[test]
    fn numbers_repeated_types_only() {
        let sessions = vec![
            scheduled("q1", session("qualifying", "18:00", "18:10")),
            scheduled("q2", session("qualifying", "18:15", "18:25")),
            scheduled("race", session("race", "19:00", "20:00")),
            scheduled("brief", session("briefing", "17:45", "")),
        ];
        let ordered = order_sessions(&sessions, date(2024, 5, 10));
        assert_eq!(
            session_titles(&ordered),
            ["Briefing", "Qualifying 1", "Qualifying 2", "Race"]
        );
    }

    #[test]
    fn single_day_and_overnight_labels() {
        let event_date = date(2024, 5, 10);
        let evening = session("race", "19:00", "20:30");
        assert_eq!(format_span(&evening, event_date), "10 May, Friday");

        let overnight = validate(&SessionDraft {
            session_type: Some("race".to_string()),
            start: Some("23:30".to_string()),
            end: Some("00:30".to_string()),
            driver_ids: Some(vec!["D1".to_string()]),
            ends_next_day: Some(true),
            ..SessionDraft::default()
        })
        .expect("overnight race should validate");
        assert_eq!(format_span(&overnight, event_date), "10 - 11 May, Fri/Sat");
        assert_eq!(format_span(&overnight, date(2024, 5, 31)), "31 - 1 May/Jun, Fri/Sat");
        assert_eq!(format_time_range(&overnight), "23:30 - 00:30 (+1)");
        assert_eq!(format_time_range(&evening), "19:00 - 20:30");
    }

    #[test]
    fn schedule_span_collapses_same_day() {
        let event_date = date(2024, 5, 10);
        let sessions = vec![
            scheduled("a", session("practice", "18:00", "18:30")),
            scheduled("b", session("race", "19:00", "20:30")),
        ];
        assert_eq!(
            format_schedule_span(&sessions, event_date).as_deref(),
            Some("10 May, Friday")
        );
        assert_eq!(format_schedule_span(&[], event_date), None);

        let mut early = session("practice", "20:00", "21:00");
        early.day = Some(date(2024, 5, 9));
        let mut spread = sessions.clone();
        spread.push(scheduled("c", early));
        assert_eq!(
            format_schedule_span(&spread, event_date).as_deref(),
            Some("9 - 10 May, Thu/Fri")
        );
    }

    #[test]
    fn day_range_formats() {
        assert_eq!(format_day_range(date(2024, 12, 31), date(2025, 1, 1)), "31 - 1 Dec/Jan, Tue/Wed");
    }

    #[test]
    fn rows_pair_titles_with_sessions() {
        let sessions = vec![
            scheduled("race", session("race", "19:00", "20:30")),
            scheduled("brief", session("briefing", "18:45", "")),
        ];
        let rows = schedule_rows(&sessions, date(2024, 5, 10));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "brief");
        assert_eq!(rows[0].time_range, "18:45");
        assert_eq!(rows[1].title, "Race");
        assert_eq!(rows[1].span, "10 May, Friday");
    }

    proptest! {
        #[test]
        fn ordering_is_stable_for_equal_starts(
            starts in proptest::collection::vec(0u32..4, 1..24),
        ) {
            let sessions = starts
                .iter()
                .enumerate()
                .map(|(index, hour)| {
                    let start = format!("{:02}:00", 18 + hour);
                    scheduled(&index.to_string(), session("briefing", &start, ""))
                })
                .collect::<Vec<_>>();

            let ordered = order_sessions(&sessions, date(2024, 5, 10));
            prop_assert_eq!(ordered.len(), sessions.len());
            for pair in ordered.windows(2) {
                let left = pair[0].session.start;
                let right = pair[1].session.start;
                prop_assert!(left <= right);
                if left == right {
                    let left_index: usize = pair[0].id.parse().expect("numeric id");
                    let right_index: usize = pair[1].id.parse().expect("numeric id");
                    prop_assert!(left_index < right_index);
                }
            }
        }
    }
}
