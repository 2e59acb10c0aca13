use std::collections::BTreeSet;
use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use paddock_planner::calendar::{MonthGrid, WeekStart, build_grid, first_day_of_month, shift_month};
use paddock_planner::config::Settings;
use paddock_planner::directory::DriverDirectory;
use paddock_planner::errors::WizardError;
use paddock_planner::paddock::Paddock;
use paddock_planner::schedule::{ScheduleRow, format_schedule_span, schedule_rows};
use paddock_planner::session::{FieldErrors, SessionDraft, SessionType, validate};
use paddock_planner::steps::{
	DetailsRecord, EventType, EventTypeRecord, RemindersRecord, StepId, StepPatch, TeamRecord,
};
use paddock_planner::storage::save_paddock;
use paddock_planner::store::WizardStore;
use paddock_planner::wizard::{self, Advance};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);

pub fn run_wizard(paddock: &mut Paddock, paddock_path: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, paddock, paddock_path, settings);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	paddock: &mut Paddock,
	paddock_path: &Path,
	settings: &Settings,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(settings);

	loop {
		let view = build_view(&app, paddock);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_wizard(frame, &app, paddock, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, paddock),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, paddock),
					InputMode::Normal => handle_normal_key(&mut app, key.code, paddock, paddock_path, &view),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_wizard(frame: &mut Frame, app: &App, paddock: &Paddock, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(6)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(28),
			Constraint::Percentage(44),
			Constraint::Percentage(28),
		])
		.split(layout[0]);

	let left = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(10), Constraint::Min(8)])
		.split(body[0]);

	render_calendar_panel(frame, left[0], app, view);
	render_progress_panel(frame, left[1], app, view);
	render_step_panel(frame, body[1], app, paddock, view);
	render_checks_panel(frame, body[2], app, view);
	render_footer(frame, layout[1], app);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_calendar_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let mut lines = Vec::new();
	match &view.grid {
		Some(grid) => {
			lines.push(Line::from(grid.title()));
			lines.push(Line::from(app.week_start.header()));
			for week in &grid.cells {
				let spans = week
					.iter()
					.map(|date| Span::styled(format!("{:>2} ", date.day()), calendar_day_style(*date, grid, app, view)))
					.collect::<Vec<_>>();
				lines.push(Line::from(spans));
			}
		}
		None => lines.push(Line::from("(calendar unavailable)")),
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Calendar")
		.border_style(border_style(false));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn calendar_day_style(date: NaiveDate, grid: &MonthGrid, app: &App, view: &ViewModel) -> Style {
	if date == app.selected_day {
		Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
	} else if Some(date) == view.event_date {
		Style::default().fg(Color::Black).bg(Color::Cyan)
	} else if !grid.is_in_month(date) {
		Style::default().fg(Color::DarkGray)
	} else if view.event_days.contains(&date) {
		Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD)
	} else {
		Style::default()
	}
}

fn render_progress_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let current = app.store.current_step();
	let lines = view
		.path
		.iter()
		.enumerate()
		.map(|(index, (step, complete))| {
			let marker = if *complete { "x" } else { " " };
			let style = if *step == current {
				Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
			} else {
				Style::default()
			};
			Line::from(Span::styled(format!("[{marker}] {}. {}", index + 1, step.title()), style))
		})
		.collect::<Vec<_>>();

	let title = match app.store.edit_target() {
		Some(event_id) if app.store.is_edit_mode() => format!("Editing {event_id}"),
		_ => "New event".to_string(),
	};
	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
	frame.render_widget(panel, area);
}

fn render_step_panel(frame: &mut Frame, area: Rect, app: &App, paddock: &Paddock, view: &ViewModel) {
	let step = app.store.current_step();
	let position = view
		.path
		.iter()
		.position(|(candidate, _)| *candidate == step)
		.map(|index| index + 1)
		.unwrap_or(1);
	let title = format!("Step {position}/{}: {}", view.path.len(), step.title());
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(true));

	if step == StepId::SingleSessions {
		let items = if view.rows.is_empty() {
			vec![ListItem::new("(no sessions yet, press a to add one)")]
		} else {
			view.rows
				.iter()
				.map(|row| ListItem::new(render_session_row_line(row, paddock)))
				.collect::<Vec<_>>()
		};

		let mut state = ListState::default();
		if !view.rows.is_empty() {
			state.select(Some(app.session_index.min(view.rows.len() - 1)));
		}
		let list = List::new(items)
			.block(block)
			.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
		frame.render_stateful_widget(list, area, &mut state);
		return;
	}

	let lines = step_summary_lines(step, &app.store, paddock);
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_session_row_line(row: &ScheduleRow, paddock: &Paddock) -> Line<'static> {
	let drivers = row
		.session
		.driver_ids()
		.into_iter()
		.map(|id| driver_label(paddock, id))
		.collect::<Vec<_>>();

	let mut spans = vec![
		Span::styled(row.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
		Span::raw(format!(" | {} | ", row.span)),
		Span::styled(row.time_range.clone(), Style::default().fg(Color::LightCyan)),
	];
	if !drivers.is_empty() {
		spans.push(Span::raw(format!(" | {}", drivers.join(", "))));
	}
	Line::from(spans)
}

fn step_summary_lines(step: StepId, store: &WizardStore, paddock: &Paddock) -> Vec<Line<'static>> {
	let records = store.records();
	match step {
		StepId::EventType => vec![
			field_line("Event type", records.event_type.event_type.map(event_type_label)),
			Line::from(""),
			Line::from("Enter to choose"),
		],
		StepId::SingleDetails => {
			let details = &records.single_event_details;
			vec![
				field_line("Name", details.name.clone()),
				field_line("Date", details.date.map(|date| date.format("%A, %-d %B %Y").to_string())),
				field_line("Game", details.game.clone()),
				field_line("Car", details.car.clone()),
				field_line("Track", details.track.clone()),
				field_line("Description", details.description.clone()),
				Line::from(""),
				Line::from("Enter to edit | t use selected day as date"),
			]
		}
		StepId::ChampionshipDetails => vec![Line::from("Championship events are not available yet.")],
		StepId::SingleTeam => {
			let team_record = &records.single_event_team;
			let team = team_record.team_id.as_deref().and_then(|id| paddock.team(id));
			let roster = team
				.zip(team_record.roster_id.as_deref())
				.and_then(|(team, roster_id)| team.roster(roster_id));
			let drivers = team_record.driver_ids.as_ref().map(|ids| {
				ids.iter()
					.map(|id| driver_label(paddock, id))
					.collect::<Vec<_>>()
					.join(", ")
			});
			vec![
				field_line("Team", team.map(|team| team.name.clone())),
				field_line("Roster", roster.map(|roster| roster.name.clone())),
				field_line("Drivers", drivers),
				Line::from(""),
				Line::from("Enter to choose team, roster and drivers"),
			]
		}
		StepId::SingleSessions => Vec::new(),
		StepId::Reminders => {
			let reminders = &records.reminders;
			let offsets = reminders.offsets_minutes.as_ref().map(|offsets| {
				offsets
					.iter()
					.map(|offset| format!("{offset} min"))
					.collect::<Vec<_>>()
					.join(", ")
			});
			vec![
				field_line(
					"Notify",
					Some(if reminders.notify.unwrap_or(false) { "yes" } else { "no" }.to_string()),
				),
				field_line("Before start", offsets),
				field_line("Message", reminders.message.clone()),
				Line::from(""),
				Line::from("Enter to edit | s submit"),
			]
		}
	}
}

fn render_checks_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let mut lines = Vec::new();
	if let Some(span) = &view.schedule_span {
		lines.push(Line::from("Schedule"));
		lines.push(Line::from(span.clone()));
		lines.push(Line::from(""));
	}

	match &app.errors {
		Some(errors) if !errors.is_empty() => {
			lines.push(Line::from(Span::styled(
				"Needs attention",
				Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
			)));
			for message in errors.form_messages() {
				lines.push(Line::from(format!("- {message}")));
			}
			for (field, messages) in errors.fields() {
				for message in messages {
					lines.push(Line::from(format!("- {field}: {message}")));
				}
			}
		}
		_ => lines.push(Line::from("No problems found")),
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Checks"));
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("n/p next/prev step | Enter edit step | a/d add/delete session | s submit | Esc reset | q quit"),
			Line::from("h/l day | [/] month | t set event date | j/k move | o open event for editing"),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
			Line::from(app.status.clone()),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from(format!(
				"Selected: {}",
				select
					.selected_option()
					.map(|option| option.label.as_str())
					.unwrap_or("(none)")
			)),
			Line::from(if select.multi {
				"j/k move | space mark | Enter confirm | Esc cancel"
			} else {
				"j/k or arrows move | Enter choose | Esc cancel"
			}),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(62, 55, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.enumerate()
			.map(|(index, option)| {
				let label = if select.multi {
					let mark = if select.marked.contains(&index) { "x" } else { " " };
					format!("[{mark}] {}", option.label)
				} else {
					option.label.clone()
				};
				ListItem::new(label)
			})
			.collect::<Vec<_>>()
	};

	let current = if select.options.is_empty() {
		0
	} else {
		select.selected.saturating_add(1)
	};
	let total = select.options.len();
	let list = List::new(items)
		.block(
			Block::default()
				.borders(Borders::ALL)
				.title(format!("{} ({current}/{total})", select.title)),
		)
		.highlight_symbol(">> ")
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR));

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len().saturating_sub(1))));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	paddock: &mut Paddock,
	paddock_path: &Path,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') => return true,
		KeyCode::Esc => {
			app.reset_wizard();
			app.status = "Wizard reset".to_string();
		}
		KeyCode::Char('n') => advance(app),
		KeyCode::Char('p') => {
			let step = wizard::prev(&mut app.store);
			app.errors = None;
			app.status = format!("Back to {}", step.title());
		}
		KeyCode::Enter | KeyCode::Char('e') => match open_step_editor(app, paddock) {
			Ok(mode) => app.mode = mode,
			Err(err) => app.status = format!("error: {err}"),
		},
		KeyCode::Char('a') => {
			if app.store.current_step() == StepId::SingleSessions {
				app.mode = InputMode::Select(build_session_type_select());
			} else {
				app.status = "Sessions are added on the sessions step".to_string();
			}
		}
		KeyCode::Char('d') => {
			if app.store.current_step() != StepId::SingleSessions {
				app.status = "Sessions are deleted on the sessions step".to_string();
			} else if let Some(row) = view.rows.get(app.session_index) {
				app.store.remove_session(&row.id);
				app.status = format!("Deleted {}", row.title);
			} else {
				app.status = "No session selected".to_string();
			}
		}
		KeyCode::Up | KeyCode::Char('k') => {
			app.session_index = app.session_index.saturating_sub(1);
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if !view.rows.is_empty() {
				app.session_index = (app.session_index + 1).min(view.rows.len() - 1);
			}
		}
		KeyCode::Left | KeyCode::Char('h') => app.shift_selected_day(-1),
		KeyCode::Right | KeyCode::Char('l') => app.shift_selected_day(1),
		KeyCode::Char('[') => app.shift_selected_month(-1),
		KeyCode::Char(']') => app.shift_selected_month(1),
		KeyCode::Char('t') => {
			app.store.set_data(StepPatch::Details(DetailsRecord {
				date: Some(app.selected_day),
				..DetailsRecord::default()
			}));
			app.status = format!("Event date set to {}", app.selected_day.format("%-d %B %Y"));
		}
		KeyCode::Char('o') => match build_open_event_select(paddock) {
			Ok(select) => app.mode = InputMode::Select(select),
			Err(err) => app.status = format!("error: {err}"),
		},
		KeyCode::Char('s') => submit(app, paddock, paddock_path),
		_ => {}
	}

	false
}

fn advance(app: &mut App) {
	match wizard::next(&mut app.store) {
		Ok(Advance::Moved(step)) => {
			app.errors = None;
			app.status = format!("Step: {}", step.title());
		}
		Ok(Advance::ReadyToSubmit) => {
			app.errors = None;
			app.status = "All steps complete, press s to submit".to_string();
		}
		Err(WizardError::StepIncomplete { step, errors }) => {
			app.status = format!("{} is incomplete", step.title());
			app.errors = Some(errors);
		}
		Err(err) => app.status = format!("error: {err}"),
	}
}

fn submit(app: &mut App, paddock: &mut Paddock, paddock_path: &Path) {
	match wizard::submit(&mut app.store, paddock) {
		Ok(submitted) => {
			app.reset_wizard();
			app.selected_day = submitted.date;
			app.calendar_month = first_day_of_month(submitted.date);
			let verb = if submitted.edited { "Updated" } else { "Created" };
			app.status = match persist(paddock_path, paddock) {
				Ok(()) => format!("{verb} event {}", submitted.event_id),
				Err(err) => format!("{verb} event {} but saving failed: {err}", submitted.event_id),
			};
		}
		Err(WizardError::StepIncomplete { step, errors }) => {
			app.store.set_step(step);
			app.status = format!("{} is incomplete", step.title());
			app.errors = Some(errors);
		}
		Err(err) => app.status = format!("error: {err}"),
	}
}

fn handle_prompt_key(app: &mut App, code: KeyCode, paddock: &Paddock) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), &mut app.store, paddock) {
				Ok(Outcome::Prompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(Outcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(Outcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(app: &mut App, code: KeyCode, paddock: &Paddock) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Char(' ') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.toggle_mark();
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), &mut app.store, paddock) {
				Ok(Outcome::Prompt(prompt)) => app.mode = InputMode::Prompt(prompt),
				Ok(Outcome::Select(next_select)) => app.mode = InputMode::Select(next_select),
				Ok(Outcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.errors = None;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn open_step_editor(app: &App, paddock: &Paddock) -> Result<InputMode, String> {
	let records = app.store.records();
	match app.store.current_step() {
		StepId::EventType => Ok(InputMode::Select(build_event_type_select())),
		StepId::SingleDetails => {
			let details = records.single_event_details.clone();
			Ok(InputMode::Prompt(details_prompt(DetailsField::Name, details, app.selected_day)))
		}
		StepId::ChampionshipDetails => Err("championship events are not available yet".to_string()),
		StepId::SingleTeam => build_team_select(paddock, &app.store).map(InputMode::Select),
		StepId::SingleSessions => Ok(InputMode::Select(build_session_type_select())),
		StepId::Reminders => Ok(InputMode::Select(build_notify_select())),
	}
}

fn submit_prompt(prompt: PromptState, store: &mut WizardStore, paddock: &Paddock) -> Result<Outcome, String> {
	match prompt.kind {
		PromptKind::Details {
			field,
			mut details,
			fallback_day,
		} => {
			field.apply(&mut details, &prompt.input)?;
			match field.next() {
				Some(next) => Ok(Outcome::Prompt(details_prompt(next, details, fallback_day))),
				None => {
					store.set_data(StepPatch::Details(details));
					Ok(Outcome::Done("Event details saved".to_string()))
				}
			}
		}
		PromptKind::SessionStart { mut draft } => {
			draft.start = optional_text(&prompt.input);
			if draft_type(&draft) == Some(SessionType::Briefing) {
				return Ok(session_extras(draft));
			}
			Ok(Outcome::Prompt(PromptState::new("End time (HH:MM)", PromptKind::SessionEnd { draft })))
		}
		PromptKind::SessionEnd { mut draft } => {
			draft.end = optional_text(&prompt.input);
			match draft_type(&draft) {
				Some(SessionType::Race) => Ok(Outcome::Select(build_ends_next_day_select(draft))),
				Some(SessionType::Qualifying) => Ok(session_driver_step(store, paddock, draft, false)),
				_ => Ok(session_extras(draft)),
			}
		}
		PromptKind::SessionDay { mut draft } => {
			draft.day = match optional_text(&prompt.input) {
				Some(raw) => Some(
					NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
						.map_err(|_| format!("session day must be YYYY-MM-DD, got {raw}"))?,
				),
				None => None,
			};
			Ok(Outcome::Prompt(PromptState::new(
				"Weather (optional)",
				PromptKind::SessionWeather { draft },
			)))
		}
		PromptKind::SessionWeather { mut draft } => {
			draft.weather = optional_text(&prompt.input);
			Ok(Outcome::Prompt(PromptState::new(
				"Server name (optional)",
				PromptKind::SessionServer { draft },
			)))
		}
		PromptKind::SessionServer { mut draft } => {
			draft.server_name = optional_text(&prompt.input);
			if draft.server_name.is_none() {
				return Ok(finish_session(store, draft));
			}
			Ok(Outcome::Prompt(PromptState::new(
				"Server password (optional)",
				PromptKind::SessionPassword { draft },
			)))
		}
		PromptKind::SessionPassword { mut draft } => {
			draft.server_password = optional_text(&prompt.input);
			Ok(finish_session(store, draft))
		}
		PromptKind::ReminderOffsets { mut reminders } => {
			reminders.offsets_minutes = Some(parse_offsets(&prompt.input)?);
			let current = reminders.message.clone().unwrap_or_default();
			Ok(Outcome::Prompt(PromptState::with_input(
				"Reminder message (optional)",
				PromptKind::ReminderMessage { reminders },
				current,
			)))
		}
		PromptKind::ReminderMessage { mut reminders } => {
			reminders.message = Some(prompt.input.trim().to_string());
			store.set_data(StepPatch::Reminders(reminders));
			Ok(Outcome::Done("Reminders saved".to_string()))
		}
	}
}

fn submit_select(select: SelectState, store: &mut WizardStore, paddock: &Paddock) -> Result<Outcome, String> {
	if let SelectKind::TeamDrivers { team_id, roster_id } = &select.kind {
		let driver_ids = select.chosen_values();
		if driver_ids.is_empty() {
			return Err("select at least one driver".to_string());
		}
		store.set_data(StepPatch::Team(TeamRecord {
			team_id: Some(team_id.clone()),
			roster_id: Some(roster_id.clone()),
			driver_ids: Some(driver_ids),
		}));
		return Ok(Outcome::Done("Team and drivers saved".to_string()));
	}
	if let SelectKind::SessionDrivers { draft } = &select.kind {
		let mut draft = draft.clone();
		draft.driver_ids = Some(select.chosen_values());
		return Ok(session_extras(draft));
	}

	let selected_value = select
		.selected_option()
		.map(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::EventType => {
			let event_type = match selected_value.as_str() {
				"championship" => EventType::Championship,
				_ => EventType::Single,
			};
			store.set_data(StepPatch::EventType(EventTypeRecord {
				event_type: Some(event_type),
			}));
			Ok(Outcome::Done(format!("Event type: {}", event_type_label(event_type))))
		}
		SelectKind::Team => build_roster_select(paddock, selected_value).map(Outcome::Select),
		SelectKind::Roster { team_id } => {
			build_team_drivers_select(paddock, team_id, selected_value).map(Outcome::Select)
		}
		SelectKind::SessionType => {
			let draft = SessionDraft {
				session_type: Some(selected_value),
				..SessionDraft::default()
			};
			Ok(Outcome::Prompt(PromptState::new(
				"Start time (HH:MM)",
				PromptKind::SessionStart { draft },
			)))
		}
		SelectKind::SessionEndsNextDay { mut draft } => {
			draft.ends_next_day = Some(selected_value == "yes");
			Ok(session_driver_step(store, paddock, draft, true))
		}
		SelectKind::SessionDriver { mut draft } => {
			draft.driver_id = Some(selected_value);
			Ok(session_extras(draft))
		}
		SelectKind::Notify => {
			if selected_value == "yes" {
				let reminders = RemindersRecord {
					notify: Some(true),
					..store.records().reminders.clone()
				};
				let current = reminders
					.offsets_minutes
					.as_ref()
					.map(|offsets| {
						offsets
							.iter()
							.map(u32::to_string)
							.collect::<Vec<_>>()
							.join(", ")
					})
					.unwrap_or_default();
				Ok(Outcome::Prompt(PromptState::with_input(
					"Minutes before start, comma separated",
					PromptKind::ReminderOffsets { reminders },
					current,
				)))
			} else {
				store.set_data(StepPatch::Reminders(RemindersRecord {
					notify: Some(false),
					..RemindersRecord::default()
				}));
				Ok(Outcome::Done("Reminders off".to_string()))
			}
		}
		SelectKind::OpenEvent => {
			let record = paddock
				.event(&selected_value)
				.ok_or_else(|| format!("event not found: {selected_value}"))?;
			wizard::begin_edit(store, &record.event_id, &record.command);
			Ok(Outcome::Done(format!("Editing {}", record.command.details.name)))
		}
		SelectKind::TeamDrivers { .. } | SelectKind::SessionDrivers { .. } => {
			Err("selection already handled".to_string())
		}
	}
}

/// Drivers for a new session come from the ones picked at the team step.
fn session_driver_step(store: &WizardStore, paddock: &Paddock, draft: SessionDraft, multi: bool) -> Outcome {
	let options = wizard::session_driver_choices(paddock, store.records())
		.into_iter()
		.map(|driver| SelectOption::new(driver_name(&driver.name, driver.number), driver.id))
		.collect::<Vec<_>>();
	if options.is_empty() {
		return session_extras(draft);
	}

	if multi {
		let count = options.len();
		let mut select = SelectState::multi("Race drivers", SelectKind::SessionDrivers { draft }, options);
		select.marked = (0..count).collect();
		Outcome::Select(select)
	} else {
		Outcome::Select(SelectState::new("Qualifying driver", SelectKind::SessionDriver { draft }, options))
	}
}

/// Optional per-session settings, asked once the type-specific fields are in.
fn session_extras(draft: SessionDraft) -> Outcome {
	Outcome::Prompt(PromptState::new(
		"Session day (YYYY-MM-DD, blank for the event date)",
		PromptKind::SessionDay { draft },
	))
}

fn finish_session(store: &mut WizardStore, draft: SessionDraft) -> Outcome {
	match validate(&draft) {
		Ok(session) => {
			let label = format!("{} at {}", session.session_type().label(), session.start);
			store.add_session(session);
			Outcome::Done(format!("Added {label}"))
		}
		Err(errors) => Outcome::Done(format!("Session not added: {errors}")),
	}
}

fn draft_type(draft: &SessionDraft) -> Option<SessionType> {
	draft.session_type.as_deref()?.parse().ok()
}

fn details_prompt(field: DetailsField, details: DetailsRecord, fallback_day: NaiveDate) -> PromptState {
	let current = field.current(&details, fallback_day);
	PromptState::with_input(
		field.title(),
		PromptKind::Details {
			field,
			details,
			fallback_day,
		},
		current,
	)
}

fn build_event_type_select() -> SelectState {
	SelectState::new(
		"Event type",
		SelectKind::EventType,
		vec![
			SelectOption::new("Single event", "single".to_string()),
			SelectOption::new("Championship (not available yet)", "championship".to_string()),
		],
	)
}

fn build_team_select(paddock: &Paddock, store: &WizardStore) -> Result<SelectState, String> {
	let game = store
		.records()
		.single_event_details
		.game
		.clone()
		.ok_or_else(|| "choose a game on the details step first".to_string())?;
	let options = wizard::team_choices(paddock, store.records())
		.into_iter()
		.map(|team| SelectOption::new(format!("{} ({} rosters)", team.name, team.rosters.len()), team.id))
		.collect::<Vec<_>>();
	if options.is_empty() {
		return Err(format!("no teams play {game}"));
	}
	Ok(SelectState::new("Team", SelectKind::Team, options))
}

fn build_roster_select(paddock: &Paddock, team_id: String) -> Result<SelectState, String> {
	let team = paddock
		.team(&team_id)
		.ok_or_else(|| format!("team not found: {team_id}"))?;
	let options = team
		.rosters
		.iter()
		.map(|roster| SelectOption::new(format!("{} ({} drivers)", roster.name, roster.members.len()), roster.id.clone()))
		.collect::<Vec<_>>();
	if options.is_empty() {
		return Err(format!("{} has no rosters", team.name));
	}
	Ok(SelectState::new("Roster", SelectKind::Roster { team_id }, options))
}

fn build_team_drivers_select(paddock: &Paddock, team_id: String, roster_id: String) -> Result<SelectState, String> {
	let roster = paddock
		.team(&team_id)
		.and_then(|team| team.roster(&roster_id))
		.ok_or_else(|| format!("roster not found: {roster_id}"))?;
	let options = paddock
		.drivers_by_ids(&roster.member_ids())
		.into_iter()
		.map(|driver| SelectOption::new(driver_name(&driver.name, driver.number), driver.id))
		.collect::<Vec<_>>();
	if options.is_empty() {
		return Err(format!("{} has no drivers", roster.name));
	}

	let count = options.len();
	let mut select = SelectState::multi("Drivers", SelectKind::TeamDrivers { team_id, roster_id }, options);
	select.marked = (0..count).collect();
	Ok(select)
}

fn build_session_type_select() -> SelectState {
	let options = SessionType::ALL
		.into_iter()
		.map(|kind| SelectOption::new(kind.label(), kind.key().to_string()))
		.collect();
	SelectState::new("Session type", SelectKind::SessionType, options)
}

fn build_ends_next_day_select(draft: SessionDraft) -> SelectState {
	SelectState::new(
		"Finishes after midnight?",
		SelectKind::SessionEndsNextDay { draft },
		vec![
			SelectOption::new("No", "no".to_string()),
			SelectOption::new("Yes", "yes".to_string()),
		],
	)
}

fn build_notify_select() -> SelectState {
	SelectState::new(
		"Send reminders?",
		SelectKind::Notify,
		vec![
			SelectOption::new("Yes", "yes".to_string()),
			SelectOption::new("No", "no".to_string()),
		],
	)
}

fn build_open_event_select(paddock: &Paddock) -> Result<SelectState, String> {
	let mut events = paddock.events();
	if events.is_empty() {
		return Err("no events to edit".to_string());
	}
	events.sort_by_key(|record| record.command.details.date);

	let options = events
		.into_iter()
		.map(|record| {
			SelectOption::new(
				format!(
					"{} | {} | {}",
					record.command.details.date.format("%Y-%m-%d"),
					record.command.details.name,
					record.command.details.game
				),
				record.event_id,
			)
		})
		.collect();
	Ok(SelectState::new("Open event", SelectKind::OpenEvent, options))
}

fn build_view(app: &App, paddock: &Paddock) -> ViewModel {
	let records = app.store.records();
	let event_date = records.single_event_details.date;
	let schedule_date = event_date.unwrap_or(app.selected_day);
	let path = wizard::resolved_path(records)
		.into_iter()
		.map(|step| (step, wizard::check_step(records, step).is_ok()))
		.collect();

	ViewModel {
		grid: build_grid(app.calendar_month.month(), app.calendar_month.year(), app.week_start).ok(),
		event_days: paddock.event_days(),
		event_date,
		path,
		rows: schedule_rows(app.store.sessions(), schedule_date),
		schedule_span: format_schedule_span(app.store.sessions(), schedule_date),
	}
}

fn persist(path: &Path, paddock: &Paddock) -> Result<(), String> {
	save_paddock(path, paddock).map_err(|err| err.to_string())
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
	}
}

fn optional_text(input: &str) -> Option<String> {
	let value = input.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

fn parse_offsets(input: &str) -> Result<Vec<u32>, String> {
	input
		.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|part| !part.is_empty())
		.map(|part| {
			part.parse::<u32>()
				.map_err(|_| format!("not a number of minutes: {part}"))
		})
		.collect()
}

fn field_line(label: &str, value: Option<String>) -> Line<'static> {
	let (text, style) = match value {
		Some(value) => (value, Style::default()),
		None => ("(not set)".to_string(), Style::default().fg(Color::DarkGray)),
	};
	Line::from(vec![
		Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
		Span::styled(text, style),
	])
}

fn event_type_label(event_type: EventType) -> String {
	match event_type {
		EventType::Single => "Single event".to_string(),
		EventType::Championship => "Championship".to_string(),
	}
}

fn driver_label(paddock: &Paddock, driver_id: &str) -> String {
	paddock
		.driver(driver_id)
		.map(|driver| driver_name(&driver.name, driver.number))
		.unwrap_or_else(|| driver_id.to_string())
}

fn driver_name(name: &str, number: Option<u32>) -> String {
	match number {
		Some(number) => format!("#{number} {name}"),
		None => name.to_string(),
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailsField {
	Name,
	Date,
	Game,
	Car,
	Track,
	Description,
}

impl DetailsField {
	fn title(self) -> &'static str {
		match self {
			DetailsField::Name => "Event name",
			DetailsField::Date => "Event date (YYYY-MM-DD)",
			DetailsField::Game => "Game",
			DetailsField::Car => "Car (optional)",
			DetailsField::Track => "Track (optional)",
			DetailsField::Description => "Description (optional)",
		}
	}

	fn next(self) -> Option<Self> {
		match self {
			DetailsField::Name => Some(DetailsField::Date),
			DetailsField::Date => Some(DetailsField::Game),
			DetailsField::Game => Some(DetailsField::Car),
			DetailsField::Car => Some(DetailsField::Track),
			DetailsField::Track => Some(DetailsField::Description),
			DetailsField::Description => None,
		}
	}

	fn current(self, details: &DetailsRecord, fallback_day: NaiveDate) -> String {
		let value = match self {
			DetailsField::Name => details.name.clone(),
			DetailsField::Date => Some(details.date.unwrap_or(fallback_day).format("%Y-%m-%d").to_string()),
			DetailsField::Game => details.game.clone(),
			DetailsField::Car => details.car.clone(),
			DetailsField::Track => details.track.clone(),
			DetailsField::Description => details.description.clone(),
		};
		value.unwrap_or_default()
	}

	fn apply(self, details: &mut DetailsRecord, input: &str) -> Result<(), String> {
		match self {
			DetailsField::Name => details.name = Some(required_text(input, "event name")?),
			DetailsField::Date => {
				let raw = required_text(input, "event date")?;
				let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
					.map_err(|_| format!("event date must be YYYY-MM-DD, got {raw}"))?;
				details.date = Some(date);
			}
			DetailsField::Game => {
				let game = required_text(input, "game")?;
				if details.game.as_deref() != Some(game.as_str()) {
					details.car = None;
					details.track = None;
				}
				details.game = Some(game);
			}
			// blank is kept as an empty string so the merge clears the stored value
			DetailsField::Car => details.car = Some(input.trim().to_string()),
			DetailsField::Track => details.track = Some(input.trim().to_string()),
			DetailsField::Description => details.description = Some(input.trim().to_string()),
		}
		Ok(())
	}
}

#[derive(Debug, Clone)]
enum Outcome {
	Prompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, kind, String::new())
	}

	fn with_input(title: impl Into<String>, kind: PromptKind, input: String) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	multi: bool,
	marked: BTreeSet<usize>,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			multi: false,
			marked: BTreeSet::new(),
			kind,
		}
	}

	fn multi(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			multi: true,
			..Self::new(title, kind, options)
		}
	}

	fn move_selection(&mut self, delta: i32) {
		if self.options.is_empty() {
			self.selected = 0;
			return;
		}

		if delta > 0 {
			self.selected = (self.selected + delta as usize).min(self.options.len() - 1);
		} else {
			self.selected = self.selected.saturating_sub(delta.unsigned_abs() as usize);
		}
	}

	fn toggle_mark(&mut self) {
		if !self.multi || self.options.is_empty() {
			return;
		}
		if !self.marked.remove(&self.selected) {
			self.marked.insert(self.selected);
		}
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}

	/// Marked values in list order.
	fn chosen_values(&self) -> Vec<String> {
		self.marked
			.iter()
			.filter_map(|index| self.options.get(*index))
			.map(|option| option.value.clone())
			.collect()
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: String,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: String) -> Self {
		Self {
			label: label.into(),
			value,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	Details {
		field: DetailsField,
		details: DetailsRecord,
		fallback_day: NaiveDate,
	},
	SessionStart {
		draft: SessionDraft,
	},
	SessionEnd {
		draft: SessionDraft,
	},
	SessionDay {
		draft: SessionDraft,
	},
	SessionWeather {
		draft: SessionDraft,
	},
	SessionServer {
		draft: SessionDraft,
	},
	SessionPassword {
		draft: SessionDraft,
	},
	ReminderOffsets {
		reminders: RemindersRecord,
	},
	ReminderMessage {
		reminders: RemindersRecord,
	},
}

#[derive(Debug, Clone)]
enum SelectKind {
	EventType,
	Team,
	Roster { team_id: String },
	TeamDrivers { team_id: String, roster_id: String },
	SessionType,
	SessionEndsNextDay { draft: SessionDraft },
	SessionDriver { draft: SessionDraft },
	SessionDrivers { draft: SessionDraft },
	Notify,
	OpenEvent,
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	store: WizardStore,
	reminder_defaults: RemindersRecord,
	week_start: WeekStart,
	selected_day: NaiveDate,
	calendar_month: NaiveDate,
	session_index: usize,
	errors: Option<FieldErrors>,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(settings: &Settings) -> Self {
		let today = Local::now().date_naive();
		let mut app = Self {
			store: WizardStore::new(),
			reminder_defaults: settings.reminder_defaults(),
			week_start: settings.week_start,
			selected_day: today,
			calendar_month: first_day_of_month(today),
			session_index: 0,
			errors: None,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		};
		app.reset_wizard();
		app
	}

	fn reset_wizard(&mut self) {
		self.store.reset();
		self.store
			.set_data(StepPatch::Reminders(self.reminder_defaults.clone()));
		self.session_index = 0;
		self.errors = None;
		self.mode = InputMode::Normal;
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		if view.rows.is_empty() {
			self.session_index = 0;
		} else {
			self.session_index = self.session_index.min(view.rows.len() - 1);
		}
	}

	fn shift_selected_day(&mut self, delta_days: i64) {
		self.selected_day += Duration::days(delta_days);
		self.calendar_month = first_day_of_month(self.selected_day);
	}

	fn shift_selected_month(&mut self, delta: i32) {
		self.selected_day = shift_month(self.selected_day, delta);
		self.calendar_month = first_day_of_month(self.selected_day);
	}
}

struct ViewModel {
	grid: Option<MonthGrid>,
	event_days: BTreeSet<NaiveDate>,
	event_date: Option<NaiveDate>,
	path: Vec<(StepId, bool)>,
	rows: Vec<ScheduleRow>,
	schedule_span: Option<String>,
}
