mod ui;

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use paddock_planner::calendar::build_grid;
use paddock_planner::config::{Settings, load_settings, resolve_paddock_path, settings_path};
use paddock_planner::draft::{load_draft, run_draft};
use paddock_planner::errors::SinkError;
use paddock_planner::paddock::Paddock;
use paddock_planner::schedule::{format_schedule_span, schedule_rows};
use paddock_planner::storage::{load_paddock, save_paddock};
use paddock_planner::steps::StepPatch;
use paddock_planner::store::WizardStore;
use paddock_planner::wizard;

use crate::ui::run_wizard;

#[derive(Debug, Parser)]
#[command(name = "paddock", about = "Event planner for sim-racing teams")]
struct Cli {
	#[arg(long)]
	paddock: Option<PathBuf>,
	#[arg(long)]
	settings: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Wizard,
	AddDriver {
		#[arg(long)]
		name: String,
		#[arg(long)]
		number: Option<u32>,
	},
	AddTeam {
		#[arg(long)]
		name: String,
		#[arg(long)]
		game: String,
	},
	AddRoster {
		#[arg(long)]
		team: String,
		#[arg(long)]
		name: String,
	},
	AddMember {
		#[arg(long)]
		team: String,
		#[arg(long)]
		roster: String,
		#[arg(long)]
		driver: String,
	},
	ListTeams,
	Calendar {
		#[arg(long)]
		month: Option<u32>,
		#[arg(long)]
		year: Option<i32>,
	},
	Events {
		#[arg(long)]
		day: Option<String>,
	},
	Create {
		#[arg(long)]
		draft: PathBuf,
	},
	Edit {
		#[arg(long)]
		event: String,
		#[arg(long)]
		draft: PathBuf,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	colog::init();

	let command = cli.command.unwrap_or(Command::Wizard);
	if matches!(command, Command::Wizard) {
		// stderr output would tear the alternate screen
		log::set_max_level(LevelFilter::Off);
	}

	let settings = load_settings(&cli.settings.unwrap_or_else(settings_path))?;
	let paddock_path = resolve_paddock_path(cli.paddock, &settings);
	let mut paddock = load_paddock(&paddock_path)?;

	match command {
		Command::Init => {
			save_paddock(&paddock_path, &paddock)?;
			println!("initialized paddock at {}", paddock_path.display());
		}
		Command::Wizard => {
			run_wizard(&mut paddock, &paddock_path, &settings)?;
		}
		Command::AddDriver { name, number } => {
			let driver_id = paddock.add_driver(name, number);
			save_paddock(&paddock_path, &paddock)?;
			println!("created driver {driver_id}");
		}
		Command::AddTeam { name, game } => {
			let team_id = paddock.add_team(name, game);
			save_paddock(&paddock_path, &paddock)?;
			println!("created team {team_id}");
		}
		Command::AddRoster { team, name } => {
			let roster_id = paddock.add_roster(&team, name)?;
			save_paddock(&paddock_path, &paddock)?;
			println!("created roster {roster_id}");
		}
		Command::AddMember {
			team,
			roster,
			driver,
		} => {
			paddock.add_member(&team, &roster, &driver)?;
			save_paddock(&paddock_path, &paddock)?;
			println!("added {driver} to roster {roster}");
		}
		Command::ListTeams => {
			print_teams(&paddock);
		}
		Command::Calendar { month, year } => {
			print_calendar(&paddock, &settings, month, year)?;
		}
		Command::Events { day } => {
			print_events(&paddock, day.as_deref())?;
		}
		Command::Create { draft } => {
			let mut store = WizardStore::new();
			store.set_data(StepPatch::Reminders(settings.reminder_defaults()));
			submit_draft(&mut paddock, &paddock_path, &draft, store)?;
		}
		Command::Edit { event, draft } => {
			let record = paddock
				.event(&event)
				.ok_or_else(|| SinkError::EventNotFound(event.clone()))?;
			let mut store = WizardStore::new();
			wizard::begin_edit(&mut store, &event, &record.command);
			submit_draft(&mut paddock, &paddock_path, &draft, store)?;
		}
	}

	Ok(())
}

fn submit_draft(
	paddock: &mut Paddock,
	paddock_path: &Path,
	draft_path: &Path,
	mut store: WizardStore,
) -> Result<(), Box<dyn Error>> {
	let draft = load_draft(draft_path)?;
	let submitted = run_draft(&mut store, draft, paddock)?;
	save_paddock(paddock_path, paddock)?;
	println!(
		"{} event {} on {}",
		if submitted.edited { "updated" } else { "created" },
		submitted.event_id,
		submitted.date.format("%Y-%m-%d")
	);
	Ok(())
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Local::now().date_naive())
	}
}

fn print_teams(paddock: &Paddock) {
	if paddock.header.teams.is_empty() {
		println!("no teams yet");
		return;
	}

	for team in &paddock.header.teams {
		println!("{} | {} | {}", team.id, team.name, team.game);
		for roster in &team.rosters {
			let members = roster
				.members
				.iter()
				.map(|member| {
					paddock
						.driver(&member.member_id)
						.map(|driver| driver.name.clone())
						.unwrap_or_else(|| format!("unknown ({})", member.member_id))
				})
				.collect::<Vec<_>>();
			println!("  {} | {} | {}", roster.id, roster.name, members.join(", "));
		}
	}
}

fn print_calendar(
	paddock: &Paddock,
	settings: &Settings,
	month: Option<u32>,
	year: Option<i32>,
) -> Result<(), Box<dyn Error>> {
	let today = Local::now().date_naive();
	let grid = build_grid(
		month.unwrap_or(today.month()),
		year.unwrap_or(today.year()),
		settings.week_start,
	)?;
	let event_days = paddock.event_days();

	println!("{}", grid.title());
	println!("{}", settings.week_start.header());
	for week in &grid.cells {
		let cells = week
			.iter()
			.map(|date| {
				if !grid.is_in_month(*date) {
					"  .".to_string()
				} else if event_days.contains(date) {
					format!("{:>2}*", date.day())
				} else {
					format!("{:>2} ", date.day())
				}
			})
			.collect::<Vec<_>>();
		println!("{}", cells.join(""));
	}

	Ok(())
}

fn print_events(paddock: &Paddock, day: Option<&str>) -> Result<(), Box<dyn Error>> {
	let day = parse_day(day)?;
	let events = paddock.events_on_day(day);

	println!("events for {}", day.format("%Y-%m-%d"));
	if events.is_empty() {
		println!("no events on this day");
		return Ok(());
	}

	for record in &events {
		let details = &record.command.details;
		let span = format_schedule_span(&record.command.sessions, details.date)
			.unwrap_or_else(|| details.date.format("%-d %B, %A").to_string());
		println!("\n{} | {} | {} | {}", record.event_id, details.name, details.game, span);
		for row in schedule_rows(&record.command.sessions, details.date) {
			let drivers = row
				.session
				.driver_ids()
				.into_iter()
				.map(|id| paddock.driver(id).map(|driver| driver.name.as_str()).unwrap_or(id))
				.collect::<Vec<_>>();
			println!(
				"  {} | {} | {}{}",
				row.title,
				row.span,
				row.time_range,
				if drivers.is_empty() {
					String::new()
				} else {
					format!(" | {}", drivers.join(", "))
				}
			);
		}
	}

	Ok(())
}
