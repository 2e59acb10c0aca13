use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::calendar::WeekStart;
use crate::errors::ConfigError;
use crate::steps::RemindersRecord;

const SETTINGS_FILE: &str = "settings.toml";
const DEFAULT_PADDOCK_FILE: &str = "paddock.ledger";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub week_start: WeekStart,
	/// Minutes before start; prefilled into the reminders step.
	pub default_reminders: Vec<u32>,
	pub paddock_path: Option<PathBuf>,
}

impl Settings {
	pub fn reminder_defaults(&self) -> RemindersRecord {
		if self.default_reminders.is_empty() {
			return RemindersRecord::default();
		}

		RemindersRecord {
			notify: Some(true),
			offsets_minutes: Some(self.default_reminders.clone()),
			message: None,
		}
	}
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => {
			debug!("no settings at {}, using defaults", path.display());
			return Ok(Settings::default());
		}
		Err(source) => {
			return Err(ConfigError::Read {
				path: path.display().to_string(),
				source,
			});
		}
	};

	toml::from_str(&raw).map_err(|source| ConfigError::Parse {
		path: path.display().to_string(),
		source,
	})
}

pub fn settings_path() -> PathBuf {
	state_dir().join(SETTINGS_FILE)
}

pub fn resolve_paddock_path(cli_path: Option<PathBuf>, settings: &Settings) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env::var_os("PADDOCK_FILE") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
		warn!("PADDOCK_FILE is set but empty, ignoring it");
	}

	if let Some(path) = &settings.paddock_path {
		return absolutize(path.clone());
	}

	state_dir().join(DEFAULT_PADDOCK_FILE)
}

fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("PADDOCK_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("paddock_planner");
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join("paddock_planner");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join("paddock_planner");
	}

	PathBuf::from(".paddock_planner")
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
