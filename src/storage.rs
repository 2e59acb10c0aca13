use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use log::debug;

use crate::errors::StorageError;
use crate::paddock::{Paddock, PaddockHeader};

const EVENTS_MARKER: &str = "\n=== EVENTS ===\n";

pub fn load_paddock(path: &Path) -> Result<Paddock, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no paddock at {}, starting empty", path.display());
            return Ok(Paddock::new());
        }
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Paddock::new());
    }

    let (header_blob, events_blob) = if let Some((header, events)) = raw.split_once(EVENTS_MARKER) {
        (header, events)
    } else {
        (raw.as_str(), "")
    };

    let header: PaddockHeader = toml::from_str(header_blob)?;
    let mut records = Vec::new();
    for (index, line) in events_blob.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| StorageError::JsonDecode {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    debug!("loaded {} event records from {}", records.len(), path.display());
    Ok(Paddock { header, records })
}

pub fn save_paddock(path: &Path, paddock: &Paddock) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let header = toml::to_string_pretty(&paddock.header)?;
    let mut file = fs::File::create(path)?;
    file.write_all(header.as_bytes())?;
    file.write_all(EVENTS_MARKER.as_bytes())?;

    for record in &paddock.records {
        let line = serde_json::to_string(record).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::directory::EventSink;
    use crate::errors::StorageError;
    use crate::paddock::tests::{fixture, overnight_command};

    use super::{load_paddock, save_paddock};

    #[test]
    fn round_trips_toml_and_jsonl() {
        let mut fixture = fixture();
        let command = overnight_command(&fixture);
        fixture
            .paddock
            .create_event(&command)
            .expect("create should work");

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("team.paddock");
        save_paddock(&path, &fixture.paddock).expect("save should succeed");
        let loaded = load_paddock(&path).expect("load should succeed");

        assert_eq!(loaded.header.drivers.len(), 2);
        assert_eq!(loaded.header.teams[0].rosters[0].members.len(), 2);
        assert_eq!(loaded.records, fixture.paddock.records);
        assert!(loaded.events()[0].command.sessions[0].session.ends_next_day());
    }

    #[test]
    fn missing_file_is_an_empty_paddock() {
        let dir = tempfile::tempdir().expect("temp dir");
        let loaded = load_paddock(&dir.path().join("absent.paddock")).expect("load should succeed");
        assert!(loaded.header.teams.is_empty());
        assert!(loaded.records.is_empty());
    }

    #[test]
    fn reports_the_broken_event_line() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("broken.paddock");
        let fixture = fixture();
        save_paddock(&path, &fixture.paddock).expect("save should succeed");
        let mut raw = fs::read_to_string(&path).expect("file exists");
        raw.push_str("{not json}\n");
        fs::write(&path, raw).expect("write should succeed");

        match load_paddock(&path) {
            Err(StorageError::JsonDecode { line, .. }) => assert_eq!(line, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
