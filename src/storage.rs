use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::{Schedule, Subject};
use crate::error::StorageError;
use crate::settings::Settings;

pub const SCHEDULE_KEY: &str = "schedule";
pub const SETTINGS_KEY: &str = "settings";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Restores the schedule snapshot. Missing or unreadable data yields an empty
/// schedule.
pub fn load_schedule(store: &impl KeyValueStore) -> Schedule {
    match load_document::<Vec<Subject>>(store, SCHEDULE_KEY) {
        Some(subjects) => {
            tracing::debug!(subjects = subjects.len(), "restored schedule");
            Schedule::from_subjects(subjects)
        }
        None => Schedule::new(),
    }
}

pub fn load_settings(store: &impl KeyValueStore) -> Settings {
    load_document(store, SETTINGS_KEY).unwrap_or_default()
}

pub fn save_schedule(store: &mut impl KeyValueStore, schedule: &Schedule) -> Result<(), StorageError> {
    let raw = serde_json::to_string(schedule.subjects()).map_err(StorageError::JsonEncode)?;
    store.set(SCHEDULE_KEY, raw)?;
    tracing::debug!(revision = schedule.revision(), "saved schedule");
    Ok(())
}

pub fn save_settings(store: &mut impl KeyValueStore, settings: &Settings) -> Result<(), StorageError> {
    let raw = serde_json::to_string(settings).map_err(StorageError::JsonEncode)?;
    store.set(SETTINGS_KEY, raw)
}

pub fn export_schedule(path: &Path, schedule: &Schedule) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let raw = serde_json::to_string_pretty(schedule.subjects()).map_err(StorageError::JsonEncode)?;
    fs::write(path, raw)?;
    tracing::info!(path = %path.display(), subjects = schedule.subjects().len(), "exported schedule");
    Ok(())
}

pub fn read_schedule_file(path: &Path) -> Result<Vec<Subject>, StorageError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

fn load_document<T: serde::de::DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) if !raw.trim().is_empty() => raw,
        Ok(_) => return None,
        Err(err) => {
            tracing::warn!(key, %err, "could not read stored data, using defaults");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, %err, "stored data is malformed, using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::domain::{CourseCode, CourseDraft, CourseType, Schedule, Weekday};
    use crate::settings::Settings;

    use super::{
        FileStore, KeyValueStore, MemoryStore, SCHEDULE_KEY, SETTINGS_KEY, export_schedule, load_schedule,
        load_settings, read_schedule_file, save_schedule, save_settings,
    };

    fn sample_schedule() -> Schedule {
        let mut schedule = Schedule::new();
        let id = schedule.add_subject("IP-18AN1G".to_string(), "Analízis".to_string());
        schedule
            .add_course(
                id,
                CourseDraft {
                    code: "3".to_string(),
                    course_type: CourseType::Practice,
                    instructor: "Példa Béla".to_string(),
                    location: "Déli Tömb 0-220".to_string(),
                    day: Weekday::Tuesday,
                    start_time: "10:00".to_string(),
                    end_time: "11:30".to_string(),
                    notes: "páros hetek".to_string(),
                },
            )
            .expect("course should be valid");
        schedule.set_chosen_course(id, &CourseCode::parse("3").expect("code should parse"), CourseType::Practice);
        schedule.add_subject("IP-18KVSZ".to_string(), "Szoftvertechnológia".to_string());
        schedule
    }

    #[test]
    fn snapshot_restores_identical_subjects() {
        let schedule = sample_schedule();
        let mut store = MemoryStore::default();
        save_schedule(&mut store, &schedule).expect("save should succeed");

        let restored = load_schedule(&store);
        assert_eq!(restored.subjects(), schedule.subjects());
    }

    #[test]
    fn missing_or_corrupt_data_falls_back_to_defaults() {
        let mut store = MemoryStore::default();
        assert!(load_schedule(&store).subjects().is_empty());
        assert_eq!(load_settings(&store), Settings::default());

        store.set(SCHEDULE_KEY, "{not json".to_string()).expect("set should succeed");
        store.set(SETTINGS_KEY, "[1, 2]".to_string()).expect("set should succeed");
        assert!(load_schedule(&store).subjects().is_empty());
        assert_eq!(load_settings(&store), Settings::default());
    }

    #[test]
    fn settings_survive_a_round_trip() {
        let mut settings = Settings::default();
        settings.saturday = true;
        settings.show.notes = true;
        settings.set_slot(30).expect("slot should be valid");

        let mut store = MemoryStore::default();
        save_settings(&mut store, &settings).expect("save should succeed");
        assert_eq!(load_settings(&store), settings);
    }

    #[test]
    fn file_store_writes_one_file_per_key() {
        let dir = temp_path("timetable_file_store");
        let mut store = FileStore::new(dir.clone());
        assert_eq!(store.get(SCHEDULE_KEY).expect("get should succeed"), None);

        save_schedule(&mut store, &sample_schedule()).expect("save should succeed");
        assert!(dir.join("schedule.json").exists());
        assert_eq!(load_schedule(&store).subjects().len(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn export_file_reads_back_strictly() {
        let schedule = sample_schedule();
        let path = temp_path("timetable_export").join("nested").join("schedule.json");
        export_schedule(&path, &schedule).expect("export should succeed");

        let subjects = read_schedule_file(&path).expect("read should succeed");
        assert_eq!(subjects, schedule.subjects());

        fs::write(&path, "{\"subjects\": 1}").expect("write should succeed");
        assert!(read_schedule_file(&path).is_err());
        if let Some(root) = path.parent().and_then(|nested| nested.parent()) {
            let _ = fs::remove_dir_all(root);
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
