//! JSON file storage for tasks, alarms and settings.

use crate::models::{date_key, Alarm, AlarmId, Backup, MissionData, Settings, Task};
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Task, alarm and settings store backed by a single JSON file.
pub struct MissionStore {
    path: Option<PathBuf>,
    data: MissionData,
}

impl MissionStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let data = if path.exists() {
            read_json(path)?
        } else {
            MissionData::default()
        };

        debug!(
            path = %path.display(),
            dates = data.schedules.len(),
            alarms = data.alarms.len(),
            "opened store"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    /// Store without a backing file (for testing).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: MissionData::default(),
        }
    }

    pub fn data(&self) -> &MissionData {
        &self.data
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current data to disk.
    fn save(&self) -> StoreResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_json(path, &self.data)
    }

    /// Apply `change` and persist it. Memory is rolled back if either fails.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut MissionData) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let previous = self.data.clone();
        match change(&mut self.data).and_then(|value| self.save().map(|()| value)) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.data = previous;
                Err(err)
            }
        }
    }

    /// Register a task on a date.
    pub fn add_task(&mut self, date: NaiveDate, text: &str) -> StoreResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::Invalid("task text is empty".to_string()));
        }

        let key = date_key(date);
        self.commit(|data| {
            data.schedules
                .entry(key.clone())
                .or_default()
                .push(Task::new(text));
            Ok(())
        })?;
        info!(date = %key, "added task");
        Ok(())
    }

    /// Tasks registered on a date, in insertion order.
    pub fn tasks_on(&self, date: NaiveDate) -> &[Task] {
        self.data
            .schedules
            .get(&date_key(date))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Texts of the incomplete tasks on a date.
    pub fn incomplete_on(&self, date: NaiveDate) -> Vec<&str> {
        self.tasks_on(date)
            .iter()
            .filter(|t| !t.completed)
            .map(|t| t.text.as_str())
            .collect()
    }

    pub fn task_count_on(&self, date: NaiveDate) -> usize {
        self.tasks_on(date).len()
    }

    /// Flip completion of a task. Returns the new state.
    pub fn toggle_task(&mut self, date: NaiveDate, index: usize) -> StoreResult<bool> {
        let key = date_key(date);
        let completed = self.commit(|data| {
            let task = data
                .schedules
                .get_mut(&key)
                .and_then(|tasks| tasks.get_mut(index))
                .ok_or_else(|| task_not_found(&key, index))?;
            task.completed = !task.completed;
            Ok(task.completed)
        })?;
        debug!(date = %key, index, completed, "toggled task");
        Ok(completed)
    }

    /// Delete a task; the date disappears once its last task is gone.
    pub fn delete_task(&mut self, date: NaiveDate, index: usize) -> StoreResult<Task> {
        let key = date_key(date);
        let task = self.commit(|data| {
            let tasks = data
                .schedules
                .get_mut(&key)
                .filter(|tasks| index < tasks.len())
                .ok_or_else(|| task_not_found(&key, index))?;
            let task = tasks.remove(index);
            if tasks.is_empty() {
                data.schedules.remove(&key);
            }
            Ok(task)
        })?;
        info!(date = %key, index, "deleted task");
        Ok(task)
    }

    /// Add an alarm and return its id.
    pub fn add_alarm(&mut self, alarm: Alarm) -> StoreResult<AlarmId> {
        if alarm.name.trim().is_empty() {
            return Err(StoreError::Invalid("alarm name is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        info!(id = %id, name = %alarm.name, time = %alarm.time, "adding alarm");
        self.commit(|data| {
            data.alarms.insert(id.clone(), alarm);
            Ok(())
        })?;
        Ok(id)
    }

    /// Alarms ordered by time, then name.
    pub fn alarms(&self) -> Vec<(&AlarmId, &Alarm)> {
        let mut alarms: Vec<_> = self.data.alarms.iter().collect();
        alarms.sort_by(|(_, a), (_, b)| a.time.cmp(&b.time).then_with(|| a.name.cmp(&b.name)));
        alarms
    }

    /// Change one alarm in place.
    fn update_alarm(&mut self, id: &str, change: impl FnOnce(&mut Alarm)) -> StoreResult<()> {
        self.commit(|data| {
            let alarm = data
                .alarms
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("alarm {}", id)))?;
            change(alarm);
            Ok(())
        })
    }

    pub fn set_alarm_active(&mut self, id: &str, active: bool) -> StoreResult<()> {
        self.update_alarm(id, |alarm| alarm.active = active)?;
        debug!(id, active, "alarm active changed");
        Ok(())
    }

    pub fn set_alarm_mission(&mut self, id: &str, mission_enabled: bool) -> StoreResult<()> {
        self.update_alarm(id, |alarm| alarm.mission_enabled = mission_enabled)?;
        debug!(id, mission_enabled, "alarm mission changed");
        Ok(())
    }

    pub fn delete_alarm(&mut self, id: &str) -> StoreResult<Alarm> {
        let alarm = self.commit(|data| {
            data.alarms
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(format!("alarm {}", id)))
        })?;
        info!(id, "deleted alarm");
        Ok(alarm)
    }

    pub fn settings(&self) -> Settings {
        self.data.settings
    }

    pub fn update_settings(&mut self, settings: Settings) -> StoreResult<()> {
        self.commit(|data| {
            data.settings = settings;
            Ok(())
        })?;
        info!(?settings, "settings saved");
        Ok(())
    }

    /// Write a backup file into `dir` and return its path.
    pub fn backup(&self, dir: &Path) -> StoreResult<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let backup = Backup::new(self.data.clone());
        let path = dir.join(Backup::file_name(
            backup.backup_date.unwrap_or_else(|| Local::now().naive_local()),
        ));
        write_json(&path, &backup)?;
        info!(path = %path.display(), "backup written");
        Ok(path)
    }

    /// Replace all data with the contents of a backup file.
    pub fn restore(&mut self, path: &Path) -> StoreResult<()> {
        let backup: Backup = read_json(path)?;
        self.commit(|data| {
            *data = backup.data;
            Ok(())
        })?;
        info!(
            path = %path.display(),
            backup_date = ?backup.backup_date,
            "restored backup"
        );
        Ok(())
    }
}

fn task_not_found(key: &str, index: usize) -> StoreError {
    StoreError::NotFound(format!("task {} on {}", index, key))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    // Replace atomically
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, content).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_time;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_task_lifecycle() {
        let mut store = MissionStore::in_memory();
        store.add_task(day(1), "  clean room ").unwrap();
        store.add_task(day(1), "read book").unwrap();

        assert_eq!(store.task_count_on(day(1)), 2);
        assert_eq!(store.tasks_on(day(1))[0].text, "clean room");
        assert!(store.tasks_on(day(2)).is_empty());

        assert!(store.toggle_task(day(1), 0).unwrap());
        assert_eq!(store.incomplete_on(day(1)), vec!["read book"]);
        assert!(!store.toggle_task(day(1), 0).unwrap());
        assert_eq!(store.incomplete_on(day(1)).len(), 2);
    }

    #[test]
    fn test_empty_task_rejected() {
        let mut store = MissionStore::in_memory();
        assert!(matches!(store.add_task(day(1), "   "), Err(StoreError::Invalid(_))));
        assert!(store.data().schedules.is_empty());
    }

    #[test]
    fn test_deleting_last_task_removes_date() {
        let mut store = MissionStore::in_memory();
        store.add_task(day(3), "a").unwrap();
        store.add_task(day(3), "b").unwrap();

        assert_eq!(store.delete_task(day(3), 0).unwrap().text, "a");
        assert!(store.data().schedules.contains_key("2024-01-03"));
        store.delete_task(day(3), 0).unwrap();
        assert!(!store.data().schedules.contains_key("2024-01-03"));
    }

    #[test]
    fn test_unknown_task_index() {
        let mut store = MissionStore::in_memory();
        store.add_task(day(1), "a").unwrap();
        assert!(matches!(store.toggle_task(day(1), 5), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete_task(day(2), 0), Err(StoreError::NotFound(_))));
        assert_eq!(store.task_count_on(day(1)), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("mission_alarm_data.json");

        {
            let mut store = MissionStore::open(&path).unwrap();
            store.add_task(day(1), "read book").unwrap();
            let alarm = Alarm::new("Wake up", parse_time("07:00").unwrap(), vec![], true);
            store.add_alarm(alarm).unwrap();
            store
                .update_settings(Settings {
                    sound_enabled: false,
                    ..Settings::default()
                })
                .unwrap();
        }

        let store = MissionStore::open(&path).unwrap();
        assert_eq!(store.tasks_on(day(1))[0].text, "read book");
        assert_eq!(store.alarms().len(), 1);
        assert!(!store.settings().sound_enabled);
    }

    #[test]
    fn test_loads_legacy_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mission_alarm_data.json");
        std::fs::write(
            &path,
            r#"{
              "schedules": {
                "2024-01-01": [
                  {"task": "운동하기", "completed": false, "created_at": "2024-01-01T08:15:30.123456"}
                ]
              },
              "alarms": {
                "alarm_0": {
                  "name": "아침 기상", "time": "07:00", "days": [0, 1, 2, 3, 4],
                  "mission_enabled": true, "active": true,
                  "created_at": "2024-01-01T08:00:00.000001"
                }
              },
              "settings": {}
            }"#,
        )
        .unwrap();

        let store = MissionStore::open(&path).unwrap();
        assert_eq!(store.incomplete_on(day(1)), vec!["운동하기"]);
        let alarm = &store.data().alarms["alarm_0"];
        assert_eq!(alarm.days_label(), "Mon, Tue, Wed, Thu, Fri");
        assert!(store.settings().vibration_enabled);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mission_alarm_data.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(MissionStore::open(&path), Err(StoreError::Json { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let mut store = MissionStore::open(&path).unwrap();
        store.add_task(day(1), "read book").unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let mut store = MissionStore::open(&path).unwrap();
        store.add_task(day(1), "read book").unwrap();

        // A directory in the temp file's place makes every write fail
        let blocker = dir.path().join("data.json.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(store.toggle_task(day(1), 0), Err(StoreError::Io { .. })));
        assert!(!store.tasks_on(day(1))[0].completed);
        assert!(store.add_task(day(2), "nap").is_err());
        assert_eq!(store.task_count_on(day(2)), 0);
        assert!(store.delete_task(day(1), 0).is_err());
        assert_eq!(store.task_count_on(day(1)), 1);

        let on_disk = MissionStore::open(&path).unwrap();
        assert_eq!(on_disk.data(), store.data());

        std::fs::remove_dir(&blocker).unwrap();
        assert!(store.toggle_task(day(1), 0).unwrap());
    }

    #[test]
    fn test_alarms_sorted_and_updated() {
        let mut store = MissionStore::in_memory();
        let late = store
            .add_alarm(Alarm::new("Late", parse_time("22:00").unwrap(), vec![], true))
            .unwrap();
        store
            .add_alarm(Alarm::new("Early", parse_time("06:00").unwrap(), vec![], true))
            .unwrap();

        let names: Vec<_> = store.alarms().iter().map(|(_, a)| a.name.clone()).collect();
        assert_eq!(names, vec!["Early", "Late"]);

        store.set_alarm_active(&late, false).unwrap();
        store.set_alarm_mission(&late, false).unwrap();
        let alarm = &store.data().alarms[&late];
        assert!(!alarm.active);
        assert!(!alarm.mission_enabled);

        store.delete_alarm(&late).unwrap();
        assert!(matches!(store.delete_alarm(&late), Err(StoreError::NotFound(_))));
        assert!(store
            .add_alarm(Alarm::new(" ", parse_time("06:00").unwrap(), vec![], true))
            .is_err());
    }

    #[test]
    fn test_backup_and_restore() {
        let dir = TempDir::new().unwrap();
        let mut store = MissionStore::open(&dir.path().join("data.json")).unwrap();
        store.add_task(day(1), "clean room").unwrap();

        let backup_path = store.backup(&dir.path().join("backups")).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&backup_path).unwrap()).unwrap();
        assert!(raw.get("backup_date").is_some());
        assert!(raw["schedules"]["2024-01-01"].is_array());

        store.delete_task(day(1), 0).unwrap();
        store.add_task(day(2), "other").unwrap();

        store.restore(&backup_path).unwrap();
        assert_eq!(store.tasks_on(day(1))[0].text, "clean room");
        assert!(store.tasks_on(day(2)).is_empty());

        let reopened = MissionStore::open(&dir.path().join("data.json")).unwrap();
        assert_eq!(reopened.data(), store.data());
    }
}
