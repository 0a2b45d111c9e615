//! Application state and logic.

use crate::config::{Config, WeekStart};
use crate::media;
use crate::models::{parse_days, parse_time, Alarm, AlarmId, Settings};
use crate::quiz::{Availability, DecoyPool, QuizSession, Verdict};
use crate::store::MissionStore;
use crate::unlocks::{Feature, Unlocks};
use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Application state.
pub struct App {
    /// Task, alarm and settings storage.
    pub store: MissionStore,
    /// Configuration.
    pub config: Config,
    /// Decoys offered in the quiz.
    pub decoys: DecoyPool,
    /// Current view.
    pub view: View,
    /// Current local time.
    pub now: NaiveDateTime,
    /// Date shown in the calendar.
    pub selected_date: NaiveDate,
    /// Selected task on the selected date.
    pub task_index: usize,
    /// Selected alarm.
    pub alarm_index: usize,
    /// Today's quiz.
    pub quiz: QuizSession,
    /// Selected quiz option.
    pub quiz_index: usize,
    /// Selected settings row.
    pub settings_index: usize,
    /// Selected link on the media pages.
    pub media_index: usize,
    /// Last YouTube URL looked up.
    pub youtube_url: Option<String>,
    /// Pages unlocked by task keywords.
    pub unlocks: Unlocks,
    /// Whether in editing mode.
    pub editing: bool,
    /// Input buffer for editing.
    pub input_buffer: String,
    /// Editing field.
    pub editing_field: EditField,
    /// Alarm being entered across several prompts.
    pub alarm_draft: AlarmDraft,
    /// Message to display.
    pub message: Option<(String, MessageType)>,
    /// Show help popup.
    pub show_help: bool,
    /// Confirmation dialog.
    pub confirm_dialog: Option<ConfirmDialog>,
}

/// Current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Calendar,
    Alarms,
    Quiz,
    Settings,
    Media,
    Mp3,
    Mp4,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Calendar => "Calendar",
            View::Alarms => "Alarms",
            View::Quiz => "Mission Quiz",
            View::Settings => "Settings",
            View::Media => "Deadline",
            View::Mp3 => Feature::Mp3Player.label(),
            View::Mp4 => Feature::Mp4Player.label(),
        }
    }
}

/// Editing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    None,
    TaskText,
    AlarmName,
    AlarmTime,
    AlarmDays,
    YoutubeUrl,
    RestorePath,
}

/// Alarm fields collected so far.
#[derive(Debug, Clone, Default)]
pub struct AlarmDraft {
    pub name: String,
    pub time: Option<NaiveTime>,
}

/// Message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

/// Confirmation dialog.
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Confirm action type.
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteTask(NaiveDate, usize),
    DeleteAlarm(AlarmId),
    Restore(PathBuf),
}

/// Settings rows in display order.
pub const SETTINGS_ROWS: [&str; 3] = [
    "Mission quiz on new alarms",
    "Alarm sound",
    "Vibration",
];

impl App {
    /// Create new application from the default paths.
    pub fn new() -> anyhow::Result<Self> {
        let config = Config::load();
        let data_path = Config::data_path().unwrap_or_else(|| crate::config::DATA_FILE.into());
        let store = MissionStore::open(&data_path)?;
        Ok(Self::with_store(config, store, Local::now().naive_local()))
    }

    /// Create application around an opened store.
    pub fn with_store(config: Config, store: MissionStore, now: NaiveDateTime) -> Self {
        let unlocks = Unlocks::scan_all(
            store
                .data()
                .schedules
                .values()
                .flatten()
                .map(|t| t.text.as_str()),
        );
        let decoys = config.quiz.decoy_pool();

        Self {
            store,
            decoys,
            config,
            view: View::Calendar,
            now,
            selected_date: now.date(),
            task_index: 0,
            alarm_index: 0,
            quiz: QuizSession::new(),
            quiz_index: 0,
            settings_index: 0,
            media_index: 0,
            youtube_url: None,
            unlocks,
            editing: false,
            input_buffer: String::new(),
            editing_field: EditField::None,
            alarm_draft: AlarmDraft::default(),
            message: None,
            show_help: false,
            confirm_dialog: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    /// Advance the clock. A new day drops yesterday's quiz.
    pub fn tick(&mut self, now: NaiveDateTime) {
        if now.date() != self.now.date() {
            debug!(date = %now.date(), "day changed");
            self.quiz.reset();
            self.quiz_index = 0;
        }
        self.now = now;
        if self.view == View::Quiz {
            self.refresh_quiz();
        }
    }

    /// Check if in editing mode.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Views reachable from the tab bar.
    pub fn views(&self) -> Vec<View> {
        let mut views = vec![
            View::Calendar,
            View::Alarms,
            View::Quiz,
            View::Settings,
            View::Media,
        ];
        if self.unlocks.contains(Feature::Mp3Player) {
            views.push(View::Mp3);
        }
        if self.unlocks.contains(Feature::Mp4Player) {
            views.push(View::Mp4);
        }
        views
    }

    /// Whether today's quiz can be played.
    pub fn quiz_availability(&self) -> Availability {
        Availability::from_tasks(self.store.tasks_on(self.today()))
    }

    /// Completed and total task counts for today.
    pub fn today_progress(&self) -> (usize, usize) {
        let tasks = self.store.tasks_on(self.today());
        (tasks.iter().filter(|t| t.completed).count(), tasks.len())
    }

    /// Earliest upcoming ring among all alarms.
    pub fn next_alarm(&self) -> Option<(NaiveDateTime, &Alarm)> {
        self.store
            .data()
            .alarms
            .values()
            .filter_map(|a| a.next_ring(self.now).map(|at| (at, a)))
            .min_by_key(|(at, _)| *at)
    }

    /// Links listed on the current media page.
    pub fn media_links(&self) -> &[String] {
        match self.view {
            View::Mp3 => self.config.media.mp3_links.as_slice(),
            View::Mp4 => self.config.media.mp4_links.as_slice(),
            _ => &[],
        }
    }

    /// Handle key input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Handle confirmation dialog
        if let Some(dialog) = self.confirm_dialog.clone() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_dialog = None;
                    self.execute_confirm(dialog.action);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirm_dialog = None;
                }
                _ => {}
            }
            return;
        }

        if self.show_help {
            self.show_help = false;
            return;
        }

        self.message = None;

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        match key.code {
            KeyCode::Tab => self.cycle_view(1),
            KeyCode::BackTab => self.cycle_view(-1),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some(view) = self.views().get(index).copied() {
                    self.set_view(view);
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => match self.view {
                View::Calendar => self.handle_calendar_key(key),
                View::Alarms => self.handle_alarms_key(key),
                View::Quiz => self.handle_quiz_key(key),
                View::Settings => self.handle_settings_key(key),
                View::Media => self.handle_media_key(key),
                View::Mp3 | View::Mp4 => self.handle_player_key(key),
            },
        }
    }

    fn cycle_view(&mut self, delta: i32) {
        let views = self.views();
        let current = views.iter().position(|v| *v == self.view).unwrap_or(0) as i32;
        let next = (current + delta).rem_euclid(views.len() as i32) as usize;
        self.set_view(views[next]);
    }

    /// Switch view.
    pub fn set_view(&mut self, view: View) {
        debug!(?view, "switching view");
        self.view = view;
        self.media_index = 0;
        if view == View::Quiz {
            self.refresh_quiz();
        }
    }

    /// Generate a quiz for today's incomplete tasks if needed.
    fn refresh_quiz(&mut self) {
        match self.quiz_availability() {
            Availability::Ready(answers) => {
                let max = self.config.quiz.max_decoys;
                if self
                    .quiz
                    .ensure_generated(&answers, &self.decoys, max, &mut rand::thread_rng())
                {
                    self.quiz_index = 0;
                }
            }
            Availability::NoTasks | Availability::AllComplete => self.quiz.reset(),
        }
    }

    /// Handle editing keys.
    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.stop_editing(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            _ => {}
        }
    }

    fn start_editing(&mut self, field: EditField, initial: impl Into<String>) {
        self.editing = true;
        self.editing_field = field;
        self.input_buffer = initial.into();
    }

    fn stop_editing(&mut self) {
        self.editing = false;
        self.input_buffer.clear();
        self.editing_field = EditField::None;
    }

    fn set_message(&mut self, text: impl Into<String>, kind: MessageType) {
        self.message = Some((text.into(), kind));
    }

    fn show_error(&mut self, context: &str, err: impl std::fmt::Display) {
        warn!(%err, "{}", context);
        self.set_message(format!("{}: {}", context, err), MessageType::Error);
    }

    // Calendar

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.change_date(Duration::days(-1)),
            KeyCode::Char('l') | KeyCode::Right => self.change_date(Duration::days(1)),
            KeyCode::Char('H') => self.change_date(Duration::days(-7)),
            KeyCode::Char('L') => self.change_date(Duration::days(7)),
            KeyCode::Char('[') => self.change_month(-1),
            KeyCode::Char(']') => self.change_month(1),
            KeyCode::Char('t') => {
                self.selected_date = self.today();
                self.task_index = 0;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let count = self.store.task_count_on(self.selected_date);
                self.task_index = step(self.task_index, 1, count);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let count = self.store.task_count_on(self.selected_date);
                self.task_index = step(self.task_index, -1, count);
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_task(),
            KeyCode::Char('a') => self.start_editing(EditField::TaskText, ""),
            KeyCode::Char('d') => self.confirm_delete_task(),
            _ => {}
        }
    }

    fn change_date(&mut self, delta: Duration) {
        self.selected_date += delta;
        self.task_index = 0;
    }

    fn change_month(&mut self, delta: i32) {
        let months = Months::new(delta.unsigned_abs());
        let moved = if delta < 0 {
            self.selected_date.checked_sub_months(months)
        } else {
            self.selected_date.checked_add_months(months)
        };
        if let Some(date) = moved {
            self.selected_date = date;
            self.task_index = 0;
        }
    }

    fn toggle_task(&mut self) {
        let date = self.selected_date;
        let Some(task) = self.store.tasks_on(date).get(self.task_index) else {
            return;
        };
        let text = task.text.clone();

        match self.store.toggle_task(date, self.task_index) {
            Ok(true) => self.set_message(format!("Done: {}", text), MessageType::Success),
            Ok(false) => self.set_message(format!("Reopened: {}", text), MessageType::Info),
            Err(err) => self.show_error("Could not update task", err),
        }
    }

    fn add_task(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            self.set_message("Enter what needs to be done.", MessageType::Warning);
            return;
        }

        if let Err(err) = self.store.add_task(self.selected_date, text) {
            self.show_error("Could not add task", err);
            return;
        }
        self.task_index = self.store.task_count_on(self.selected_date) - 1;

        let unlocked = self.unlocks.merge(&Unlocks::scan(text));
        if let Some(feature) = unlocked.first() {
            debug!(?unlocked, "pages unlocked");
            self.set_message(
                format!("Task added. Unlocked: {}", feature.label()),
                MessageType::Success,
            );
        } else {
            self.set_message("Task added.", MessageType::Success);
        }
    }

    fn confirm_delete_task(&mut self) {
        if let Some(task) = self.store.tasks_on(self.selected_date).get(self.task_index) {
            self.confirm_dialog = Some(ConfirmDialog {
                title: "Delete Task".to_string(),
                message: format!("Delete '{}'? (y/n)", task.text),
                action: ConfirmAction::DeleteTask(self.selected_date, self.task_index),
            });
        }
    }

    // Alarms

    fn handle_alarms_key(&mut self, key: KeyEvent) {
        let count = self.store.data().alarms.len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.alarm_index = step(self.alarm_index, 1, count)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.alarm_index = step(self.alarm_index, -1, count)
            }
            KeyCode::Char('a') => {
                self.alarm_draft = AlarmDraft::default();
                self.start_editing(EditField::AlarmName, "");
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some((id, alarm)) = self.selected_alarm() {
                    let active = !alarm.active;
                    match self.store.set_alarm_active(&id, active) {
                        Ok(()) => self.set_message(
                            if active { "Alarm on" } else { "Alarm off" },
                            MessageType::Success,
                        ),
                        Err(err) => self.show_error("Could not update alarm", err),
                    }
                }
            }
            KeyCode::Char('m') => {
                if let Some((id, alarm)) = self.selected_alarm() {
                    let enabled = !alarm.mission_enabled;
                    match self.store.set_alarm_mission(&id, enabled) {
                        Ok(()) => self.set_message(
                            if enabled { "Mission quiz on" } else { "Mission quiz off" },
                            MessageType::Success,
                        ),
                        Err(err) => self.show_error("Could not update alarm", err),
                    }
                }
            }
            KeyCode::Char('d') => {
                if let Some((id, alarm)) = self.selected_alarm() {
                    self.confirm_dialog = Some(ConfirmDialog {
                        title: "Delete Alarm".to_string(),
                        message: format!("Delete alarm '{}'? (y/n)", alarm.name),
                        action: ConfirmAction::DeleteAlarm(id),
                    });
                }
            }
            _ => {}
        }
    }

    /// Selected alarm in display order.
    pub fn selected_alarm(&self) -> Option<(AlarmId, Alarm)> {
        self.store
            .alarms()
            .get(self.alarm_index)
            .map(|(id, alarm)| ((*id).clone(), (*alarm).clone()))
    }

    fn add_alarm(&mut self, days: Vec<u8>) {
        let draft = std::mem::take(&mut self.alarm_draft);
        let Some(time) = draft.time else {
            return;
        };

        let mission = self.store.settings().mission_alarm_enabled;
        let alarm = Alarm::new(draft.name, time, days, mission);
        let label = format!("{} {}", alarm.time.format("%H:%M"), alarm.days_label());
        match self.store.add_alarm(alarm) {
            Ok(_) => self.set_message(format!("Alarm added: {}", label), MessageType::Success),
            Err(err) => self.show_error("Could not add alarm", err),
        }
    }

    // Quiz

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        let count = self.quiz.quiz().map_or(0, |q| q.len());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.quiz_index = step(self.quiz_index, 1, count),
            KeyCode::Char('k') | KeyCode::Up => self.quiz_index = step(self.quiz_index, -1, count),
            KeyCode::Char(' ') => self.quiz.toggle(self.quiz_index),
            KeyCode::Enter => self.submit_quiz(),
            KeyCode::Char('r') => {
                if let Availability::Ready(answers) = self.quiz_availability() {
                    let max = self.config.quiz.max_decoys;
                    self.quiz
                        .regenerate(&answers, &self.decoys, max, &mut rand::thread_rng());
                    self.quiz_index = 0;
                    self.set_message("New quiz generated.", MessageType::Info);
                }
            }
            _ => {}
        }
    }

    fn submit_quiz(&mut self) {
        match self.quiz.submit() {
            Some(Verdict::Correct) => {
                debug!("quiz solved");
                self.quiz_index = 0;
                self.set_message(
                    "Correct! Mission complete. Alarm dismissed, have a great day!",
                    MessageType::Success,
                );
            }
            Some(Verdict::Incorrect { expected: Some(n) }) => self.set_message(
                format!("Wrong, try again. Hint: there are {} answers.", n),
                MessageType::Warning,
            ),
            Some(Verdict::Incorrect { expected: None }) => {
                self.set_message("Wrong, try again.", MessageType::Error)
            }
            None => {}
        }
    }

    // Settings

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.settings_index = step(self.settings_index, 1, SETTINGS_ROWS.len())
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.settings_index = step(self.settings_index, -1, SETTINGS_ROWS.len())
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_setting(),
            KeyCode::Char('b') => {
                let dir = self.config.backup_dir();
                match self.store.backup(&dir) {
                    Ok(path) => self.set_message(
                        format!("Backup written to {}", path.display()),
                        MessageType::Success,
                    ),
                    Err(err) => self.show_error("Backup failed", err),
                }
            }
            KeyCode::Char('R') => self.start_editing(EditField::RestorePath, ""),
            _ => {}
        }
    }

    fn toggle_setting(&mut self) {
        let mut settings: Settings = self.store.settings();
        let flag = match self.settings_index {
            0 => &mut settings.mission_alarm_enabled,
            1 => &mut settings.sound_enabled,
            _ => &mut settings.vibration_enabled,
        };
        *flag = !*flag;

        match self.store.update_settings(settings) {
            Ok(()) => self.set_message("Settings saved.", MessageType::Success),
            Err(err) => self.show_error("Could not save settings", err),
        }
    }

    // Media

    fn handle_media_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('u') {
            self.start_editing(EditField::YoutubeUrl, "");
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent) {
        let count = self.media_links().len();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.media_index = step(self.media_index, 1, count)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.media_index = step(self.media_index, -1, count)
            }
            _ => {}
        }
    }

    /// Direct link for the selected entry on a media page.
    pub fn selected_direct_link(&self) -> Option<String> {
        self.media_links()
            .get(self.media_index)
            .and_then(|link| media::drive_direct_link(link))
    }

    /// Finish editing and save.
    fn finish_editing(&mut self) {
        let input = self.input_buffer.trim().to_string();
        let field = self.editing_field;
        self.stop_editing();

        match field {
            EditField::TaskText => self.add_task(&input),
            EditField::AlarmName => {
                if input.is_empty() {
                    self.set_message("Enter an alarm name.", MessageType::Warning);
                } else {
                    self.alarm_draft.name = input;
                    self.start_editing(EditField::AlarmTime, "07:00");
                }
            }
            EditField::AlarmTime => match parse_time(&input) {
                Some(time) => {
                    self.alarm_draft.time = Some(time);
                    self.start_editing(EditField::AlarmDays, "");
                }
                None => {
                    self.set_message("Time must look like 07:30.", MessageType::Warning);
                    self.start_editing(EditField::AlarmTime, input);
                }
            },
            EditField::AlarmDays => match parse_days(&input) {
                Some(days) => self.add_alarm(days),
                None => {
                    self.set_message(
                        "Days look like mon,wed,fri (blank = every day).",
                        MessageType::Warning,
                    );
                    self.start_editing(EditField::AlarmDays, input);
                }
            },
            EditField::YoutubeUrl => {
                if input.is_empty() {
                    return;
                }
                match media::youtube_watch_url(&input) {
                    Some(url) => self.youtube_url = Some(url),
                    None => self.set_message("Not a valid YouTube video URL.", MessageType::Error),
                }
            }
            EditField::RestorePath => {
                if !input.is_empty() {
                    let path = PathBuf::from(&input);
                    self.confirm_dialog = Some(ConfirmDialog {
                        title: "Restore Backup".to_string(),
                        message: format!("Replace all data with {}? (y/n)", path.display()),
                        action: ConfirmAction::Restore(path),
                    });
                }
            }
            EditField::None => {}
        }
    }

    /// Execute confirmed action.
    fn execute_confirm(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteTask(date, index) => match self.store.delete_task(date, index) {
                Ok(task) => {
                    let last = self.store.task_count_on(date).saturating_sub(1);
                    self.task_index = self.task_index.min(last);
                    self.set_message(format!("Deleted: {}", task.text), MessageType::Success);
                }
                Err(err) => self.show_error("Could not delete task", err),
            },
            ConfirmAction::DeleteAlarm(id) => match self.store.delete_alarm(&id) {
                Ok(alarm) => {
                    let last = self.store.data().alarms.len().saturating_sub(1);
                    self.alarm_index = self.alarm_index.min(last);
                    self.set_message(
                        format!("Deleted alarm: {}", alarm.name),
                        MessageType::Success,
                    );
                }
                Err(err) => self.show_error("Could not delete alarm", err),
            },
            ConfirmAction::Restore(path) => match self.store.restore(&path) {
                Ok(()) => {
                    self.quiz.reset();
                    self.task_index = 0;
                    self.alarm_index = 0;
                    self.unlocks.merge(&Unlocks::scan_all(
                        self.store
                            .data()
                            .schedules
                            .values()
                            .flatten()
                            .map(|t| t.text.as_str()),
                    ));
                    self.set_message("Data restored.", MessageType::Success);
                }
                Err(err) => self.show_error("Restore failed", err),
            },
        }
    }
}

/// Move an index by `delta`, clamped to `0..len`.
fn step(index: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (index as i64 + delta as i64).clamp(0, len as i64 - 1) as usize
}

/// Dates of a month laid out in weeks; `None` pads days outside the month.
pub fn month_grid(year: i32, month: u32, week_start: WeekStart) -> Vec<[Option<NaiveDate>; 7]> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let offset = match week_start {
        WeekStart::Monday => first.weekday().num_days_from_monday(),
        WeekStart::Sunday => first.weekday().num_days_from_sunday(),
    } as usize;

    let mut weeks = Vec::new();
    let mut week = [None; 7];
    let mut slot = offset;
    let mut date = first;
    while date.month() == month {
        week[slot] = Some(date);
        slot += 1;
        if slot == 7 {
            weeks.push(week);
            week = [None; 7];
            slot = 0;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    if slot > 0 {
        weeks.push(week);
    }
    weeks
}
