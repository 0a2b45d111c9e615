//! UI rendering for mission alarm.

use crate::app::{month_grid, App, ConfirmDialog, EditField, MessageType, View, SETTINGS_ROWS};
use crate::config::WeekStart;
use crate::media;
use crate::models::WEEKDAY_LABELS;
use crate::quiz::Availability;
use chrono::Datelike;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

/// Draw the application.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/status
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    if app.show_help {
        draw_help_popup(f);
    }

    if let Some(dialog) = &app.confirm_dialog {
        draw_confirm_dialog(f, dialog);
    }

    if app.editing {
        draw_edit_dialog(f, app);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let (done, total) = app.today_progress();
    let mut title = format!(
        " Mission Alarm - {} - today {}/{} done ",
        app.today().format("%a %Y-%m-%d"),
        done,
        total
    );
    if let Some((at, alarm)) = app.next_alarm() {
        title.push_str(&format!("- next alarm {} {} ", at.format("%a %H:%M"), alarm.name));
    }

    let mut tabs: Vec<Span> = Vec::new();
    for (i, view) in app.views().into_iter().enumerate() {
        if i > 0 {
            tabs.push(Span::raw(" "));
        }
        tabs.push(styled_tab(&format!("{}:{}", i + 1, view.title()), app.view == view));
    }

    let header = Paragraph::new(Line::from(tabs))
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center);

    f.render_widget(header, area);
}

fn styled_tab(label: &str, active: bool) -> Span<'static> {
    if active {
        Span::styled(
            format!("[{}]", label),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(format!(" {} ", label), Style::default().fg(Color::Gray))
    }
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Calendar => draw_calendar_view(f, app, area),
        View::Alarms => draw_alarms_view(f, app, area),
        View::Quiz => draw_quiz_view(f, app, area),
        View::Settings => draw_settings_view(f, app, area),
        View::Media => draw_media_view(f, app, area),
        View::Mp3 | View::Mp4 => draw_player_view(f, app, area),
    }
}

fn draw_calendar_view(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)])
        .split(area);

    draw_month(f, app, chunks[0]);
    draw_day_tasks(f, app, chunks[1]);
}

fn draw_month(f: &mut Frame, app: &App, area: Rect) {
    let date = app.selected_date;
    let week_start = app.config.display.week_start;
    let title = format!(" {} ", date.format("%B %Y"));

    let mut labels: Vec<&str> = WEEKDAY_LABELS.to_vec();
    if week_start == WeekStart::Sunday {
        labels.rotate_right(1);
    }
    let header: String = labels.iter().map(|l| format!("{:<4}", &l[..2])).collect();

    let mut lines = vec![Line::styled(header, Style::default().fg(Color::DarkGray))];

    for week in month_grid(date.year(), date.month(), week_start) {
        let spans: Vec<Span> = week
            .iter()
            .map(|day| match day {
                None => Span::raw("    "),
                Some(day) => {
                    let count = app.store.task_count_on(*day);
                    let mut style = Style::default();
                    if count > 0 {
                        style = style.fg(Color::Green);
                    }
                    if *day == app.today() {
                        style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
                    }
                    if *day == date {
                        style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
                    }
                    let marker = if count > 0 { "*" } else { " " };
                    Span::styled(format!("{:>2}{} ", day.day(), marker), style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
    }

    let calendar = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(calendar, area);
}

fn draw_day_tasks(f: &mut Frame, app: &App, area: Rect) {
    let date = app.selected_date;
    let tasks = app.store.tasks_on(date);
    let title = format!(" {} ", date.format(&app.config.display.date_format));

    if tasks.is_empty() {
        let msg = Paragraph::new("No tasks for this day. Press 'a' to add one.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let checkbox = if task.completed { "[x]" } else { "[ ]" };
            let name_style = if task.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else if i == app.task_index {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let spans = vec![
                Span::styled(
                    checkbox,
                    Style::default().fg(if task.completed {
                        Color::Green
                    } else {
                        Color::Gray
                    }),
                ),
                Span::raw(" "),
                Span::styled(task.text.as_str(), name_style),
            ];

            let style = if i == app.task_index {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(
                "{}({} tasks, {} open) ",
                title,
                tasks.len(),
                app.store.incomplete_on(date).len()
            )),
    );
    f.render_widget(list, area);
}

fn draw_alarms_view(f: &mut Frame, app: &App, area: Rect) {
    let alarms = app.store.alarms();
    if alarms.is_empty() {
        let msg = Paragraph::new("No alarms yet. Press 'a' to add one.")
            .block(Block::default().borders(Borders::ALL).title(" Alarms "))
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let header = Row::new(vec!["Time", "Name", "Repeat", "Mission", "Active"])
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = alarms
        .iter()
        .enumerate()
        .map(|(i, (_, alarm))| {
            let style = if i == app.alarm_index {
                Style::default().bg(Color::DarkGray)
            } else if !alarm.active {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                alarm.time.format("%H:%M").to_string(),
                alarm.name.clone(),
                alarm.days_label(),
                if alarm.mission_enabled { "on" } else { "off" }.to_string(),
                if alarm.active { "on" } else { "off" }.to_string(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Alarms "));

    f.render_widget(table, area);
}

fn draw_quiz_view(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Mission Quiz ");

    let notice = match app.quiz_availability() {
        Availability::NoTasks => Some((
            "No tasks registered for today. Add some in the calendar first.",
            Color::Yellow,
        )),
        Availability::AllComplete => Some(("Every task for today is done!", Color::Green)),
        Availability::Ready(_) => None,
    };
    if let Some((text, color)) = notice {
        let msg = Paragraph::new(text)
            .style(Style::default().fg(color))
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let Some(quiz) = app.quiz.quiz() else {
        let msg = Paragraph::new("Press 'r' to generate a quiz.")
            .block(block)
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(block.inner(area));
    f.render_widget(block, area);

    let prompt = Paragraph::new(vec![Line::from(format!(
        "Select everything you still have to do today ({}). {} selected.",
        app.today().format("%Y-%m-%d"),
        app.quiz.selected_count()
    ))]);
    f.render_widget(prompt, chunks[0]);

    let items: Vec<ListItem> = quiz
        .options
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let checked = app.quiz.is_selected(i);
            let style = if i == app.quiz_index {
                Style::default().bg(Color::DarkGray).fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    if checked { "[x] " } else { "[ ] " },
                    Style::default().fg(if checked { Color::Green } else { Color::Gray }),
                ),
                Span::raw(option.as_str()),
            ]))
            .style(style)
        })
        .collect();

    f.render_widget(List::new(items), chunks[1]);
}

fn draw_settings_view(f: &mut Frame, app: &App, area: Rect) {
    let settings = app.store.settings();
    let values = [
        settings.mission_alarm_enabled,
        settings.sound_enabled,
        settings.vibration_enabled,
    ];

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = SETTINGS_ROWS
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (label, on))| {
            let style = if i == app.settings_index {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    if on { "[x] " } else { "[ ] " },
                    Style::default().fg(if on { Color::Green } else { Color::Gray }),
                ),
                Span::raw(*label),
            ]))
            .style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" General "));
    f.render_widget(list, chunks[0]);

    let data_file = app
        .store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not saved)".to_string());
    let unlocked = if app.unlocks.is_empty() {
        "none".to_string()
    } else {
        app.unlocks.iter().map(|f| f.label()).collect::<Vec<_>>().join(", ")
    };
    let decoys = if app.decoys.is_empty() {
        "none configured".to_string()
    } else {
        format!("{} (max {} per quiz)", app.decoys.len(), app.config.quiz.max_decoys)
    };
    let info = format!(
        "Data file: {}\nBackup directory: {}\nQuiz decoys: {}\nUnlocked pages: {}\n\n\
         b: write backup   R: restore from a backup file",
        data_file,
        app.config.backup_dir().display(),
        decoys,
        unlocked
    );
    let data = Paragraph::new(info)
        .block(Block::default().borders(Borders::ALL).title(" Data "))
        .wrap(Wrap { trim: true });
    f.render_widget(data, chunks[1]);
}

fn draw_media_view(f: &mut Frame, app: &App, area: Rect) {
    let deadline = &app.config.media.deadline_video;
    let deadline_url = media::youtube_watch_url(deadline).unwrap_or_else(|| deadline.clone());

    let mut lines = vec![
        Line::styled(
            "When the deadline is chasing you:",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::styled(deadline_url, Style::default().fg(Color::Cyan)),
        Line::raw(""),
        Line::raw("Press 'u' to look up a YouTube video URL."),
    ];
    if let Some(url) = &app.youtube_url {
        lines.push(Line::raw(""));
        lines.push(Line::styled(url.as_str(), Style::default().fg(Color::Cyan)));
    }

    let page = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Deadline "))
        .wrap(Wrap { trim: true });
    f.render_widget(page, area);
}

fn draw_player_view(f: &mut Frame, app: &App, area: Rect) {
    let title = format!(" {} ", app.view.title());
    let links = app.media_links();
    if links.is_empty() {
        let msg = Paragraph::new("No links configured. Add some to the [media] section of config.toml.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .alignment(Alignment::Center);
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let items: Vec<ListItem> = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let style = if i == app.media_index {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            ListItem::new(link.as_str()).style(style)
        })
        .collect();
    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[0],
    );

    let (text, style) = match app.selected_direct_link() {
        Some(link) => (link, Style::default().fg(Color::Cyan)),
        None => (
            "Not a valid Google Drive link.".to_string(),
            Style::default().fg(Color::Red),
        ),
    };
    let direct = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(" Direct link "))
        .wrap(Wrap { trim: true });
    f.render_widget(direct, chunks[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let (msg, style) = if let Some((ref message, msg_type)) = app.message {
        let color = match msg_type {
            MessageType::Info => Color::Blue,
            MessageType::Success => Color::Green,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };
        (message.clone(), Style::default().fg(color))
    } else {
        let help = match app.view {
            View::Calendar => "h/l:Day  H/L:Week  [/]:Month  t:Today  j/k:Task  Space:Toggle  a:Add  d:Delete  ?:Help  q:Quit",
            View::Alarms => "j/k:Navigate  a:Add  Space:On/Off  m:Mission  d:Delete  ?:Help  q:Quit",
            View::Quiz if app.quiz.is_generated() => {
                "j/k:Navigate  Space:Select  Enter:Check  r:New quiz  ?:Help  q:Quit"
            }
            View::Quiz => "r:Generate quiz  Tab:Next view  ?:Help  q:Quit",
            View::Settings => "j/k:Navigate  Space:Toggle  b:Backup  R:Restore  ?:Help  q:Quit",
            View::Media => "u:YouTube URL  Tab:Next view  ?:Help  q:Quit",
            View::Mp3 | View::Mp4 => "j/k:Navigate  Tab:Next view  ?:Help  q:Quit",
        };
        (help.to_string(), Style::default().fg(Color::DarkGray))
    };

    let footer = Paragraph::new(msg)
        .style(style)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help_text = r#"
Mission Alarm Keybindings

Views:
  Tab/Shift-Tab   Next/previous view
  1-7             Jump to view

Calendar:
  h/l, H/L        Previous/next day, week
  [ ]             Previous/next month
  t               Jump to today
  j/k             Select task
  Space, Enter    Toggle completion
  a / d           Add / delete task

Alarms:
  a               Add alarm (name, time, days)
  Space / m       Toggle active / mission quiz
  d               Delete alarm

Quiz:
  Space           Select option
  Enter           Check answer
  r               Generate a new quiz

General:
  ?               Show this help
  q               Quit

Press any key to close
"#;

    let popup = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });

    f.render_widget(popup, area);
}

fn draw_confirm_dialog(f: &mut Frame, dialog: &ConfirmDialog) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let text = Paragraph::new(dialog.message.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", dialog.title)),
        )
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    f.render_widget(text, area);
}

fn draw_edit_dialog(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let title = match app.editing_field {
        EditField::TaskText => "What needs to be done?",
        EditField::AlarmName => "Alarm name",
        EditField::AlarmTime => "Alarm time (HH:MM)",
        EditField::AlarmDays => "Repeat days (mon,wed,...; blank = every day)",
        EditField::YoutubeUrl => "YouTube video URL",
        EditField::RestorePath => "Backup file to restore",
        EditField::None => "",
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title)),
        )
        .style(Style::default().fg(Color::Yellow));

    f.render_widget(input, area);

    f.set_cursor_position((
        area.x + 1 + app.input_buffer.chars().count() as u16,
        area.y + 1,
    ));
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::quiz::DecoyPool;
    use crate::store::MissionStore;
    use chrono::NaiveDate;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        App::with_store(Config::default(), MissionStore::in_memory(), now)
    }

    #[test]
    fn test_calendar_lists_tasks() {
        let mut app = app();
        app.store.add_task(app.today(), "clean room").unwrap();
        let screen = render(&app);
        assert!(screen.contains("January 2024"));
        assert!(screen.contains("[ ] clean room"));
        assert!(screen.contains("today 0/1 done"));
    }

    #[test]
    fn test_quiz_view_without_tasks() {
        let mut app = app();
        app.set_view(View::Quiz);
        assert!(render(&app).contains("No tasks registered for today"));
    }

    #[test]
    fn test_quiz_view_lists_options() {
        let mut app = app();
        app.store.add_task(app.today(), "read book").unwrap();
        app.set_view(View::Quiz);
        let screen = render(&app);
        assert!(screen.contains("read book"));
        assert_eq!(screen.matches("[ ] ").count(), 4);
    }

    #[test]
    fn test_settings_show_decoy_pool() {
        let mut app = app();
        app.set_view(View::Settings);
        assert!(render(&app).contains("Quiz decoys: 8 (max 3 per quiz)"));

        app.decoys = DecoyPool::new(Vec::<String>::new());
        assert!(render(&app).contains("Quiz decoys: none configured"));
    }

    #[test]
    fn test_quiz_footer_before_generation() {
        let mut app = app();
        app.view = View::Quiz;
        assert!(render(&app).contains("r:Generate quiz"));

        app.store.add_task(app.today(), "read book").unwrap();
        app.set_view(View::Quiz);
        assert!(render(&app).contains("r:New quiz"));
    }

    #[test]
    fn test_help_popup() {
        let mut app = app();
        app.show_help = true;
        assert!(render(&app).contains("Mission Alarm Keybindings"));
    }
}
