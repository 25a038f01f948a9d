use std::collections::HashSet;
use std::error::Error;
use std::io;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, NaiveTime};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::calendar::{CalendarEvent, local_today, project_events, resolve_date_for_weekday, week_start};
use crate::color::HexColor;
use crate::domain::{CourseCode, CourseDraft, CourseType, Schedule, Subject, Weekday, parse_clock, parse_time_range};
use crate::selection::{SelectionMode, is_chosen, subject_icon, subject_status};
use crate::settings::Settings;
use crate::storage::{KeyValueStore, save_schedule, save_settings};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const UNCHOSEN_BACKGROUND_COLOR: Color = Color::DarkGray;
const GRID_GUTTER: u16 = 6;

fn grid_open() -> NaiveTime {
	NaiveTime::from_hms_opt(8, 0, 0).expect("grid start must be valid")
}

fn grid_close() -> NaiveTime {
	NaiveTime::from_hms_opt(22, 0, 0).expect("grid end must be valid")
}

pub fn run_dashboard<S: KeyValueStore>(
	schedule: &mut Schedule,
	settings: &mut Settings,
	store: &mut S,
) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let mut planner = Planner::new(schedule, settings, store);
	let result = run_event_loop(&mut terminal, &mut planner);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop<S: KeyValueStore>(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	planner: &mut Planner<'_, S>,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();

	loop {
		let view = build_view(&app, planner.schedule, planner.settings, local_today());
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, planner),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, planner),
					InputMode::Normal => handle_normal_key(&mut app, key.code, planner, &view),
				};

				if let Err(err) = planner.sync_schedule() {
					app.status = format!("error: {err}");
				}
				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

struct Planner<'a, S: KeyValueStore> {
	schedule: &'a mut Schedule,
	settings: &'a mut Settings,
	store: &'a mut S,
	saved_revision: u64,
}

impl<'a, S: KeyValueStore> Planner<'a, S> {
	fn new(schedule: &'a mut Schedule, settings: &'a mut Settings, store: &'a mut S) -> Self {
		let saved_revision = schedule.revision();
		Self {
			schedule,
			settings,
			store,
			saved_revision,
		}
	}

	fn sync_schedule(&mut self) -> Result<bool, String> {
		let revision = self.schedule.revision();
		if revision == self.saved_revision {
			return Ok(false);
		}
		save_schedule(&mut *self.store, self.schedule).map_err(|err| err.to_string())?;
		self.saved_revision = revision;
		Ok(true)
	}

	fn persist_settings(&mut self) -> Result<(), String> {
		save_settings(&mut *self.store, self.settings).map_err(|err| err.to_string())
	}
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(5)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
		.split(layout[0]);

	render_explorer_panel(frame, body[0], app, view);
	render_week_panel(frame, body[1], app, view);
	render_footer(frame, layout[1], app, view);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select);
	}
}

fn render_explorer_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.explorer_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.explorer_rows.is_empty() {
		state.select(Some(app.explorer_index.min(view.explorer_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(format!("Subjects ({})", view.subject_count))
		.border_style(border_style(app.focus == FocusPane::Subjects));
	let list = List::new(if items.is_empty() {
		vec![ListItem::new("(no subjects, press a to add one)")]
	} else {
		items
	})
	.block(block)
	.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_week_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let inner_width = area.width.saturating_sub(2);
	let columns = view.days.len().max(1) as u16;
	let column_width = usize::from(inner_width.saturating_sub(GRID_GUTTER) / columns);
	let selected = if app.focus == FocusPane::Week {
		view.events.get(app.event_index)
	} else {
		None
	};

	let mut header = vec![Span::raw(" ".repeat(usize::from(GRID_GUTTER)))];
	for (day, date) in &view.days {
		header.push(Span::styled(
			fit(&format!("{} {}", day.name(), date.format("%m.%d")), column_width),
			Style::default().add_modifier(Modifier::BOLD),
		));
	}

	let rows = slot_rows(view.slot);
	let mut lines = vec![Line::from(header)];
	for from in &rows {
		let until = *from + Duration::minutes(i64::from(view.slot));
		let mut spans = vec![Span::styled(
			format!("{:<width$}", from.format("%H:%M"), width = usize::from(GRID_GUTTER)),
			Style::default().fg(Color::DarkGray),
		)];
		for (_, date) in &view.days {
			spans.extend(grid_cell(&view.events, *date, *from, until, view.slot, column_width, selected));
		}
		lines.push(Line::from(spans));
	}

	let visible_rows = usize::from(area.height.saturating_sub(3));
	let focus_row = selected
		.map(|event| slot_index(event.start.time(), view.slot))
		.unwrap_or(0);
	let offset = scroll_offset(focus_row, visible_rows, rows.len());

	let title = match selected {
		Some(event) => format!(
			"Week of {} | {} {} {} {}",
			view.week_start.format("%Y-%m-%d"),
			event.title,
			event.course_code,
			event.course_type,
			event.time_text()
		),
		None => format!("Week of {}", view.week_start.format("%Y-%m-%d")),
	};
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Week));
	// header stays pinned above the scrolled rows
	let mut pinned = vec![lines[0].clone()];
	pinned.extend(lines.into_iter().skip(1 + offset));
	frame.render_widget(Paragraph::new(pinned).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | arrows/jk navigate | Enter expand/collapse subject | q quit"),
			Line::from(
				"space choose section | v show/hide subject | h show/hide section | m selection mode | a add subject | c add section | d delete | s saturday",
			),
			Line::from(format!("{} | slot {} min", app.status, view.slot)),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(prompt.title.clone()),
			Line::from(format!("> {}", prompt.input)),
			Line::from("Enter submit | Esc cancel"),
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
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn render_select_popup(frame: &mut Frame, select: &SelectState) {
	let area = centered_rect(50, 45, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()).style(option.style))
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

fn grid_cell(
	events: &[CalendarEvent],
	date: NaiveDate,
	from: NaiveTime,
	until: NaiveTime,
	slot: u32,
	width: usize,
	selected: Option<&CalendarEvent>,
) -> Vec<Span<'static>> {
	let covering = events
		.iter()
		.filter(|event| event.covers(date, from, until))
		.collect::<Vec<_>>();
	let Some(event) = covering.first() else {
		return vec![Span::raw(" ".repeat(width))];
	};
	if width == 0 {
		return Vec::new();
	}

	let mut text = cell_text(event, from, slot).unwrap_or_default();
	if covering.len() > 1 && from <= event.start.time() {
		text = format!("{text} +{}", covering.len() - 1);
	}

	let mut style = if event.chosen {
		Style::default()
			.bg(terminal_color(&event.background))
			.fg(terminal_color(&event.text_color))
	} else {
		Style::default().bg(UNCHOSEN_BACKGROUND_COLOR).fg(Color::White)
	};
	if selected == Some(*event) {
		style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
	}

	let marker = if event.dashed { "┆" } else { "│" };
	vec![
		Span::styled(marker, style.fg(terminal_color(&event.border))),
		Span::styled(fit(&text, width - 1), style),
	]
}

/// Label line shown in the grid row starting at `from`: the first row of an
/// event shows its first label line, later rows continue down the list.
fn cell_text(event: &CalendarEvent, from: NaiveTime, slot: u32) -> Option<String> {
	let start = event.start.time();
	let index = if from <= start {
		0
	} else {
		let minutes = (from - start).num_minutes();
		let slot = i64::from(slot.max(1));
		((minutes + slot - 1) / slot) as usize
	};
	event.label_lines.get(index).cloned()
}

fn slot_rows(slot: u32) -> Vec<NaiveTime> {
	let step = Duration::minutes(i64::from(slot.max(1)));
	let mut rows = Vec::new();
	let mut cursor = grid_open();
	while cursor < grid_close() {
		rows.push(cursor);
		cursor += step;
	}
	rows
}

fn slot_index(time: NaiveTime, slot: u32) -> usize {
	if time <= grid_open() {
		return 0;
	}
	((time - grid_open()).num_minutes() / i64::from(slot.max(1))) as usize
}

fn scroll_offset(focus_row: usize, visible_rows: usize, total_rows: usize) -> usize {
	if visible_rows == 0 || total_rows <= visible_rows {
		return 0;
	}
	focus_row
		.saturating_sub(visible_rows / 2)
		.min(total_rows - visible_rows)
}

fn fit(text: &str, width: usize) -> String {
	let mut out = text.chars().take(width).collect::<String>();
	let used = out.chars().count();
	out.extend(std::iter::repeat_n(' ', width - used));
	out
}

fn terminal_color(color: &HexColor) -> Color {
	let (red, green, blue) = color.rgb();
	Color::Rgb(red, green, blue)
}

fn handle_normal_key<S: KeyValueStore>(
	app: &mut App,
	code: KeyCode,
	planner: &mut Planner<'_, S>,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Tab => {
			app.focus = app.focus.next();
			false
		}
		KeyCode::BackTab => {
			app.focus = app.focus.prev();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			app.move_selection(-1, view);
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			app.move_selection(1, view);
			false
		}
		KeyCode::Enter => {
			if let Some(RowTarget::Subject { subject_id }) = app.selected_target(view) {
				if !app.collapsed_subjects.remove(&subject_id) {
					app.collapsed_subjects.insert(subject_id);
				}
			}
			false
		}
		KeyCode::Char(' ') => {
			app.status = match app.selected_target(view) {
				Some(RowTarget::Course {
					subject_id,
					course_id,
				}) => choose_course(planner, subject_id, course_id).unwrap_or_else(|err| format!("error: {err}")),
				Some(RowTarget::Subject { .. }) => "Select a section of this subject first".to_string(),
				None => "Nothing selected".to_string(),
			};
			false
		}
		KeyCode::Char('v') => {
			app.status = match app.selected_target(view) {
				Some(target) => {
					toggle_subject_visibility(planner, target.subject_id()).unwrap_or_else(|err| format!("error: {err}"))
				}
				None => "Select a subject first".to_string(),
			};
			false
		}
		KeyCode::Char('h') => {
			app.status = match app.selected_target(view) {
				Some(RowTarget::Course {
					subject_id,
					course_id,
				}) => toggle_course_visibility(planner, subject_id, course_id)
					.unwrap_or_else(|err| format!("error: {err}")),
				_ => "Select a section first".to_string(),
			};
			false
		}
		KeyCode::Char('m') => {
			app.status = match app.selected_target(view) {
				Some(target) => cycle_selection_mode(planner, target.subject_id()).unwrap_or_else(|err| format!("error: {err}")),
				None => "Select a subject first".to_string(),
			};
			false
		}
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new("Subject code", PromptKind::SubjectCode));
			false
		}
		KeyCode::Char('c') => {
			match app.selected_target(view) {
				Some(target) => {
					app.mode = InputMode::Prompt(PromptState::new(
						"Section code",
						PromptKind::CourseCode {
							subject_id: target.subject_id(),
						},
					));
				}
				None => app.status = "Select a subject to add a section to".to_string(),
			}
			false
		}
		KeyCode::Char('d') => {
			match app
				.selected_target(view)
				.and_then(|target| build_delete_select(planner.schedule, target))
			{
				Some(select) => app.mode = InputMode::Select(select),
				None => app.status = "Nothing selected to delete".to_string(),
			}
			false
		}
		KeyCode::Char('s') => {
			planner.settings.saturday = !planner.settings.saturday;
			app.status = match planner.persist_settings() {
				Ok(()) if planner.settings.saturday => "Saturday shown".to_string(),
				Ok(()) => "Saturday hidden".to_string(),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		_ => false,
	}
}

fn handle_prompt_key<S: KeyValueStore>(app: &mut App, code: KeyCode, planner: &mut Planner<'_, S>) -> bool {
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

			match submit_prompt(prompt.clone(), planner) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Select(select)) => app.mode = InputMode::Select(select),
				Ok(PromptOutcome::Done(message)) => {
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

fn handle_select_key<S: KeyValueStore>(app: &mut App, code: KeyCode, planner: &mut Planner<'_, S>) -> bool {
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
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), planner) {
				Ok(SelectOutcome::NextPrompt(prompt)) => app.mode = InputMode::Prompt(prompt),
				Ok(SelectOutcome::NextSelect(next_select)) => app.mode = InputMode::Select(next_select),
				Ok(SelectOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
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

fn submit_prompt<S: KeyValueStore>(prompt: PromptState, planner: &mut Planner<'_, S>) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::SubjectCode => {
			let code = required_text(&prompt.input, "subject code")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				format!("Name of {code}"),
				PromptKind::SubjectName { code },
			)))
		}
		PromptKind::SubjectName { code } => {
			let name = required_text(&prompt.input, "subject name")?;
			let id = planner.schedule.add_subject(code.clone(), name);
			Ok(PromptOutcome::Done(format!("created subject {id}: {code}")))
		}
		PromptKind::CourseCode { subject_id } => {
			let code = CourseCode::parse(&prompt.input).map_err(|err| err.to_string())?;
			Ok(PromptOutcome::Select(build_course_type_select(subject_id, blank_draft(code))))
		}
		PromptKind::CourseStart { subject_id, mut draft } => {
			parse_clock(&prompt.input).map_err(|err| err.to_string())?;
			draft.start_time = prompt.input.trim().to_string();
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"End time (HH:MM)",
				PromptKind::CourseEnd { subject_id, draft },
			)))
		}
		PromptKind::CourseEnd { subject_id, mut draft } => {
			parse_time_range(&draft.start_time, &prompt.input).map_err(|err| err.to_string())?;
			draft.end_time = prompt.input.trim().to_string();
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Instructor",
				PromptKind::CourseInstructor { subject_id, draft },
			)))
		}
		PromptKind::CourseInstructor { subject_id, mut draft } => {
			draft.instructor = required_text(&prompt.input, "instructor")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Location",
				PromptKind::CourseLocation { subject_id, draft },
			)))
		}
		PromptKind::CourseLocation { subject_id, mut draft } => {
			draft.location = required_text(&prompt.input, "location")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Notes (optional)",
				PromptKind::CourseNotes { subject_id, draft },
			)))
		}
		PromptKind::CourseNotes { subject_id, mut draft } => {
			draft.notes = prompt.input.trim().to_string();
			let code = draft.code.clone();
			match planner.schedule.add_course(subject_id, draft) {
				Ok(Some(course_id)) => {
					Ok(PromptOutcome::Done(format!("created section {course_id}: {code}")))
				}
				Ok(None) => Err("subject no longer exists".to_string()),
				Err(err) => Err(err.to_string()),
			}
		}
	}
}

fn submit_select<S: KeyValueStore>(select: SelectState, planner: &mut Planner<'_, S>) -> Result<SelectOutcome, String> {
	let selected_value = select
		.selected_option()
		.and_then(|option| option.value.clone())
		.ok_or_else(|| "no option selected".to_string())?;

	match select.kind {
		SelectKind::CourseType { subject_id, mut draft } => {
			draft.course_type = CourseType::from_label(&selected_value);
			Ok(SelectOutcome::NextSelect(build_course_day_select(
				subject_id,
				draft,
				planner.settings,
			)))
		}
		SelectKind::CourseDay { subject_id, mut draft } => {
			let day = selected_value.parse::<Weekday>().map_err(|err| err.to_string())?;
			planner.settings.check_day(day).map_err(|err| err.to_string())?;
			draft.day = day;
			Ok(SelectOutcome::NextPrompt(PromptState::new(
				"Start time (HH:MM)",
				PromptKind::CourseStart { subject_id, draft },
			)))
		}
		SelectKind::DeleteConfirm { target, label } => {
			if selected_value != "delete" {
				return Ok(SelectOutcome::Done("Delete cancelled".to_string()));
			}

			let removed = match target {
				RowTarget::Subject { subject_id } => planner.schedule.remove_subject(subject_id),
				RowTarget::Course {
					subject_id,
					course_id,
				} => planner.schedule.remove_course(subject_id, course_id),
			};
			if !removed {
				return Err(format!("{label} no longer exists"));
			}
			Ok(SelectOutcome::Done(format!("deleted {label}")))
		}
	}
}

fn choose_course<S: KeyValueStore>(planner: &mut Planner<'_, S>, subject_id: u32, course_id: u32) -> Result<String, String> {
	let (code, course_type, locked) = {
		let subject = planner
			.schedule
			.subject(subject_id)
			.ok_or_else(|| "subject no longer exists".to_string())?;
		let course = subject
			.course(course_id)
			.ok_or_else(|| "section no longer exists".to_string())?;
		(
			course.course.clone(),
			course.course_type,
			subject.selection_mode() == SelectionMode::Locked,
		)
	};

	if locked {
		return Ok("Every section of a locked subject is already chosen".to_string());
	}
	if !planner.schedule.set_chosen_course(subject_id, &code, course_type) {
		return Err("section could not be chosen".to_string());
	}

	let chosen = planner
		.schedule
		.subject(subject_id)
		.and_then(|subject| subject.course(course_id).map(|course| is_chosen(subject, course)))
		.unwrap_or(false);
	Ok(if chosen {
		format!("chose section {code} ({course_type})")
	} else {
		format!("cleared section {code} ({course_type})")
	})
}

fn toggle_subject_visibility<S: KeyValueStore>(planner: &mut Planner<'_, S>, subject_id: u32) -> Result<String, String> {
	let show = planner
		.schedule
		.subject(subject_id)
		.map(|subject| !subject.status.show)
		.ok_or_else(|| "subject no longer exists".to_string())?;
	planner.schedule.update_show_subject(subject_id, show);
	Ok(if show { "Subject shown" } else { "Subject hidden" }.to_string())
}

fn toggle_course_visibility<S: KeyValueStore>(
	planner: &mut Planner<'_, S>,
	subject_id: u32,
	course_id: u32,
) -> Result<String, String> {
	let show = planner
		.schedule
		.subject(subject_id)
		.and_then(|subject| subject.course(course_id))
		.map(|course| !course.show)
		.ok_or_else(|| "section no longer exists".to_string())?;
	planner.schedule.update_show_course(subject_id, course_id, show);
	Ok(if show { "Section shown" } else { "Section hidden" }.to_string())
}

fn cycle_selection_mode<S: KeyValueStore>(planner: &mut Planner<'_, S>, subject_id: u32) -> Result<String, String> {
	let subject = planner
		.schedule
		.subject(subject_id)
		.cloned()
		.ok_or_else(|| "subject no longer exists".to_string())?;
	let mode = subject.selection_mode().next();
	planner
		.schedule
		.update_subject(subject_id, subject.code, subject.name, subject.status.color, mode);
	Ok(format!("selection mode: {}", mode.label()))
}

fn build_course_type_select(subject_id: u32, draft: CourseDraft) -> SelectState {
	let options = CourseType::ALL
		.iter()
		.map(|course_type| SelectOption::new(course_type.label(), Some(course_type.label().to_string()), Style::default()))
		.collect::<Vec<_>>();

	SelectState::new("Section type", SelectKind::CourseType { subject_id, draft }, options)
}

fn build_course_day_select(subject_id: u32, draft: CourseDraft, settings: &Settings) -> SelectState {
	let options = settings
		.allowed_days()
		.into_iter()
		.map(|day| SelectOption::new(day.name(), Some(day.name().to_string()), Style::default()))
		.collect::<Vec<_>>();

	SelectState::new("Day", SelectKind::CourseDay { subject_id, draft }, options)
}

fn build_delete_select(schedule: &Schedule, target: RowTarget) -> Option<SelectState> {
	let label = match target {
		RowTarget::Subject { subject_id } => {
			let subject = schedule.subject(subject_id)?;
			format!("subject {} {}", subject.code, subject.name)
		}
		RowTarget::Course {
			subject_id,
			course_id,
		} => {
			let subject = schedule.subject(subject_id)?;
			let course = subject.course(course_id)?;
			format!("section {} of {}", course.course, subject.code)
		}
	};

	let options = vec![
		SelectOption::new(
			"Delete",
			Some("delete".to_string()),
			Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
		),
		SelectOption::new("Cancel", Some("cancel".to_string()), Style::default()),
	];

	let mut select = SelectState::new(format!("Delete {label}?"), SelectKind::DeleteConfirm { target, label }, options);
	select.selected = 1;
	Some(select)
}

fn build_view(app: &App, schedule: &Schedule, settings: &Settings, today: NaiveDate) -> ViewModel {
	let days = settings
		.visible_days()
		.into_iter()
		.map(|day| (day, resolve_date_for_weekday(day, today)))
		.collect::<Vec<_>>();

	let mut events = project_events(schedule, settings, today)
		.into_iter()
		.filter(|event| event.visible && days.iter().any(|(day, _)| *day == event.day))
		.collect::<Vec<_>>();
	events.sort_by(|left, right| left.start.cmp(&right.start).then_with(|| left.title.cmp(&right.title)));

	ViewModel {
		explorer_rows: build_explorer_rows(app, schedule),
		subject_count: schedule.subjects().len(),
		events,
		days,
		slot: settings.effective_slot(),
		week_start: week_start(today),
	}
}

fn build_explorer_rows(app: &App, schedule: &Schedule) -> Vec<ExplorerRow> {
	let mut rows = Vec::new();
	for subject in schedule.subjects() {
		let collapsed = app.collapsed_subjects.contains(&subject.id);
		rows.push(ExplorerRow {
			line: subject_line(subject, collapsed),
			target: RowTarget::Subject { subject_id: subject.id },
		});
		if collapsed {
			continue;
		}

		for course in &subject.courses {
			let chosen = is_chosen(subject, course);
			let marker = if chosen {
				Span::styled("● ", Style::default().fg(terminal_color(&subject.status.color)))
			} else {
				Span::styled("○ ", Style::default().fg(Color::DarkGray))
			};
			let text_style = if course.show && subject.status.show {
				Style::default()
			} else {
				Style::default().fg(Color::DarkGray)
			};
			let mut spans = vec![
				Span::raw("    "),
				marker,
				Span::styled(
					format!(
						"{} {} {} {} {}",
						course.course,
						course.course_type,
						course.day,
						course.time_range_text(),
						course.instructor
					),
					text_style,
				),
			];
			if !course.show {
				spans.push(Span::styled(" (hidden)", Style::default().fg(Color::DarkGray)));
			}
			rows.push(ExplorerRow {
				line: Line::from(spans),
				target: RowTarget::Course {
					subject_id: subject.id,
					course_id: course.id,
				},
			});
		}
	}
	rows
}

fn subject_line(subject: &Subject, collapsed: bool) -> Line<'static> {
	let status = subject_status(subject);
	let icon = subject_icon(subject);
	let name_style = if subject.status.show {
		Style::default().add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(Color::DarkGray)
	};

	let mut spans = vec![
		Span::raw(if collapsed { "[+] " } else { "[-] " }),
		Span::styled("██ ", Style::default().fg(terminal_color(&subject.status.color))),
		Span::raw(format!("{} ", icon.glyph())),
		Span::styled(format!("{} {}", subject.code, subject.name), name_style),
		Span::styled(
			format!(" | {} | {}", status.label(), subject.selection_mode().label()),
			Style::default().fg(Color::DarkGray),
		),
	];
	if !subject.status.show {
		spans.push(Span::styled(" (hidden)", Style::default().fg(Color::DarkGray)));
	}
	Line::from(spans)
}

fn blank_draft(code: CourseCode) -> CourseDraft {
	CourseDraft {
		code: code.to_string(),
		course_type: CourseType::Practice,
		instructor: String::new(),
		location: String::new(),
		day: Weekday::Monday,
		start_time: String::new(),
		end_time: String::new(),
		notes: String::new(),
	}
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		Err(format!("{field_name} is required"))
	} else {
		Ok(value.to_string())
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

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Select(SelectState),
	Done(String),
}

#[derive(Debug, Clone)]
enum SelectOutcome {
	NextPrompt(PromptState),
	NextSelect(SelectState),
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
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		self.selected = step_index(self.selected, delta, self.options.len());
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: Option<String>,
	style: Style,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: Option<String>, style: Style) -> Self {
		Self {
			label: label.into(),
			value,
			style,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	SubjectCode,
	SubjectName { code: String },
	CourseCode { subject_id: u32 },
	CourseStart { subject_id: u32, draft: CourseDraft },
	CourseEnd { subject_id: u32, draft: CourseDraft },
	CourseInstructor { subject_id: u32, draft: CourseDraft },
	CourseLocation { subject_id: u32, draft: CourseDraft },
	CourseNotes { subject_id: u32, draft: CourseDraft },
}

#[derive(Debug, Clone)]
enum SelectKind {
	CourseType { subject_id: u32, draft: CourseDraft },
	CourseDay { subject_id: u32, draft: CourseDraft },
	DeleteConfirm { target: RowTarget, label: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Subjects,
	Week,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Subjects => FocusPane::Week,
			FocusPane::Week => FocusPane::Subjects,
		}
	}

	fn prev(self) -> Self {
		self.next()
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	focus: FocusPane,
	explorer_index: usize,
	event_index: usize,
	collapsed_subjects: HashSet<u32>,
	mode: InputMode,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			focus: FocusPane::Subjects,
			explorer_index: 0,
			event_index: 0,
			collapsed_subjects: HashSet::new(),
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn clamp_selection(&mut self, view: &ViewModel) {
		self.explorer_index = self.explorer_index.min(view.explorer_rows.len().saturating_sub(1));
		self.event_index = self.event_index.min(view.events.len().saturating_sub(1));
	}

	fn move_selection(&mut self, delta: i32, view: &ViewModel) {
		match self.focus {
			FocusPane::Subjects => {
				self.explorer_index = step_index(self.explorer_index, delta, view.explorer_rows.len());
			}
			FocusPane::Week => {
				self.event_index = step_index(self.event_index, delta, view.events.len());
			}
		}
	}

	fn selected_target(&self, view: &ViewModel) -> Option<RowTarget> {
		match self.focus {
			FocusPane::Subjects => view.explorer_rows.get(self.explorer_index).map(|row| row.target),
			FocusPane::Week => view.events.get(self.event_index).map(|event| RowTarget::Course {
				subject_id: event.subject_id,
				course_id: event.course_id,
			}),
		}
	}
}

fn step_index(current: usize, delta: i32, len: usize) -> usize {
	if len == 0 {
		return 0;
	}
	if delta > 0 {
		(current + delta as usize).min(len - 1)
	} else {
		current.saturating_sub(delta.unsigned_abs() as usize)
	}
}

struct ViewModel {
	explorer_rows: Vec<ExplorerRow>,
	subject_count: usize,
	events: Vec<CalendarEvent>,
	days: Vec<(Weekday, NaiveDate)>,
	slot: u32,
	week_start: NaiveDate,
}

#[derive(Clone)]
struct ExplorerRow {
	line: Line<'static>,
	target: RowTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowTarget {
	Subject { subject_id: u32 },
	Course { subject_id: u32, course_id: u32 },
}

impl RowTarget {
	fn subject_id(self) -> u32 {
		match self {
			RowTarget::Subject { subject_id } | RowTarget::Course { subject_id, .. } => subject_id,
		}
	}
}

#[cfg(test)]
mod tests {
	use chrono::{NaiveDate, NaiveTime};

	use crate::calendar::project_events;
	use crate::domain::{CourseDraft, CourseType, Schedule, Weekday};
	use crate::settings::Settings;
	use crate::storage::{MemoryStore, load_schedule};

	use super::{App, Planner, RowTarget, build_view, choose_course, toggle_course_visibility, cell_text, fit, scroll_offset, slot_index, slot_rows, step_index};

	fn time(hour: u32, minute: u32) -> NaiveTime {
		NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
	}

	fn sample_schedule() -> Schedule {
		let mut schedule = Schedule::new();
		let id = schedule.add_subject("CS101".to_string(), "Programozás".to_string());
		schedule
			.add_course(
				id,
				CourseDraft {
					code: "5".to_string(),
					course_type: CourseType::Practice,
					instructor: "Oktató".to_string(),
					location: "Terem".to_string(),
					day: Weekday::Monday,
					start_time: "08:10".to_string(),
					end_time: "09:30".to_string(),
					notes: String::new(),
				},
			)
			.expect("course should be valid");
		schedule
	}

	#[test]
	fn grid_rows_cover_the_teaching_day() {
		let rows = slot_rows(20);
		assert_eq!(rows.len(), 42);
		assert_eq!(rows.first(), Some(&time(8, 0)));
		assert_eq!(rows.last(), Some(&time(21, 40)));

		let rows = slot_rows(45);
		assert_eq!(rows.len(), 19);
		assert_eq!(rows.last(), Some(&time(21, 30)));

		assert_eq!(slot_index(time(7, 0), 20), 0);
		assert_eq!(slot_index(time(9, 10), 20), 3);
	}

	#[test]
	fn continuation_rows_walk_down_the_labels() {
		let schedule = sample_schedule();
		let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
		let events = project_events(&schedule, &Settings::default(), today);
		let event = &events[0];

		assert_eq!(cell_text(event, time(8, 0), 20).as_deref(), Some("Programozás"));
		assert_eq!(cell_text(event, time(8, 20), 20).as_deref(), Some("08:10-09:30"));
		assert_eq!(cell_text(event, time(8, 40), 20).as_deref(), Some("Oktató"));
		assert_eq!(cell_text(event, time(9, 0), 20).as_deref(), Some("Terem"));
		assert_eq!(cell_text(event, time(9, 20), 20), None);
	}

	#[test]
	fn fit_pads_and_truncates_by_characters() {
		assert_eq!(fit("Hétfő", 7), "Hétfő  ");
		assert_eq!(fit("Előadás", 3), "Elő");
		assert_eq!(fit("x", 0), "");
	}

	#[test]
	fn scrolling_keeps_the_focus_row_in_view() {
		assert_eq!(scroll_offset(30, 50, 42), 0);
		assert_eq!(scroll_offset(2, 10, 42), 0);
		assert_eq!(scroll_offset(20, 10, 42), 15);
		assert_eq!(scroll_offset(41, 10, 42), 32);
		assert_eq!(step_index(0, -1, 3), 0);
		assert_eq!(step_index(2, 1, 3), 2);
		assert_eq!(step_index(0, 1, 0), 0);
	}

	#[test]
	fn view_lists_subjects_with_their_sections() {
		let schedule = sample_schedule();
		let mut settings = Settings::default();
		let today = NaiveDate::from_ymd_opt(2026, 10, 21).expect("valid date");
		let mut app = App::default();

		let view = build_view(&app, &schedule, &settings, today);
		assert_eq!(view.days.len(), 5);
		assert_eq!(view.events.len(), 1);
		assert_eq!(view.explorer_rows.len(), 2);
		assert_eq!(
			view.explorer_rows[1].target,
			RowTarget::Course {
				subject_id: 1,
				course_id: 1
			}
		);

		app.collapsed_subjects.insert(1);
		settings.saturday = true;
		let view = build_view(&app, &schedule, &settings, today);
		assert_eq!(view.explorer_rows.len(), 1);
		assert_eq!(view.days.last().map(|(day, _)| *day), Some(Weekday::Saturday));
	}

	#[test]
	fn planner_saves_when_the_revision_moves() {
		let mut schedule = sample_schedule();
		let mut settings = Settings::default();
		let mut store = MemoryStore::default();
		let mut planner = Planner::new(&mut schedule, &mut settings, &mut store);

		assert_eq!(planner.sync_schedule(), Ok(false));
		assert!(load_schedule(&*planner.store).subjects().is_empty());

		choose_course(&mut planner, 1, 1).expect("choose should succeed");
		assert_eq!(planner.sync_schedule(), Ok(true));
		assert_eq!(planner.sync_schedule(), Ok(false));
		assert_eq!(load_schedule(&*planner.store).subjects(), planner.schedule.subjects());

		toggle_course_visibility(&mut planner, 1, 1).expect("toggle should succeed");
		assert_eq!(planner.sync_schedule(), Ok(true));
		let stored = load_schedule(&*planner.store);
		assert!(!stored.subject(1).and_then(|subject| subject.course(1)).expect("course should exist").show);
	}
}
