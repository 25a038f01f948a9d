mod calendar;
mod catalog;
mod color;
mod config;
mod domain;
mod error;
mod selection;
mod settings;
mod storage;
mod ui;

use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::calendar::{local_today, project_events, visible_events};
use crate::catalog::read_catalog_file;
use crate::color::HexColor;
use crate::config::{AppConfig, load_config, log_directives, resolve_data_dir};
use crate::domain::{Course, CourseCode, CourseDraft, CourseType, Schedule, Subject, Weekday};
use crate::selection::{SelectionMode, is_chosen, subject_icon, subject_status};
use crate::settings::{DisplayFlags, Settings};
use crate::storage::{
	FileStore, export_schedule, load_schedule, load_settings, read_schedule_file, save_schedule, save_settings,
};
use crate::ui::run_dashboard;

const DASHBOARD_LOG_FILE: &str = "planner.log";

#[derive(Debug, Parser)]
#[command(name = "timetable-planner", about = "Weekly university timetable planner")]
struct Cli {
	/// Directory holding the saved schedule and settings.
	#[arg(long)]
	data_dir: Option<PathBuf>,
	/// TOML config file (data_dir, log).
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init,
	Dashboard,
	AddSubject {
		#[arg(long)]
		code: String,
		#[arg(long)]
		name: String,
	},
	UpdateSubject {
		#[arg(long)]
		id: u32,
		#[arg(long)]
		code: Option<String>,
		#[arg(long)]
		name: Option<String>,
		#[arg(long)]
		color: Option<String>,
		/// single, per-type or locked; resets the current choice.
		#[arg(long)]
		mode: Option<String>,
	},
	RemoveSubject {
		#[arg(long)]
		id: u32,
	},
	ShowSubject {
		#[arg(long)]
		id: u32,
		#[arg(long)]
		hide: bool,
	},
	AddCourse {
		#[arg(long)]
		subject: u32,
		#[arg(long)]
		code: String,
		#[arg(long = "type", default_value = "Gyakorlat")]
		course_type: String,
		#[arg(long)]
		instructor: String,
		#[arg(long)]
		location: String,
		#[arg(long)]
		day: String,
		#[arg(long)]
		start: String,
		#[arg(long)]
		end: String,
		#[arg(long)]
		notes: Option<String>,
	},
	UpdateCourse {
		#[arg(long)]
		subject: u32,
		#[arg(long)]
		course: u32,
		#[arg(long)]
		code: Option<String>,
		#[arg(long = "type")]
		course_type: Option<String>,
		#[arg(long)]
		instructor: Option<String>,
		#[arg(long)]
		location: Option<String>,
		#[arg(long)]
		day: Option<String>,
		#[arg(long)]
		start: Option<String>,
		#[arg(long)]
		end: Option<String>,
		#[arg(long)]
		notes: Option<String>,
	},
	RemoveCourse {
		#[arg(long)]
		subject: u32,
		#[arg(long)]
		course: u32,
	},
	ShowCourse {
		#[arg(long)]
		subject: u32,
		#[arg(long)]
		course: u32,
		#[arg(long)]
		hide: bool,
	},
	/// Toggles a section as the subject's choice, like clicking it on the calendar.
	Choose {
		#[arg(long)]
		subject: u32,
		#[arg(long)]
		code: String,
		#[arg(long = "type")]
		course_type: Option<String>,
	},
	Subjects,
	Events {
		/// Any day of the week to project, YYYY-MM-DD.
		#[arg(long)]
		date: Option<String>,
		#[arg(long)]
		json: bool,
		/// Include sections that are not displayed.
		#[arg(long)]
		all: bool,
	},
	Export {
		#[arg(long)]
		out: PathBuf,
	},
	/// Replaces the schedule with an exported file.
	Load {
		#[arg(long)]
		file: PathBuf,
	},
	/// Adds the subjects of a catalog export that are not planned yet.
	Import {
		#[arg(long)]
		file: PathBuf,
	},
	Settings {
		/// field=true|false, repeatable.
		#[arg(long = "show")]
		show: Vec<String>,
		#[arg(long)]
		saturday: Option<bool>,
		#[arg(long)]
		slot: Option<u32>,
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
	let config = load_config(cli.config.as_deref())?;
	let data_dir = resolve_data_dir(cli.data_dir, &config);
	let command = cli.command.unwrap_or(Command::Dashboard);

	let log_file = matches!(command, Command::Dashboard).then(|| data_dir.join(DASHBOARD_LOG_FILE));
	init_logging(&config, log_file.as_deref())?;

	let mut store = FileStore::new(data_dir);
	let mut schedule = load_schedule(&store);
	let mut settings = load_settings(&store);

	match command {
		Command::Init => {
			save_schedule(&mut store, &schedule)?;
			save_settings(&mut store, &settings)?;
			println!("initialized planner data in {}", store.dir().display());
		}
		Command::Dashboard => {
			run_dashboard(&mut schedule, &mut settings, &mut store)?;
		}
		Command::AddSubject { code, name } => {
			if schedule.subject_by_code(&code).is_some() {
				eprintln!("warning: a subject with code {code} is already planned");
			}
			let id = schedule.add_subject(code, name);
			save_schedule(&mut store, &schedule)?;
			println!("created subject {id}");
		}
		Command::UpdateSubject {
			id,
			code,
			name,
			color,
			mode,
		} => {
			let subject = find_subject(&schedule, id)?.clone();
			let color = match color {
				Some(raw) => HexColor::parse(&raw)?,
				None => subject.status.color.clone(),
			};
			let mode = match mode {
				Some(raw) => raw.parse::<SelectionMode>()?,
				None => subject.selection_mode(),
			};
			schedule.update_subject(
				id,
				code.unwrap_or(subject.code),
				name.unwrap_or(subject.name),
				color,
				mode,
			);
			save_schedule(&mut store, &schedule)?;
			println!("updated subject {id} ({})", mode.label());
		}
		Command::RemoveSubject { id } => {
			if !schedule.remove_subject(id) {
				return Err(format!("subject {id} not found").into());
			}
			save_schedule(&mut store, &schedule)?;
			println!("removed subject {id}");
		}
		Command::ShowSubject { id, hide } => {
			if !schedule.update_show_subject(id, !hide) {
				return Err(format!("subject {id} not found").into());
			}
			save_schedule(&mut store, &schedule)?;
			println!("{} subject {id}", if hide { "hid" } else { "showed" });
		}
		Command::AddCourse {
			subject,
			code,
			course_type,
			instructor,
			location,
			day,
			start,
			end,
			notes,
		} => {
			let day = day.parse::<Weekday>()?;
			settings.check_day(day)?;
			let draft = CourseDraft {
				code,
				course_type: CourseType::from_label(&course_type),
				instructor,
				location,
				day,
				start_time: start,
				end_time: end,
				notes: notes.unwrap_or_default(),
			};
			let course_id = schedule
				.add_course(subject, draft)?
				.ok_or_else(|| format!("subject {subject} not found"))?;
			save_schedule(&mut store, &schedule)?;
			println!("created course {course_id} in subject {subject}");
		}
		Command::UpdateCourse {
			subject,
			course,
			code,
			course_type,
			instructor,
			location,
			day,
			start,
			end,
			notes,
		} => {
			let current = find_course(&schedule, subject, course)?.clone();
			let day = match day {
				Some(raw) => raw.parse::<Weekday>()?,
				None => current.day,
			};
			settings.check_day(day)?;
			let draft = CourseDraft {
				code: code.unwrap_or_else(|| current.course.to_string()),
				course_type: course_type
					.as_deref()
					.map(CourseType::from_label)
					.unwrap_or(current.course_type),
				instructor: instructor.unwrap_or(current.instructor),
				location: location.unwrap_or(current.location),
				day,
				start_time: start.unwrap_or_else(|| current.start_time.format("%H:%M").to_string()),
				end_time: end.unwrap_or_else(|| current.end_time.format("%H:%M").to_string()),
				notes: notes.unwrap_or(current.notes),
			};
			schedule.update_course(subject, course, draft)?;
			save_schedule(&mut store, &schedule)?;
			println!("updated course {course} in subject {subject}");
		}
		Command::RemoveCourse { subject, course } => {
			if !schedule.remove_course(subject, course) {
				return Err(format!("course {course} not found in subject {subject}").into());
			}
			save_schedule(&mut store, &schedule)?;
			println!("removed course {course} from subject {subject}");
		}
		Command::ShowCourse { subject, course, hide } => {
			if !schedule.update_show_course(subject, course, !hide) {
				return Err(format!("course {course} not found in subject {subject}").into());
			}
			save_schedule(&mut store, &schedule)?;
			println!("{} course {course} of subject {subject}", if hide { "hid" } else { "showed" });
		}
		Command::Choose {
			subject,
			code,
			course_type,
		} => {
			choose_course(&mut schedule, subject, &code, course_type.as_deref())?;
			save_schedule(&mut store, &schedule)?;
		}
		Command::Subjects => {
			print_subjects(&schedule);
		}
		Command::Events { date, json, all } => {
			print_events(&schedule, &settings, date.as_deref(), json, all)?;
		}
		Command::Export { out } => {
			export_schedule(&out, &schedule)?;
			println!("exported {} subjects to {}", schedule.subjects().len(), out.display());
		}
		Command::Load { file } => {
			let subjects = read_schedule_file(&file)?;
			let count = subjects.len();
			schedule.replace_subjects(subjects);
			save_schedule(&mut store, &schedule)?;
			println!("loaded {count} subjects from {}", file.display());
		}
		Command::Import { file } => {
			let export = read_catalog_file(&file)?;
			let report = schedule.import_from_arrays(&export.subjects, &export.courses);
			save_schedule(&mut store, &schedule)?;
			println!(
				"imported {} subjects, skipped {} already planned, rejected {} courses",
				report.added.len(),
				report.skipped.len(),
				report.rejected_courses
			);
			if !report.skipped.is_empty() {
				println!("skipped: {}", report.skipped.join(", "));
			}
		}
		Command::Settings { show, saturday, slot } => {
			let changed = apply_settings(&mut settings, &show, saturday, slot)?;
			if changed {
				save_settings(&mut store, &settings)?;
			}
			print_settings(&settings);
		}
	}

	Ok(())
}

fn init_logging(config: &AppConfig, log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::WARN.into())
		.parse_lossy(log_directives(config));

	match log_file {
		Some(path) => {
			if let Some(parent) = path.parent() {
				std::fs::create_dir_all(parent)?;
			}
			let file = OpenOptions::new().create(true).append(true).open(path)?;
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_ansi(false)
				.with_writer(Mutex::new(file))
				.init();
		}
		None => {
			tracing_subscriber::fmt()
				.with_env_filter(filter)
				.with_writer(std::io::stderr)
				.init();
		}
	}

	Ok(())
}

fn find_subject(schedule: &Schedule, id: u32) -> Result<&Subject, Box<dyn Error>> {
	schedule
		.subject(id)
		.ok_or_else(|| format!("subject {id} not found").into())
}

fn find_course(schedule: &Schedule, subject_id: u32, course_id: u32) -> Result<&Course, Box<dyn Error>> {
	find_subject(schedule, subject_id)?
		.course(course_id)
		.ok_or_else(|| format!("course {course_id} not found in subject {subject_id}").into())
}

fn choose_course(
	schedule: &mut Schedule,
	subject_id: u32,
	code: &str,
	course_type: Option<&str>,
) -> Result<(), Box<dyn Error>> {
	let code = CourseCode::parse(code)?;
	let subject = find_subject(schedule, subject_id)?;
	if subject.selection_mode() == SelectionMode::Locked {
		println!("subject {subject_id} is locked, every course is already chosen");
		return Ok(());
	}

	let mut types = subject
		.courses
		.iter()
		.filter(|course| course.course == code)
		.map(|course| course.course_type);
	let course_type = match course_type.map(CourseType::from_label) {
		Some(requested) => {
			if !types.any(|found| found == requested) {
				return Err(format!("subject {subject_id} has no {requested} course {code}").into());
			}
			requested
		}
		None => types
			.next()
			.ok_or_else(|| format!("no course {code} in subject {subject_id}"))?,
	};

	schedule.set_chosen_course(subject_id, &code, course_type);
	let chosen = find_subject(schedule, subject_id)?
		.status
		.chosen
		.choice_for(course_type)
		== Some(&code);
	println!(
		"{} course {code} ({course_type}) of subject {subject_id}",
		if chosen { "chose" } else { "cleared" }
	);
	Ok(())
}

fn print_subjects(schedule: &Schedule) {
	if schedule.subjects().is_empty() {
		println!("no subjects yet");
		return;
	}

	for subject in schedule.subjects() {
		let icon = subject_icon(subject);
		println!(
			"{} | {} {} | {} | {} | {} | {} | {}{}",
			subject.id,
			icon.glyph(),
			icon.name(),
			subject_status(subject).label(),
			subject.code,
			subject.name,
			subject.selection_mode().label(),
			subject.status.color,
			if subject.status.show { "" } else { " | hidden" }
		);
		for course in &subject.courses {
			println!(
				"    {} {} | {} | {} | {} {} | {} | {}{}",
				if is_chosen(subject, course) { "*" } else { " " },
				course.id,
				course.course,
				course.course_type,
				course.day,
				course.time_range_text(),
				course.instructor,
				course.location,
				if course.show { "" } else { " | hidden" }
			);
		}
	}
}

fn print_events(
	schedule: &Schedule,
	settings: &Settings,
	date: Option<&str>,
	json: bool,
	all: bool,
) -> Result<(), Box<dyn Error>> {
	let today = match date {
		Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")?,
		None => local_today(),
	};
	let projected = project_events(schedule, settings, today);
	let mut events = if all {
		projected.iter().collect::<Vec<_>>()
	} else {
		visible_events(&projected)
	};
	events.sort_by(|left, right| left.start.cmp(&right.start).then_with(|| left.title.cmp(&right.title)));

	if json {
		println!("{}", serde_json::to_string_pretty(&events)?);
		return Ok(());
	}

	if events.is_empty() {
		println!("no events this week");
		return Ok(());
	}

	for event in events {
		println!(
			"{} {} {} | {} | {} {} | {}{}",
			event.day,
			event.start.format("%Y-%m-%d"),
			event.time_text(),
			event.title,
			event.course_code,
			event.course_type,
			if event.chosen { "chosen" } else { "open" },
			if event.visible { "" } else { " | hidden" }
		);
	}

	Ok(())
}

fn apply_settings(
	settings: &mut Settings,
	show: &[String],
	saturday: Option<bool>,
	slot: Option<u32>,
) -> Result<bool, Box<dyn Error>> {
	let mut changed = false;
	for entry in show {
		let (field, value) = entry
			.split_once('=')
			.ok_or_else(|| format!("expected field=true|false, got {entry:?}"))?;
		let value = value.trim().parse::<bool>()?;
		if !settings.show.set(field.trim(), value) {
			return Err(format!(
				"unknown display field {field:?}, expected one of {}",
				DisplayFlags::FIELDS.join(", ")
			)
			.into());
		}
		changed = true;
	}

	if let Some(saturday) = saturday {
		settings.saturday = saturday;
		changed = true;
	}

	if let Some(slot) = slot {
		settings.set_slot(slot)?;
		changed = true;
	}

	Ok(changed)
}

fn print_settings(settings: &Settings) {
	let flags = settings.show;
	let shown = [
		("name", flags.name),
		("code", flags.code),
		("time", flags.time),
		("type", flags.course_type),
		("instructor", flags.instructor),
		("location", flags.location),
		("notes", flags.notes),
	]
	.into_iter()
	.filter(|(_, enabled)| *enabled)
	.map(|(field, _)| field)
	.collect::<Vec<_>>();

	println!("show: {}", if shown.is_empty() { "(nothing)".to_string() } else { shown.join(", ") });
	println!("saturday: {}", settings.saturday);
	println!("slot: {} min", settings.slot);
}

#[cfg(test)]
mod tests {
	use crate::domain::{CourseCode, CourseDraft, CourseType, Schedule, Weekday};
	use crate::selection::{SubjectStatus, is_displayed, subject_status};
	use crate::settings::Settings;

	use super::{apply_settings, choose_course};

	fn schedule_with_practice_and_lecture() -> (Schedule, u32) {
		let mut schedule = Schedule::new();
		let id = schedule.add_subject("IP-18AN1G".to_string(), "Analízis".to_string());
		for (code, course_type) in [("5", CourseType::Practice), ("7", CourseType::Lecture)] {
			schedule
				.add_course(
					id,
					CourseDraft {
						code: code.to_string(),
						course_type,
						instructor: "Példa Béla".to_string(),
						location: "Déli Tömb 0-220".to_string(),
						day: Weekday::Monday,
						start_time: "10:00".to_string(),
						end_time: "11:30".to_string(),
						notes: String::new(),
					},
				)
				.expect("course should be valid");
		}
		(schedule, id)
	}

	#[test]
	fn choose_takes_the_type_of_the_matching_course() {
		let (mut schedule, id) = schedule_with_practice_and_lecture();
		choose_course(&mut schedule, id, "5", None).expect("choose should succeed");
		choose_course(&mut schedule, id, "7", Some("Előadás")).expect("choose should succeed");

		let subject = schedule.subject(id).expect("subject should exist");
		let five = CourseCode::parse("5").expect("code should parse");
		assert_eq!(subject.status.chosen.choice_for(CourseType::Practice), Some(&five));
		assert!(subject.courses.iter().all(|course| is_displayed(subject, course)));
	}

	#[test]
	fn choose_rejects_unknown_codes_and_mismatched_types() {
		let (mut schedule, id) = schedule_with_practice_and_lecture();
		let revision = schedule.revision();

		assert!(choose_course(&mut schedule, id, "5", Some("Előadás")).is_err());
		assert!(choose_course(&mut schedule, id, "99", Some("Gyakorlat")).is_err());
		assert!(choose_course(&mut schedule, id, "99", None).is_err());
		assert!(choose_course(&mut schedule, 42, "5", None).is_err());

		assert_eq!(schedule.revision(), revision);
		let subject = schedule.subject(id).expect("subject should exist");
		assert_eq!(subject_status(subject), SubjectStatus::Unchosen);
		assert!(subject.courses.iter().all(|course| is_displayed(subject, course)));
	}

	#[test]
	fn settings_command_updates_flags_and_validates() {
		let mut settings = Settings::default();
		let changed = apply_settings(
			&mut settings,
			&["code=true".to_string(), "location = false".to_string()],
			Some(true),
			Some(30),
		)
		.expect("settings should apply");
		assert!(changed);
		assert!(settings.show.code);
		assert!(!settings.show.location);
		assert!(settings.saturday);
		assert_eq!(settings.slot, 30);

		assert!(apply_settings(&mut settings, &["colour=true".to_string()], None, None).is_err());
		assert!(apply_settings(&mut settings, &[], None, Some(7)).is_err());
		assert!(!apply_settings(&mut settings, &[], None, None).expect("no-op should succeed"));
	}
}
