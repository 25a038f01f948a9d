use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogCourse, CatalogSubject};
use crate::color::HexColor;
use crate::error::PlannerError;
use crate::selection::{ChosenMode, SelectionMode};

const CLOCK_FORMAT: &str = "%H:%M";
const RESERVED_CODES: [&str; 2] = ["0", "-1"];

/// Identifier of a course section inside its subject.
///
/// `"0"` and `"-1"` are rejected because the stored selection document uses
/// them as "nothing chosen" and "locked" markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseCode(String);

impl CourseCode {
    pub fn parse(input: &str) -> Result<Self, PlannerError> {
        let value = input.trim();
        if value.is_empty() || RESERVED_CODES.contains(&value) {
            return Err(PlannerError::InvalidCourseCode(input.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CourseCode {
    type Error = PlannerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CourseCode> for String {
    fn from(value: CourseCode) -> Self {
        value.0
    }
}

impl Display for CourseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CourseType {
    Practice,
    Lecture,
    Other,
}

impl CourseType {
    pub const ALL: [CourseType; 3] = [CourseType::Practice, CourseType::Lecture, CourseType::Other];

    pub fn label(self) -> &'static str {
        match self {
            CourseType::Practice => "Gyakorlat",
            CourseType::Lecture => "Előadás",
            CourseType::Other => "Egyéb",
        }
    }

    pub fn from_label(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "gyakorlat" | "practice" => CourseType::Practice,
            "előadás" | "eloadas" | "lecture" => CourseType::Lecture,
            _ => CourseType::Other,
        }
    }
}

impl From<String> for CourseType {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<CourseType> for String {
    fn from(value: CourseType) -> Self {
        value.label().to_string()
    }
}

impl Display for CourseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "Hétfő", alias = "Hétfo")]
    Monday,
    #[serde(rename = "Kedd")]
    Tuesday,
    #[serde(rename = "Szerda")]
    Wednesday,
    #[serde(rename = "Csütörtök")]
    Thursday,
    #[serde(rename = "Péntek")]
    Friday,
    #[serde(rename = "Szombat")]
    Saturday,
    #[serde(rename = "Vasárnap")]
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Hétfő",
            Weekday::Tuesday => "Kedd",
            Weekday::Wednesday => "Szerda",
            Weekday::Thursday => "Csütörtök",
            Weekday::Friday => "Péntek",
            Weekday::Saturday => "Szombat",
            Weekday::Sunday => "Vasárnap",
        }
    }

    pub fn number_from_monday(self) -> u32 {
        match self {
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
            Weekday::Sunday => 7,
        }
    }
}

impl FromStr for Weekday {
    type Err = PlannerError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input.trim();
        if value == "Hétfo" {
            return Ok(Weekday::Monday);
        }
        Weekday::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(value) || day.name() == value)
            .ok_or_else(|| PlannerError::UnknownWeekday(input.to_string()))
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: u32,
    pub course: CourseCode,
    #[serde(rename = "type")]
    pub course_type: CourseType,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub location: String,
    pub day: Weekday,
    #[serde(with = "clock")]
    pub start_time: NaiveTime,
    #[serde(with = "clock")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_show")]
    pub show: bool,
}

impl Course {
    pub fn time_range_text(&self) -> String {
        format!(
            "{}-{}",
            self.start_time.format(CLOCK_FORMAT),
            self.end_time.format(CLOCK_FORMAT)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectState {
    pub color: HexColor,
    #[serde(default = "default_show")]
    pub show: bool,
    #[serde(alias = "choosen")]
    pub chosen: ChosenMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u32,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub courses: Vec<Course>,
    pub status: SubjectState,
}

impl Subject {
    fn new(id: u32, code: String, name: String, courses: Vec<Course>) -> Self {
        Self {
            id,
            code,
            name,
            courses,
            status: SubjectState {
                color: HexColor::random(),
                show: true,
                chosen: SelectionMode::PerType.initial_choice(),
            },
        }
    }

    pub fn course(&self, id: u32) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == id)
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.status.chosen.mode()
    }

    fn next_course_id(&self) -> u32 {
        self.courses.iter().map(|course| course.id).max().unwrap_or(0) + 1
    }
}

#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub code: String,
    pub course_type: CourseType,
    pub instructor: String,
    pub location: String,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub notes: String,
}

impl CourseDraft {
    fn into_course(self, id: u32, show: bool) -> Result<Course, PlannerError> {
        let course = CourseCode::parse(&self.code)?;
        let instructor = required_text(&self.instructor, "instructor")?;
        let location = required_text(&self.location, "location")?;
        let (start_time, end_time) = parse_time_range(&self.start_time, &self.end_time)?;

        Ok(Course {
            id,
            course,
            course_type: self.course_type,
            instructor,
            location,
            day: self.day,
            start_time,
            end_time,
            notes: self.notes.trim().to_string(),
            show,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub rejected_courses: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Schedule {
    subjects: Vec<Subject>,
    revision: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subjects(subjects: Vec<Subject>) -> Self {
        Self {
            subjects,
            revision: 0,
        }
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, id: u32) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.id == id)
    }

    pub fn subject_by_code(&self, code: &str) -> Option<&Subject> {
        self.subjects.iter().find(|subject| subject.code == code)
    }

    /// Bumped on every mutation that changed state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn add_subject(&mut self, code: String, name: String) -> u32 {
        let id = self.next_subject_id();
        tracing::debug!(id, %code, "adding subject");
        self.subjects.push(Subject::new(id, code, name, Vec::new()));
        self.touch();
        id
    }

    pub fn remove_subject(&mut self, id: u32) -> bool {
        let before = self.subjects.len();
        self.subjects.retain(|subject| subject.id != id);
        let removed = self.subjects.len() != before;
        if removed {
            tracing::debug!(id, "removed subject");
            self.touch();
        }
        removed
    }

    /// Updates the descriptive fields and resets the selection to the initial
    /// shape of `mode`.
    pub fn update_subject(
        &mut self,
        id: u32,
        code: String,
        name: String,
        color: HexColor,
        mode: SelectionMode,
    ) -> bool {
        let Some(subject) = self.subject_mut(id) else {
            return false;
        };
        subject.code = code;
        subject.name = name;
        subject.status.color = color;
        subject.status.chosen = mode.initial_choice();
        tracing::debug!(id, ?mode, "updated subject");
        self.touch();
        true
    }

    pub fn update_show_subject(&mut self, id: u32, show: bool) -> bool {
        let Some(subject) = self.subject_mut(id) else {
            return false;
        };
        subject.status.show = show;
        self.touch();
        true
    }

    pub fn add_course(
        &mut self,
        subject_id: u32,
        draft: CourseDraft,
    ) -> Result<Option<u32>, PlannerError> {
        let Some(subject) = self.subject_mut(subject_id) else {
            return Ok(None);
        };
        let id = subject.next_course_id();
        let course = draft.into_course(id, true)?;
        tracing::debug!(subject_id, course_id = id, code = %course.course, "adding course");
        subject.courses.push(course);
        self.touch();
        Ok(Some(id))
    }

    pub fn remove_course(&mut self, subject_id: u32, course_id: u32) -> bool {
        let Some(subject) = self.subject_mut(subject_id) else {
            return false;
        };
        let before = subject.courses.len();
        subject.courses.retain(|course| course.id != course_id);
        let removed = subject.courses.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn update_course(
        &mut self,
        subject_id: u32,
        course_id: u32,
        draft: CourseDraft,
    ) -> Result<bool, PlannerError> {
        let Some(course) = self.course_mut(subject_id, course_id) else {
            return Ok(false);
        };
        *course = draft.into_course(course_id, course.show)?;
        self.touch();
        Ok(true)
    }

    pub fn update_show_course(&mut self, subject_id: u32, course_id: u32, show: bool) -> bool {
        let Some(course) = self.course_mut(subject_id, course_id) else {
            return false;
        };
        course.show = show;
        self.touch();
        true
    }

    pub fn set_chosen_course(
        &mut self,
        subject_id: u32,
        code: &CourseCode,
        course_type: CourseType,
    ) -> bool {
        let Some(subject) = self.subject_mut(subject_id) else {
            return false;
        };
        if !subject.status.chosen.toggle(code, course_type) {
            return false;
        }
        tracing::debug!(subject_id, %code, %course_type, "selection changed");
        self.touch();
        true
    }

    /// Adds every catalog subject whose code is not already present, together
    /// with the catalog courses that reference it. Known codes are skipped
    /// without touching the existing subject.
    pub fn import_from_arrays(
        &mut self,
        subjects: &[CatalogSubject],
        courses: &[CatalogCourse],
    ) -> ImportReport {
        let mut report = ImportReport::default();
        let mut known_codes = self
            .subjects
            .iter()
            .map(|subject| subject.code.clone())
            .collect::<HashSet<_>>();
        let mut next_id = self.next_subject_id();

        for candidate in subjects {
            if !known_codes.insert(candidate.code.clone()) {
                report.skipped.push(candidate.code.clone());
                continue;
            }

            let mut imported = Vec::new();
            for course in courses.iter().filter(|course| course.subject == candidate.code) {
                let id = imported.len() as u32 + 1;
                match course.to_course(id) {
                    Ok(course) => imported.push(course),
                    Err(err) => {
                        tracing::warn!(subject = %candidate.code, course = %course.course, %err, "skipping catalog course");
                        report.rejected_courses += 1;
                    }
                }
            }

            self.subjects.push(Subject::new(
                next_id,
                candidate.code.clone(),
                candidate.name.clone(),
                imported,
            ));
            report.added.push(candidate.code.clone());
            next_id += 1;
        }

        if !report.added.is_empty() {
            self.touch();
        }
        tracing::info!(
            added = report.added.len(),
            skipped = report.skipped.len(),
            rejected_courses = report.rejected_courses,
            "catalog import finished"
        );
        report
    }

    pub fn replace_subjects(&mut self, subjects: Vec<Subject>) {
        self.subjects = subjects;
        self.touch();
    }

    fn subject_mut(&mut self, id: u32) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|subject| subject.id == id)
    }

    fn course_mut(&mut self, subject_id: u32, course_id: u32) -> Option<&mut Course> {
        self.subject_mut(subject_id)?
            .courses
            .iter_mut()
            .find(|course| course.id == course_id)
    }

    fn next_subject_id(&self) -> u32 {
        self.subjects.iter().map(|subject| subject.id).max().unwrap_or(0) + 1
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

pub fn parse_clock(input: &str) -> Result<NaiveTime, PlannerError> {
    NaiveTime::parse_from_str(input.trim(), CLOCK_FORMAT)
        .map_err(|_| PlannerError::InvalidTime(input.to_string()))
}

pub fn parse_time_range(start: &str, end: &str) -> Result<(NaiveTime, NaiveTime), PlannerError> {
    let start_time = parse_clock(&required_text(start, "start time")?)?;
    let end_time = parse_clock(&required_text(end, "end time")?)?;
    if start_time >= end_time {
        return Err(PlannerError::InvalidTimeRange {
            start: start.trim().to_string(),
            end: end.trim().to_string(),
        });
    }
    Ok((start_time, end_time))
}

fn required_text(input: &str, field_name: &'static str) -> Result<String, PlannerError> {
    let value = input.trim();
    if value.is_empty() {
        Err(PlannerError::MissingField(field_name))
    } else {
        Ok(value.to_string())
    }
}

fn default_show() -> bool {
    true
}

mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{CLOCK_FORMAT, parse_clock};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(CLOCK_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_clock(&raw).map_err(serde::de::Error::custom)
    }
}
