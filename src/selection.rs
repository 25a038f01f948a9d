use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Course, CourseCode, CourseType, Subject};
use crate::error::PlannerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChosen", into = "RawChosen")]
pub enum ChosenMode {
    Single(Option<CourseCode>),
    PerType(BTreeMap<CourseType, Option<CourseCode>>),
    Locked,
}

impl ChosenMode {
    pub fn mode(&self) -> SelectionMode {
        match self {
            ChosenMode::Single(_) => SelectionMode::Single,
            ChosenMode::PerType(_) => SelectionMode::PerType,
            ChosenMode::Locked => SelectionMode::Locked,
        }
    }

    pub fn choice_for(&self, course_type: CourseType) -> Option<&CourseCode> {
        match self {
            ChosenMode::Single(choice) => choice.as_ref(),
            ChosenMode::PerType(choices) => choices.get(&course_type).and_then(Option::as_ref),
            ChosenMode::Locked => None,
        }
    }

    pub fn toggle(&mut self, code: &CourseCode, course_type: CourseType) -> bool {
        let slot = match self {
            ChosenMode::Single(choice) => choice,
            ChosenMode::PerType(choices) => choices.entry(course_type).or_insert(None),
            ChosenMode::Locked => return false,
        };
        *slot = if slot.as_ref() == Some(code) {
            None
        } else {
            Some(code.clone())
        };
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    Single,
    PerType,
    Locked,
}

impl SelectionMode {
    pub const ALL: [SelectionMode; 3] = [SelectionMode::Single, SelectionMode::PerType, SelectionMode::Locked];

    pub fn label(self) -> &'static str {
        match self {
            SelectionMode::Single => "Egy kurzus",
            SelectionMode::PerType => "Típusunként egy kurzus",
            SelectionMode::Locked => "Minden kurzus ki van választva",
        }
    }

    pub fn initial_choice(self) -> ChosenMode {
        match self {
            SelectionMode::Single => ChosenMode::Single(None),
            SelectionMode::PerType => ChosenMode::PerType(empty_per_type()),
            SelectionMode::Locked => ChosenMode::Locked,
        }
    }

    pub fn next(self) -> Self {
        match self {
            SelectionMode::Single => SelectionMode::PerType,
            SelectionMode::PerType => SelectionMode::Locked,
            SelectionMode::Locked => SelectionMode::Single,
        }
    }
}

impl FromStr for SelectionMode {
    type Err = PlannerError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input.trim();
        match value.to_lowercase().as_str() {
            "single" => return Ok(SelectionMode::Single),
            "per-type" | "per_type" | "pertype" => return Ok(SelectionMode::PerType),
            "locked" | "all" => return Ok(SelectionMode::Locked),
            _ => {}
        }
        SelectionMode::ALL
            .into_iter()
            .find(|mode| mode.label() == value)
            .ok_or_else(|| PlannerError::UnknownSelectionMode(input.to_string()))
    }
}

impl Display for SelectionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn empty_per_type() -> BTreeMap<CourseType, Option<CourseCode>> {
    CourseType::ALL
        .into_iter()
        .map(|course_type| (course_type, None))
        .collect()
}

pub fn is_chosen(subject: &Subject, course: &Course) -> bool {
    match &subject.status.chosen {
        ChosenMode::Locked => true,
        chosen => chosen.choice_for(course.course_type) == Some(&course.course),
    }
}

/// Locked subjects show every section, even ones hidden individually.
pub fn is_displayed(subject: &Subject, course: &Course) -> bool {
    match &subject.status.chosen {
        ChosenMode::Locked => true,
        chosen => {
            course.show
                && match chosen.choice_for(course.course_type) {
                    None => true,
                    Some(code) => code == &course.course,
                }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectStatus {
    Unchosen,
    Partial,
    Complete,
}

impl SubjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            SubjectStatus::Unchosen => "none",
            SubjectStatus::Partial => "partial",
            SubjectStatus::Complete => "complete",
        }
    }
}

pub fn subject_status(subject: &Subject) -> SubjectStatus {
    match &subject.status.chosen {
        ChosenMode::PerType(choices) => {
            let types = subject
                .courses
                .iter()
                .map(|course| course.course_type)
                .collect::<BTreeSet<_>>();
            let chosen = types
                .iter()
                .filter(|course_type| matches!(choices.get(course_type), Some(Some(_))))
                .count();
            if chosen == 0 {
                SubjectStatus::Unchosen
            } else if chosen == types.len() {
                SubjectStatus::Complete
            } else {
                SubjectStatus::Partial
            }
        }
        ChosenMode::Single(Some(_)) | ChosenMode::Locked => SubjectStatus::Complete,
        ChosenMode::Single(None) => SubjectStatus::Unchosen,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectIcon {
    List,
    Lock,
    CheckCircle,
}

impl SubjectIcon {
    pub fn name(self) -> &'static str {
        match self {
            SubjectIcon::List => "list",
            SubjectIcon::Lock => "lock",
            SubjectIcon::CheckCircle => "check-circle",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            SubjectIcon::List => "≡",
            SubjectIcon::Lock => "■",
            SubjectIcon::CheckCircle => "✓",
        }
    }
}

pub fn subject_icon(subject: &Subject) -> SubjectIcon {
    match subject.status.chosen {
        ChosenMode::PerType(_) => SubjectIcon::List,
        ChosenMode::Locked => SubjectIcon::Lock,
        ChosenMode::Single(_) => SubjectIcon::CheckCircle,
    }
}

// Stored shape: 0 = nothing chosen, -1 = locked, a code string, or a map
// from type label to 0 / code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawChoice {
    Number(i64),
    Code(String),
}

/// Stored form of the selection: `0` for nothing chosen, `-1` for locked, a
/// section code in single mode, or a type-to-code map in per-type mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawChosen {
    Number(i64),
    Code(String),
    PerType(BTreeMap<String, RawChoice>),
}

fn choice_from_raw(raw: RawChoice) -> Result<Option<CourseCode>, PlannerError> {
    match raw {
        RawChoice::Number(0) => Ok(None),
        RawChoice::Number(value) => CourseCode::parse(&value.to_string()).map(Some),
        RawChoice::Code(value) if value.trim() == "0" => Ok(None),
        RawChoice::Code(value) => CourseCode::parse(&value).map(Some),
    }
}

fn choice_to_raw(choice: Option<CourseCode>) -> RawChoice {
    match choice {
        Some(code) => RawChoice::Code(code.into()),
        None => RawChoice::Number(0),
    }
}

impl TryFrom<RawChosen> for ChosenMode {
    type Error = PlannerError;

    fn try_from(raw: RawChosen) -> Result<Self, Self::Error> {
        match raw {
            RawChosen::Number(-1) => Ok(ChosenMode::Locked),
            RawChosen::Code(value) if value.trim() == "-1" => Ok(ChosenMode::Locked),
            RawChosen::Number(value) => choice_from_raw(RawChoice::Number(value)).map(ChosenMode::Single),
            RawChosen::Code(value) => choice_from_raw(RawChoice::Code(value)).map(ChosenMode::Single),
            RawChosen::PerType(entries) => {
                let mut choices = empty_per_type();
                for (label, value) in entries {
                    choices.insert(CourseType::from_label(&label), choice_from_raw(value)?);
                }
                Ok(ChosenMode::PerType(choices))
            }
        }
    }
}

impl From<ChosenMode> for RawChosen {
    fn from(mode: ChosenMode) -> Self {
        match mode {
            ChosenMode::Locked => RawChosen::Number(-1),
            ChosenMode::Single(None) => RawChosen::Number(0),
            ChosenMode::Single(Some(code)) => RawChosen::Code(code.into()),
            ChosenMode::PerType(choices) => RawChosen::PerType(
                choices
                    .into_iter()
                    .map(|(course_type, choice)| (course_type.label().to_string(), choice_to_raw(choice)))
                    .collect(),
            ),
        }
    }
}
