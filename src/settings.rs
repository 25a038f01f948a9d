use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::Weekday;
use crate::error::PlannerError;

const MIN_SLOT: u32 = 10;
const MAX_SLOT: u32 = 120;
const SLOT_STEP: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayFlags {
    pub name: bool,
    pub code: bool,
    pub time: bool,
    #[serde(rename = "type")]
    pub course_type: bool,
    pub instructor: bool,
    pub location: bool,
    pub notes: bool,
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            name: true,
            code: false,
            time: true,
            course_type: false,
            instructor: true,
            location: true,
            notes: false,
        }
    }
}

impl DisplayFlags {
    pub const FIELDS: [&'static str; 7] = ["name", "code", "time", "type", "instructor", "location", "notes"];

    pub fn set(&mut self, field: &str, value: bool) -> bool {
        let flag = match field {
            "name" => &mut self.name,
            "code" => &mut self.code,
            "time" => &mut self.time,
            "type" => &mut self.course_type,
            "instructor" => &mut self.instructor,
            "location" => &mut self.location,
            "notes" => &mut self.notes,
            _ => return false,
        };
        *flag = value;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show: DisplayFlags,
    pub saturday: bool,
    #[serde(deserialize_with = "slot_minutes")]
    pub slot: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show: DisplayFlags::default(),
            saturday: false,
            slot: 20,
        }
    }
}

impl Settings {
    pub fn allowed_days(&self) -> Vec<Weekday> {
        let mut days = Weekday::ALL[..5].to_vec();
        if self.saturday {
            days.push(Weekday::Saturday);
        }
        days
    }

    pub fn visible_days(&self) -> Vec<Weekday> {
        self.allowed_days()
    }

    pub fn check_day(&self, day: Weekday) -> Result<(), PlannerError> {
        if self.allowed_days().contains(&day) {
            Ok(())
        } else {
            Err(PlannerError::DayNotEnabled(day.name().to_string()))
        }
    }

    pub fn set_slot(&mut self, minutes: u32) -> Result<(), PlannerError> {
        if !(MIN_SLOT..=MAX_SLOT).contains(&minutes) || minutes % SLOT_STEP != 0 {
            return Err(PlannerError::InvalidSlot(minutes));
        }
        self.slot = minutes;
        Ok(())
    }

    /// Slot length used for layout, falling back to the default for
    /// out-of-range stored values.
    pub fn effective_slot(&self) -> u32 {
        if (MIN_SLOT..=MAX_SLOT).contains(&self.slot) && self.slot % SLOT_STEP == 0 {
            self.slot
        } else {
            Settings::default().slot
        }
    }
}

// Older documents stored the slot as the raw text of a number input.
fn slot_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSlot {
        Number(u32),
        Text(String),
    }

    match RawSlot::deserialize(deserializer)? {
        RawSlot::Number(minutes) => Ok(minutes),
        RawSlot::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
