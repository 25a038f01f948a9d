//! Flat records handed over by the course-catalog search.
//!
//! The catalog client lives outside this crate; it produces one list of
//! subjects and one list of sections that point at their subject by code.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Course, CourseCode, CourseType, Weekday, parse_time_range};
use crate::error::{PlannerError, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSubject {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCourse {
    pub subject: String,
    pub course: String,
    #[serde(rename = "type", default)]
    pub course_type: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub location: String,
    pub day: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub notes: String,
}

impl CatalogCourse {
    /// Builds a visible section with the given id. Catalog rows only need a
    /// usable code, day and time range; descriptive fields may be blank.
    pub fn to_course(&self, id: u32) -> Result<Course, PlannerError> {
        let course = CourseCode::parse(&self.course)?;
        let day = self.day.parse::<Weekday>()?;
        let (start_time, end_time) = parse_time_range(&self.start_time, &self.end_time)?;

        Ok(Course {
            id,
            course,
            course_type: CourseType::from_label(&self.course_type),
            instructor: self.instructor.trim().to_string(),
            location: self.location.trim().to_string(),
            day,
            start_time,
            end_time,
            notes: self.notes.trim().to_string(),
            show: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogExport {
    #[serde(default)]
    pub subjects: Vec<CatalogSubject>,
    #[serde(default)]
    pub courses: Vec<CatalogCourse>,
}

pub fn read_catalog_file(path: &Path) -> Result<CatalogExport, StorageError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use crate::domain::{CourseType, Weekday};
    use crate::error::PlannerError;

    use super::{CatalogCourse, CatalogExport};

    fn row() -> CatalogCourse {
        CatalogCourse {
            subject: "IP-18AN1G".to_string(),
            course: "1".to_string(),
            course_type: "gyakorlat".to_string(),
            instructor: " Példa Béla ".to_string(),
            location: String::new(),
            day: "Hétfo".to_string(),
            start_time: "8:00".to_string(),
            end_time: "9:30".to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn normalizes_scraped_fields() {
        let course = row().to_course(4).expect("row should convert");
        assert_eq!(course.id, 4);
        assert_eq!(course.course_type, CourseType::Practice);
        assert_eq!(course.day, Weekday::Monday);
        assert_eq!(course.start_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(course.time_range_text(), "08:00-09:30");
        assert_eq!(course.instructor, "Példa Béla");
        assert!(course.show);
    }

    #[test]
    fn rejects_rows_without_a_usable_slot() {
        let mut reserved = row();
        reserved.course = "-1".to_string();
        assert!(matches!(reserved.to_course(1), Err(PlannerError::InvalidCourseCode(_))));

        let mut unknown_day = row();
        unknown_day.day = "Monday".to_string();
        assert!(matches!(unknown_day.to_course(1), Err(PlannerError::UnknownWeekday(_))));
    }

    #[test]
    fn reads_the_export_shape() {
        let raw = r#"{
            "subjects": [{"code": "IP-18AN1G", "name": "Analízis"}],
            "courses": [{
                "subject": "IP-18AN1G", "course": "2", "type": "Előadás",
                "instructor": "X", "location": "Y", "day": "Kedd",
                "startTime": "10:00", "endTime": "12:00"
            }]
        }"#;
        let export: CatalogExport = serde_json::from_str(raw).expect("export should parse");
        assert_eq!(export.subjects.len(), 1);
        assert_eq!(export.courses[0].course_type, "Előadás");
        assert!(export.courses[0].notes.is_empty());
    }
}
