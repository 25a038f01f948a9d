use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::color::HexColor;
use crate::domain::{Course, CourseCode, CourseType, Schedule, Subject, Weekday};
use crate::selection::{is_chosen, is_displayed};
use crate::settings::Settings;

pub fn resolve_date_for_weekday(day: Weekday, today: NaiveDate) -> NaiveDate {
    week_start(today) + Duration::days(i64::from(day.number_from_monday()) - 1)
}

pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().number_from_monday()) - 1)
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub label_lines: Vec<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub day: Weekday,
    pub background: HexColor,
    pub border: HexColor,
    pub text_color: HexColor,
    pub dashed: bool,
    pub chosen: bool,
    pub visible: bool,
    pub subject_id: u32,
    pub course_id: u32,
    pub course_code: CourseCode,
    pub course_type: CourseType,
}

impl CalendarEvent {
    pub fn time_text(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }

    pub fn covers(&self, day: NaiveDate, from: NaiveTime, until: NaiveTime) -> bool {
        self.start.date() == day && self.start.time() < until && self.end.time() > from
    }
}

pub fn project_events(schedule: &Schedule, settings: &Settings, today: NaiveDate) -> Vec<CalendarEvent> {
    schedule
        .subjects()
        .iter()
        .filter(|subject| subject.status.show)
        .flat_map(|subject| {
            subject
                .courses
                .iter()
                .map(move |course| project_course(subject, course, settings, today))
        })
        .collect()
}

pub fn visible_events(events: &[CalendarEvent]) -> Vec<&CalendarEvent> {
    events.iter().filter(|event| event.visible).collect()
}

fn project_course(subject: &Subject, course: &Course, settings: &Settings, today: NaiveDate) -> CalendarEvent {
    let date = resolve_date_for_weekday(course.day, today);
    let chosen = is_chosen(subject, course);
    let background = if chosen {
        subject.status.color.clone()
    } else {
        HexColor::black()
    };

    CalendarEvent {
        title: subject.name.clone(),
        label_lines: label_lines(subject, course, settings),
        start: date.and_time(course.start_time),
        end: date.and_time(course.end_time),
        day: course.day,
        text_color: background.contrast_text(),
        background,
        border: subject.status.color.clone(),
        dashed: course.course_type == CourseType::Lecture,
        chosen,
        visible: is_displayed(subject, course),
        subject_id: subject.id,
        course_id: course.id,
        course_code: course.course.clone(),
        course_type: course.course_type,
    }
}

fn label_lines(subject: &Subject, course: &Course, settings: &Settings) -> Vec<String> {
    let show = &settings.show;
    [
        (show.name, subject.name.clone()),
        (show.code, course.course.to_string()),
        (show.time, course.time_range_text()),
        (show.course_type, course.course_type.to_string()),
        (show.instructor, course.instructor.clone()),
        (show.location, course.location.clone()),
        (show.notes, course.notes.clone()),
    ]
    .into_iter()
    .filter(|(enabled, text)| *enabled && !text.is_empty())
    .map(|(_, text)| text)
    .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime};

    use crate::color::HexColor;
    use crate::domain::{CourseCode, CourseDraft, CourseType, Schedule, Weekday};
    use crate::selection::SelectionMode;
    use crate::settings::Settings;

    use super::{project_events, resolve_date_for_weekday, visible_events, week_start};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn draft(code: &str, course_type: CourseType, day: Weekday, start: &str, end: &str) -> CourseDraft {
        CourseDraft {
            code: code.to_string(),
            course_type,
            instructor: "Oktató".to_string(),
            location: "Terem".to_string(),
            day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            notes: String::new(),
        }
    }

    fn sample_schedule() -> (Schedule, u32) {
        let mut schedule = Schedule::new();
        let id = schedule.add_subject("CS101".to_string(), "Programozás".to_string());
        schedule
            .add_course(id, draft("5", CourseType::Practice, Weekday::Monday, "08:00", "09:30"))
            .expect("course should be valid");
        schedule
            .add_course(id, draft("6", CourseType::Practice, Weekday::Wednesday, "10:00", "11:30"))
            .expect("course should be valid");
        schedule
            .add_course(id, draft("7", CourseType::Lecture, Weekday::Friday, "12:00", "14:00"))
            .expect("course should be valid");
        (schedule, id)
    }

    #[test]
    fn resolves_weekdays_with_monday_first() {
        // 2026-10-19 is a Monday, 2026-10-25 the Sunday of the same week
        let monday = date(2026, 10, 19);
        let sunday = date(2026, 10, 25);
        assert_eq!(week_start(sunday), monday);
        assert_eq!(resolve_date_for_weekday(Weekday::Sunday, monday), sunday);
        assert_eq!(resolve_date_for_weekday(Weekday::Monday, sunday), monday);
        assert_eq!(resolve_date_for_weekday(Weekday::Friday, sunday), date(2026, 10, 23));
    }

    #[test]
    fn friday_is_stable_across_the_whole_week() {
        let monday = date(2026, 3, 23);
        let expected = resolve_date_for_weekday(Weekday::Friday, monday);
        for offset in 0..7 {
            let today = monday + Duration::days(offset);
            assert_eq!(resolve_date_for_weekday(Weekday::Friday, today), expected);
        }
        let next_monday = monday + Duration::days(7);
        assert_eq!(
            resolve_date_for_weekday(Weekday::Friday, next_monday),
            expected + Duration::days(7)
        );
    }

    #[test]
    fn projects_every_section_of_visible_subjects() {
        let (schedule, id) = sample_schedule();
        let today = date(2026, 10, 21);
        let events = project_events(&schedule, &Settings::default(), today);

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|event| event.visible && !event.chosen));
        assert!(events.iter().all(|event| event.background == HexColor::black()));
        assert!(events.iter().all(|event| event.subject_id == id));

        let lecture = &events[2];
        assert_eq!(lecture.start, date(2026, 10, 23).and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
        assert_eq!(lecture.time_text(), "12:00-14:00");
        assert!(lecture.dashed);
        assert_eq!(lecture.text_color, HexColor::white());
    }

    #[test]
    fn chosen_sections_take_the_subject_color() {
        let (mut schedule, id) = sample_schedule();
        schedule.set_chosen_course(id, &CourseCode::parse("5").unwrap(), CourseType::Practice);
        let color = schedule.subject(id).unwrap().status.color.clone();

        let events = project_events(&schedule, &Settings::default(), date(2026, 10, 21));
        let by_code = |code: &str| {
            events
                .iter()
                .find(|event| event.course_code.as_str() == code)
                .expect("event should exist")
        };

        assert!(by_code("5").chosen && by_code("5").visible);
        assert_eq!(by_code("5").background, color);
        assert!(!by_code("6").visible);
        assert!(by_code("7").visible && !by_code("7").chosen);
        assert_eq!(visible_events(&events).len(), 2);
    }

    #[test]
    fn hidden_subjects_contribute_no_events() {
        let (mut schedule, id) = sample_schedule();
        schedule.update_show_subject(id, false);
        assert!(project_events(&schedule, &Settings::default(), date(2026, 10, 21)).is_empty());
    }

    #[test]
    fn locked_subjects_show_every_section() {
        let (mut schedule, id) = sample_schedule();
        schedule.update_show_course(id, 2, false);
        let color = schedule.subject(id).unwrap().status.color.clone();
        schedule.update_subject(id, "CS101".to_string(), "Programozás".to_string(), color, SelectionMode::Locked);

        let events = project_events(&schedule, &Settings::default(), date(2026, 10, 21));
        assert!(events.iter().all(|event| event.visible && event.chosen));
    }

    #[test]
    fn labels_follow_the_display_flags() {
        let (schedule, _) = sample_schedule();
        let mut settings = Settings::default();
        let events = project_events(&schedule, &settings, date(2026, 10, 21));
        assert_eq!(events[0].label_lines, vec!["Programozás", "08:00-09:30", "Oktató", "Terem"]);

        settings.show.name = false;
        settings.show.code = true;
        settings.show.course_type = true;
        settings.show.location = false;
        let events = project_events(&schedule, &settings, date(2026, 10, 21));
        assert_eq!(events[0].label_lines, vec!["5", "08:00-09:30", "Gyakorlat", "Oktató"]);
    }

    #[test]
    fn click_metadata_routes_back_into_the_selection() {
        let (mut schedule, id) = sample_schedule();
        let today = date(2026, 10, 21);
        let event = project_events(&schedule, &Settings::default(), today)[1].clone();

        assert!(schedule.set_chosen_course(event.subject_id, &event.course_code, event.course_type));
        let events = project_events(&schedule, &Settings::default(), today);
        assert!(events[1].chosen);
        assert!(!events[0].visible);

        schedule.set_chosen_course(id, &event.course_code, event.course_type);
        let events = project_events(&schedule, &Settings::default(), today);
        assert!(events.iter().all(|event| event.visible && !event.chosen));
    }
}
