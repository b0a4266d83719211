//! Weekly timetable: Monday to Friday by ten teaching periods.
//!
//! A slot literal such as `"Monday 8:00-9:40"` occupies every period whose
//! time range overlaps it. Slots that name a weekend day, cover no period
//! or cannot be parsed are kept in [`Timetable::unplaced`].

use chrono::Weekday;
use seat_ledger::{OfferedId, Section, Semester, SemesterId};
use serde::Serialize;

/// `(period, start, end)` in minutes after midnight.
pub const PERIODS: [(u8, u16, u16); 10] = [
    (1, 8 * 60, 8 * 60 + 45),
    (2, 8 * 60 + 55, 9 * 60 + 40),
    (3, 10 * 60, 10 * 60 + 45),
    (4, 10 * 60 + 55, 11 * 60 + 40),
    (5, 14 * 60, 14 * 60 + 45),
    (6, 14 * 60 + 55, 15 * 60 + 40),
    (7, 16 * 60, 16 * 60 + 45),
    (8, 16 * 60 + 55, 17 * 60 + 40),
    (9, 19 * 60, 19 * 60 + 45),
    (10, 19 * 60 + 55, 20 * 60 + 40),
];

pub const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

fn clock_label(minutes: u16) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// `"8:00-8:45"` for period 1.
fn span_label(start: u16, end: u16) -> String {
    format!("{}-{}", clock_label(start), clock_label(end))
}

fn parse_clock(s: &str) -> Option<u16> {
    let (h, m) = s.trim().split_once(':')?;
    let (h, m): (u16, u16) = (h.parse().ok()?, m.parse().ok()?);
    (h < 24 && m < 60).then(|| h * 60 + m)
}

/// Split `"<Weekday> H:MM-H:MM"` into day and minute range. The space after
/// the day name is optional.
pub fn parse_slot(slot: &str) -> Option<(Weekday, u16, u16)> {
    let slot = slot.trim();
    let split = slot.find(|c: char| c.is_ascii_digit())?;
    let (day, range) = slot.split_at(split);
    let weekday: Weekday = day.trim().parse().ok()?;
    let (start, end) = range.split_once('-')?;
    let (start, end) = (parse_clock(start)?, parse_clock(end)?);
    (start < end).then_some((weekday, start, end))
}

/// Periods overlapped by `[start, end)`, ascending.
pub fn covered_periods(start: u16, end: u16) -> Vec<u8> {
    PERIODS
        .iter()
        .filter(|(_, p_start, p_end)| *p_start < end && start < *p_end)
        .map(|(n, _, _)| *n)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableEntry {
    pub offered_id: OfferedId,
    pub course_name: String,
    pub teacher_name: String,
    pub classroom: String,
    pub span_start: u8,
    pub span_end: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableRow {
    pub period: u8,
    pub label: String,
    /// One cell per weekday, Monday first. A cell holds more than one entry
    /// only when held slots overlap without being textually identical.
    pub days: Vec<Vec<TimetableEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timetable {
    pub semester_id: SemesterId,
    pub rows: Vec<TimetableRow>,
    pub unplaced: Vec<Section>,
}

impl Timetable {
    pub fn entries_at(&self, period: u8, weekday: Weekday) -> &[TimetableEntry] {
        let Some(day) = WEEKDAYS.iter().position(|d| *d == weekday) else {
            return &[];
        };
        self.rows
            .iter()
            .find(|r| r.period == period)
            .map(|r| r.days[day].as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|r| r.days.iter().all(|cell| cell.is_empty()))
    }
}

pub fn build_timetable(semester: &Semester, sections: &[Section]) -> Timetable {
    let mut rows: Vec<TimetableRow> = PERIODS
        .iter()
        .map(|(n, start, end)| TimetableRow {
            period: *n,
            label: span_label(*start, *end),
            days: vec![Vec::new(); WEEKDAYS.len()],
        })
        .collect();
    let mut unplaced = Vec::new();

    for section in sections {
        let placement = parse_slot(&section.time_slot).and_then(|(weekday, start, end)| {
            let day = WEEKDAYS.iter().position(|d| *d == weekday)?;
            let periods = covered_periods(start, end);
            let (first, last) = (*periods.first()?, *periods.last()?);
            Some((day, periods, first, last))
        });
        let Some((day, periods, span_start, span_end)) = placement else {
            unplaced.push(section.clone());
            continue;
        };

        for period in periods {
            rows[usize::from(period - 1)].days[day].push(TimetableEntry {
                offered_id: section.offered_id.clone(),
                course_name: section.course_name.clone(),
                teacher_name: section.teacher_name.clone(),
                classroom: section.classroom.clone(),
                span_start,
                span_end,
            });
        }
    }

    Timetable {
        semester_id: semester.semester_id.clone(),
        rows,
        unplaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn semester() -> Semester {
        let day = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        Semester {
            semester_id: "S2025A".into(),
            semester_name: "Autumn 2025".into(),
            selection_start: day.and_hms_opt(0, 0, 0).unwrap(),
            selection_end: day.and_hms_opt(23, 0, 0).unwrap(),
        }
    }

    fn section(id: &str, name: &str, slot: &str) -> Section {
        Section {
            offered_id: id.into(),
            course_id: "c-1".into(),
            course_name: name.into(),
            credits: 2,
            target_grade: 2,
            college_id: "CS".into(),
            college_name: "Computer Science".into(),
            teacher_id: "t-1".into(),
            teacher_name: "Ada".into(),
            semester_id: "S2025A".into(),
            classroom: "A101".into(),
            time_slot: slot.into(),
            capacity: 30,
            current_count: 1,
        }
    }

    #[test]
    fn parses_with_and_without_space() {
        assert_eq!(parse_slot("Monday 8:00-9:40"), Some((Weekday::Mon, 480, 580)));
        assert_eq!(parse_slot("Friday19:00-20:40"), Some((Weekday::Fri, 1140, 1240)));
        assert_eq!(parse_slot("Someday 8:00-9:40"), None);
        assert_eq!(parse_slot("Monday 9:40-8:00"), None);
        assert_eq!(parse_slot("Monday"), None);
    }

    #[test]
    fn two_hour_block_covers_two_periods() {
        assert_eq!(covered_periods(480, 600), vec![1, 2]);
        assert_eq!(covered_periods(480, 580), vec![1, 2]);
        assert_eq!(covered_periods(14 * 60, 15 * 60 + 40), vec![5, 6]);
        assert!(covered_periods(12 * 60, 13 * 60).is_empty());
    }

    #[test]
    fn endpoints_inside_breaks_still_place() {
        assert_eq!(covered_periods(480, 590), vec![1, 2]);
        assert_eq!(covered_periods(585, 630), vec![3]);
        assert_eq!(covered_periods(580, 600), Vec::<u8>::new());
    }

    #[test]
    fn rows_are_labelled_with_period_bounds() {
        let table = build_timetable(&semester(), &[]);
        assert_eq!(table.rows.len(), PERIODS.len());
        assert_eq!(table.rows[0].label, "8:00-8:45");
        assert_eq!(table.rows[9].label, "19:55-20:40");
        assert!(table.is_empty());
    }

    #[test]
    fn grid_places_sections_and_keeps_leftovers() {
        let sections = vec![
            section("oc-1", "Algorithms", "Monday 8:00-9:40"),
            section("oc-2", "Databases", "Wednesday 14:00-15:40"),
            section("oc-3", "Seminar", "Saturday 8:00-9:40"),
            section("oc-4", "Reading", "TBA"),
        ];
        let table = build_timetable(&semester(), &sections);

        let cell = table.entries_at(2, Weekday::Mon);
        assert_eq!(cell.len(), 1);
        assert_eq!(cell[0].course_name, "Algorithms");
        assert_eq!((cell[0].span_start, cell[0].span_end), (1, 2));
        assert!(table.entries_at(3, Weekday::Mon).is_empty());
        assert_eq!(table.entries_at(6, Weekday::Wed)[0].course_name, "Databases");

        let leftovers: Vec<&str> = table.unplaced.iter().map(|s| s.offered_id.as_str()).collect();
        assert_eq!(leftovers, vec!["oc-3", "oc-4"]);
        assert!(!table.is_empty());
    }

    #[test]
    fn empty_when_nothing_held() {
        let table = build_timetable(&semester(), &[]);
        assert!(table.is_empty());
        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.semester_id.as_str(), "S2025A");
    }
}
