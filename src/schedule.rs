//! Bookable start times for a service on a given day.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::{parse_hhmm, Booking, BookingStatus, DaySchedule, Service, WorkingHours};

/// Length assumed for a booking whose service has since been removed.
pub const FALLBACK_DURATION_MINUTES: u32 = 30;

/// Parsed opening hours of one day, in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub open: u32,
    pub close: u32,
    pub lunch: Option<(u32, u32)>,
}

impl DayWindow {
    /// `None` when the day is disabled or its open/close times do not parse
    /// into a non-empty interval. A malformed break is ignored.
    pub fn from_schedule(schedule: &DaySchedule) -> Option<Self> {
        if !schedule.enabled {
            return None;
        }
        let open = minutes(parse_hhmm(&schedule.open_time)?);
        let close = minutes(parse_hhmm(&schedule.close_time)?);
        if open >= close {
            return None;
        }
        let lunch = match (parse_hhmm(&schedule.break_start), parse_hhmm(&schedule.break_end)) {
            (Some(start), Some(end)) if minutes(start) < minutes(end) => {
                Some((minutes(start), minutes(end)))
            }
            _ => None,
        };
        Some(Self { open, close, lunch })
    }
}

/// A time range already taken by a scheduled booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyWindow {
    pub start: u32,
    pub end: u32,
}

impl BusyWindow {
    pub fn new(start: NaiveTime, duration: u32) -> Self {
        let start = minutes(start);
        Self {
            start,
            end: start.saturating_add(duration),
        }
    }

    fn overlaps(&self, start: u32, end: u32) -> bool {
        start < self.end && end > self.start
    }
}

fn minutes(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn time_of(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

/// Steps through the day in increments of `duration`, starting at opening
/// time. A candidate that would run into the break is dropped and stepping
/// resumes when the break ends; nothing may end after closing time.
pub fn generate_slots(
    hours: &WorkingHours,
    date: NaiveDate,
    duration: u32,
    busy: &[BusyWindow],
    not_before: Option<NaiveTime>,
) -> Vec<NaiveTime> {
    let Some(window) = DayWindow::from_schedule(hours.day(date.weekday())) else {
        return Vec::new();
    };
    if duration == 0 {
        return Vec::new();
    }
    let not_before = not_before.map(minutes);

    let mut slots = Vec::new();
    let mut start = window.open;
    while let Some(end) = start.checked_add(duration).filter(|end| *end <= window.close) {
        if let Some((lunch_start, lunch_end)) = window.lunch {
            if start < lunch_end && end > lunch_start {
                start = lunch_end;
                continue;
            }
        }
        let taken = busy.iter().any(|window| window.overlaps(start, end));
        let elapsed = not_before.is_some_and(|limit| start <= limit);
        if !taken && !elapsed {
            if let Some(time) = time_of(start) {
                slots.push(time);
            }
        }
        start = end;
    }
    slots
}

/// Windows held by scheduled bookings on `date`.
pub fn busy_windows(bookings: &[Booking], services: &[Service], date: NaiveDate) -> Vec<BusyWindow> {
    bookings
        .iter()
        .filter(|booking| booking.date == date && booking.status == BookingStatus::Scheduled)
        .map(|booking| {
            let duration = services
                .iter()
                .find(|service| service.id == booking.service_id)
                .map(|service| service.duration)
                .unwrap_or(FALLBACK_DURATION_MINUTES);
            BusyWindow::new(booking.time, duration)
        })
        .collect()
}

/// Slots still open for booking as of `now`: past days are empty and on the
/// current day only times after `now` are offered.
pub fn available_slots(
    hours: &WorkingHours,
    bookings: &[Booking],
    services: &[Service],
    date: NaiveDate,
    duration: u32,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    let today = now.date();
    if date < today {
        return Vec::new();
    }
    let not_before = (date == today).then(|| now.time());
    let busy = busy_windows(bookings, services, date);
    generate_slots(hours, date, duration, &busy, not_before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DaySchedule;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn labels(slots: &[NaiveTime]) -> Vec<String> {
        slots.iter().map(|slot| slot.format("%H:%M").to_string()).collect()
    }

    #[test]
    fn steps_by_duration_and_resumes_after_break() {
        let slots = generate_slots(&WorkingHours::default(), monday(), 45, &[], None);
        assert_eq!(
            labels(&slots),
            vec![
                "08:00", "08:45", "09:30", "10:15", "11:00", "14:00", "14:45", "15:30", "16:15",
                "17:00"
            ]
        );
    }

    #[test]
    fn disabled_day_is_empty_for_every_duration() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        for duration in [1, 15, 30, 45, 60, 90, 600] {
            assert!(generate_slots(&WorkingHours::default(), sunday, duration, &[], None).is_empty());
        }
    }

    #[test]
    fn every_slot_fits_and_avoids_the_break() {
        let mut hours = WorkingHours::default();
        hours.monday = DaySchedule {
            enabled: true,
            open_time: "09:10".into(),
            close_time: "19:05".into(),
            break_start: "12:30".into(),
            break_end: "13:15".into(),
        };
        let (close, lunch_start, lunch_end) = (minutes(t(19, 5)), minutes(t(12, 30)), minutes(t(13, 15)));
        for duration in 1..=240 {
            for slot in generate_slots(&hours, monday(), duration, &[], None) {
                let start = minutes(slot);
                let end = start + duration;
                assert!(end <= close, "{duration}min slot at {slot} runs past close");
                assert!(
                    !(start < lunch_end && end > lunch_start),
                    "{duration}min slot at {slot} overlaps the break"
                );
            }
        }
    }

    #[test]
    fn partial_final_slot_is_excluded() {
        let mut hours = WorkingHours::default();
        hours.monday = DaySchedule {
            enabled: true,
            open_time: "08:00".into(),
            close_time: "09:40".into(),
            break_start: String::new(),
            break_end: String::new(),
        };
        let slots = generate_slots(&hours, monday(), 45, &[], None);
        assert_eq!(labels(&slots), vec!["08:00", "08:45"]);
    }

    #[test]
    fn duration_longer_than_day_yields_nothing() {
        assert!(generate_slots(&WorkingHours::default(), monday(), 0, &[], None).is_empty());
        assert!(generate_slots(&WorkingHours::default(), monday(), 11 * 60, &[], None).is_empty());
        assert!(generate_slots(&WorkingHours::default(), monday(), u32::MAX, &[], None).is_empty());
    }

    #[test]
    fn huge_busy_window_blocks_the_rest_of_the_day() {
        let busy = [BusyWindow::new(t(9, 0), u32::MAX)];
        assert_eq!(busy[0].end, u32::MAX);
        let slots = generate_slots(&WorkingHours::default(), monday(), 30, &busy, None);
        assert_eq!(labels(&slots), vec!["08:00", "08:30"]);
    }

    #[test]
    fn booked_and_elapsed_slots_are_skipped() {
        let busy = [BusyWindow::new(t(8, 30), 30)];
        let slots = generate_slots(&WorkingHours::default(), monday(), 30, &busy, Some(t(8, 0)));
        assert_eq!(labels(&slots[..2]), vec!["09:00", "09:30"]);
    }

    #[test]
    fn busy_windows_ignore_cancelled_and_other_days() {
        let booking = |date: NaiveDate, status| Booking {
            id: "agd".into(),
            client_name: "Ana Lima".into(),
            client_phone: "11987654321".into(),
            professional_id: "1".into(),
            professional_name: "Pablo Silva".into(),
            service_id: "svc_gone".into(),
            service_name: "Antigo".into(),
            date,
            time: t(10, 0),
            price: 10.0,
            status,
            created_at: None,
        };
        let bookings = vec![
            booking(monday(), BookingStatus::Scheduled),
            booking(monday(), BookingStatus::Cancelled),
            booking(monday().succ_opt().unwrap(), BookingStatus::Scheduled),
        ];
        let windows = busy_windows(&bookings, &[], monday());
        assert_eq!(windows, vec![BusyWindow::new(t(10, 0), FALLBACK_DURATION_MINUTES)]);
    }

    #[test]
    fn past_days_have_no_availability() {
        let now = monday().and_hms_opt(15, 0, 0).unwrap();
        let hours = WorkingHours::default();
        let yesterday = monday().pred_opt().unwrap();
        assert!(available_slots(&hours, &[], &[], yesterday, 30, now).is_empty());

        let today = available_slots(&hours, &[], &[], monday(), 30, now);
        assert_eq!(labels(&today)[0], "15:30");
    }
}
