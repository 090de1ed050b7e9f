//! Daily reset boundary: the next local noon in the game's home timezone.

use chrono::{
    DateTime,
    Days,
    LocalResult,
    NaiveDateTime,
    NaiveTime,
    TimeZone,
    Utc,
};
use chrono_tz::{
    America::Los_Angeles,
    Tz,
};
use std::{
    fmt,
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetSchedule {
    zone: Tz,
    time: NaiveTime,
}

impl Default for ResetSchedule {
    fn default() -> Self {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        Self::new(Los_Angeles, noon)
    }
}

impl ResetSchedule {
    pub fn new(zone: Tz, time: NaiveTime) -> Self {
        Self { zone, time }
    }

    /// Next reset strictly after `now`. When the local clock already shows
    /// the reset time (or later) today, the boundary is tomorrow's.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.zone);
        let today = local.date_naive();
        let mut target = today.and_time(self.time);
        if local.naive_local() >= target {
            target = (today + Days::new(1)).and_time(self.time);
        }
        self.resolve(target)
    }

    /// Converts a civil timestamp with the offset in force on that date.
    fn resolve(&self, civil: NaiveDateTime) -> DateTime<Utc> {
        match self.zone.from_local_datetime(&civil) {
            LocalResult::Single(at) => at.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            LocalResult::None => {
                // spring-forward gap: the wall clock skips an hour
                let shifted = civil + chrono::Duration::hours(1);
                self.zone
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|at| at.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&civil))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundaryCrossed {
    pub boundary: DateTime<Utc>,
    pub next: DateTime<Utc>,
}

/// Tracks the armed boundary and re-arms it once passed.
#[derive(Clone, Debug)]
pub struct ResetClock {
    schedule: ResetSchedule,
    boundary: DateTime<Utc>,
}

impl ResetClock {
    pub fn new(schedule: ResetSchedule, now: DateTime<Utc>) -> Self {
        Self {
            schedule,
            boundary: schedule.next_boundary(now),
        }
    }

    pub fn boundary(&self) -> DateTime<Utc> {
        self.boundary
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<BoundaryCrossed> {
        if now < self.boundary {
            return None;
        }
        let boundary = self.boundary;
        self.boundary = self.schedule.next_boundary(now);
        Some(BoundaryCrossed {
            boundary,
            next: self.boundary,
        })
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        Countdown::until(self.boundary, now)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub remaining: Duration,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn until(boundary: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = (boundary - now).to_std().unwrap_or(Duration::ZERO);
        let total = remaining.as_secs();
        Self {
            remaining,
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining.is_zero()
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn next_boundary__is_today_noon_one_second_before() {
        // given: 11:59:59 PST
        let now = utc("2026-01-15T19:59:59Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then
        assert_eq!(boundary, utc("2026-01-15T20:00:00Z"));
    }

    #[test]
    fn next_boundary__is_tomorrow_noon_one_second_after() {
        // given: 12:00:01 PST
        let now = utc("2026-01-15T20:00:01Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then
        assert_eq!(boundary, utc("2026-01-16T20:00:00Z"));
    }

    #[test]
    fn next_boundary__is_tomorrow_noon_at_exact_noon() {
        // given
        let now = utc("2026-01-15T20:00:00Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then
        assert_eq!(boundary, utc("2026-01-16T20:00:00Z"));
    }

    #[test]
    fn next_boundary__uses_local_date_not_utc_date() {
        // given: 2026-01-16 02:00 UTC is still the 15th in Los Angeles
        let now = utc("2026-01-16T02:00:00Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then
        assert_eq!(boundary, utc("2026-01-16T20:00:00Z"));
    }

    #[test]
    fn next_boundary__spans_23_hours_into_daylight_time() {
        // given: noon PST on the day before clocks spring forward
        let now = utc("2026-03-07T20:00:00Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then: noon PDT is 19:00 UTC
        assert_eq!(boundary, utc("2026-03-08T19:00:00Z"));
        assert_eq!((boundary - now).num_hours(), 23);
    }

    #[test]
    fn next_boundary__spans_25_hours_back_to_standard_time() {
        // given: noon PDT on the day before clocks fall back
        let now = utc("2026-10-31T19:00:00Z");

        // when
        let boundary = ResetSchedule::default().next_boundary(now);

        // then
        assert_eq!(boundary, utc("2026-11-01T20:00:00Z"));
        assert_eq!((boundary - now).num_hours(), 25);
    }

    #[test]
    fn next_boundary__rolls_forward_out_of_a_dst_gap() {
        // given: 02:30 does not exist in Los Angeles on 2026-03-08
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let schedule = ResetSchedule::new(Los_Angeles, time);
        let now = utc("2026-03-08T09:00:00Z");

        // when
        let boundary = schedule.next_boundary(now);

        // then: 03:30 PDT
        assert_eq!(boundary, utc("2026-03-08T10:30:00Z"));
    }

    #[test]
    fn next_boundary__takes_earliest_instant_of_repeated_hour() {
        // given: 01:30 happens twice in Los Angeles on 2026-11-01
        let time = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        let schedule = ResetSchedule::new(Los_Angeles, time);
        let now = utc("2026-11-01T07:00:00Z");

        // when
        let boundary = schedule.next_boundary(now);

        // then: 01:30 PDT
        assert_eq!(boundary, utc("2026-11-01T08:30:00Z"));
    }

    #[test]
    fn tick__reports_crossing_once_and_rearms() {
        // given
        let mut clock = ResetClock::new(
            ResetSchedule::default(),
            utc("2026-01-15T19:59:59Z"),
        );

        // when
        let before = clock.tick(utc("2026-01-15T19:59:59Z"));
        let crossed = clock.tick(utc("2026-01-15T20:00:00Z"));
        let after = clock.tick(utc("2026-01-15T20:00:01Z"));

        // then
        assert_eq!(before, None);
        assert_eq!(
            crossed,
            Some(BoundaryCrossed {
                boundary: utc("2026-01-15T20:00:00Z"),
                next: utc("2026-01-16T20:00:00Z"),
            })
        );
        assert_eq!(after, None);
        assert_eq!(clock.boundary(), utc("2026-01-16T20:00:00Z"));
    }

    #[test]
    fn tick__rearms_from_now_after_a_long_gap() {
        // given
        let mut clock = ResetClock::new(
            ResetSchedule::default(),
            utc("2026-01-15T10:00:00Z"),
        );

        // when: the process slept through several resets
        let crossed = clock.tick(utc("2026-01-18T21:00:00Z")).unwrap();

        // then
        assert_eq!(crossed.boundary, utc("2026-01-15T20:00:00Z"));
        assert_eq!(crossed.next, utc("2026-01-19T20:00:00Z"));
    }

    #[test]
    fn countdown__splits_remaining_time_and_saturates() {
        // given
        let clock = ResetClock::new(
            ResetSchedule::default(),
            utc("2026-01-15T10:00:00Z"),
        );

        // when
        let countdown = clock.countdown(utc("2026-01-15T16:58:55Z"));
        let elapsed = clock.countdown(utc("2026-01-15T20:00:05Z"));

        // then
        assert_eq!((countdown.hours, countdown.minutes, countdown.seconds), (3, 1, 5));
        assert_eq!(countdown.to_string(), "03:01:05");
        assert!(elapsed.is_elapsed());
        assert_eq!(elapsed.to_string(), "00:00:00");
    }
}
