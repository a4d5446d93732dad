use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

/// Width of one optimizer slot in seconds.
pub const SLOT_SECONDS: u32 = 900;

/// The translation instant, seen from the site's local day.
///
/// The optimizer indexes its plan by 15 minute slots of the site's local wall
/// clock, so all time arithmetic goes through this type. Days of a DST
/// transition last 23 or 25 hours, but their wall clock still runs from 0 to
/// 86 399 s.
#[derive(Debug, Clone, Copy)]
pub struct SiteClock {
    now: DateTime<Utc>,
    timezone: Tz,
    midnight: DateTime<Utc>,
    next_midnight: DateTime<Utc>,
}

impl SiteClock {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        let today = now.with_timezone(&timezone).date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        SiteClock {
            now,
            timezone,
            midnight: local_midnight(today, timezone, now),
            next_midnight: local_midnight(tomorrow, timezone, now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn midnight(&self) -> DateTime<Utc> {
        self.midnight
    }

    /// Local wall clock seconds of now.
    pub fn seconds_since_midnight(&self) -> u32 {
        self.now.with_timezone(&self.timezone).num_seconds_from_midnight()
    }

    /// Local wall clock seconds of `instant`, `None` when it falls on another
    /// local day.
    pub fn seconds_today(&self, instant: DateTime<Utc>) -> Option<u32> {
        (self.midnight <= instant && instant < self.next_midnight)
            .then(|| instant.with_timezone(&self.timezone).num_seconds_from_midnight())
    }

    pub fn current_slot(&self) -> usize {
        (self.seconds_since_midnight() / SLOT_SECONDS) as usize
    }

    /// Most recent slot boundary at or before now.
    pub fn slot_start(&self) -> DateTime<Utc> {
        let local = self.now.with_timezone(&self.timezone);
        let offset = self.current_slot() as u32 * SLOT_SECONDS;
        let naive =
            local.date_naive().and_time(NaiveTime::MIN) + Duration::seconds(i64::from(offset));
        resolve_local(naive, self.timezone, self.now).unwrap_or_else(|| {
            let into_slot = local.num_seconds_from_midnight() - offset;
            self.now - Duration::seconds(i64::from(into_slot))
        })
    }
}

fn local_midnight(date: NaiveDate, timezone: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    resolve_local(naive, timezone, now)
        // Midnight skipped by a DST transition
        .or_else(|| resolve_local(naive + Duration::hours(1), timezone, now))
        .unwrap_or_else(|| timezone.from_utc_datetime(&naive).with_timezone(&Utc))
}

/// Instant of a local wall clock time. Of the two instants of a repeated
/// hour, the latest one not after `now` is taken.
fn resolve_local(naive: NaiveDateTime, timezone: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Some(instant.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, latest) => {
            let latest = latest.with_timezone(&Utc);
            if latest <= now {
                Some(latest)
            } else {
                Some(earliest.with_timezone(&Utc))
            }
        }
        LocalResult::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_in_utc() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 10, 7, 30).unwrap();
        let clock = SiteClock::new(now, Tz::UTC);
        assert_eq!(clock.seconds_since_midnight(), 10 * 3600 + 7 * 60 + 30);
        assert_eq!(clock.current_slot(), 40);
        assert_eq!(
            clock.slot_start(),
            Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_local_midnight() {
        // 23:30 UTC is already the next day in Paris (UTC+1 in winter)
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 23, 30, 0).unwrap();
        let clock = SiteClock::new(now, chrono_tz::Europe::Paris);
        assert_eq!(
            clock.midnight(),
            Utc.with_ymd_and_hms(2025, 1, 14, 23, 0, 0).unwrap()
        );
        assert_eq!(clock.seconds_since_midnight(), 1800);
        assert_eq!(clock.current_slot(), 2);
    }

    #[test]
    fn test_previous_day_is_not_today() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap();
        let clock = SiteClock::new(now, Tz::UTC);
        let yesterday = Utc.with_ymd_and_hms(2025, 3, 9, 22, 0, 0).unwrap();
        assert_eq!(clock.seconds_today(yesterday), None);
        let earlier = Utc.with_ymd_and_hms(2025, 3, 10, 0, 15, 0).unwrap();
        assert_eq!(clock.seconds_today(earlier), Some(900));
    }

    #[test]
    fn test_last_hour_of_fall_back_day() {
        // 25 hour day in Paris: 22:30 UTC is 23:30 local, CET
        let now = Utc.with_ymd_and_hms(2025, 10, 26, 22, 30, 0).unwrap();
        let clock = SiteClock::new(now, chrono_tz::Europe::Paris);
        assert_eq!(
            clock.midnight(),
            Utc.with_ymd_and_hms(2025, 10, 25, 22, 0, 0).unwrap()
        );
        assert_eq!(clock.seconds_since_midnight(), 23 * 3600 + 30 * 60);
        assert_eq!(clock.current_slot(), 94);
        assert_eq!(clock.slot_start(), now);

        let started = Utc.with_ymd_and_hms(2025, 10, 26, 22, 10, 0).unwrap();
        assert_eq!(clock.seconds_today(started), Some(23 * 3600 + 10 * 60));
        let next_day = Utc.with_ymd_and_hms(2025, 10, 26, 23, 0, 0).unwrap();
        assert_eq!(clock.seconds_today(next_day), None);
    }

    #[test]
    fn test_repeated_hour_slot_start() {
        // 01:10 UTC is 02:10 local on its second pass
        let now = Utc.with_ymd_and_hms(2025, 10, 26, 1, 10, 0).unwrap();
        let clock = SiteClock::new(now, chrono_tz::Europe::Paris);
        assert_eq!(clock.seconds_since_midnight(), 2 * 3600 + 10 * 60);
        assert_eq!(clock.current_slot(), 8);
        assert_eq!(
            clock.slot_start(),
            Utc.with_ymd_and_hms(2025, 10, 26, 1, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_spring_forward_day() {
        // 23 hour day in Paris: 02:00 to 03:00 local is skipped
        let now = Utc.with_ymd_and_hms(2025, 3, 30, 1, 20, 0).unwrap();
        let clock = SiteClock::new(now, chrono_tz::Europe::Paris);
        assert_eq!(clock.seconds_since_midnight(), 3 * 3600 + 20 * 60);
        assert_eq!(clock.current_slot(), 13);
        assert_eq!(
            clock.slot_start(),
            Utc.with_ymd_and_hms(2025, 3, 30, 1, 15, 0).unwrap()
        );
    }
}
