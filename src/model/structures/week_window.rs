use crate::model::constants::DAYS_PER_WEEK;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};

/// One local calendar week: `[start 00:00, start + 7 days 00:00)` in the
/// user's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekWindow {
    start: NaiveDate,
    offset: FixedOffset
}

impl WeekWindow {
    /// The week containing `date`, where weeks begin on `week_start`.
    pub fn containing(date: NaiveDate, week_start: Weekday, offset: FixedOffset) -> WeekWindow {
        WeekWindow {
            start: date.week(week_start).first_day(),
            offset
        }
    }

    /// The week containing the instant `now` as seen in `offset`.
    pub fn current(now: DateTime<Utc>, week_start: Weekday, offset: FixedOffset) -> WeekWindow {
        Self::containing(now.with_timezone(&offset).date_naive(), week_start, offset)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.local_midnight(self.start)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.local_midnight(self.start + Duration::days(DAYS_PER_WEEK))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_utc() && instant < self.end_utc()
    }

    /// The local calendar day an instant falls on.
    pub fn local_day(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn previous(&self) -> WeekWindow {
        WeekWindow {
            start: self.start - Duration::days(DAYS_PER_WEEK),
            offset: self.offset
        }
    }

    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(NaiveTime::MIN).and_utc() - Duration::seconds(self.offset.local_minus_utc() as i64)
    }
}
