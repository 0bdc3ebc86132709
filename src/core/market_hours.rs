//! Trading-day session boundaries consumed by the intraday positioning regime.
//!
//! The calendar itself is an external concern. [`MarketHoursResolver`] is the
//! seam a host implements; [`UsEquitySessionResolver`] covers the common
//! US-equity schedule with configurable holidays and early closes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::core::primitives::seconds_between;
use crate::core::types::SessionKind;
use crate::error::{ChartError, ChartResult};

/// Exchange time zone used for local-date decisions (sessions, buckets, labels).
pub const MARKET_TIME_ZONE: Tz = chrono_tz::America::New_York;

/// Four session boundaries for one trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarketHoursBounds {
    pub extended_open: DateTime<Utc>,
    pub regular_open: DateTime<Utc>,
    pub regular_close: DateTime<Utc>,
    pub extended_close: DateTime<Utc>,
}

impl MarketHoursBounds {
    /// Builds bounds after checking
    /// `extended_open <= regular_open <= regular_close <= extended_close`
    /// and a non-empty extended session.
    pub fn new(
        extended_open: DateTime<Utc>,
        regular_open: DateTime<Utc>,
        regular_close: DateTime<Utc>,
        extended_close: DateTime<Utc>,
    ) -> ChartResult<Self> {
        if !(extended_open <= regular_open
            && regular_open <= regular_close
            && regular_close <= extended_close)
        {
            return Err(ChartError::InvalidData(
                "market hours must be ordered extended_open <= regular_open <= regular_close <= extended_close"
                    .to_owned(),
            ));
        }
        if extended_open == extended_close {
            return Err(ChartError::InvalidData(
                "market hours extended session must be non-empty".to_owned(),
            ));
        }
        Ok(Self {
            extended_open,
            regular_open,
            regular_close,
            extended_close,
        })
    }

    /// Applies a shortened session. The close is overridden before any
    /// duration is derived from the bounds.
    pub fn with_early_close(
        self,
        regular_close: DateTime<Utc>,
        extended_close: DateTime<Utc>,
    ) -> ChartResult<Self> {
        Self::new(
            self.extended_open,
            self.regular_open,
            regular_close,
            extended_close,
        )
    }

    #[must_use]
    pub fn extended_duration_seconds(&self) -> f64 {
        seconds_between(self.extended_open, self.extended_close)
    }

    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.extended_open && time <= self.extended_close
    }

    /// Classifies an instant. The regular session is half-open
    /// (`regular_open..regular_close`); the closing instant starts after-hours.
    #[must_use]
    pub fn session_at(&self, time: DateTime<Utc>) -> Option<SessionKind> {
        if !self.contains(time) {
            return None;
        }
        if time < self.regular_open {
            Some(SessionKind::PreMarket)
        } else if time < self.regular_close {
            Some(SessionKind::Regular)
        } else {
            Some(SessionKind::AfterHours)
        }
    }
}

/// Calendar collaborator resolving session bounds per trading day.
pub trait MarketHoursResolver {
    /// Returns `None` for non-trading days.
    fn bounds_for(&self, day: NaiveDate) -> Option<MarketHoursBounds>;

    /// Local exchange date an instant belongs to.
    fn trading_day_of(&self, time: DateTime<Utc>) -> NaiveDate {
        time.with_timezone(&MARKET_TIME_ZONE).date_naive()
    }
}

/// US-equity schedule in `America/New_York`:
/// pre-market 04:00, regular 09:30-16:00, after-hours until 20:00.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsEquitySessionResolver {
    holidays: BTreeSet<NaiveDate>,
    early_closes: BTreeMap<NaiveDate, NaiveTime>,
}

impl UsEquitySessionResolver {
    const EXTENDED_OPEN: (u32, u32) = (4, 0);
    const REGULAR_OPEN: (u32, u32) = (9, 30);
    const REGULAR_CLOSE: (u32, u32) = (16, 0);
    const EXTENDED_CLOSE: (u32, u32) = (20, 0);
    const EARLY_CLOSE_EXTENSION_HOURS: i64 = 4;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_holiday(mut self, day: NaiveDate) -> Self {
        self.holidays.insert(day);
        self
    }

    /// Registers a shortened session closing the regular market at `close`
    /// local time. After-hours trading continues for four hours past it.
    #[must_use]
    pub fn with_early_close(mut self, day: NaiveDate, close: NaiveTime) -> Self {
        self.early_closes.insert(day, close);
        self
    }

    fn local_instant(day: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
        MARKET_TIME_ZONE
            .from_local_datetime(&day.and_time(time))
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    fn hm(day: NaiveDate, (hour, minute): (u32, u32)) -> Option<DateTime<Utc>> {
        Self::local_instant(day, NaiveTime::from_hms_opt(hour, minute, 0)?)
    }
}

impl MarketHoursResolver for UsEquitySessionResolver {
    fn bounds_for(&self, day: NaiveDate) -> Option<MarketHoursBounds> {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) || self.holidays.contains(&day) {
            return None;
        }

        let bounds = MarketHoursBounds::new(
            Self::hm(day, Self::EXTENDED_OPEN)?,
            Self::hm(day, Self::REGULAR_OPEN)?,
            Self::hm(day, Self::REGULAR_CLOSE)?,
            Self::hm(day, Self::EXTENDED_CLOSE)?,
        )
        .ok()?;

        match self.early_closes.get(&day) {
            Some(close) => {
                let regular_close = Self::local_instant(day, *close)?;
                let extended_close = (regular_close
                    + Duration::hours(Self::EARLY_CLOSE_EXTENSION_HOURS))
                .min(bounds.extended_close);
                bounds.with_early_close(regular_close, extended_close).ok()
            }
            None => Some(bounds),
        }
    }
}
