use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{GridError, Result};

pub const DEFAULT_SYMBOL: &str = "RELIANCE.NS";
pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub symbol: String,
    pub date: NaiveDate,
}

impl ResolvedInput {
    pub fn filename(&self) -> String {
        format!("{}_{}.xlsx", self.symbol.replace('.', "_"), self.date.format("%Y-%m-%d"))
    }

    /// Local midnight of the target date and local midnight of the next day.
    pub fn fetch_window(&self, tz: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
        let start = local_midnight(self.date, tz);
        let end = self
            .date
            .succ_opt()
            .map(|next| local_midnight(next, tz))
            .unwrap_or(start + chrono::Duration::hours(24));
        (start, end)
    }

    pub fn fetching_message(&self) -> String {
        format!("Fetching {} 1-minute data for {}", self.symbol, self.date)
    }
}

/// `YYYY-MM-DD` with a four-digit year and one- or two-digit month and day,
/// nothing before or after.
fn is_date_shaped(date: &str) -> bool {
    let parts: Vec<&str> = date.split('-').collect();
    let digits = |part: &str, min: usize, max: usize| {
        (min..=max).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };
    parts.len() == 3 && digits(parts[0], 4, 4) && digits(parts[1], 1, 2) && digits(parts[2], 1, 2)
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| GridError::Timezone(name.to_string()))
}

/// Blank dates resolve to the day before `now` in `tz`; anything else must be `YYYY-MM-DD`.
pub fn resolve_input(
    symbol: &str,
    date: &str,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<ResolvedInput> {
    let date = if date.trim().is_empty() {
        let today = now.with_timezone(&tz).date_naive();
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    } else if !is_date_shaped(date) {
        return Err(GridError::Parse {
            input: date.to_string(),
            source: None,
        });
    } else {
        NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|source| GridError::Parse {
            input: date.to_string(),
            source: Some(source),
        })?
    };

    Ok(ResolvedInput {
        symbol: symbol.to_string(),
        date,
    })
}

/// Earliest instant of `date` in `tz`. A midnight skipped by a DST jump
/// resolves to the first minute that exists on the local clock.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    (0..=24 * 60)
        .map(|minute| midnight + chrono::Duration::minutes(minute))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}
