use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use chrono_tz::Tz;
use log::{debug, warn};
use minute_model::{MinuteSlot, NormalizedRow, RawBar};

pub const MINUTES_PER_DAY: usize = 24 * 60;

/// Join key shared by slots and bars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MinuteKey {
    timestamp: NaiveDateTime,
    time_label: String,
}

impl MinuteKey {
    fn new(timestamp: NaiveDateTime) -> Self {
        MinuteKey {
            time_label: timestamp.format("%H:%M").to_string(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedGrid {
    pub date: NaiveDate,
    pub timezone: Tz,
    pub rows: Vec<NormalizedRow>,
    /// Slots that received a bar.
    pub matched: usize,
    /// Bars dropped because an earlier bar already claimed their minute.
    pub duplicates: usize,
    /// Bars that fall outside the target day.
    pub out_of_range: usize,
}

impl NormalizedGrid {
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Every wall-clock minute of `date`, 00:00 through 23:59.
pub fn minute_slots(date: NaiveDate) -> Vec<MinuteSlot> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..MINUTES_PER_DAY as i64)
        .map(|minute| {
            let key = MinuteKey::new(midnight + chrono::Duration::minutes(minute));
            MinuteSlot {
                timestamp: key.timestamp,
                time_label: key.time_label,
            }
        })
        .collect()
}

/// Local wall-clock minute a provider bar belongs to.
fn bar_key(bar: &RawBar, tz: Tz) -> MinuteKey {
    let local = bar.timestamp.to_local(tz);
    let truncated = local
        .with_second(0)
        .and_then(|ts| ts.with_nanosecond(0))
        .unwrap_or(local);
    MinuteKey::new(truncated)
}

/// Left-joins `bars` onto the full minute grid of `date` in `tz`. The grid
/// always has one row per wall-clock minute; the first bar claiming a minute
/// wins, which also settles the repeated hour of a DST fall-back.
pub fn normalize(date: NaiveDate, tz: Tz, bars: &[RawBar]) -> NormalizedGrid {
    let slots = minute_slots(date);

    let mut by_key: HashMap<MinuteKey, &RawBar> = HashMap::with_capacity(bars.len());
    let mut duplicates = 0;
    for bar in bars {
        let key = bar_key(bar, tz);
        if by_key.contains_key(&key) {
            debug!("normalize | duplicate bar | minute: {}", key.timestamp);
            duplicates += 1;
            continue;
        }
        by_key.insert(key, bar);
    }

    let mut matched = 0;
    let rows: Vec<NormalizedRow> = slots
        .into_iter()
        .map(|slot| {
            let key = MinuteKey {
                timestamp: slot.timestamp,
                time_label: slot.time_label.clone(),
            };
            let mut row = NormalizedRow::empty(slot);
            if let Some(bar) = by_key.get(&key) {
                row.fill(bar);
                matched += 1;
            }
            row
        })
        .collect();

    let out_of_range = bars.len() - duplicates - matched;

    if duplicates > 0 {
        warn!(
            "normalize | {} bars share a minute with an earlier bar and were discarded",
            duplicates
        );
    }
    if out_of_range > 0 {
        warn!(
            "normalize | {} bars fall outside {} ({}) and were discarded",
            out_of_range, date, tz
        );
    }
    debug!(
        "normalize | date: {} | tz: {} | bars: {} | matched: {}",
        date,
        tz,
        bars.len(),
        matched
    );

    NormalizedGrid {
        date,
        timezone: tz,
        rows,
        matched,
        duplicates,
        out_of_range,
    }
}
