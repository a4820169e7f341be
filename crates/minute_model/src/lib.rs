use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Timestamp as handed over by a data provider, with or without a zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BarTimestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl BarTimestamp {
    /// Naive timestamps are read as UTC, aware ones keep their offset.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            BarTimestamp::Naive(naive) => naive.and_utc(),
            BarTimestamp::Aware(aware) => aware.with_timezone(&Utc),
        }
    }

    /// Wall-clock reading of this instant in `tz`.
    pub fn to_local(&self, tz: Tz) -> NaiveDateTime {
        self.to_utc().with_timezone(&tz).naive_local()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawBar {
    pub timestamp: BarTimestamp,
    pub open: f64,
    pub close: f64,
    pub volume: u64,
}

/// One wall-clock minute of the target day in the grid timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteSlot {
    pub timestamp: NaiveDateTime,
    pub time_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    /// Local wall-clock minute, zone annotation already dropped.
    pub timestamp: NaiveDateTime,
    pub time_label: String,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl NormalizedRow {
    pub fn empty(slot: MinuteSlot) -> Self {
        NormalizedRow {
            timestamp: slot.timestamp,
            time_label: slot.time_label,
            open: None,
            close: None,
            volume: None,
        }
    }

    pub fn fill(&mut self, bar: &RawBar) {
        self.open = Some(bar.open);
        self.close = Some(bar.close);
        self.volume = Some(bar.volume);
    }

    pub fn has_data(&self) -> bool {
        self.open.is_some() || self.close.is_some() || self.volume.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn naive(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn slot(h: u32, m: u32) -> MinuteSlot {
        MinuteSlot {
            timestamp: naive(h, m),
            time_label: format!("{:02}:{:02}", h, m),
        }
    }

    #[test]
    fn to_utc_pass_naive_is_utc() {
        let ts = BarTimestamp::Naive(naive(3, 45));
        assert_eq!(ts.to_utc(), Utc.with_ymd_and_hms(2024, 3, 15, 3, 45, 0).unwrap());
    }

    #[test]
    fn to_utc_pass_aware_keeps_offset() {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let ts = BarTimestamp::Aware(ist.from_local_datetime(&naive(9, 15)).unwrap());
        assert_eq!(ts.to_utc(), Utc.with_ymd_and_hms(2024, 3, 15, 3, 45, 0).unwrap());
    }

    #[test]
    fn to_local_pass_wall_clock_in_zone() {
        let ts = BarTimestamp::Naive(naive(3, 45));
        assert_eq!(ts.to_local(chrono_tz::Asia::Kolkata), naive(9, 15));
        assert_eq!(ts.to_local(chrono_tz::UTC), naive(3, 45));
    }

    #[test]
    fn fill_pass_copies_values() {
        let mut row = NormalizedRow::empty(slot(0, 0));
        assert!(!row.has_data());
        row.fill(&RawBar {
            timestamp: BarTimestamp::Naive(naive(0, 0)),
            open: 10.5,
            close: 11.0,
            volume: 300,
        });
        assert_eq!(row.open, Some(10.5));
        assert_eq!(row.close, Some(11.0));
        assert_eq!(row.volume, Some(300));
        assert!(row.has_data());
    }

    #[test]
    fn serialize_pass_nulls_for_missing_values() {
        let row = NormalizedRow::empty(slot(0, 1));
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["open"].is_null());
        assert_eq!(json["time_label"], "00:01");
        assert_eq!(json["timestamp"], "2024-03-15T00:01:00");
    }
}
