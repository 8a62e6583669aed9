use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One sampling interval's worth of traffic, in bytes.
///
/// The sampling interval is one second, so the delta fields double as
/// byte-per-second rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub up_speed: u64,
    pub down_speed: u64,
    pub sent_delta: u64,
    pub recv_delta: u64,
}

/// Accumulated traffic for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub day: NaiveDate,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub max_up_speed: u64,
    pub max_down_speed: u64,
    pub active_seconds: u64,
}

impl DailyUsage {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            bytes_sent: 0,
            bytes_recv: 0,
            max_up_speed: 0,
            max_down_speed: 0,
            active_seconds: 0,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent + self.bytes_recv
    }

    /// Average upload rate in bytes per second, zero for an empty day.
    pub fn avg_up_speed(&self) -> f64 {
        if self.active_seconds == 0 {
            return 0.0;
        }
        self.bytes_sent as f64 / self.active_seconds as f64
    }

    /// Average download rate in bytes per second, zero for an empty day.
    pub fn avg_down_speed(&self) -> f64 {
        if self.active_seconds == 0 {
            return 0.0;
        }
        self.bytes_recv as f64 / self.active_seconds as f64
    }

    pub fn avg_total_speed(&self) -> f64 {
        self.avg_up_speed() + self.avg_down_speed()
    }
}

/// Aggregate over every tracked day of one calendar month.
///
/// `days_tracked` counts rows that exist, not the calendar length of the
/// month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyUsage {
    pub year: i32,
    pub month: u32,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub max_up_speed: u64,
    pub max_down_speed: u64,
    pub active_seconds: u64,
    pub days_tracked: u64,
}

impl MonthlyUsage {
    pub fn empty(year: i32, month: u32) -> Self {
        Self {
            year,
            month,
            bytes_sent: 0,
            bytes_recv: 0,
            max_up_speed: 0,
            max_down_speed: 0,
            active_seconds: 0,
            days_tracked: 0,
        }
    }

    /// Folds one daily row into the aggregate: sums for byte and second
    /// counters, max for the peak speeds.
    pub fn fold(&mut self, day: &DailyUsage) {
        self.bytes_sent += day.bytes_sent;
        self.bytes_recv += day.bytes_recv;
        self.max_up_speed = self.max_up_speed.max(day.max_up_speed);
        self.max_down_speed = self.max_down_speed.max(day.max_down_speed);
        self.active_seconds += day.active_seconds;
        self.days_tracked += 1;
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent + self.bytes_recv
    }

    pub fn avg_up_speed(&self) -> f64 {
        if self.active_seconds == 0 {
            return 0.0;
        }
        self.bytes_sent as f64 / self.active_seconds as f64
    }

    pub fn avg_down_speed(&self) -> f64 {
        if self.active_seconds == 0 {
            return 0.0;
        }
        self.bytes_recv as f64 / self.active_seconds as f64
    }
}
