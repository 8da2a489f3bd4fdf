use std::net::IpAddr;

use chrono::NaiveDate;

use crate::Logging;

/// `chrono` format of [`SessionResult::timestamp`]. Characters 11..13 hold
/// the two-digit hour.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Summary of one finished probe session, one row per run in the daily file.
#[derive(Debug, Clone, PartialEq, Logging)]
pub struct SessionResult {
    pub destination_ip: IpAddr,
    pub timestamp: String,
    pub loss_rate_pct: f64,
    pub min_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub bandwidth: f64,
    pub jitter: f64,
}

impl SessionResult {
    /// Two-digit hour of day of the timestamp, `None` if the timestamp is too
    /// short.
    pub fn hour(&self) -> Option<&str> {
        self.timestamp.get(11..13)
    }
}

/// Aggregate quality score of one hour of one day.
#[derive(Debug, Clone, PartialEq, Logging)]
pub struct QualityScoreRecord {
    pub date: NaiveDate,
    pub hour_label: String,
    pub score: f64,
}
