//! Scan statistics for the owner dashboard
//!
//! Everything here is a pure function of the record set and the current time.

use chrono::{DateTime, Utc};

use crate::model::{DashboardStats, QrRecord};

/// Number of daily buckets in the scan histogram
pub const HISTOGRAM_DAYS: usize = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days elapsed between `at` and `now`, rounded down.
///
/// Negative when `at` lies in the future (clock skew).
fn age_in_days(at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - at).num_milliseconds().div_euclid(MILLIS_PER_DAY)
}

/// Buckets scan events by day. Index 0 is six days ago, index 6 is today.
pub fn scan_histogram<'a>(
    records: impl IntoIterator<Item = &'a QrRecord>,
    now: DateTime<Utc>,
) -> [u64; HISTOGRAM_DAYS] {
    let mut buckets = [0u64; HISTOGRAM_DAYS];
    let last = HISTOGRAM_DAYS as i64 - 1;

    for at in records.into_iter().flat_map(|r| r.scan_history.iter()) {
        let age = age_in_days(*at, now);
        if (0..=last).contains(&age) {
            buckets[(last - age) as usize] += 1;
        }
    }

    buckets
}

/// Summarizes one owner's records for the dashboard.
pub fn summarize(records: Vec<QrRecord>, now: DateTime<Utc>) -> DashboardStats {
    DashboardStats {
        total_qrs: records.len(),
        total_scans: records.iter().map(|r| r.scans).sum(),
        graph_data: scan_histogram(&records, now),
        qr_list: records,
    }
}
