//! Usage counters and quota status. Observational only.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Window after a quota error during which the quota is considered exhausted.
pub const QUOTA_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Success,
    QuotaExceeded,
    Failure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub total: u64,
    pub successful: u64,
    pub quota_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_requests: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuotaStatus {
    Normal,
    Exhausted { hours_since: f64 },
    PossiblyReset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub quota_errors: u64,
    /// Percentage, two decimals.
    pub success_rate: f64,
    pub last_quota_error: Option<DateTime<Utc>>,
    pub active_users: usize,
    pub today: DailyUsage,
    pub users: BTreeMap<String, UserActivity>,
    pub quota_status: QuotaStatus,
}

#[derive(Debug, Default)]
pub struct UsageMonitor {
    total: AtomicU64,
    successful: AtomicU64,
    quota_errors: AtomicU64,
    last_quota_error: Mutex<Option<DateTime<Utc>>>,
    daily: DashMap<NaiveDate, DailyUsage>,
    users: DashMap<String, UserActivity>,
}

impl UsageMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self, user_id: &str, outcome: CallOutcome) {
        self.record_call_at(user_id, outcome, Utc::now());
    }

    pub fn record_call_at(&self, user_id: &str, outcome: CallOutcome, now: DateTime<Utc>) {
        self.total.fetch_add(1, Ordering::Relaxed);
        match outcome {
            CallOutcome::Success => {
                self.successful.fetch_add(1, Ordering::Relaxed);
            }
            CallOutcome::QuotaExceeded | CallOutcome::Failure => {}
        }

        {
            let mut day = self.daily.entry(now.date_naive()).or_default();
            day.total += 1;
            if outcome == CallOutcome::Success {
                day.successful += 1;
            }
        }

        self.users
            .entry(user_id.to_string())
            .and_modify(|activity| {
                activity.last_seen = now;
                activity.total_requests += 1;
            })
            .or_insert(UserActivity {
                first_seen: now,
                last_seen: now,
                total_requests: 1,
            });
    }

    /// Count one model call that ended in quota exhaustion.
    ///
    /// The gateway reports these, including failures the turn itself swallows (extraction),
    /// so a `QuotaExceeded` turn outcome is not counted again here.
    pub fn record_quota_error(&self) {
        self.record_quota_error_at(Utc::now());
    }

    pub fn record_quota_error_at(&self, now: DateTime<Utc>) {
        self.quota_errors.fetch_add(1, Ordering::Relaxed);
        self.daily.entry(now.date_naive()).or_default().quota_errors += 1;

        let mut last = self
            .last_quota_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.map_or(true, |prev| prev < now) {
            *last = Some(now);
        }
    }

    fn last_quota_error(&self) -> Option<DateTime<Utc>> {
        *self
            .last_quota_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quota_status(&self, now: DateTime<Utc>) -> QuotaStatus {
        match self.last_quota_error() {
            None => QuotaStatus::Normal,
            Some(at) => {
                let elapsed = now - at;
                if elapsed < chrono::Duration::hours(QUOTA_WINDOW_HOURS) {
                    let hours_since = elapsed.num_seconds() as f64 / 3600.0;
                    QuotaStatus::Exhausted {
                        hours_since: (hours_since * 10.0).round() / 10.0,
                    }
                } else {
                    QuotaStatus::PossiblyReset
                }
            }
        }
    }

    pub fn report(&self) -> UsageReport {
        self.report_at(Utc::now())
    }

    pub fn report_at(&self, now: DateTime<Utc>) -> UsageReport {
        let total_calls = self.total.load(Ordering::Relaxed);
        let successful_calls = self.successful.load(Ordering::Relaxed);
        let success_rate = if total_calls == 0 {
            0.0
        } else {
            (successful_calls as f64 / total_calls as f64 * 100.0 * 100.0).round() / 100.0
        };

        let users: BTreeMap<String, UserActivity> = self
            .users
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        UsageReport {
            total_calls,
            successful_calls,
            quota_errors: self.quota_errors.load(Ordering::Relaxed),
            success_rate,
            last_quota_error: self.last_quota_error(),
            active_users: users.len(),
            today: self
                .daily
                .get(&now.date_naive())
                .map(|d| *d)
                .unwrap_or_default(),
            users,
            quota_status: self.quota_status(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_rate() {
        let monitor = UsageMonitor::new();
        monitor.record_call("u1", CallOutcome::Success);
        monitor.record_call("u1", CallOutcome::Success);
        monitor.record_call("u2", CallOutcome::Failure);

        let report = monitor.report();
        assert_eq!(report.total_calls, 3);
        assert_eq!(report.successful_calls, 2);
        assert_eq!(report.success_rate, 66.67);
        assert_eq!(report.active_users, 2);
        assert_eq!(report.users["u1"].total_requests, 2);
        assert_eq!(report.today.total, 3);
        assert_eq!(report.quota_status, QuotaStatus::Normal);
    }

    #[test]
    fn test_quota_status_window() {
        let monitor = UsageMonitor::new();
        let at = Utc::now();
        monitor.record_quota_error_at(at);
        monitor.record_call_at("u1", CallOutcome::QuotaExceeded, at);

        assert_eq!(
            monitor.quota_status(at + chrono::Duration::hours(2)),
            QuotaStatus::Exhausted { hours_since: 2.0 }
        );
        assert_eq!(
            monitor.quota_status(at + chrono::Duration::hours(25)),
            QuotaStatus::PossiblyReset
        );

        let report = monitor.report_at(at);
        assert_eq!(report.quota_errors, 1);
        assert_eq!(report.today.quota_errors, 1);
        assert_eq!(report.last_quota_error, Some(at));
    }

    #[test]
    fn test_record_quota_error_counts() {
        let monitor = UsageMonitor::new();
        monitor.record_quota_error();
        monitor.record_quota_error();

        let report = monitor.report();
        assert_eq!(report.total_calls, 0);
        assert_eq!(report.quota_errors, 2);
        assert_eq!(report.today.quota_errors, 2);
        assert!(report.last_quota_error.is_some());
        assert!(matches!(report.quota_status, QuotaStatus::Exhausted { .. }));
    }

    #[test]
    fn test_quota_turn_outcome_is_not_double_counted() {
        let monitor = UsageMonitor::new();
        let at = Utc::now();
        monitor.record_quota_error_at(at);
        monitor.record_call_at("u1", CallOutcome::QuotaExceeded, at);

        let report = monitor.report_at(at);
        assert_eq!(report.total_calls, 1);
        assert_eq!(report.successful_calls, 0);
        assert_eq!(report.quota_errors, 1);
        assert_eq!(report.today.total, 1);
        assert_eq!(report.today.quota_errors, 1);
    }

    #[test]
    fn test_user_activity_timestamps() {
        let monitor = UsageMonitor::new();
        let first = Utc::now();
        let later = first + chrono::Duration::minutes(5);
        monitor.record_call_at("u1", CallOutcome::Success, first);
        monitor.record_call_at("u1", CallOutcome::Failure, later);

        let report = monitor.report_at(later);
        assert_eq!(report.users["u1"].first_seen, first);
        assert_eq!(report.users["u1"].last_seen, later);
    }

    #[test]
    fn test_report_serializes() {
        let monitor = UsageMonitor::new();
        monitor.record_call("u1", CallOutcome::Success);
        let json = serde_json::to_value(monitor.report()).unwrap();
        assert_eq!(json["quota_status"]["status"], "normal");
        assert_eq!(json["total_calls"], 1);
    }
}
