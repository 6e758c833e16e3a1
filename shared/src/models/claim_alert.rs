//! Claim-window tracking for issued requests

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overdue-alert bookkeeping for one issued request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimAlert {
    pub request_id: Uuid,
    pub alert_sent: bool,
    pub alert_time: Option<DateTime<Utc>>,
}

impl ClaimAlert {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            alert_sent: false,
            alert_time: None,
        }
    }

    /// Flag the alert when the window has elapsed and it was not flagged yet.
    ///
    /// Returns true only for the call that flips the flag, so repeated sweeps
    /// notify at most once.
    pub fn flag_if_overdue(
        &mut self,
        issued_at: DateTime<Utc>,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        if self.alert_sent || now - issued_at <= window {
            return false;
        }
        self.alert_sent = true;
        self.alert_time = Some(now);
        true
    }
}

/// Derived classification of an issued request's claim timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimUrgency {
    OnTime,
    Urgent,
    Overdue,
}

impl ClaimUrgency {
    /// `overdue` past the window, `urgent` within `urgent_lead` of it
    pub fn classify(elapsed: Duration, window: Duration, urgent_lead: Duration) -> Self {
        if elapsed > window {
            ClaimUrgency::Overdue
        } else if elapsed >= window - urgent_lead {
            ClaimUrgency::Urgent
        } else {
            ClaimUrgency::OnTime
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimUrgency::OnTime => "on_time",
            ClaimUrgency::Urgent => "urgent",
            ClaimUrgency::Overdue => "overdue",
        }
    }
}

/// Claim timing snapshot exposed to read paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimTiming {
    pub elapsed_minutes: i64,
    /// Negative once overdue
    pub minutes_remaining: i64,
    pub urgency: ClaimUrgency,
}

impl ClaimTiming {
    pub fn compute(
        issued_at: DateTime<Utc>,
        now: DateTime<Utc>,
        window: Duration,
        urgent_lead: Duration,
    ) -> Self {
        let elapsed = now - issued_at;
        Self {
            elapsed_minutes: elapsed.num_minutes(),
            minutes_remaining: (window - elapsed).num_minutes(),
            urgency: ClaimUrgency::classify(elapsed, window, urgent_lead),
        }
    }
}
