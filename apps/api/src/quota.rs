//! Quota Gate: decides whether a user may start another interview.
//!
//! Pure over the user row and a clock reading: no I/O and no mutation.
//! Consuming a starter interview is the lifecycle's job, done atomically
//! with the interview insert.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::user::{SubscriptionTier, UserRow};

/// Interviews included in the one-off starter purchase.
pub const STARTER_INTERVIEW_LIMIT: i32 = 1;

/// Machine-readable reason a new interview is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotaReason {
    SubscriptionRequired,
    StarterLimitReached,
    StarterExpired,
}

impl QuotaReason {
    pub fn code(&self) -> &'static str {
        match self {
            QuotaReason::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
            QuotaReason::StarterLimitReached => "STARTER_LIMIT_REACHED",
            QuotaReason::StarterExpired => "STARTER_EXPIRED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            QuotaReason::SubscriptionRequired => {
                "A subscription is required to start an interview"
            }
            QuotaReason::StarterLimitReached => {
                "Your starter interview has been used. Upgrade to premium for unlimited interviews"
            }
            QuotaReason::StarterExpired => {
                "Your starter access has expired. Upgrade to continue practising"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaDecision {
    /// Tier after expiry is applied; an expired starter is effectively free.
    pub tier: SubscriptionTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<QuotaReason>,
}

impl QuotaDecision {
    pub fn allows_new_interview(&self) -> bool {
        self.reason.is_none()
    }

    /// Limit to enforce atomically when the interview is inserted, if any.
    pub fn starter_limit(&self) -> Option<i32> {
        (self.tier == SubscriptionTier::Starter).then_some(STARTER_INTERVIEW_LIMIT)
    }
}

pub fn effective_tier(user: &UserRow, now: DateTime<Utc>) -> SubscriptionTier {
    match user.tier() {
        SubscriptionTier::Starter if starter_expired(user, now) => SubscriptionTier::Free,
        tier => tier,
    }
}

pub fn evaluate(user: &UserRow, now: DateTime<Utc>) -> QuotaDecision {
    let stored = user.tier();
    let tier = effective_tier(user, now);

    let reason = match tier {
        SubscriptionTier::Premium => None,
        SubscriptionTier::Starter if user.starter_interviews_used >= STARTER_INTERVIEW_LIMIT => {
            Some(QuotaReason::StarterLimitReached)
        }
        SubscriptionTier::Starter => None,
        SubscriptionTier::Free if stored == SubscriptionTier::Starter => {
            Some(QuotaReason::StarterExpired)
        }
        SubscriptionTier::Free => Some(QuotaReason::SubscriptionRequired),
    };

    QuotaDecision { tier, reason }
}

fn starter_expired(user: &UserRow, now: DateTime<Utc>) -> bool {
    user.starter_expires_at.is_some_and(|expires| expires < now)
}
