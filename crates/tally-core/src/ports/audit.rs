//! Abuse audit port.

use crate::domain::WindowHit;

/// Hook for recording abusive usage, attached by the policy layer.
pub trait AbuseAudit: Send + Sync {
    fn record(&self, _key: &str, _hit: &WindowHit) {}
}

/// Audit hook that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAbuseAudit;

impl AbuseAudit for NoopAbuseAudit {}
