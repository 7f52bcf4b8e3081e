//! Placeholder weather alerts.
//!
//! There is no alerts endpoint wired up yet. Callers get a canned rainstorm
//! warning roughly 30% of the time and nothing otherwise, without any network,
//! cache or rate-limiter involvement.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::debug;

use crate::model::{Alert, AlertLevel};

/// Chance that [`sample_alerts`] returns the canned alert.
pub const ALERT_PROBABILITY: f64 = 0.3;

pub fn sample_alerts(region_code: &str) -> Vec<Alert> {
    alerts_with_rng(region_code, &mut rand::thread_rng(), Utc::now())
}

pub fn alerts_with_rng<R: Rng + ?Sized>(
    region_code: &str,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    if !rng.gen_bool(ALERT_PROBABILITY) {
        return Vec::new();
    }

    debug!(region_code, "returning canned alert");
    vec![canned_alert(now)]
}

fn canned_alert(now: DateTime<Utc>) -> Alert {
    Alert {
        level: AlertLevel::Yellow,
        kind: "暴雨".to_string(),
        title: "暴雨黄色预警".to_string(),
        content: "预计未来6小时内降雨量将达50毫米以上，请注意防范。".to_string(),
        publish_time: now,
        effective_time: now,
        expire_time: now + Duration::hours(6),
    }
}
