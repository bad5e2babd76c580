//! Pure derivation of badge statuses from current metrics. No state here;
//! presentation layers call these on every render.

use serde::{Deserialize, Serialize};

/// Display status for a header badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Busy,
    Offline,
}

impl ServiceStatus {
    pub fn label(self) -> &'static str {
        match self {
            ServiceStatus::Online => "ONLINE",
            ServiceStatus::Busy => "BUSY",
            ServiceStatus::Offline => "OFFLINE",
        }
    }
}

/// Busy cutoff for the VRAM badge, in absolute GB.
const BUSY_VRAM_GB: f64 = 20.0;

/// The GPU badge turns busy once the gauge exceeds the cutoff. The cutoff
/// never exceeds the configured total, so a small ceiling still yields a
/// meaningful badge.
pub fn vram_status(usage_gb: f64, total_gb: f64) -> ServiceStatus {
    if usage_gb > BUSY_VRAM_GB.min(total_gb) {
        ServiceStatus::Busy
    } else {
        ServiceStatus::Online
    }
}

/// Connectivity flags map directly to online/offline.
pub fn link_status(connected: bool) -> ServiceStatus {
    if connected {
        ServiceStatus::Online
    } else {
        ServiceStatus::Offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vram_badge_thresholds() {
        assert_eq!(vram_status(21.0, 24.0), ServiceStatus::Busy);
        assert_eq!(vram_status(10.0, 24.0), ServiceStatus::Online);
        assert_eq!(vram_status(20.0, 24.0), ServiceStatus::Online);
    }

    #[test]
    fn cutoff_respects_a_small_ceiling() {
        assert_eq!(vram_status(11.0, 10.0), ServiceStatus::Busy);
    }

    #[test]
    fn link_badges_are_direct_mappings() {
        assert_eq!(link_status(true), ServiceStatus::Online);
        assert_eq!(link_status(false), ServiceStatus::Offline);
    }
}
