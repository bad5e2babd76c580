//! Resource monitor: background perturbation of the VRAM gauge.
//!
//! Runs on a fixed cadence for the whole process lifetime, regardless of run
//! state. Only `SystemMetrics` is touched, so it interleaves safely with
//! in-flight runs in the single orchestrator task.

use crate::model::SystemMetrics;
use rand::Rng;

/// The gauge never drops below this, whatever the configured total.
pub const VRAM_FLOOR_GB: f64 = 8.0;

/// Gauge reading at startup.
pub const VRAM_USAGE_START_GB: f64 = 14.2;

/// Largest single-tick move, in either direction.
const MAX_STEP_GB: f64 = 0.25;

/// Nudge the gauge by a small signed random delta, clamped to
/// `[VRAM_FLOOR_GB, vram_total_gb]`.
pub fn perturb<R: Rng>(metrics: &mut SystemMetrics, rng: &mut R) {
    let delta = (rng.gen::<f64>() - 0.5) * 2.0 * MAX_STEP_GB;
    metrics.vram_usage_gb =
        (metrics.vram_usage_gb + delta).clamp(VRAM_FLOOR_GB, metrics.vram_total_gb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn metrics(total: f64) -> SystemMetrics {
        SystemMetrics {
            vram_usage_gb: VRAM_USAGE_START_GB,
            vram_total_gb: total,
            queue_connected: true,
            editor_connected: true,
            active_workers: 0,
        }
    }

    #[test]
    fn gauge_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut m = metrics(24.0);
        for _ in 0..10_000 {
            perturb(&mut m, &mut rng);
            assert!(m.vram_usage_gb >= VRAM_FLOOR_GB);
            assert!(m.vram_usage_gb <= m.vram_total_gb);
        }
    }

    #[test]
    fn tight_ceiling_pins_the_gauge() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut m = metrics(8.0);
        m.vram_usage_gb = 8.0;
        for _ in 0..100 {
            perturb(&mut m, &mut rng);
            assert_eq!(m.vram_usage_gb, 8.0);
        }
    }

    #[test]
    fn single_tick_moves_are_small() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut m = metrics(24.0);
        for _ in 0..1_000 {
            let before = m.vram_usage_gb;
            perturb(&mut m, &mut rng);
            assert!((m.vram_usage_gb - before).abs() <= MAX_STEP_GB + f64::EPSILON);
        }
    }
}
