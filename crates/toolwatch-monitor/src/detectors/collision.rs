use crate::latch::Latch;
use serde::{Deserialize, Serialize};
use toolwatch_core::Position;

/// A collision latched on this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionTrigger {
    /// Largest per-axis acceleration
    pub acceleration: f64,
    /// Collision counter including this one
    pub count: u32,
}

/// Flags sudden changes of motion between consecutive position samples.
///
/// Velocity is the per-tick position delta on X, Y and Z; acceleration is
/// the per-axis absolute change of that velocity.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    last_position: Option<[f64; 3]>,
    last_velocity: [f64; 3],
    latch: Latch,
    count: u32,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `position` as the motion baseline without evaluating it
    pub fn prime(&mut self, position: &Position) {
        self.last_position = Some(position.linear());
        self.last_velocity = [0.0; 3];
    }

    /// Forget the baseline; the next sample only primes
    pub fn clear_baseline(&mut self) {
        self.last_position = None;
        self.last_velocity = [0.0; 3];
    }

    pub fn is_primed(&self) -> bool {
        self.last_position.is_some()
    }

    pub fn evaluate(&mut self, position: &Position, threshold: f64) -> Option<CollisionTrigger> {
        let Some(last) = self.last_position else {
            self.prime(position);
            return None;
        };

        let current = position.linear();
        let mut velocity = [0.0; 3];
        let mut max_accel: f64 = 0.0;
        for i in 0..3 {
            velocity[i] = current[i] - last[i];
            max_accel = max_accel.max((velocity[i] - self.last_velocity[i]).abs());
        }
        self.last_velocity = velocity;
        self.last_position = Some(current);

        if max_accel > threshold && self.latch.trigger() {
            self.count += 1;
            tracing::warn!("Collision detected! Acceleration: {:.1}", max_accel);
            return Some(CollisionTrigger {
                acceleration: max_accel,
                count: self.count,
            });
        }
        None
    }

    pub fn is_triggered(&self) -> bool {
        self.latch.is_triggered()
    }

    pub fn reset(&mut self) {
        self.latch.reset();
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_velocity(&self) -> [f64; 3] {
        self.last_velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_only_primes() {
        let mut detector = CollisionDetector::new();
        assert!(detector
            .evaluate(&Position::new(9_000.0, 0.0, 0.0), 100.0)
            .is_none());
        assert!(detector.is_primed());
    }

    #[test]
    fn test_constant_velocity_is_quiet() {
        let mut detector = CollisionDetector::new();
        detector.prime(&Position::new(0.0, 0.0, 0.0));
        // first move establishes velocity 50 (accel 50 < 100)
        assert!(detector.evaluate(&Position::new(50.0, 0.0, 0.0), 100.0).is_none());
        for step in 2..10 {
            let pos = Position::new(50.0 * step as f64, 0.0, 0.0);
            assert!(detector.evaluate(&pos, 100.0).is_none());
        }
    }

    #[test]
    fn test_spike_latches() {
        let mut detector = CollisionDetector::new();
        detector.prime(&Position::default());

        let trigger = detector
            .evaluate(&Position::new(0.0, 0.0, -500.0), 100.0)
            .unwrap();
        assert_eq!(trigger.acceleration, 500.0);
        assert_eq!(trigger.count, 1);

        // Reversal is an even larger spike but the latch holds
        assert!(detector.evaluate(&Position::default(), 100.0).is_none());
        assert_eq!(detector.count(), 1);

        detector.reset();
        let trigger = detector
            .evaluate(&Position::new(0.0, 0.0, -500.0), 100.0)
            .unwrap();
        assert_eq!(trigger.count, 2);
    }
}
