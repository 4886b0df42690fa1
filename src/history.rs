use crate::error::{ProxwatchError, Result};
use std::collections::VecDeque;
use tracing::trace;

/// Reserved distance meaning "no valid reading"
pub const NO_READING_CM: f64 = 999.0;

/// Shortest distance the rangefinder can resolve
pub const MIN_VALID_CM: f64 = 2.0;

/// Longest distance the rangefinder can resolve
pub const MAX_VALID_CM: f64 = 400.0;

/// Whether a distance lies inside the sensor's usable range
pub fn is_valid_distance(distance_cm: f64) -> bool {
    (MIN_VALID_CM..=MAX_VALID_CM).contains(&distance_cm)
}

/// Fixed-capacity FIFO of recent distance samples
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl DistanceHistory {
    /// Create an empty history holding at most `capacity` samples
    ///
    /// # Example
    /// ```
    /// use proxwatch::history::DistanceHistory;
    ///
    /// let mut history = DistanceHistory::new(2)?;
    /// history.push(10.0);
    /// history.push(20.0);
    /// history.push(30.0);
    /// assert_eq!(history.to_vec(), vec![20.0, 30.0]);
    /// # Ok::<(), proxwatch::ProxwatchError>(())
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ProxwatchError::component(
                "history",
                "capacity must be greater than 0",
            ));
        }

        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, distance_cm: f64) {
        if self.samples.len() == self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                trace!("History full, evicted {} cm", evicted);
            }
        }
        self.samples.push_back(distance_cm);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// The `count` most recent samples, oldest first
    pub fn recent(&self, count: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction_keeps_last_samples() {
        let mut history = DistanceHistory::new(8).unwrap();
        for i in 1..=10 {
            history.push(i as f64 * 10.0);
        }

        assert_eq!(history.len(), 8);
        assert_eq!(
            history.to_vec(),
            vec![30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0]
        );
    }

    #[test]
    fn test_recent_window() {
        let mut history = DistanceHistory::new(8).unwrap();
        for d in [10.0, 20.0, 30.0] {
            history.push(d);
        }

        assert_eq!(history.recent(5), vec![10.0, 20.0, 30.0]);
        assert_eq!(history.recent(2), vec![20.0, 30.0]);
        assert!(history.recent(0).is_empty());
    }

    #[test]
    fn test_valid_distance_range() {
        assert!(is_valid_distance(2.0));
        assert!(is_valid_distance(400.0));
        assert!(!is_valid_distance(1.99));
        assert!(!is_valid_distance(NO_READING_CM));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = DistanceHistory::new(0);
        assert!(matches!(
            result,
            Err(ProxwatchError::Component { ref component, .. }) if component == "history"
        ));
    }
}
