//! Water-quality checks shown alongside a recommendation.

use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;

use crate::environment::{
    ContinuousState, Drift, IDEAL_DISSOLVED_OXYGEN, IDEAL_PH, IDEAL_TEMPERATURE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Ok,
    OutOfRange,
}

impl ReadingStatus {
    fn of(value: f64, ideal: &RangeInclusive<f64>) -> Self {
        if ideal.contains(&value) {
            ReadingStatus::Ok
        } else {
            ReadingStatus::OutOfRange
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReadingStatus::Ok => "OK",
            ReadingStatus::OutOfRange => "Out of range",
        }
    }
}

/// Status of a single reading against its ideal range.
#[derive(Debug, Clone, Serialize)]
pub struct ReadingReport {
    pub name: &'static str,
    pub value: f64,
    pub ideal_min: f64,
    pub ideal_max: f64,
    pub status: ReadingStatus,
}

/// Per-reading statuses plus the overall health score.
#[derive(Debug, Clone, Serialize)]
pub struct WaterAssessment {
    pub readings: Vec<ReadingReport>,
    /// Number of readings inside their ideal range, 0..=3.
    pub health_score: u8,
}

pub fn assess(state: &ContinuousState) -> WaterAssessment {
    let checks = [
        ("Temperature (°C)", state.temperature, IDEAL_TEMPERATURE),
        ("pH", state.ph, IDEAL_PH),
        ("Dissolved Oxygen (mg/L)", state.dissolved_oxygen, IDEAL_DISSOLVED_OXYGEN),
    ];

    let readings: Vec<ReadingReport> = checks
        .into_iter()
        .map(|(name, value, ideal)| ReadingReport {
            name,
            value,
            ideal_min: *ideal.start(),
            ideal_max: *ideal.end(),
            status: ReadingStatus::of(value, &ideal),
        })
        .collect();

    let health_score = readings
        .iter()
        .filter(|r| r.status == ReadingStatus::Ok)
        .count() as u8;

    WaterAssessment {
        readings,
        health_score,
    }
}

/// Readings one day later under natural drift only, clamped to legal bounds.
pub fn simulate_day<R: Rng + ?Sized>(state: &ContinuousState, rng: &mut R) -> ContinuousState {
    let mut next = *state;
    Drift::daily().apply(&mut next, rng);
    next.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_health_score_counts_ideal_readings() {
        assert_eq!(assess(&ContinuousState::new(28.0, 7.0, 6.0)).health_score, 3);
        assert_eq!(assess(&ContinuousState::new(31.0, 7.0, 6.0)).health_score, 2);
        assert_eq!(assess(&ContinuousState::new(31.0, 9.0, 2.0)).health_score, 0);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let report = assess(&ContinuousState::new(26.0, 8.0, 10.0));
        assert!(report.readings.iter().all(|r| r.status == ReadingStatus::Ok));

        // Dashboard caps oxygen at 10, unlike the reward.
        let report = assess(&ContinuousState::new(28.0, 7.0, 10.5));
        assert_eq!(report.readings[2].status, ReadingStatus::OutOfRange);
        assert_eq!(report.readings[2].status.label(), "Out of range");
    }

    #[test]
    fn test_simulate_day_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = ContinuousState::new(20.0, 5.5, 0.05);
        for _ in 0..100 {
            state = simulate_day(&state, &mut rng);
            assert!(state.is_within_bounds());
        }
        assert_eq!(state.dissolved_oxygen, 0.0);
    }
}
