use nightcycle_codec::ActivityType;

use crate::MinuteSeries;

/// Minutes on each side of a slot that contribute to its weighted activity.
/// The weight falls off linearly and reaches zero at this distance.
pub const ACTIVITY_WINDOW_RADIUS: usize = 7;

/// Weighted activity above this is considered awake. Calibrated against
/// wrist-worn accelerometer intensities (0-7) where any non-resting activity
/// type counts as the maximum level of 8.
pub const WAKE_THRESHOLD: f64 = 2.2;

/// Weighted activity above this (and not awake) is restless, light sleep.
pub const LOW_ACTIVITY_THRESHOLD: f64 = 0.5;

/// Lower bound used by the motion-only fallback, where any residual movement
/// is treated as light sleep.
pub const FALLBACK_LOW_ACTIVITY_THRESHOLD: f64 = 0.01;

/// Activity level of a non-resting activity type; one above the highest intensity.
const NON_RESTING_LEVEL: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityClass {
    Wake,
    LowActivity,
    NoActivity,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityClassifier {
    pub wake_threshold: f64,
    pub low_activity_threshold: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityClassification {
    pub weighted: Vec<f64>,
    pub classes: Vec<ActivityClass>,
}

impl Default for ActivityClassifier {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl ActivityClassifier {
    pub const STANDARD: Self = Self {
        wake_threshold: WAKE_THRESHOLD,
        low_activity_threshold: LOW_ACTIVITY_THRESHOLD,
    };

    pub const FALLBACK: Self = Self {
        wake_threshold: WAKE_THRESHOLD,
        low_activity_threshold: FALLBACK_LOW_ACTIVITY_THRESHOLD,
    };

    pub fn classify(&self, series: &MinuteSeries) -> ActivityClassification {
        let weighted = Self::weighted_activity(series);
        let classes = self.classify_weighted(&weighted);
        ActivityClassification { weighted, classes }
    }

    pub fn classify_weighted(&self, weighted: &[f64]) -> Vec<ActivityClass> {
        weighted.iter().map(|&level| self.class_of(level)).collect()
    }

    pub fn class_of(&self, level: f64) -> ActivityClass {
        if level > self.wake_threshold {
            ActivityClass::Wake
        } else if level > self.low_activity_threshold {
            ActivityClass::LowActivity
        } else {
            ActivityClass::NoActivity
        }
    }

    /// Triangularly weighted mean of the activity level around every minute.
    pub fn weighted_activity(series: &MinuteSeries) -> Vec<f64> {
        let levels = series
            .activity_type
            .iter()
            .zip(&series.activity_intensity)
            .map(|(activity_type, intensity)| Self::activity_level(*activity_type, *intensity))
            .collect::<Vec<_>>();

        (0..levels.len())
            .map(|i| {
                let from = i.saturating_sub(ACTIVITY_WINDOW_RADIUS);
                let to = (i + ACTIVITY_WINDOW_RADIUS).min(levels.len() - 1);

                let (sum, weights) = (from..=to).fold((0.0, 0.0), |(sum, weights), j| {
                    let weight = (ACTIVITY_WINDOW_RADIUS - i.abs_diff(j)) as f64;
                    (sum + weight * levels[j], weights + weight)
                });

                sum / weights
            })
            .collect()
    }

    fn activity_level(activity_type: Option<ActivityType>, intensity: Option<u8>) -> f64 {
        match activity_type {
            Some(ActivityType::Resting) => f64::from(intensity.unwrap_or_default()),
            _ => NON_RESTING_LEVEL,
        }
    }
}
