#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

mod error;
pub use error::SleepAnalysisError;

pub(crate) mod window;
pub use window::{
    AnalysisWindow, DEFAULT_WINDOW_OFFSET, MinuteSeries, MinuteWindow, WINDOW_MINUTES, fill_gaps,
};

pub(crate) mod activity;
pub use activity::{
    ACTIVITY_WINDOW_RADIUS, ActivityClass, ActivityClassification, ActivityClassifier,
    FALLBACK_LOW_ACTIVITY_THRESHOLD, LOW_ACTIVITY_THRESHOLD, WAKE_THRESHOLD,
};

pub(crate) mod heart_rate;
pub use heart_rate::{
    BASE_DWELL_MINUTES, DWELL_STEP_MINUTES, HeartRateClassification, HeartRateClassifier, HrClass,
    MIN_DWELL_MINUTES, MIN_TRANSITION_BPM, MIN_USABLE_TRANSITIONS,
};

pub(crate) mod phases;
pub use phases::{DetectionStrategy, PhaseDetection, SleepPhase};

pub(crate) mod cycle;
pub use cycle::{CycleChain, CycleId, MIN_DEEP_SLEEP_MINUTES, SleepCycle, SleepPhaseSegment};

pub(crate) mod analyzer;
pub use analyzer::{DailySleepAnalyzer, MinuteRecord, SleepAnalysis, SleepCycleSummary, SleepTotals};

pub mod helpers;
