use std::collections::BTreeMap;
use std::fmt::{self, Display};

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use nightcycle_codec::{ActivityType, MonitoringBatch};

use crate::{
    ActivityClass, ActivityClassification, ActivityClassifier, AnalysisWindow, CycleChain,
    DetectionStrategy, HeartRateClassification, HeartRateClassifier, HrClass, MinuteSeries,
    MinuteWindow, SleepAnalysisError, SleepCycle, SleepPhase, SleepPhaseSegment,
    helpers::format_hm::FormatHM,
};

/// Sleep structure of one night, reconstructed from a 24h monitoring window.
pub struct DailySleepAnalyzer {
    window: AnalysisWindow,
    series: MinuteSeries,
    activity: ActivityClassification,
    heart_rate: HeartRateClassification,
    strategy: DetectionStrategy,
    phases: Vec<SleepPhase>,
    cycles: CycleChain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepCycleSummary {
    pub from_time: NaiveDateTime,
    pub to_time: NaiveDateTime,
    pub phases: Vec<SleepPhaseSegment>,
    /// Seconds per phase.
    pub phase_durations: BTreeMap<SleepPhase, i64>,
}

impl SleepCycleSummary {
    fn new(cycle: &SleepCycle, window: &AnalysisWindow) -> Self {
        Self {
            from_time: window.minute_time(cycle.start_idx),
            to_time: window.minute_time(cycle.end_idx + 1),
            phases: cycle.phases.clone(),
            phase_durations: cycle.total_seconds.clone(),
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.to_time - self.from_time
    }

    pub fn seconds_in(&self, phase: SleepPhase) -> i64 {
        self.phase_durations.get(&phase).copied().unwrap_or_default()
    }
}

/// Durations in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SleepTotals {
    pub total_sleep: i64,
    pub rem_sleep: i64,
    pub light_sleep: i64,
    pub deep_sleep: i64,
}

impl SleepTotals {
    pub fn aggregate<'a>(cycles: impl IntoIterator<Item = &'a SleepCycle>) -> Self {
        cycles
            .into_iter()
            .flat_map(|cycle| &cycle.total_seconds)
            .fold(Self::default(), |mut totals, (&phase, &seconds)| {
                match phase {
                    SleepPhase::Wake => return totals,
                    SleepPhase::Rem => totals.rem_sleep += seconds,
                    SleepPhase::Nrem1 | SleepPhase::Nrem2 => totals.light_sleep += seconds,
                    SleepPhase::Nrem3 => totals.deep_sleep += seconds,
                }
                totals.total_sleep += seconds;
                totals
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SleepAnalysis {
    /// `None` when no monitoring data had timezone information.
    pub window: Option<AnalysisWindow>,
    pub strategy: Option<DetectionStrategy>,
    pub cycles: Vec<SleepCycleSummary>,
    #[serde(flatten)]
    pub totals: SleepTotals,
    pub resting_heart_rate: Option<u16>,
}

/// Per-minute state of an analysis run, for debugging the classifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinuteRecord {
    pub time: NaiveDateTime,
    pub activity_type: Option<u8>,
    pub activity_intensity: Option<u8>,
    pub heart_rate: Option<u16>,
    pub weighted_activity: f64,
    pub activity_class: ActivityClass,
    pub hr_class: Option<HrClass>,
    pub sleep_phase: SleepPhase,
}

impl DailySleepAnalyzer {
    pub fn new(
        batches: &[MonitoringBatch],
        day: NaiveDate,
        window_offset: TimeDelta,
    ) -> Result<Self, SleepAnalysisError> {
        let MinuteWindow { window, series } = MinuteWindow::extract(batches, day, window_offset)?;
        let series = series.filled();

        let activity = ActivityClassifier::STANDARD.classify(&series);
        let heart_rate = HeartRateClassifier::classify(&series.heart_rate, &activity.classes);

        let strategy = match heart_rate.verdict() {
            Ok(()) => DetectionStrategy::HrInformed,
            Err(error) => {
                debug!("{error}, falling back to motion only detection");
                DetectionStrategy::MotionOnly
            }
        };

        let classes = match strategy {
            DetectionStrategy::HrInformed => activity.classes.clone(),
            DetectionStrategy::MotionOnly => {
                ActivityClassifier::FALLBACK.classify_weighted(&activity.weighted)
            }
        };

        let detection = strategy.detect(&classes, &heart_rate.classes);
        let phases = detection.phases;
        let mut cycles = detection.cycles;
        cycles.extract_phases(&phases, &window);
        let pruned = cycles.prune_wake_cycles();

        info!(
            "{day}: {} sleep cycles ({:?}, {} wake cycles pruned)",
            cycles.len(),
            strategy,
            pruned
        );

        Ok(Self {
            window,
            series,
            activity,
            heart_rate,
            strategy,
            phases,
            cycles,
        })
    }

    /// Analyses one day. Missing timezone data yields an empty analysis.
    pub fn analyze(batches: &[MonitoringBatch], day: NaiveDate, window_offset: TimeDelta) -> SleepAnalysis {
        match Self::new(batches, day, window_offset) {
            Ok(analyzer) => analyzer.analysis(),
            Err(error) => {
                warn!("{day}: {error}");
                SleepAnalysis::default()
            }
        }
    }

    pub fn window(&self) -> &AnalysisWindow {
        &self.window
    }

    pub fn strategy(&self) -> DetectionStrategy {
        self.strategy
    }

    pub fn cycles(&self) -> &CycleChain {
        &self.cycles
    }

    pub fn phases(&self) -> &[SleepPhase] {
        &self.phases
    }

    pub fn totals(&self) -> SleepTotals {
        SleepTotals::aggregate(self.cycles.cycles())
    }

    /// Lowest non-zero heart rate of the window.
    ///
    /// Minutes are not filtered by activity type: the minimum is taken over
    /// resting and active minutes alike.
    pub fn resting_heart_rate(&self) -> Option<u16> {
        self.series
            .heart_rate
            .iter()
            .flatten()
            .copied()
            .filter(|&bpm| bpm > 0)
            .min()
    }

    pub fn analysis(&self) -> SleepAnalysis {
        let cycles = self
            .cycles
            .cycles()
            .map(|cycle| SleepCycleSummary::new(cycle, &self.window))
            .collect::<Vec<_>>();

        if cycles.is_empty() {
            info!("no sleep detected between {} and {}", self.window.start, self.window.end);
        }

        SleepAnalysis {
            window: Some(self.window),
            strategy: Some(self.strategy),
            cycles,
            totals: self.totals(),
            resting_heart_rate: self.resting_heart_rate(),
        }
    }

    pub fn minutes(&self) -> Vec<MinuteRecord> {
        (0..self.series.len())
            .map(|idx| MinuteRecord {
                time: self.window.to_local(self.window.minute_time(idx)),
                activity_type: self.series.activity_type[idx].map(ActivityType::code),
                activity_intensity: self.series.activity_intensity[idx],
                heart_rate: self.series.heart_rate[idx],
                weighted_activity: self.activity.weighted[idx],
                activity_class: self.activity.classes[idx],
                hr_class: self.heart_rate.classes[idx],
                sleep_phase: self.phases[idx],
            })
            .collect()
    }
}

impl SleepAnalysis {
    /// Turns an analysis without any sleep into an error.
    pub fn require_sleep(&self) -> Result<&Self, SleepAnalysisError> {
        if self.window.is_none() {
            Err(SleepAnalysisError::NoTimezoneData)
        } else if self.cycles.is_empty() {
            Err(SleepAnalysisError::EmptyWindow)
        } else {
            Ok(self)
        }
    }

    pub fn utc_offset(&self) -> Option<TimeDelta> {
        self.window.map(|w| w.utc_offset)
    }
}

impl Display for SleepAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(window) = self.window else {
            return write!(f, "No monitoring data with timezone information");
        };

        writeln!(
            f,
            "Window: {} - {} (UTC offset {})",
            window.to_local(window.start),
            window.to_local(window.end),
            window.utc_offset.format_hm()
        )?;
        writeln!(f, "Cycle  From   To     REM    NREM1  NREM2  NREM3")?;
        for (i, cycle) in self.cycles.iter().enumerate() {
            let secs = |phase| TimeDelta::seconds(cycle.seconds_in(phase)).format_hm();
            writeln!(
                f,
                "{:>5}  {}  {}  {}  {}  {}  {}",
                i + 1,
                window.to_local(cycle.from_time).time().format_hm(),
                window.to_local(cycle.to_time).time().format_hm(),
                secs(SleepPhase::Rem),
                secs(SleepPhase::Nrem1),
                secs(SleepPhase::Nrem2),
                secs(SleepPhase::Nrem3),
            )?;
        }

        let hm = |secs: i64| TimeDelta::seconds(secs).format_hm();
        writeln!(
            f,
            "Total sleep: {}  REM: {}  Light: {}  Deep: {}",
            hm(self.totals.total_sleep),
            hm(self.totals.rem_sleep),
            hm(self.totals.light_sleep),
            hm(self.totals.deep_sleep),
        )?;
        match self.resting_heart_rate {
            Some(bpm) => write!(f, "Resting heart rate: {bpm} bpm"),
            None => write!(f, "Resting heart rate: -"),
        }
    }
}
