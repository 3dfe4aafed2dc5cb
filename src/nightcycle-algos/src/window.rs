use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use nightcycle_codec::{ActivityType, MonitoringBatch};
use serde::Serializer;

use crate::SleepAnalysisError;

mod gap_fill;
pub use gap_fill::fill_gaps;

/// One analysis run covers 24 hours at one slot per minute.
pub const WINDOW_MINUTES: usize = 24 * 60;

/// Puts the window start at local noon of the previous day, so a whole night
/// falls into the window of the day the sleeper wakes up on.
pub const DEFAULT_WINDOW_OFFSET: TimeDelta = TimeDelta::hours(-12);

const SLOT: TimeDelta = TimeDelta::minutes(1);

/// The 24h span being analysed, in UTC, together with the device UTC offset
/// it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(rename = "utc_offset_secs", serialize_with = "serialize_secs")]
    pub utc_offset: TimeDelta,
}

fn serialize_secs<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(delta.num_seconds())
}

impl AnalysisWindow {
    pub fn new(day: NaiveDate, utc_offset: TimeDelta, window_offset: TimeDelta) -> Self {
        let midnight = day.and_time(chrono::NaiveTime::MIN);
        let start = midnight - utc_offset + window_offset;
        Self {
            start,
            end: start + SLOT * WINDOW_MINUTES as i32,
            utc_offset,
        }
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }

    pub fn slot(&self, time: NaiveDateTime) -> Option<usize> {
        self.contains(time)
            .then(|| ((time - self.start).num_seconds() / SLOT.num_seconds()) as usize)
    }

    pub fn minute_time(&self, idx: usize) -> NaiveDateTime {
        self.start + SLOT * idx as i32
    }

    pub fn to_local(&self, time: NaiveDateTime) -> NaiveDateTime {
        time + self.utc_offset
    }
}

/// Parallel per-minute arrays, `None` where no sample was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteSeries {
    pub activity_type: Vec<Option<ActivityType>>,
    pub activity_intensity: Vec<Option<u8>>,
    pub heart_rate: Vec<Option<u16>>,
}

impl Default for MinuteSeries {
    fn default() -> Self {
        Self {
            activity_type: vec![None; WINDOW_MINUTES],
            activity_intensity: vec![None; WINDOW_MINUTES],
            heart_rate: vec![None; WINDOW_MINUTES],
        }
    }
}

impl MinuteSeries {
    pub fn len(&self) -> usize {
        self.heart_rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heart_rate.is_empty()
    }

    /// Dense copy with every gap filled from the next recorded sample.
    pub fn filled(&self) -> Self {
        Self {
            activity_type: fill_gaps(&self.activity_type),
            activity_intensity: fill_gaps(&self.activity_intensity),
            heart_rate: fill_gaps(&self.heart_rate),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinuteWindow {
    pub window: AnalysisWindow,
    pub series: MinuteSeries,
}

impl MinuteWindow {
    /// Collects the samples of `batches` falling into the window of `day`.
    ///
    /// The first batch that contributes a sample fixes the window and the UTC
    /// offset for the whole run. Later batches recorded with another offset
    /// are read against that same window.
    pub fn extract(
        batches: &[MonitoringBatch],
        day: NaiveDate,
        window_offset: TimeDelta,
    ) -> Result<Self, SleepAnalysisError> {
        let mut locked: Option<AnalysisWindow> = None;
        let mut series = MinuteSeries::default();

        for batch in batches {
            let Some(utc_offset) = batch.utc_offset() else {
                trace!("skipping monitoring batch without timezone info");
                continue;
            };

            let window = match locked {
                Some(window) => {
                    if window.utc_offset != utc_offset {
                        warn!(
                            "monitoring batch offset {}s differs from window offset {}s",
                            utc_offset.num_seconds(),
                            window.utc_offset.num_seconds()
                        );
                    }
                    window
                }
                None => AnalysisWindow::new(day, utc_offset, window_offset),
            };

            match batch.last_timestamp() {
                Some(last) if last >= window.start => {}
                _ => continue,
            }

            for sample in &batch.samples {
                let Some(idx) = window.slot(sample.timestamp) else {
                    continue;
                };

                if locked.is_none() {
                    debug!(
                        "analysis window {} - {} (utc offset {}s)",
                        window.start,
                        window.end,
                        utc_offset.num_seconds()
                    );
                    locked = Some(window);
                }

                if let Some(activity) = sample.activity() {
                    series.activity_type[idx] = Some(activity.activity_type);
                    series.activity_intensity[idx] = Some(activity.intensity);
                }
                if let Some(bpm) = sample.heart_rate {
                    series.heart_rate[idx] = Some(bpm);
                }
            }
        }

        let window = locked.ok_or(SleepAnalysisError::NoTimezoneData)?;
        Ok(Self { window, series })
    }
}
