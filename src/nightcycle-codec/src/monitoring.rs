use std::io::Read;

use chrono::{NaiveDateTime, TimeDelta};

use crate::CodecError;

mod activity;
pub use activity::{ActivityType, ActivityTypeIntensity};

/// Header of a monitoring batch: one instant expressed both in UTC and in the
/// device clock. Their difference is the device's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringInfo {
    pub timestamp: NaiveDateTime,
    pub local_time: NaiveDateTime,
}

impl MonitoringInfo {
    pub fn utc_offset(&self) -> TimeDelta {
        self.local_time - self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSample {
    /// UTC
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub current_activity_type_intensity: Option<u8>,
    #[serde(default)]
    pub heart_rate: Option<u16>,
}

impl MonitoringSample {
    pub fn activity(&self) -> Option<ActivityTypeIntensity> {
        self.current_activity_type_intensity
            .map(ActivityTypeIntensity::unpack)
    }
}

/// One file worth of monitoring samples as handed over by the file reader.
/// Samples are in chronological order; devices only emit a sample when a
/// value changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringBatch {
    #[serde(default)]
    pub info: Option<MonitoringInfo>,
    #[serde(default)]
    pub samples: Vec<MonitoringSample>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<MonitoringBatch>),
    One(MonitoringBatch),
}

impl MonitoringBatch {
    pub fn utc_offset(&self) -> Option<TimeDelta> {
        self.info.as_ref().map(MonitoringInfo::utc_offset)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.timestamp)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CodecError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Reads either a single batch object or an array of batches.
    pub fn load_batches<R: Read>(reader: R) -> Result<Vec<Self>, CodecError> {
        let batches = match serde_json::from_reader(reader)? {
            OneOrMany::Many(batches) => batches,
            OneOrMany::One(batch) => vec![batch],
        };
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn utc_offset_is_local_minus_utc() {
        let info = MonitoringInfo {
            timestamp: time(10, 0),
            local_time: time(12, 0),
        };
        assert_eq!(info.utc_offset(), TimeDelta::hours(2));
    }

    #[test]
    fn batch_without_info_has_no_offset() {
        let batch = MonitoringBatch::default();
        assert!(batch.utc_offset().is_none());
        assert!(batch.last_timestamp().is_none());
    }

    #[test]
    fn sample_unpacks_activity() {
        let sample = MonitoringSample {
            timestamp: time(0, 0),
            current_activity_type_intensity: Some(0x28),
            heart_rate: Some(55),
        };
        let activity = sample.activity().unwrap();
        assert_eq!(activity.activity_type, ActivityType::Resting);
        assert_eq!(activity.intensity, 1);
    }

    #[test]
    fn load_single_batch() {
        let json = r#"{
            "info": {"timestamp": "2025-01-01T10:00:00", "local_time": "2025-01-01T11:00:00"},
            "samples": [
                {"timestamp": "2025-01-01T10:00:00", "current_activity_type_intensity": 8, "heart_rate": 60},
                {"timestamp": "2025-01-01T10:01:00"}
            ]
        }"#;
        let batches = MonitoringBatch::load_batches(json.as_bytes()).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].samples.len(), 2);
        assert_eq!(batches[0].samples[1].heart_rate, None);
        assert_eq!(batches[0].utc_offset(), Some(TimeDelta::hours(1)));
        assert_eq!(batches[0].last_timestamp(), Some(time(10, 1)));
    }

    #[test]
    fn load_batch_array() {
        let json = r#"[{"samples": []}, {"info": null, "samples": []}]"#;
        let batches = MonitoringBatch::load_batches(json.as_bytes()).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn load_invalid_json_errors() {
        let result = MonitoringBatch::load_batches("not json".as_bytes());
        assert!(matches!(result, Err(CodecError::Json(_))));
    }
}
