use chrono::{NaiveTime, TimeDelta, Timelike as _};

pub trait FormatHM {
    fn format_hm(&self) -> String;
}

impl FormatHM for TimeDelta {
    fn format_hm(&self) -> String {
        let minutes = self.num_minutes();
        let sign = if minutes < 0 { "-" } else { "" };
        let minutes = minutes.abs();
        format!("{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
    }
}

impl FormatHM for NaiveTime {
    fn format_hm(&self) -> String {
        format!("{:02}:{:02}", self.hour(), self.minute())
    }
}
