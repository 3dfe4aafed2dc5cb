use crate::{ActivityClass, SleepAnalysisError};

/// Minimum minutes a regime has to last before the first transition of the
/// night. High HR (light sleep/REM) phases get longer and deep sleep (low HR)
/// phases get shorter as the night progresses, so the dwell time moves by
/// [`DWELL_STEP_MINUTES`] per transition already seen.
pub const BASE_DWELL_MINUTES: usize = 25;
pub const DWELL_STEP_MINUTES: usize = 2;
/// Floor for the shrinking high to low dwell time.
pub const MIN_DWELL_MINUTES: usize = 5;

/// Heart rate has to move this far from the regime extreme to count as a
/// transition. Filters out single-beat jitter of optical wrist sensors.
pub const MIN_TRANSITION_BPM: u16 = 5;

/// A night needs at least this many regime transitions (two full
/// deep-sleep/REM alternations) for the heart rate to be trusted.
pub const MIN_USABLE_TRANSITIONS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HrClass {
    HighHr,
    LowHr,
}

impl HrClass {
    fn opposite(self) -> Self {
        match self {
            Self::HighHr => Self::LowHr,
            Self::LowHr => Self::HighHr,
        }
    }

    /// Whether `bpm` lies further in this regime's direction than `reference`.
    fn beyond(self, bpm: u16, reference: u16) -> bool {
        match self {
            Self::HighHr => bpm > reference,
            Self::LowHr => bpm < reference,
        }
    }

    fn dwell_minutes(self, transitions: usize) -> usize {
        let step = DWELL_STEP_MINUTES * transitions;
        match self {
            Self::HighHr => BASE_DWELL_MINUTES
                .saturating_sub(step)
                .max(MIN_DWELL_MINUTES),
            Self::LowHr => BASE_DWELL_MINUTES + step,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeartRateClassification {
    pub classes: Vec<Option<HrClass>>,
    pub transitions: usize,
}

impl HeartRateClassification {
    pub fn is_usable(&self) -> bool {
        self.transitions >= MIN_USABLE_TRANSITIONS
    }

    pub fn verdict(&self) -> Result<(), SleepAnalysisError> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(SleepAnalysisError::InsufficientTransitions {
                found: self.transitions,
            })
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Regime {
    class: HrClass,
    start: usize,
    extreme_bpm: u16,
    extreme_idx: usize,
    /// The regime this one replaced and the bpm swing that confirmed the switch.
    previous: Option<(PreviousRegime, u16)>,
}

#[derive(Clone, Copy, Debug)]
struct PreviousRegime {
    start: usize,
    extreme_bpm: u16,
    extreme_idx: usize,
}

pub struct HeartRateClassifier<'a> {
    heart_rate: &'a [Option<u16>],
    activity: &'a [ActivityClass],
    classes: Vec<Option<HrClass>>,
    transitions: usize,
}

impl<'a> HeartRateClassifier<'a> {
    pub fn classify(
        heart_rate: &'a [Option<u16>],
        activity: &'a [ActivityClass],
    ) -> HeartRateClassification {
        let mut classifier = Self {
            heart_rate,
            activity,
            classes: vec![None; heart_rate.len()],
            transitions: 0,
        };
        classifier.run();

        HeartRateClassification {
            classes: classifier.classes,
            transitions: classifier.transitions,
        }
    }

    fn run(&mut self) {
        let mut regime: Option<Regime> = None;

        for idx in 0..self.heart_rate.len() {
            let bpm = match (self.heart_rate[idx], self.activity.get(idx)) {
                (_, Some(ActivityClass::Wake)) | (None | Some(0), _) => {
                    // no regime spans a wake period or a gap in heart rate
                    regime = None;
                    continue;
                }
                (Some(bpm), _) => bpm,
            };

            let current = match regime {
                None => Regime {
                    class: HrClass::HighHr,
                    start: idx,
                    extreme_bpm: bpm,
                    extreme_idx: idx,
                    previous: None,
                },
                Some(current) => self.step(current, idx, bpm),
            };

            self.classes[idx] = Some(current.class);
            regime = Some(current);
        }
    }

    fn step(&mut self, mut regime: Regime, idx: usize, bpm: u16) -> Regime {
        let in_dwell = idx - regime.start < regime.class.dwell_minutes(self.transitions);

        if let Some((previous, swing)) = regime.previous {
            let rebound = bpm.abs_diff(regime.extreme_bpm);
            let towards_previous = regime.class.opposite().beyond(bpm, regime.extreme_bpm);
            if in_dwell && towards_previous && rebound > swing {
                return self.revert(regime, previous, idx, bpm);
            }
        }

        if !regime.class.beyond(bpm, regime.extreme_bpm) && bpm != regime.extreme_bpm {
            let swing = bpm.abs_diff(regime.extreme_bpm);
            if !in_dwell && swing >= MIN_TRANSITION_BPM {
                return self.transition(regime, idx, bpm, swing);
            }
        } else {
            regime.extreme_bpm = bpm;
            regime.extreme_idx = idx;
        }

        regime
    }

    /// Switches to the opposite regime, which started right after the extreme
    /// of the current one.
    fn transition(&mut self, regime: Regime, idx: usize, bpm: u16, swing: u16) -> Regime {
        let class = regime.class.opposite();
        let start = regime.extreme_idx + 1;

        let mut extreme_bpm = bpm;
        let mut extreme_idx = idx;
        for i in start..=idx {
            self.classes[i] = Some(class);
            if let Some(value) = self.heart_rate[i] {
                if class.beyond(value, extreme_bpm) {
                    extreme_bpm = value;
                    extreme_idx = i;
                }
            }
        }

        self.transitions += 1;
        trace!("hr transition #{} to {:?} at minute {}", self.transitions, class, start);

        Regime {
            class,
            start,
            extreme_bpm,
            extreme_idx,
            previous: Some((
                PreviousRegime {
                    start: regime.start,
                    extreme_bpm: regime.extreme_bpm,
                    extreme_idx: regime.extreme_idx,
                },
                swing,
            )),
        }
    }

    /// The last transition turned out to be a dip inside the previous regime:
    /// relabel the short segment instead of counting two transitions.
    fn revert(&mut self, regime: Regime, previous: PreviousRegime, idx: usize, bpm: u16) -> Regime {
        let class = regime.class.opposite();
        for i in regime.start..=idx {
            self.classes[i] = Some(class);
        }
        self.transitions -= 1;
        trace!("hr transition at minute {} reverted", regime.start);

        let (extreme_bpm, extreme_idx) = if class.beyond(bpm, previous.extreme_bpm) {
            (bpm, idx)
        } else {
            (previous.extreme_bpm, previous.extreme_idx)
        };

        Regime {
            class,
            start: previous.start,
            extreme_bpm,
            extreme_idx,
            previous: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a sleeping heart rate series from `(minutes, bpm)` blocks,
    /// preceded by ten minutes without data.
    fn make_night(blocks: &[(usize, u16)]) -> (Vec<Option<u16>>, Vec<ActivityClass>) {
        let mut heart_rate = vec![None; 10];
        for &(minutes, bpm) in blocks {
            heart_rate.extend(std::iter::repeat_n(Some(bpm), minutes));
        }
        let activity = vec![ActivityClass::NoActivity; heart_rate.len()];
        (heart_rate, activity)
    }

    #[test]
    fn dwell_times_adapt_to_transitions() {
        assert_eq!(HrClass::HighHr.dwell_minutes(0), 25);
        assert_eq!(HrClass::HighHr.dwell_minutes(3), 19);
        assert_eq!(HrClass::HighHr.dwell_minutes(20), MIN_DWELL_MINUTES);
        assert_eq!(HrClass::LowHr.dwell_minutes(0), 25);
        assert_eq!(HrClass::LowHr.dwell_minutes(3), 31);
    }

    #[test]
    fn four_transitions_are_usable() {
        let (hr, activity) = make_night(&[(40, 90), (40, 50), (40, 90), (40, 50), (40, 90)]);
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert_eq!(result.transitions, 4);
        assert!(result.is_usable());
        assert!(result.verdict().is_ok());
    }

    #[test]
    fn three_transitions_are_not_usable() {
        let (hr, activity) = make_night(&[(40, 90), (40, 50), (40, 90), (40, 50)]);
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert_eq!(result.transitions, 3);
        assert!(!result.is_usable());
        assert_eq!(
            result.verdict(),
            Err(SleepAnalysisError::InsufficientTransitions { found: 3 })
        );
    }

    #[test]
    fn transitions_are_placed_at_the_extreme() {
        let (hr, activity) = make_night(&[(40, 90), (40, 50), (40, 90)]);
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert!(result.classes[..10].iter().all(Option::is_none));
        assert!(result.classes[10..50].iter().all(|c| *c == Some(HrClass::HighHr)));
        assert!(result.classes[50..90].iter().all(|c| *c == Some(HrClass::LowHr)));
        assert!(result.classes[90..].iter().all(|c| *c == Some(HrClass::HighHr)));
    }

    #[test]
    fn wake_resets_regime() {
        let (hr, mut activity) = make_night(&[(40, 90), (40, 50), (40, 50)]);
        for class in &mut activity[90..95] {
            *class = ActivityClass::Wake;
        }
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert!(result.classes[90..95].iter().all(Option::is_none));
        // after waking up the night starts over in the high regime
        assert_eq!(result.classes[95], Some(HrClass::HighHr));
        assert_eq!(result.transitions, 1);
    }

    #[test]
    fn zero_heart_rate_is_a_gap() {
        let (mut hr, activity) = make_night(&[(40, 90)]);
        hr[20] = Some(0);
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert_eq!(result.classes[20], None);
        assert_eq!(result.classes[21], Some(HrClass::HighHr));
    }

    #[test]
    fn short_dip_is_reverted() {
        let (hr, activity) = make_night(&[(30, 90), (3, 80), (20, 95)]);
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert_eq!(result.transitions, 0);
        assert!(result.classes[10..].iter().all(|c| *c == Some(HrClass::HighHr)));
    }

    #[test]
    fn no_transition_within_dwell_time() {
        let (hr, activity) = make_night(&[(10, 90), (30, 50)]);
        let result = HeartRateClassifier::classify(&hr, &activity);
        // the drop is seen after 10 minutes, the switch is confirmed once the
        // regime lasted 25 minutes and then relabelled back to the peak
        assert_eq!(result.transitions, 1);
        assert!(result.classes[20..].iter().all(|c| *c == Some(HrClass::LowHr)));
    }

    #[test]
    fn missing_heart_rate_yields_nothing() {
        let hr = vec![None; 100];
        let activity = vec![ActivityClass::NoActivity; 100];
        let result = HeartRateClassifier::classify(&hr, &activity);
        assert_eq!(result.transitions, 0);
        assert!(result.classes.iter().all(Option::is_none));
    }
}
