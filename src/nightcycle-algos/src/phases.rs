use crate::{ActivityClass, CycleChain, CycleId, HrClass};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepPhase {
    Wake,
    Rem,
    Nrem1,
    Nrem2,
    Nrem3,
}

/// How sleep phases get detected for one night, picked once per run from the
/// quality of the heart rate data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStrategy {
    /// Heart rate regimes and motion combined; detects REM.
    HrInformed,
    /// Motion only; two sleep depths and no REM.
    MotionOnly,
}

#[derive(Clone, Debug, Default)]
pub struct PhaseDetection {
    pub phases: Vec<SleepPhase>,
    pub cycles: CycleChain,
}

impl DetectionStrategy {
    pub fn detect(self, activity: &[ActivityClass], heart_rate: &[Option<HrClass>]) -> PhaseDetection {
        match self {
            Self::HrInformed => Self::detect_with_heart_rate(activity, heart_rate),
            Self::MotionOnly => Self::detect_with_motion(activity),
        }
    }

    fn detect_with_heart_rate(activity: &[ActivityClass], heart_rate: &[Option<HrClass>]) -> PhaseDetection {
        let mut phases = vec![SleepPhase::Wake; heart_rate.len()];
        let mut cycles = CycleChain::default();
        let mut current: Option<CycleId> = None;
        let mut rem_possible = false;
        let mut previous: Option<HrClass> = None;

        for (idx, (&class, &hr_class)) in activity.iter().zip(heart_rate).enumerate() {
            match (previous, hr_class) {
                (None, Some(_)) => {
                    // falling asleep, the first light sleep is never REM
                    rem_possible = false;
                    current = Some(cycles.open(idx, None));
                }
                (Some(_), None) => {
                    if let Some(id) = current.take() {
                        cycles.close(id, idx - 1);
                    }
                }
                (Some(HrClass::HighHr), Some(HrClass::LowHr)) => {
                    current = current.map(|id| Self::enter_deep_sleep(&mut cycles, id, idx));
                }
                (Some(HrClass::LowHr), Some(HrClass::HighHr)) => {
                    if let Some(cycle) = current.and_then(|id| cycles.get_mut(id)) {
                        cycle.low_high_trans_idx = Some(idx);
                    }
                    rem_possible = true;
                }
                _ => {}
            }

            phases[idx] = match hr_class {
                None => SleepPhase::Wake,
                Some(HrClass::HighHr) => match class {
                    ActivityClass::NoActivity => SleepPhase::Nrem1,
                    _ if rem_possible => SleepPhase::Rem,
                    _ => SleepPhase::Nrem1,
                },
                Some(HrClass::LowHr) => match class {
                    ActivityClass::NoActivity => SleepPhase::Nrem3,
                    _ => SleepPhase::Nrem2,
                },
            };
            previous = hr_class;
        }

        if let Some(id) = current {
            cycles.close(id, phases.len() - 1);
        }

        cycles.adjust_boundaries(&phases);
        PhaseDetection { phases, cycles }
    }

    /// A drop into the low regime after a REM phase starts the next cycle.
    fn enter_deep_sleep(cycles: &mut CycleChain, id: CycleId, idx: usize) -> CycleId {
        let Some(cycle) = cycles.get_mut(id) else {
            return id;
        };
        cycle.high_low_trans_idx = Some(idx);
        if cycle.low_high_trans_idx.is_none() {
            return id;
        }

        cycles.close(id, idx - 1);
        let next = cycles.open(idx, Some(id));
        if let Some(cycle) = cycles.get_mut(next) {
            cycle.high_low_trans_idx = Some(idx);
        }
        next
    }

    fn detect_with_motion(activity: &[ActivityClass]) -> PhaseDetection {
        let phases = activity
            .iter()
            .map(|class| match class {
                ActivityClass::Wake => SleepPhase::Wake,
                ActivityClass::LowActivity => SleepPhase::Nrem1,
                ActivityClass::NoActivity => SleepPhase::Nrem3,
            })
            .collect::<Vec<_>>();

        let mut cycles = CycleChain::default();
        let mut current: Option<CycleId> = None;
        let mut last: Option<CycleId> = None;
        let mut end_of_deep: Option<usize> = None;
        let mut previous = SleepPhase::Wake;

        // One step past the window end, treated as wake, closes a cycle still
        // open at the end of the window.
        for idx in 0..=phases.len() {
            let phase = phases.get(idx).copied().unwrap_or(SleepPhase::Wake);

            match current {
                None if phase != SleepPhase::Wake && previous == SleepPhase::Wake => {
                    let id = cycles.open(idx, last);
                    current = Some(id);
                    last = Some(id);
                    end_of_deep = None;
                }
                Some(id) if phase == SleepPhase::Wake => {
                    cycles.close(id, end_of_deep.unwrap_or(idx - 1));
                    current = None;
                }
                _ => {}
            }

            if phase == SleepPhase::Nrem3 {
                end_of_deep = Some(idx);
            }
            previous = phase;
        }

        PhaseDetection { phases, cycles }
    }
}
