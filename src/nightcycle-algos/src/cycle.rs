use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};

use crate::{AnalysisWindow, SleepPhase};

/// A cycle without a deep sleep segment of at least this length (in itself or
/// in a directly adjacent cycle) is a restless wake period, not sleep.
pub const MIN_DEEP_SLEEP_MINUTES: usize = 10;

pub type CycleId = usize;

/// Contiguous run of minutes sharing the same phase, `to_idx` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SleepPhaseSegment {
    pub from_idx: usize,
    pub to_idx: usize,
    pub from_time: NaiveDateTime,
    pub to_time: NaiveDateTime,
    pub phase: SleepPhase,
}

impl SleepPhaseSegment {
    pub fn minutes(&self) -> usize {
        self.to_idx - self.from_idx + 1
    }

    pub fn duration(&self) -> TimeDelta {
        self.to_time - self.from_time
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SleepCycle {
    pub start_idx: usize,
    pub end_idx: usize,
    pub high_low_trans_idx: Option<usize>,
    pub low_high_trans_idx: Option<usize>,
    pub prev: Option<CycleId>,
    pub next: Option<CycleId>,
    pub phases: Vec<SleepPhaseSegment>,
    /// Seconds spent in every phase of this cycle.
    pub total_seconds: BTreeMap<SleepPhase, i64>,
}

impl SleepCycle {
    pub fn minutes(&self) -> usize {
        self.end_idx - self.start_idx + 1
    }

    pub fn has_deep_sleep(&self) -> bool {
        self.phases
            .iter()
            .any(|p| p.phase == SleepPhase::Nrem3 && p.minutes() >= MIN_DEEP_SLEEP_MINUTES)
    }

    pub fn seconds_in(&self, phase: SleepPhase) -> i64 {
        self.total_seconds.get(&phase).copied().unwrap_or_default()
    }

    /// Splits `phases[start_idx..=end_idx]` into segments and sums them up.
    pub fn extract_phases(&mut self, phases: &[SleepPhase], window: &AnalysisWindow) {
        self.phases.clear();
        self.total_seconds.clear();

        let mut from = self.start_idx;
        for idx in self.start_idx..=self.end_idx {
            let last = idx == self.end_idx;
            if last || phases[idx + 1] != phases[from] {
                let segment = SleepPhaseSegment {
                    from_idx: from,
                    to_idx: idx,
                    from_time: window.minute_time(from),
                    to_time: window.minute_time(idx + 1),
                    phase: phases[from],
                };
                *self.total_seconds.entry(segment.phase).or_default() +=
                    segment.duration().num_seconds();
                self.phases.push(segment);
                from = idx + 1;
            }
        }
    }
}

/// Chronological chain of cycles. Cycles live at stable indices; pruned ones
/// leave an empty slot behind so `prev`/`next` links stay valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleChain {
    cycles: Vec<Option<SleepCycle>>,
}

impl CycleChain {
    /// Starts a new cycle at `start_idx`, appended after `prev` if given.
    pub fn open(&mut self, start_idx: usize, prev: Option<CycleId>) -> CycleId {
        let id = self.cycles.len();
        self.cycles.push(Some(SleepCycle {
            start_idx,
            end_idx: start_idx,
            prev,
            ..Default::default()
        }));
        if let Some(prev) = prev.and_then(|p| self.get_mut(p)) {
            prev.next = Some(id);
        }
        id
    }

    pub fn close(&mut self, id: CycleId, end_idx: usize) {
        if let Some(cycle) = self.get_mut(id) {
            cycle.end_idx = end_idx;
        }
    }

    pub fn get(&self, id: CycleId) -> Option<&SleepCycle> {
        self.cycles.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: CycleId) -> Option<&mut SleepCycle> {
        self.cycles.get_mut(id).and_then(Option::as_mut)
    }

    pub fn ids(&self) -> Vec<CycleId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CycleId, &SleepCycle)> {
        self.cycles
            .iter()
            .enumerate()
            .filter_map(|(id, c)| c.as_ref().map(|c| (id, c)))
    }

    pub fn cycles(&self) -> impl Iterator<Item = &SleepCycle> {
        self.iter().map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a cycle and links its neighbours to each other.
    pub fn unlink(&mut self, id: CycleId) -> Option<SleepCycle> {
        let cycle = self.cycles.get_mut(id)?.take()?;
        if let Some(prev) = cycle.prev.and_then(|p| self.get_mut(p)) {
            prev.next = cycle.next;
        }
        if let Some(next) = cycle.next.and_then(|n| self.get_mut(n)) {
            next.prev = cycle.prev;
        }
        Some(cycle)
    }

    /// A cycle really ends with its last REM minute. Moves every cycle end
    /// there and lets the successor start right after it.
    pub fn adjust_boundaries(&mut self, phases: &[SleepPhase]) {
        for id in self.ids() {
            let Some(cycle) = self.get_mut(id) else {
                continue;
            };
            let Some(end_of_rem) = (cycle.start_idx..=cycle.end_idx)
                .rev()
                .find(|&idx| phases[idx] == SleepPhase::Rem)
            else {
                continue;
            };

            cycle.end_idx = end_of_rem;
            let next = cycle.next;
            if let Some(next) = next.and_then(|n| self.get_mut(n)) {
                next.start_idx = end_of_rem + 1;
            }
        }
    }

    pub fn extract_phases(&mut self, phases: &[SleepPhase], window: &AnalysisWindow) {
        for cycle in self.cycles.iter_mut().flatten() {
            cycle.extract_phases(phases, window);
        }
    }

    fn adjacent_prev(&self, id: CycleId) -> Option<CycleId> {
        let cycle = self.get(id)?;
        let prev_id = cycle.prev?;
        let prev = self.get(prev_id)?;
        (prev.end_idx + 1 == cycle.start_idx).then_some(prev_id)
    }

    fn adjacent_next(&self, id: CycleId) -> Option<CycleId> {
        let cycle = self.get(id)?;
        let next_id = cycle.next?;
        let next = self.get(next_id)?;
        (cycle.end_idx + 1 == next.start_idx).then_some(next_id)
    }

    /// True unless the cycle or any cycle chained to it without a gap
    /// contains deep sleep.
    pub fn is_wake_cycle(&self, id: CycleId) -> bool {
        let deep = |id: CycleId| self.get(id).is_some_and(SleepCycle::has_deep_sleep);

        if deep(id) {
            return false;
        }

        let mut cursor = id;
        while let Some(prev) = self.adjacent_prev(cursor) {
            if deep(prev) {
                return false;
            }
            cursor = prev;
        }

        let mut cursor = id;
        while let Some(next) = self.adjacent_next(cursor) {
            if deep(next) {
                return false;
            }
            cursor = next;
        }

        true
    }

    /// Drops every wake cycle and returns how many were removed.
    pub fn prune_wake_cycles(&mut self) -> usize {
        let wake = self
            .ids()
            .into_iter()
            .filter(|&id| self.is_wake_cycle(id))
            .collect::<Vec<_>>();

        for &id in &wake {
            if let Some(cycle) = self.unlink(id) {
                debug!(
                    "pruning wake cycle at minutes {}..={}",
                    cycle.start_idx, cycle.end_idx
                );
            }
        }

        wake.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::DEFAULT_WINDOW_OFFSET;

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            TimeDelta::zero(),
            DEFAULT_WINDOW_OFFSET,
        )
    }

    fn make_phases(runs: &[(usize, SleepPhase)]) -> Vec<SleepPhase> {
        runs.iter()
            .flat_map(|&(minutes, phase)| std::iter::repeat_n(phase, minutes))
            .collect()
    }

    fn make_chain(bounds: &[(usize, usize)], linked: bool) -> CycleChain {
        let mut chain = CycleChain::default();
        let mut prev = None;
        for &(start, end) in bounds {
            let id = chain.open(start, if linked { prev } else { None });
            chain.close(id, end);
            prev = Some(id);
        }
        chain
    }

    #[test]
    fn extract_phases_builds_segments() {
        use SleepPhase::*;
        let phases = make_phases(&[(5, Wake), (10, Nrem1), (20, Nrem3), (5, Rem), (5, Wake)]);
        let mut chain = make_chain(&[(5, 39)], false);
        chain.extract_phases(&phases, &window());

        let cycle = chain.get(0).unwrap();
        assert_eq!(cycle.phases.len(), 3);
        assert_eq!(cycle.phases[1].phase, Nrem3);
        assert_eq!(cycle.phases[1].minutes(), 20);
        assert_eq!(cycle.seconds_in(Nrem1), 600);
        assert_eq!(cycle.seconds_in(Nrem3), 1200);
        assert_eq!(cycle.seconds_in(Rem), 300);
        assert_eq!(cycle.seconds_in(Nrem2), 0);
        assert_eq!(
            cycle.total_seconds.values().sum::<i64>(),
            cycle.minutes() as i64 * 60
        );
        assert_eq!(cycle.phases[0].from_time, window().minute_time(5));
        assert_eq!(cycle.phases[2].to_time, window().minute_time(40));
        assert!(cycle.has_deep_sleep());
    }

    #[test]
    fn short_deep_segment_is_not_deep_sleep() {
        use SleepPhase::*;
        let phases = make_phases(&[(10, Nrem1), (9, Nrem3), (10, Nrem1)]);
        let mut chain = make_chain(&[(0, 28)], false);
        chain.extract_phases(&phases, &window());
        assert!(!chain.get(0).unwrap().has_deep_sleep());
        assert!(chain.is_wake_cycle(0));
    }

    #[test]
    fn open_links_predecessor() {
        let chain = make_chain(&[(0, 9), (10, 19), (20, 29)], true);
        assert_eq!(chain.get(0).unwrap().next, Some(1));
        assert_eq!(chain.get(1).unwrap().prev, Some(0));
        assert_eq!(chain.get(1).unwrap().next, Some(2));
        assert_eq!(chain.get(2).unwrap().next, None);
    }

    #[test]
    fn unlink_relinks_neighbours() {
        let mut chain = make_chain(&[(0, 9), (10, 19), (20, 29)], true);
        let removed = chain.unlink(1).unwrap();
        assert_eq!(removed.start_idx, 10);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.get(0).unwrap().next, Some(2));
        assert_eq!(chain.get(2).unwrap().prev, Some(0));
        assert!(chain.get(1).is_none());
        assert!(chain.unlink(1).is_none());
    }

    #[test]
    fn adjust_boundaries_moves_end_to_last_rem() {
        use SleepPhase::*;
        let phases = make_phases(&[(20, Nrem3), (10, Rem), (5, Nrem1), (20, Nrem3), (5, Rem)]);
        let mut chain = make_chain(&[(0, 34), (35, 59)], true);
        chain.adjust_boundaries(&phases);
        assert_eq!(chain.get(0).unwrap().end_idx, 29);
        assert_eq!(chain.get(1).unwrap().start_idx, 30);
        assert_eq!(chain.get(1).unwrap().end_idx, 59);
    }

    #[test]
    fn adjust_boundaries_without_rem_keeps_cycle() {
        use SleepPhase::*;
        let phases = make_phases(&[(30, Nrem3)]);
        let mut chain = make_chain(&[(0, 29)], true);
        chain.adjust_boundaries(&phases);
        assert_eq!(chain.get(0).unwrap().end_idx, 29);
    }

    #[test]
    fn deep_sleep_neighbour_keeps_cycle() {
        use SleepPhase::*;
        let phases = make_phases(&[(20, Nrem1), (20, Nrem3), (20, Nrem1), (5, Wake), (20, Nrem1)]);
        let mut chain = make_chain(&[(0, 19), (20, 39), (40, 59), (65, 84)], true);
        chain.extract_phases(&phases, &window());

        assert!(!chain.is_wake_cycle(0));
        assert!(!chain.is_wake_cycle(1));
        assert!(!chain.is_wake_cycle(2));
        // separated by a gap
        assert!(chain.is_wake_cycle(3));

        assert_eq!(chain.prune_wake_cycles(), 1);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.get(2).unwrap().next, None);
    }

    #[test]
    fn deep_sleep_reaches_through_chain() {
        use SleepPhase::*;
        let phases = make_phases(&[(20, Nrem1), (20, Nrem1), (20, Nrem3)]);
        let mut chain = make_chain(&[(0, 19), (20, 39), (40, 59)], true);
        chain.extract_phases(&phases, &window());
        assert!(!chain.is_wake_cycle(0));
    }

    #[test]
    fn unlinked_neighbour_does_not_count() {
        use SleepPhase::*;
        let phases = make_phases(&[(20, Nrem1), (20, Nrem3)]);
        let mut chain = make_chain(&[(0, 19), (20, 39)], false);
        chain.extract_phases(&phases, &window());
        assert!(chain.is_wake_cycle(0));
        assert!(!chain.is_wake_cycle(1));
    }

    #[test]
    fn pruning_is_idempotent() {
        use SleepPhase::*;
        let phases = make_phases(&[
            (15, Nrem1),
            (15, Nrem3),
            (3, Wake),
            (15, Nrem1),
            (3, Wake),
            (15, Nrem2),
            (15, Nrem1),
        ]);
        let mut chain = make_chain(&[(0, 29), (33, 47), (51, 65), (66, 80)], true);
        chain.extract_phases(&phases, &window());

        assert_eq!(chain.prune_wake_cycles(), 3);
        let once = chain.clone();
        assert_eq!(chain.prune_wake_cycles(), 0);
        assert_eq!(chain, once);
    }
}
