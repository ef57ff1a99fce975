//! Majority-vote label smoothing.
//!
//! A 3-slot history with 2-of-3 consensus: a single disagreeing sample can
//! never change the published label, while genuine changes win within two
//! samples (~100 ms at the 50 ms cadence).

use gearsense_common::gear::GearLabel;
use heapless::Vec;

/// History depth. Consensus needs ceil(HISTORY_LEN/2 + ε) = 2 votes.
pub const HISTORY_LEN: usize = 3;

/// Hysteresis filter over raw classifier outputs.
#[derive(Debug, Clone)]
pub struct GearSmoother {
    /// Last raw outputs, oldest first.
    history: Vec<GearLabel, HISTORY_LEN>,
    /// Last label that passed the filter.
    last_valid: GearLabel,
}

impl GearSmoother {
    pub fn new(initial: GearLabel) -> Self {
        Self {
            history: Vec::new(),
            last_valid: initial,
        }
    }

    /// Push a raw classifier output, returning the filtered label.
    ///
    /// With fewer than two samples of history the candidate is accepted
    /// immediately; afterwards a label needs at least two votes among the
    /// last three to become current, otherwise the previous valid label
    /// holds.
    pub fn push(&mut self, candidate: GearLabel) -> GearLabel {
        if self.history.is_full() {
            self.history.remove(0);
        }
        // Cannot fail: one slot was just freed.
        let _ = self.history.push(candidate);

        if self.history.len() < 2 {
            self.last_valid = candidate;
            return candidate;
        }

        if let Some(majority) = self.majority() {
            self.last_valid = majority;
        }
        self.last_valid
    }

    /// The label with ≥2 votes in the current history, if any.
    fn majority(&self) -> Option<GearLabel> {
        for label in &self.history {
            let votes = self.history.iter().filter(|l| *l == label).count();
            if votes >= 2 {
                return Some(*label);
            }
        }
        None
    }

    /// Drop the history (selector position changed; old votes are for a
    /// different letter and must not outvote the new one).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Last label that passed the filter.
    #[inline]
    pub fn last_valid(&self) -> GearLabel {
        self.last_valid
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gearsense_common::gear::GearNumber;

    fn d(n: u8) -> GearLabel {
        GearLabel::Drive(GearNumber::new(n))
    }

    #[test]
    fn first_sample_accepted_immediately() {
        let mut s = GearSmoother::new(GearLabel::Park);
        assert_eq!(s.push(d(3)), d(3));
    }

    #[test]
    fn single_outlier_rejected() {
        let mut s = GearSmoother::new(GearLabel::Park);
        s.push(d(4));
        s.push(d(4));
        assert_eq!(s.push(d(5)), d(4), "one outlier must not flip the label");
    }

    #[test]
    fn two_of_three_wins() {
        let mut s = GearSmoother::new(GearLabel::Park);
        s.push(d(4));
        s.push(d(4));
        s.push(d(5));
        assert_eq!(s.push(d(5)), d(5), "2-of-3 consensus switches");
    }

    #[test]
    fn no_majority_holds_previous() {
        let mut s = GearSmoother::new(GearLabel::Park);
        s.push(d(4));
        s.push(d(4));
        s.push(d(5));
        // History is now [4, 5, 6]: three-way split, label holds at 4.
        assert_eq!(s.push(d(6)), d(4));
    }

    #[test]
    fn history_is_bounded() {
        let mut s = GearSmoother::new(GearLabel::Park);
        for n in 1..=8 {
            s.push(d(n));
        }
        assert!(s.history.len() <= HISTORY_LEN);
    }

    #[test]
    fn reset_accepts_next_sample_immediately() {
        let mut s = GearSmoother::new(GearLabel::Park);
        s.push(d(4));
        s.push(d(4));
        s.push(d(4));
        s.reset();
        assert_eq!(s.push(GearLabel::Manual(GearNumber::new(4))), GearLabel::Manual(GearNumber::new(4)));
    }
}
