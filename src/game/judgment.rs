use crate::config::Preferences;
use crate::game::note::NoteId;
use log::warn;
use serde::Serialize;

/// The tap window reaches this far past the good window before a tap note is missed.
pub const BAD_WINDOW_SCALE: f64 = 1.125;
/// Accuracy credit of a Good relative to a Perfect.
pub const GOOD_ACCURACY_WEIGHT: f64 = 0.65;

pub const ACCURACY_SCORE: f64 = 900_000.0;
pub const COMBO_SCORE: f64 = 100_000.0;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Judgment {
    #[default]
    Unjudged,
    Perfect,
    GoodEarly,
    GoodLate,
    Bad,
    Miss,
    /// Fake notes only.
    Passed,
}

impl Judgment {
    #[inline(always)]
    pub const fn is_good(self) -> bool {
        matches!(self, Judgment::GoodEarly | Judgment::GoodLate)
    }

    /// Perfect or Good: the judgments that keep a combo alive.
    #[inline(always)]
    pub const fn keeps_combo(self) -> bool {
        matches!(self, Judgment::Perfect | Judgment::GoodEarly | Judgment::GoodLate)
    }

    /// Judgments that enter the counters.
    #[inline(always)]
    pub const fn is_scored(self) -> bool {
        !matches!(self, Judgment::Unjudged | Judgment::Passed)
    }
}

/// Timing thresholds in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JudgmentWindows {
    pub perfect: f64,
    pub good: f64,
    pub bad: f64,
    pub hold_body_tolerance: f64,
    pub hold_tail_tolerance: f64,
}

impl Default for JudgmentWindows {
    fn default() -> Self {
        Self::from_preferences(&Preferences::default())
    }
}

impl JudgmentWindows {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        let good = prefs.good_judgment_ms / 1000.0;
        Self {
            perfect: prefs.perfect_judgment_ms / 1000.0,
            good,
            bad: good * BAD_WINDOW_SCALE,
            hold_body_tolerance: prefs.hold_body_tolerance_ms / 1000.0,
            hold_tail_tolerance: prefs.hold_tail_tolerance_ms / 1000.0,
        }
    }

    /// Grades a tap on a Tap note; `delta` is `input - hit` in seconds.
    pub fn grade_tap(&self, delta: f64) -> Judgment {
        if delta < -self.good {
            Judgment::Bad
        } else if delta < -self.perfect {
            Judgment::GoodEarly
        } else if delta <= self.perfect {
            Judgment::Perfect
        } else if delta <= self.good {
            Judgment::GoodLate
        } else {
            Judgment::Bad
        }
    }

    /// Grades the press that starts a hold. Holds never Bad.
    pub fn grade_hold_head(&self, delta: f64) -> Judgment {
        if delta < -self.perfect {
            Judgment::GoodEarly
        } else if delta <= self.perfect {
            Judgment::Perfect
        } else {
            Judgment::GoodLate
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub good_early: u32,
    pub good_late: u32,
    pub bad: u32,
    pub miss: u32,
}

impl JudgmentCounts {
    fn slot(&mut self, judgment: Judgment) -> Option<&mut u32> {
        match judgment {
            Judgment::Perfect => Some(&mut self.perfect),
            Judgment::GoodEarly => Some(&mut self.good_early),
            Judgment::GoodLate => Some(&mut self.good_late),
            Judgment::Bad => Some(&mut self.bad),
            Judgment::Miss => Some(&mut self.miss),
            Judgment::Unjudged | Judgment::Passed => None,
        }
    }

    pub fn good(&self) -> u32 {
        self.good_early + self.good_late
    }

    pub fn judged(&self) -> u32 {
        self.perfect + self.good() + self.bad + self.miss
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimingSample {
    /// Seconds, already divided by the time scale.
    pub delta: f64,
    pub beat: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FcApStatus {
    AllPerfect,
    FullCombo,
    None,
}

/// Running totals for one play session.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub counts: JudgmentCounts,
    pub combo: u32,
    pub max_combo: u32,
    pub total_notes: u32,
    samples: Vec<TimingSample>,
    /// Scored judgments in the order they were fixed.
    log: Vec<(NoteId, Judgment)>,
}

impl Statistics {
    pub fn new(total_notes: u32) -> Self {
        Self { total_notes, ..Default::default() }
    }

    pub fn samples(&self) -> &[TimingSample] {
        &self.samples
    }

    pub fn record(&mut self, id: NoteId, judgment: Judgment) {
        let Some(slot) = self.counts.slot(judgment) else {
            return;
        };
        *slot += 1;
        self.log.push((id, judgment));
        if judgment.keeps_combo() {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        } else {
            self.combo = 0;
        }
    }

    /// Takes back a judgment fixed earlier on `id`, then rebuilds the combo.
    pub fn revoke(&mut self, id: NoteId, judgment: Judgment) {
        let Some(slot) = self.counts.slot(judgment) else {
            return;
        };
        if *slot == 0 {
            debug_assert!(false, "revoking {:?} on {:?} with an empty counter", judgment, id);
            warn!("Revoked {:?} on {:?} but its counter was already zero.", judgment, id);
            return;
        }
        *slot -= 1;
        if let Some(pos) = self.log.iter().rposition(|(logged, _)| *logged == id) {
            self.log.remove(pos);
        }
        self.rebuild_combo();
    }

    fn rebuild_combo(&mut self) {
        let (mut combo, mut max_combo) = (0, 0);
        for (_, judgment) in &self.log {
            if judgment.keeps_combo() {
                combo += 1;
                max_combo = max_combo.max(combo);
            } else {
                combo = 0;
            }
        }
        self.combo = combo;
        self.max_combo = max_combo;
    }

    pub fn push_sample(&mut self, delta: f64, beat: f64) {
        self.samples.push(TimingSample { delta, beat });
    }

    /// Drops samples recorded past `beat`.
    pub fn rewind_samples(&mut self, beat: f64) {
        self.samples.retain(|s| s.beat <= beat);
    }

    pub fn accuracy(&self) -> f64 {
        let judged = self.counts.judged();
        if judged == 0 {
            return 1.0;
        }
        (self.counts.perfect as f64 + GOOD_ACCURACY_WEIGHT * self.counts.good() as f64)
            / judged as f64
    }

    pub fn score(&self) -> u32 {
        if self.total_notes == 0 {
            return 0;
        }
        let total = self.total_notes as f64;
        let accuracy_part =
            (self.counts.perfect as f64 + GOOD_ACCURACY_WEIGHT * self.counts.good() as f64) / total;
        let combo_part = self.max_combo as f64 / total;
        (ACCURACY_SCORE * accuracy_part + COMBO_SCORE * combo_part).round() as u32
    }

    pub fn fc_ap_status(&self) -> FcApStatus {
        let c = &self.counts;
        if c.bad + c.miss > 0 {
            FcApStatus::None
        } else if c.good() > 0 {
            FcApStatus::FullCombo
        } else {
            FcApStatus::AllPerfect
        }
    }

    /// `(mean, standard deviation)` of the timing samples, in seconds.
    pub fn deviation(&self) -> (f64, f64) {
        if self.samples.is_empty() {
            return (0.0, 0.0);
        }
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().map(|s| s.delta).sum::<f64>() / n;
        let variance = self.samples.iter().map(|s| (s.delta - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt())
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let (mean_delta, std_deviation) = self.deviation();
        StatisticsSnapshot {
            counts: self.counts,
            combo: self.combo,
            max_combo: self.max_combo,
            total_notes: self.total_notes,
            judged: self.counts.judged(),
            accuracy: self.accuracy(),
            score: self.score(),
            status: self.fc_ap_status(),
            mean_delta,
            std_deviation,
            samples: self.samples.len(),
        }
    }
}

/// Read-only view handed to HUD and results collaborators.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub counts: JudgmentCounts,
    pub combo: u32,
    pub max_combo: u32,
    pub total_notes: u32,
    pub judged: u32,
    pub accuracy: f64,
    pub score: u32,
    pub status: FcApStatus,
    pub mean_delta: f64,
    pub std_deviation: f64,
    pub samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> JudgmentWindows {
        JudgmentWindows {
            perfect: 0.080,
            good: 0.160,
            bad: 0.160 * BAD_WINDOW_SCALE,
            hold_body_tolerance: 0.1,
            hold_tail_tolerance: 0.1,
        }
    }

    fn id(note: usize) -> NoteId {
        NoteId { line: 0, note }
    }

    #[test]
    fn tap_grades_by_delta() {
        let w = windows();
        assert_eq!(w.grade_tap(0.0), Judgment::Perfect);
        assert_eq!(w.grade_tap(-0.150), Judgment::GoodEarly);
        assert_eq!(w.grade_tap(0.120), Judgment::GoodLate);
        assert_eq!(w.grade_tap(0.170), Judgment::Bad);
        assert_eq!(w.grade_tap(-0.170), Judgment::Bad);
        assert_eq!(w.grade_tap(0.080), Judgment::Perfect);
        assert!((w.bad - 0.180).abs() < 1e-12);
    }

    #[test]
    fn hold_head_never_grades_bad() {
        let w = windows();
        assert_eq!(w.grade_hold_head(-0.159), Judgment::GoodEarly);
        assert_eq!(w.grade_hold_head(0.159), Judgment::GoodLate);
        assert_eq!(w.grade_hold_head(0.01), Judgment::Perfect);
    }

    #[test]
    fn combo_breaks_on_bad_and_miss() {
        let mut stats = Statistics::new(5);
        stats.record(id(0), Judgment::Perfect);
        stats.record(id(1), Judgment::GoodLate);
        assert_eq!(stats.combo, 2);
        stats.record(id(2), Judgment::Bad);
        assert_eq!(stats.combo, 0);
        stats.record(id(3), Judgment::Perfect);
        assert_eq!((stats.combo, stats.max_combo), (1, 2));
        stats.record(id(4), Judgment::Passed);
        assert_eq!(stats.counts.judged(), 4);
    }

    #[test]
    fn revoking_restores_counts_and_combo() {
        let mut stats = Statistics::new(3);
        stats.record(id(0), Judgment::Perfect);
        stats.record(id(1), Judgment::Miss);
        stats.record(id(2), Judgment::Perfect);
        stats.revoke(id(2), Judgment::Perfect);
        stats.revoke(id(1), Judgment::Miss);
        assert_eq!(stats.counts.miss, 0);
        assert_eq!(stats.counts.perfect, 1);
        assert_eq!((stats.combo, stats.max_combo), (1, 1));
    }

    #[test]
    fn rewinding_keeps_earlier_samples() {
        let mut stats = Statistics::new(3);
        stats.push_sample(0.01, 1.0);
        stats.push_sample(-0.02, 4.0);
        stats.push_sample(0.03, 9.0);
        stats.rewind_samples(4.0);
        assert_eq!(stats.samples().len(), 2);
        let (mean, _) = stats.deviation();
        assert!((mean + 0.005).abs() < 1e-12);
    }

    #[test]
    fn score_and_status() {
        let mut stats = Statistics::new(4);
        for n in 0..4 {
            stats.record(id(n), Judgment::Perfect);
        }
        assert_eq!(stats.score(), 1_000_000);
        assert_eq!(stats.fc_ap_status(), FcApStatus::AllPerfect);

        let mut stats = Statistics::new(2);
        stats.record(id(0), Judgment::Perfect);
        stats.record(id(1), Judgment::GoodEarly);
        assert_eq!(stats.fc_ap_status(), FcApStatus::FullCombo);
        assert_eq!(stats.score(), (900_000.0 * 1.65 / 2.0 + 100_000.0f64).round() as u32);
        assert!((stats.accuracy() - 0.825).abs() < 1e-12);

        let snapshot = stats.snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["maxCombo"], 2);
        assert_eq!(json["status"], "FullCombo");
    }
}
