use log::{debug, info, warn};
use std::cmp::Ordering;
use std::sync::Arc;

pub const DEFAULT_BPM: f64 = 120.0;

/// Beat-to-seconds mapping built from a chart's tempo points.
///
/// Each point opens a segment of constant tempo; `time_sec` is integrated from
/// the segments before it and is never taken from the chart.
#[derive(Debug, Clone)]
pub struct TempoMap {
    beat_to_time: Arc<Vec<BeatTimePoint>>,
    max_bpm: f64,
}

#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct BeatTimePoint {
    pub beat: f64,
    pub time_sec: f64,
    pub bpm: f64,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::from_points(&[])
    }
}

impl TempoMap {
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        let mut parsed: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|&(beat, bpm)| {
                let keep = beat.is_finite() && beat >= 0.0 && bpm.is_finite() && bpm > 0.0;
                if !keep {
                    warn!("Dropping tempo point at beat {} with bpm {}.", beat, bpm);
                }
                keep
            })
            .collect();

        parsed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        // Later declarations at the same beat win.
        let mut deduped: Vec<(f64, f64)> = Vec::with_capacity(parsed.len());
        for point in parsed {
            match deduped.last_mut() {
                Some(last) if last.0 == point.0 => *last = point,
                _ => deduped.push(point),
            }
        }
        let mut parsed = deduped;

        if parsed.is_empty() {
            parsed.push((0.0, DEFAULT_BPM));
        }
        if parsed.first().is_some_and(|&(b, _)| b > 0.0) {
            parsed.insert(0, (0.0, parsed[0].1));
        }

        let mut beat_to_time = Vec::with_capacity(parsed.len());
        let mut current_time = 0.0;
        let mut last_beat = 0.0;
        let mut last_bpm = parsed[0].1;
        let mut max_bpm: f64 = 0.0;

        for &(beat, bpm) in &parsed {
            current_time += (beat - last_beat) * (60.0 / last_bpm);
            beat_to_time.push(BeatTimePoint { beat, time_sec: current_time, bpm });
            max_bpm = max_bpm.max(bpm);
            last_beat = beat;
            last_bpm = bpm;
        }

        info!("TempoMap built with {} segment(s).", beat_to_time.len());

        Self {
            beat_to_time: Arc::new(beat_to_time),
            max_bpm,
        }
    }

    pub fn points(&self) -> &[BeatTimePoint] {
        &self.beat_to_time
    }

    #[inline(always)]
    fn is_linear(&self) -> bool {
        self.beat_to_time.len() == 1
    }

    fn index_for_beat(&self, target_beat: f64) -> usize {
        match self
            .beat_to_time
            .binary_search_by(|p| p.beat.partial_cmp(&target_beat).unwrap_or(Ordering::Less))
        {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    fn index_for_time(&self, target_time_sec: f64) -> usize {
        match self.beat_to_time.binary_search_by(|p| {
            p.time_sec
                .partial_cmp(&target_time_sec)
                .unwrap_or(Ordering::Less)
        }) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Seconds from the chart origin at which `target_beat` falls.
    pub fn time_at(&self, target_beat: f64) -> f64 {
        let point = if self.is_linear() {
            &self.beat_to_time[0]
        } else {
            &self.beat_to_time[self.index_for_beat(target_beat)]
        };
        point.time_sec + (target_beat - point.beat) * (60.0 / point.bpm)
    }

    /// The beat reached after `target_time_sec` seconds.
    pub fn beat_at(&self, target_time_sec: f64) -> f64 {
        let point = if self.is_linear() {
            &self.beat_to_time[0]
        } else {
            &self.beat_to_time[self.index_for_time(target_time_sec)]
        };
        point.beat + (target_time_sec - point.time_sec) * (point.bpm / 60.0)
    }

    pub fn bpm_at(&self, target_beat: f64) -> f64 {
        self.beat_to_time[self.index_for_beat(target_beat)].bpm
    }

    pub fn max_bpm(&self) -> f64 {
        if self.max_bpm > 0.0 { self.max_bpm } else { DEFAULT_BPM }
    }

    /// The bpm that covers the most playback time up to `end_time_sec`.
    pub fn predominant_bpm(&self, end_time_sec: f64) -> f64 {
        let points = &self.beat_to_time;
        let mut durations: Vec<(f64, f64)> = Vec::new();
        for (i, point) in points.iter().enumerate() {
            let start = point.time_sec.max(0.0);
            let end = points
                .get(i + 1)
                .map_or(end_time_sec, |next| next.time_sec)
                .min(end_time_sec);
            if end <= start {
                continue;
            }
            match durations.iter_mut().find(|(bpm, _)| *bpm == point.bpm) {
                Some((_, total)) => *total += end - start,
                None => durations.push((point.bpm, end - start)),
            }
        }
        durations
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map_or(points[0].bpm, |(bpm, _)| bpm)
    }

    /// Splits `[from, to]` at tempo changes, yielding `(start, end, bpm)` pieces.
    pub fn segments_between(&self, from: f64, to: f64) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        let first = self.index_for_beat(lo);
        let points = &self.beat_to_time;
        (first..points.len())
            .map_while(move |i| {
                let start = if i == first { lo } else { points[i].beat };
                if start >= hi && i != first {
                    return None;
                }
                let end = points.get(i + 1).map_or(hi, |next| next.beat.min(hi));
                Some((start, end.max(start), points[i].bpm))
            })
            .filter(|&(start, end, _)| end > start)
    }
}

/// Per-frame time-to-beat lookup that walks the tempo list instead of searching it.
#[derive(Debug, Clone, Default)]
pub struct TempoCursor {
    index: usize,
}

impl TempoCursor {
    pub fn beat_at(&mut self, tempo: &TempoMap, song_time_sec: f64) -> f64 {
        let points = tempo.points();
        if self.index >= points.len() || song_time_sec < points[self.index].time_sec {
            if self.index != 0 {
                debug!("TempoCursor rewound at {:.3}s.", song_time_sec);
            }
            self.index = 0;
        }
        while self.index + 1 < points.len() && song_time_sec >= points[self.index + 1].time_sec {
            self.index += 1;
        }
        let point = &points[self.index];
        point.beat + (song_time_sec - point.time_sec) * (point.bpm / 60.0)
    }
}
