use crate::game::easing::Easing;
use crate::game::timing::TempoMap;
use crate::game::value::{self, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One keyframe pair as the chart supplies it; any field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventData {
    pub start_beat: f64,
    pub end_beat: Option<f64>,
    pub start: Option<Value>,
    pub end: Option<Value>,
    pub easing_type: i64,
    pub easing_left: Option<f64>,
    pub easing_right: Option<f64>,
    /// `1` switches the event onto `bezier_points`; anything else keeps `easing_type`.
    pub bezier: i64,
    pub bezier_points: Option<Vec<f64>>,
}

/// One gap-filled keyframe pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub start_beat: f64,
    pub end_beat: f64,
    pub start: Value,
    pub end: Value,
    pub easing: Easing,
}

impl Event {
    pub fn new(start_beat: f64, end_beat: f64, start: Value, end: Value, easing: Easing) -> Self {
        Self { start_beat, end_beat, start, end, easing }
    }

    /// Eased progress through the event, clamped to `[0, 1]`.
    pub fn progress(&self, beat: f64) -> f64 {
        let span = self.end_beat - self.start_beat;
        if !self.end_beat.is_finite() {
            return 0.0;
        }
        if !(span > 0.0) {
            return if beat >= self.start_beat { 1.0 } else { 0.0 };
        }
        self.easing.ease((beat - self.start_beat) / span)
    }

    pub fn value_at(&self, beat: f64) -> Value {
        let progress = self.progress(beat);
        if progress == 0.0 {
            self.start.clone()
        } else if progress == 1.0 {
            self.end.clone()
        } else {
            value::interpolate(&self.start, &self.end, progress)
        }
    }

    #[inline(always)]
    fn start_scalar(&self) -> f64 {
        self.start.as_scalar().unwrap_or(0.0)
    }

    #[inline(always)]
    fn end_scalar(&self) -> f64 {
        self.end.as_scalar().unwrap_or(0.0)
    }

    fn scalar_at(&self, beat: f64) -> f64 {
        let progress = self.progress(beat);
        let (start, end) = (self.start_scalar(), self.end_scalar());
        if progress == 0.0 {
            start
        } else if progress == 1.0 {
            end
        } else {
            start + (end - start) * progress
        }
    }

    /// `∫ speed dt` from the event start to `beat`, clamped to the event span.
    fn displacement_until(&self, beat: f64, tempo: &TempoMap) -> f64 {
        let start_speed = self.start_scalar();
        let upper = if self.end_beat.is_finite() { beat.min(self.end_beat) } else { beat };
        if upper <= self.start_beat {
            return 0.0;
        }
        let constant = start_speed * (tempo.time_at(upper) - tempo.time_at(self.start_beat));

        let delta = self.end_scalar() - start_speed;
        let span = self.end_beat - self.start_beat;
        if delta == 0.0 || !self.end_beat.is_finite() || !(span > 0.0) {
            return constant;
        }

        let eased: f64 = tempo
            .segments_between(self.start_beat, upper)
            .map(|(from, to, bpm)| {
                let p_from = (from - self.start_beat) / span;
                let p_to = (to - self.start_beat) / span;
                (60.0 / bpm) * span * (self.easing.integral(p_to) - self.easing.integral(p_from))
            })
            .sum();
        constant + delta * eased
    }
}

/// Sorts raw events and fills the gaps the chart left open.
pub fn fill_gaps(raw: Vec<EventData>, default: Value) -> Vec<Event> {
    let mut raw: Vec<EventData> = raw
        .into_iter()
        .filter(|e| {
            let keep = e.start_beat.is_finite();
            if !keep {
                debug!("Dropping event with non-finite start beat.");
            }
            keep
        })
        .collect();
    raw.sort_by(|a, b| a.start_beat.partial_cmp(&b.start_beat).unwrap_or(Ordering::Equal));

    let present = |v: &Option<Value>| v.clone().filter(|v| !v.is_missing());
    let len = raw.len();

    let mut starts: Vec<Option<Value>> = raw.iter().map(|e| present(&e.start)).collect();
    let ends: Vec<Option<Value>> = raw.iter().map(|e| present(&e.end)).collect();

    // Forward pass: a missing start continues from the previous event.
    for i in 0..len {
        if starts[i].is_some() {
            continue;
        }
        starts[i] = if i == 0 {
            ends[0].clone().or_else(|| Some(default.clone()))
        } else {
            ends[i - 1].clone().or_else(|| starts[i - 1].clone())
        };
    }

    let mut events = Vec::with_capacity(len);
    for i in 0..len {
        let start = starts[i].clone().unwrap_or_else(|| default.clone());
        let end = ends[i]
            .clone()
            .or_else(|| starts.get(i + 1).cloned().flatten())
            .unwrap_or_else(|| start.clone());

        let next_start_beat = raw.get(i + 1).map(|e| e.start_beat);
        let mut end_beat = raw[i]
            .end_beat
            .filter(|b| !b.is_nan())
            .or(next_start_beat)
            .unwrap_or(f64::INFINITY);
        if let Some(next) = next_start_beat {
            if end_beat > next {
                debug!("Clamping overlapping event end {} to {}.", end_beat, next);
                end_beat = next;
            }
        }

        let data = &raw[i];
        let easing = Easing::from_chart(
            data.easing_type,
            data.easing_left.unwrap_or(0.0),
            data.easing_right.unwrap_or(1.0),
            data.bezier_points.as_deref().filter(|_| data.bezier == 1),
        );
        events.push(Event::new(data.start_beat, end_beat, start, end, easing));
    }
    events
}

/// The forward-walking position shared by every track type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackCursor {
    pub index: usize,
}

impl TrackCursor {
    /// Moves to the event governing `beat`, rewinding to the front on a backward seek.
    fn seek(&mut self, events: &[Event], beat: f64) {
        if self.index > 0 && (self.index >= events.len() || beat <= events[self.index].start_beat) {
            self.index = 0;
        }
        while self.index + 1 < events.len() && events[self.index + 1].start_beat < beat {
            self.index += 1;
        }
    }
}

/// Keyframes for one attribute on one layer.
#[derive(Debug, Clone, Default)]
pub struct EventTrack {
    events: Vec<Event>,
    cursor: TrackCursor,
    default: Value,
}

impl EventTrack {
    pub fn new(raw: Vec<EventData>, default: Value) -> Self {
        Self {
            events: fill_gaps(raw, default.clone()),
            cursor: TrackCursor::default(),
            default,
        }
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events, cursor: TrackCursor::default(), default: Value::default() }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn value_at(&mut self, beat: f64) -> Value {
        if self.events.is_empty() {
            return self.default.clone();
        }
        self.cursor.seek(&self.events, beat);
        self.events[self.cursor.index].value_at(beat)
    }

    pub fn scalar_at(&mut self, beat: f64) -> f64 {
        if self.events.is_empty() {
            return self.default.as_scalar().unwrap_or(0.0);
        }
        self.cursor.seek(&self.events, beat);
        self.events[self.cursor.index].scalar_at(beat)
    }
}

/// A speed track: its value is the distance travelled, not the speed.
#[derive(Debug, Clone, Default)]
pub struct SpeedTrack {
    events: Vec<Event>,
    cursor: TrackCursor,
    /// Displacement at the start of the event under the cursor.
    accumulated: f64,
}

impl SpeedTrack {
    pub fn new(raw: Vec<EventData>) -> Self {
        Self::from_events(fill_gaps(raw, Value::Scalar(0.0)))
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events, cursor: TrackCursor::default(), accumulated: 0.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Full contribution of `events[i]` up to the start of the next event.
    fn contribution(&self, i: usize, tempo: &TempoMap) -> f64 {
        let event = &self.events[i];
        let full = event.displacement_until(event.end_beat, tempo);
        let tail = match self.events.get(i + 1) {
            Some(next) if next.start_beat > event.end_beat => {
                event.end_scalar() * (tempo.time_at(next.start_beat) - tempo.time_at(event.end_beat))
            }
            _ => 0.0,
        };
        full + tail
    }

    /// Distance travelled from the first event's start to `beat`.
    pub fn travel_distance_at(&mut self, beat: f64, tempo: &TempoMap) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        if self.cursor.index > 0 && beat <= self.events[self.cursor.index].start_beat {
            self.cursor.index = 0;
            self.accumulated = 0.0;
        }
        while self.cursor.index + 1 < self.events.len()
            && self.events[self.cursor.index + 1].start_beat < beat
        {
            self.accumulated += self.contribution(self.cursor.index, tempo);
            self.cursor.index += 1;
        }

        let event = &self.events[self.cursor.index];
        let current = if beat < event.start_beat {
            event.start_scalar() * (tempo.time_at(beat) - tempo.time_at(event.start_beat))
        } else if beat <= event.end_beat {
            event.displacement_until(beat, tempo)
        } else {
            event.displacement_until(event.end_beat, tempo)
                + event.end_scalar() * (tempo.time_at(beat) - tempo.time_at(event.end_beat))
        };
        self.accumulated + current
    }

    /// Speed value at `beat`, without touching the distance accumulator.
    pub fn speed_at(&self, beat: f64) -> f64 {
        let mut cursor = TrackCursor::default();
        if self.events.is_empty() {
            return 0.0;
        }
        cursor.seek(&self.events, beat);
        self.events[cursor.index].scalar_at(beat)
    }
}
