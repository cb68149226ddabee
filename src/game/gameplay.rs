use crate::config::Preferences;
use crate::core::input::{InputEvent, InputKind, TouchSet};
use crate::game::chart::Chart;
use crate::game::judgment::{Judgment, JudgmentWindows, Statistics};
use crate::game::line::{JudgeLine, LineArena, JUDGMENT_THRESHOLD};
use crate::game::note::{Note, NoteId, NoteKind};
use crate::game::timing::{TempoCursor, TempoMap};
use log::{debug, info, warn};
use std::collections::VecDeque;

/// Minimum touch speed, in chart units per second, that counts as a flick.
pub const FLICK_VELOCITY_THRESHOLD: f64 = 75.0;
/// Under autoplay only deltas tighter than this are sampled.
const AUTOPLAY_SAMPLE_LIMIT: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Loading,
    Ready,
    Playing,
    Seeking,
    Paused,
    Finished,
}

/// One judgment fixed during a tick, for effects and HUD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JudgmentEvent {
    pub note: NoteId,
    pub judgment: Judgment,
    /// Seconds, divided by the time scale.
    pub delta: f64,
    pub beat: f64,
    /// Hold head rather than a final judgment.
    pub head: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub beat: f64,
    pub time: f64,
    pub judgments: Vec<JudgmentEvent>,
    pub completed: bool,
}

pub struct State {
    pub tempo: TempoMap,
    pub lines: LineArena,
    pub windows: JudgmentWindows,
    pub time_scale: f64,
    pub autoplay: bool,
    /// Chart offset plus the player's offset, in seconds.
    pub offset_sec: f64,
    pub status: GameStatus,
    pub statistics: Statistics,
    /// Chart beat and chart time of the last update.
    pub current_beat: f64,
    pub current_time: f64,
    /// Chart time at which the last note finishes.
    pub end_time: f64,
    tempo_cursor: TempoCursor,
    touches: TouchSet,
    pending_inputs: VecDeque<InputEvent>,
    seek_pending: bool,
    last_log_time: f64,
    events: Vec<JudgmentEvent>,
}

enum Resolution {
    Head { judgment: Judgment, delta: f64 },
    Final { judgment: Judgment, delta: f64, sampled: bool },
}

pub fn init(chart: Chart, prefs: &Preferences) -> State {
    info!("Initializing gameplay...");
    let time_scale = if prefs.time_scale > 0.0 { prefs.time_scale } else { 1.0 };
    let offset_sec = chart.offset_sec() + prefs.chart_offset_ms / 1000.0;
    let end_time = chart.last_note_time();
    let windows = JudgmentWindows::from_preferences(prefs);
    info!(
        "Chart '{}': {} lines, {} notes, ends at {:.2}s. Windows: perfect {:.0}ms, good {:.0}ms, bad {:.0}ms.",
        chart.meta.name,
        chart.lines.len(),
        chart.total_notes,
        end_time,
        windows.perfect * 1000.0,
        windows.good * 1000.0,
        windows.bad * 1000.0
    );
    if prefs.autoplay {
        info!("Autoplay is on.");
    }

    State {
        tempo: chart.tempo,
        lines: chart.lines,
        windows,
        time_scale,
        autoplay: prefs.autoplay,
        offset_sec,
        status: GameStatus::Ready,
        statistics: Statistics::new(chart.total_notes),
        current_beat: 0.0,
        current_time: f64::NEG_INFINITY,
        end_time,
        tempo_cursor: TempoCursor::default(),
        touches: TouchSet::default(),
        pending_inputs: VecDeque::new(),
        seek_pending: false,
        last_log_time: f64::NEG_INFINITY,
        events: Vec::new(),
    }
}

/// Buffers an input; `event.time` is song time, before the chart offset.
pub fn queue_input(state: &mut State, event: InputEvent) {
    if matches!(state.status, GameStatus::Paused | GameStatus::Finished) {
        return;
    }
    state.pending_inputs.push_back(event);
}

/// Marks an explicit jump; holds in progress fail on the next update.
pub fn seek(state: &mut State) {
    state.seek_pending = true;
    state.status = GameStatus::Seeking;
    state.pending_inputs.clear();
    state.touches.clear();
    debug!("Seek requested at chart time {:.3}s.", state.current_time);
}

pub fn pause(state: &mut State) {
    if state.status == GameStatus::Playing {
        state.status = GameStatus::Paused;
        state.pending_inputs.clear();
        state.touches.clear();
    }
}

pub fn resume(state: &mut State) {
    if state.status == GameStatus::Paused {
        state.status = GameStatus::Playing;
    }
}

pub fn finish(state: &mut State) {
    if state.status == GameStatus::Finished {
        return;
    }
    state.status = GameStatus::Finished;
    let s = state.statistics.snapshot();
    info!(
        "Finished: score {}, accuracy {:.2}%, max combo {}, {:?}.",
        s.score,
        s.accuracy * 100.0,
        s.max_combo,
        s.status
    );
}

#[inline(always)]
fn sample_allowed(autoplay: bool, delta: f64) -> bool {
    !autoplay || delta.abs() < AUTOPLAY_SAMPLE_LIMIT
}

/// Undoes judgments fixed past the current beat, resolves fakes, and keeps the judge window current.
fn refresh_note(state: &mut State, id: NoteId) {
    let (time, ts, windows) = (state.current_time, state.time_scale, state.windows);
    let line = &mut state.lines.lines_mut()[id.line];
    let line_beat = line.beat;
    let note = &mut line.notes[id.note];

    let rewound_final = note.state.judged_at.is_some_and(|at| line_beat < at);
    let rewound_head = note.state.hold.temp_judged_at.is_some_and(|at| line_beat < at);
    if rewound_final {
        let judgment = note.state.judgment;
        if !note.is_fake {
            state.statistics.revoke(id, judgment);
        }
        debug!("ROLLBACK: line {}, note {}, was {:?}", id.line, id.note, judgment);
    }
    // Judged notes are never in the judge window.
    if rewound_head || (rewound_final && !note.is_hold()) {
        note.reset();
    } else if rewound_final {
        note.state.judgment = Judgment::Unjudged;
        note.state.judged_at = None;
        note.state.pending_perfect = None;
    }
    if let Some(delta) = note.state.pending_perfect {
        if time < note.hit_time + delta * ts {
            note.state.pending_perfect = None;
        }
    }
    if let Some(tap_time) = note.state.tap_time {
        if time < tap_time && note.is_awaiting_head() {
            note.state.tap_time = None;
        }
    }

    if note.is_fake {
        if note.state.judgment == Judgment::Unjudged && line_beat >= note.start_beat {
            note.state.judgment = Judgment::Passed;
            note.state.judged_at = Some(line_beat);
        }
        return;
    }

    let delta = (time - note.hit_time) / ts;
    let window = note.input_window(windows.good, windows.bad);
    let open = note.is_awaiting_head() && delta.abs() <= window;
    if open != note.state.in_window {
        note.state.in_window = open;
        if open {
            line.judge_window.insert(id.note);
        } else {
            line.judge_window.remove(id.note);
        }
    }
}

/// Along-line reach check; returns the perpendicular distance when the point reaches.
fn reach(line: &JudgeLine, note: &Note, position: Option<[f64; 2]>) -> Option<f64> {
    let Some(point) = position else {
        return Some(0.0);
    };
    let (along, across) = line.project(point);
    ((along - note.position_x).abs() <= JUDGMENT_THRESHOLD).then_some(across.abs())
}

/// Finds a held touch over `note`; a flick also spends the touch's swipe.
fn take_touch(line: &JudgeLine, note: &Note, touches: &mut TouchSet, flick: bool) -> bool {
    for touch in touches.iter_mut() {
        if reach(line, note, touch.position).is_none() {
            continue;
        }
        if !flick {
            return true;
        }
        if touch.can_flick(FLICK_VELOCITY_THRESHOLD) {
            touch.flick_consumed = true;
            return true;
        }
    }
    false
}

/// Delivers a tap to the best registered note that it reaches.
fn resolve_tap(state: &mut State, event: &InputEvent, time: f64) {
    let mut candidates: Vec<(NoteId, f64)> = Vec::new();
    for (li, line) in state.lines.lines().iter().enumerate() {
        for ni in line.judge_window.iter() {
            let note = &line.notes[ni];
            if note.state.tap_time.is_some() {
                continue;
            }
            if let Some(dist) = reach(line, note, event.position) {
                candidates.push((NoteId { line: li, note: ni }, dist));
            }
        }
    }

    while !candidates.is_empty() {
        let Some(best_pos) = (0..candidates.len()).min_by(|&a, &b| {
            let (ida, da) = candidates[a];
            let (idb, db) = candidates[b];
            let (Some(na), Some(nb)) = (state.lines.note(ida), state.lines.note(idb)) else {
                return std::cmp::Ordering::Equal;
            };
            na.hit_time
                .total_cmp(&nb.hit_time)
                .then(da.total_cmp(&db))
                .then(na.kind.code().cmp(&nb.kind.code()))
        }) else {
            break;
        };
        let (chosen, _) = candidates.swap_remove(best_pos);
        let lines = state.lines.lines_mut();
        let line_beat = lines[chosen.line].beat;
        let (kind, start, consumes) = {
            let note = &mut lines[chosen.line].notes[chosen.note];
            note.state.tap_time = Some(time);
            (note.kind, note.start, note.consumes_tap(line_beat))
        };
        debug!("TAP at {:.3}s -> line {}, note {} ({:?})", time, chosen.line, chosen.note, kind);

        if kind.resolves_stack() {
            candidates.retain(|&(id, _)| {
                let note = &mut lines[id.line].notes[id.note];
                if note.start.is_simultaneous(start) {
                    note.state.tap_time = Some(time);
                    false
                } else {
                    true
                }
            });
        }
        if consumes {
            break;
        }
    }
}

fn process_inputs(state: &mut State) {
    while let Some(event) = state.pending_inputs.pop_front() {
        let time = event.time - state.offset_sec;
        let fresh = state.touches.apply(&event, FLICK_VELOCITY_THRESHOLD);
        if fresh && event.kind == InputKind::Tap {
            resolve_tap(state, &event, time);
        }
    }
}

/// Runs one note's state machine at chart `beat` and chart `time`, returning its final judgment.
pub fn judge_note(state: &mut State, id: NoteId, beat: f64, time: f64) -> Judgment {
    let (windows, ts, autoplay, seeking) =
        (state.windows, state.time_scale, state.autoplay, state.seek_pending);
    let Some(line) = state.lines.lines_mut().get_mut(id.line) else {
        warn!("judge_note: no line {}", id.line);
        return Judgment::Unjudged;
    };
    let line_beat = line.line_beat(beat);
    let Some(note) = line.notes.get(id.note) else {
        warn!("judge_note: line {} has no note {}", id.line, id.note);
        return Judgment::Unjudged;
    };
    if note.is_fake || note.state.judgment != Judgment::Unjudged {
        return note.state.judgment;
    }

    let wants_touch = match note.kind {
        NoteKind::Tap => false,
        NoteKind::Hold => note.state.hold.temp != Judgment::Unjudged,
        NoteKind::Flick | NoteKind::Drag => {
            note.state.in_window && note.state.pending_perfect.is_none() && !autoplay
        }
    };
    let touched = wants_touch
        && take_touch(line, note, &mut state.touches, note.kind == NoteKind::Flick);

    let note = &mut line.notes[id.note];
    let delta = (time - note.hit_time) / ts;
    let reached_beat = line_beat >= note.start_beat;

    let resolution = match note.kind {
        NoteKind::Tap => {
            if let Some(tap_time) = note.state.tap_time {
                let d = (tap_time - note.hit_time) / ts;
                Some(Resolution::Final { judgment: windows.grade_tap(d), delta: d, sampled: true })
            } else if autoplay && reached_beat {
                Some(Resolution::Final { judgment: Judgment::Perfect, delta, sampled: true })
            } else if delta > windows.bad {
                Some(Resolution::Final { judgment: Judgment::Miss, delta, sampled: false })
            } else {
                None
            }
        }
        NoteKind::Flick | NoteKind::Drag => {
            let tapped_drag = note.kind == NoteKind::Drag && note.state.tap_time.is_some();
            if reached_beat && (autoplay || note.state.pending_perfect.is_some()) {
                let d = note.state.pending_perfect.unwrap_or(delta);
                Some(Resolution::Final { judgment: Judgment::Perfect, delta: d, sampled: false })
            } else if delta > windows.good {
                Some(Resolution::Final { judgment: Judgment::Miss, delta, sampled: false })
            } else if note.state.in_window && (touched || tapped_drag) {
                if reached_beat {
                    Some(Resolution::Final { judgment: Judgment::Perfect, delta, sampled: false })
                } else {
                    note.state.pending_perfect = Some(delta);
                    debug!("PENDING: line {}, note {}, {:.2}ms early", id.line, id.note, -delta * 1000.0);
                    None
                }
            } else {
                None
            }
        }
        NoteKind::Hold => {
            let hold = &mut note.state.hold;
            if hold.temp == Judgment::Unjudged {
                let head = if let Some(tap_time) = note.state.tap_time {
                    let d = (tap_time - note.hit_time) / ts;
                    Some((windows.grade_hold_head(d), d))
                } else if autoplay && reached_beat {
                    Some((Judgment::Perfect, delta))
                } else {
                    None
                };
                if let Some((judgment, d)) = head {
                    hold.temp = judgment;
                    hold.temp_judged_at = Some(line_beat);
                    hold.last_input_time = Some(time);
                    Some(Resolution::Head { judgment, delta: d })
                } else if delta > windows.good {
                    hold.temp = Judgment::Miss;
                    hold.temp_judged_at = Some(line_beat);
                    Some(Resolution::Final { judgment: Judgment::Miss, delta, sampled: false })
                } else {
                    None
                }
            } else {
                let last_input = hold.last_input_time.unwrap_or(note.hit_time);
                let dropped = if autoplay || touched {
                    hold.last_input_time = Some(time);
                    None
                } else if seeking || time - last_input > windows.hold_body_tolerance {
                    info!(
                        "HOLD DROPPED: line {}, note {}, {:.0}ms without input{}",
                        id.line,
                        id.note,
                        (time - last_input) * 1000.0,
                        if seeking { " (seek)" } else { "" }
                    );
                    Some(Resolution::Final { judgment: Judgment::Miss, delta, sampled: false })
                } else {
                    None
                };
                dropped.or_else(|| {
                    (note.end_time - time < windows.hold_tail_tolerance).then_some(Resolution::Final {
                        judgment: hold.temp,
                        delta: 0.0,
                        sampled: false,
                    })
                })
            }
        }
    };

    match resolution {
        Some(resolution) => apply_resolution(state, id, line_beat, beat, resolution),
        None => Judgment::Unjudged,
    }
}

fn apply_resolution(state: &mut State, id: NoteId, line_beat: f64, beat: f64, resolution: Resolution) -> Judgment {
    let autoplay = state.autoplay;
    let line = &mut state.lines.lines_mut()[id.line];
    let note = &mut line.notes[id.note];
    if note.state.in_window {
        note.state.in_window = false;
        line.judge_window.remove(id.note);
    }

    match resolution {
        Resolution::Head { judgment, delta } => {
            if sample_allowed(autoplay, delta) {
                state.statistics.push_sample(delta, beat);
            }
            debug!(
                "HOLD HEAD: line {}, note {}, Error: {:.2}ms, Grade: {:?}",
                id.line,
                id.note,
                delta * 1000.0,
                judgment
            );
            state.events.push(JudgmentEvent { note: id, judgment, delta, beat, head: true });
            Judgment::Unjudged
        }
        Resolution::Final { judgment, delta, sampled } => {
            note.state.judgment = judgment;
            note.state.judged_at = Some(line_beat);
            note.state.pending_perfect = None;
            state.statistics.record(id, judgment);
            if sampled && sample_allowed(autoplay, delta) {
                state.statistics.push_sample(delta, beat);
            }
            if judgment == Judgment::Miss {
                info!("MISSED: line {}, note {} at beat {:.3}", id.line, id.note, beat);
            } else {
                info!(
                    "JUDGED: line {}, note {}, Error: {:.2}ms, Grade: {:?}",
                    id.line,
                    id.note,
                    delta * 1000.0,
                    judgment
                );
            }
            state.events.push(JudgmentEvent { note: id, judgment, delta, beat, head: false });
            judgment
        }
    }
}

/// Advances the session to `song_time` (before the chart offset).
pub fn update(state: &mut State, song_time: f64) -> TickReport {
    match state.status {
        GameStatus::Ready | GameStatus::Seeking => state.status = GameStatus::Playing,
        GameStatus::Loading => {
            warn!("update called before the chart finished loading.");
            return TickReport::default();
        }
        _ => {}
    }

    let time = song_time - state.offset_sec;
    let beat = state.tempo_cursor.beat_at(&state.tempo, time);
    if time < state.current_time {
        state.statistics.rewind_samples(beat);
        state.last_log_time = f64::NEG_INFINITY;
    }
    state.current_time = time;
    state.current_beat = beat;

    state.lines.update(beat);

    let ids: Vec<NoteId> = state.lines.note_ids().collect();
    for &id in &ids {
        refresh_note(state, id);
    }

    state.touches.rearm_keys();
    process_inputs(state);

    for &id in &ids {
        judge_note(state, id, beat, time);
    }
    state.seek_pending = false;

    if time - state.last_log_time >= 1.0 {
        let in_window: usize = state.lines.lines().iter().map(|l| l.judge_window.len()).sum();
        info!(
            "Beat: {:.2}, Time: {:.2}, Combo: {}, Judged: {}/{}, In window: {}, Touches: {}",
            beat,
            time,
            state.statistics.combo,
            state.statistics.counts.judged(),
            state.statistics.total_notes,
            in_window,
            state.touches.len()
        );
        state.last_log_time = time;
    }

    let completed = state.status != GameStatus::Finished
        && state.statistics.counts.judged() >= state.statistics.total_notes
        && time >= state.end_time;
    TickReport { beat, time, judgments: std::mem::take(&mut state.events), completed }
}
