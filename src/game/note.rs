use crate::game::beat::BeatFraction;
use crate::game::judgment::Judgment;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NoteKind {
    Tap = 1,
    Hold = 2,
    Flick = 3,
    Drag = 4,
}

impl NoteKind {
    /// Chart type code; lower codes win ties when a tap could hit several notes.
    #[inline(always)]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(NoteKind::Tap),
            2 => Some(NoteKind::Hold),
            3 => Some(NoteKind::Flick),
            4 => Some(NoteKind::Drag),
            _ => None,
        }
    }

    /// Flick and Drag resolve whole stacks when they win a tap.
    #[inline(always)]
    pub const fn resolves_stack(self) -> bool {
        matches!(self, NoteKind::Flick | NoteKind::Drag)
    }
}

/// Address of a note inside the line arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NoteId {
    pub line: usize,
    pub note: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoldState {
    /// Head judgment, fixed when the press lands.
    pub temp: Judgment,
    pub temp_judged_at: Option<f64>,
    pub last_input_time: Option<f64>,
}

/// Runtime judgment fields layered over the immutable chart data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteState {
    pub judgment: Judgment,
    /// Line beat at which `judgment` was fixed.
    pub judged_at: Option<f64>,
    pub hold: HoldState,
    pub in_window: bool,
    /// Song time of the tap delivered to this note, if any.
    pub tap_time: Option<f64>,
    /// Timing error of an early Flick/Drag input waiting for its beat.
    pub pending_perfect: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct Note {
    pub kind: NoteKind,
    pub start: BeatFraction,
    /// Line beats; equal to `start_beat` except for holds.
    pub start_beat: f64,
    pub end_beat: f64,
    pub position_x: f64,
    /// Already multiplied by `speed`.
    pub y_offset: f64,
    pub speed: f64,
    pub size: f64,
    pub alpha: f64,
    pub visible_time: f64,
    pub is_fake: bool,
    pub above: bool,
    pub hit_time: f64,
    pub end_time: f64,
    /// Line travel distance at the head and at the tail.
    pub floor: f64,
    pub tail_floor: f64,
    pub state: NoteState,
}

impl Note {
    #[inline(always)]
    pub fn is_hold(&self) -> bool {
        self.kind == NoteKind::Hold
    }

    /// Whether a tap landing now is spent on this note.
    #[inline(always)]
    pub fn consumes_tap(&self, line_beat: f64) -> bool {
        line_beat <= self.start_beat || self.kind != NoteKind::Drag
    }

    /// Half-width of the window in which the note takes input, in the units of `good` and `bad`.
    pub fn input_window(&self, good: f64, bad: f64) -> f64 {
        if self.kind == NoteKind::Tap { bad } else { good }
    }

    pub fn is_awaiting_head(&self) -> bool {
        self.state.judgment == Judgment::Unjudged
            && (!self.is_hold() || self.state.hold.temp == Judgment::Unjudged)
    }

    /// Clears every runtime field, as if the chart had just loaded.
    pub fn reset(&mut self) {
        self.state = NoteState::default();
    }
}
