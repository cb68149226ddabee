use crate::game::chart::ChartError;
use crate::game::event::{EventTrack, SpeedTrack};
use crate::game::judgment::Judgment;
use crate::game::note::{Note, NoteId};
use crate::game::timing::TempoMap;
use crate::game::value::Value;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chart space is centred on the origin with y pointing up.
pub const CHART_WIDTH: f64 = 1350.0;
pub const CHART_HEIGHT: f64 = 900.0;
/// One unit of travel distance (seconds at speed 1) in chart units.
pub const DISTANCE_TO_CHART_UNITS: f64 = CHART_HEIGHT * 2.0 / 15.0;
/// Along-line reach of a touch, in chart units.
pub const JUDGMENT_THRESHOLD: f64 = 180.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u8);

/// One stack of animation tracks; lines sum their layers.
#[derive(Debug, Clone, Default)]
pub struct EventLayer {
    pub alpha: Option<EventTrack>,
    pub move_x: Option<EventTrack>,
    pub move_y: Option<EventTrack>,
    pub rotate: Option<EventTrack>,
    pub speed: Option<SpeedTrack>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtendedTracks {
    pub scale_x: Option<EventTrack>,
    pub scale_y: Option<EventTrack>,
    pub incline: Option<EventTrack>,
    pub color: Option<EventTrack>,
    pub text: Option<EventTrack>,
}

/// What the summed line alpha means for the line and its notes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AlphaMode {
    /// Opacity in `[0, 1]`.
    Visible(f64),
    Hidden,
    /// Line hidden; notes only show on the side opposite to where they were authored.
    BelowOnly,
    /// Notes show only within this many chart units of the line.
    RevealWithin(f64),
    /// Notes vanish once within this many chart units of the line.
    HideWithin(f64),
}

impl AlphaMode {
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha >= 0.0 {
            AlphaMode::Visible((alpha / 255.0).min(1.0))
        } else if alpha == -2.0 {
            AlphaMode::BelowOnly
        } else if alpha >= -100.0 {
            AlphaMode::Hidden
        } else if alpha >= -1000.0 {
            AlphaMode::RevealWithin((-alpha - 100.0) / 10.0)
        } else {
            AlphaMode::HideWithin((-alpha - 1000.0) / 10.0)
        }
    }

    pub fn line_opacity(self) -> f64 {
        match self {
            AlphaMode::Visible(opacity) => opacity,
            _ => 0.0,
        }
    }
}

/// A line's state at one beat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineFrame {
    pub x: f64,
    pub y: f64,
    /// Clockwise, degrees.
    pub rotation_deg: f64,
    pub alpha: f64,
    pub travel_distance: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub incline: f64,
}

impl Default for LineFrame {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation_deg: 0.0,
            alpha: 0.0,
            travel_distance: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            incline: 0.0,
        }
    }
}

impl LineFrame {
    /// Unit vector along the line.
    #[inline(always)]
    pub fn direction(&self) -> [f64; 2] {
        let r = self.rotation_deg.to_radians();
        [r.cos(), -r.sin()]
    }

    /// Unit vector on the `above` side of the line.
    #[inline(always)]
    pub fn normal(&self) -> [f64; 2] {
        let r = self.rotation_deg.to_radians();
        [r.sin(), r.cos()]
    }

    /// Places a point given in this frame's rotated axes into the parent space.
    pub fn compose(&self, local_x: f64, local_y: f64) -> (f64, f64) {
        let r = self.rotation_deg.to_radians();
        let (sin, cos) = r.sin_cos();
        (self.x + local_x * cos + local_y * sin, self.y + local_y * cos - local_x * sin)
    }
}

/// Notes of one line that currently accept input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JudgeWindow {
    notes: Vec<usize>,
}

impl JudgeWindow {
    pub fn insert(&mut self, note: usize) -> bool {
        if self.notes.contains(&note) {
            return false;
        }
        self.notes.push(note);
        true
    }

    pub fn remove(&mut self, note: usize) -> bool {
        match self.notes.iter().position(|&n| n == note) {
            Some(pos) => {
                self.notes.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, note: usize) -> bool {
        self.notes.contains(&note)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.notes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }
}

#[derive(Debug, Clone)]
pub struct JudgeLine {
    pub index: usize,
    pub parent: Option<usize>,
    pub bpm_factor: f64,
    pub is_cover: bool,
    pub z_order: i32,
    /// The chart tempo map rescaled to this line's beats.
    pub tempo: TempoMap,
    pub layers: BTreeMap<LayerId, EventLayer>,
    pub extended: ExtendedTracks,
    pub notes: Vec<Note>,
    pub judge_window: JudgeWindow,
    /// Beat in line units at the last update.
    pub beat: f64,
    pub local: LineFrame,
    pub world: LineFrame,
    /// Line opacity in `[0, 1]`; zero for every negative alpha mode.
    pub opacity: f64,
    pub color: Option<Value>,
    pub text: Option<Value>,
}

impl JudgeLine {
    pub fn new(index: usize, chart_tempo: &TempoMap, bpm_factor: f64) -> Self {
        let bpm_factor = if bpm_factor.is_finite() && bpm_factor > 0.0 {
            bpm_factor
        } else {
            warn!("Line {} has bpm factor {}; using 1.", index, bpm_factor);
            1.0
        };
        let tempo = if bpm_factor == 1.0 {
            chart_tempo.clone()
        } else {
            let points: Vec<(f64, f64)> = chart_tempo
                .points()
                .iter()
                .map(|p| (p.beat / bpm_factor, p.bpm / bpm_factor))
                .collect();
            TempoMap::from_points(&points)
        };
        Self {
            index,
            parent: None,
            bpm_factor,
            is_cover: true,
            z_order: 0,
            tempo,
            layers: BTreeMap::new(),
            extended: ExtendedTracks::default(),
            notes: Vec::new(),
            judge_window: JudgeWindow::default(),
            beat: 0.0,
            local: LineFrame::default(),
            world: LineFrame::default(),
            opacity: 0.0,
            color: None,
            text: None,
        }
    }

    #[inline(always)]
    pub fn line_beat(&self, beat: f64) -> f64 {
        beat / self.bpm_factor
    }

    /// Summed travel distance of every layer's speed track at `line_beat`.
    fn travel_distance_at(layers: &mut BTreeMap<LayerId, EventLayer>, line_beat: f64, tempo: &TempoMap) -> f64 {
        layers
            .values_mut()
            .filter_map(|layer| layer.speed.as_mut())
            .map(|speed| speed.travel_distance_at(line_beat, tempo))
            .sum()
    }

    /// Evaluates every track at `beat` into `local`; `world` is left to the arena.
    pub fn evaluate(&mut self, beat: f64) {
        let line_beat = self.line_beat(beat);
        self.beat = line_beat;

        let mut frame = LineFrame::default();
        for layer in self.layers.values_mut() {
            if let Some(track) = layer.alpha.as_mut() {
                frame.alpha += track.scalar_at(line_beat);
            }
            if let Some(track) = layer.move_x.as_mut() {
                frame.x += track.scalar_at(line_beat);
            }
            if let Some(track) = layer.move_y.as_mut() {
                frame.y += track.scalar_at(line_beat);
            }
            if let Some(track) = layer.rotate.as_mut() {
                frame.rotation_deg += track.scalar_at(line_beat);
            }
        }
        frame.travel_distance = Self::travel_distance_at(&mut self.layers, line_beat, &self.tempo);

        let ext = &mut self.extended;
        if let Some(track) = ext.scale_x.as_mut() {
            frame.scale_x = track.scalar_at(line_beat);
        }
        if let Some(track) = ext.scale_y.as_mut() {
            frame.scale_y = track.scalar_at(line_beat);
        }
        if let Some(track) = ext.incline.as_mut() {
            frame.incline = track.scalar_at(line_beat);
        }
        self.color = ext.color.as_mut().map(|track| track.value_at(line_beat));
        self.text = ext.text.as_mut().map(|track| track.value_at(line_beat));

        self.opacity = AlphaMode::from_alpha(frame.alpha).line_opacity();
        self.local = frame;
        self.world = frame;
    }

    /// Caches hit times and floor positions. Notes are sorted by start beat.
    pub fn prepare_notes(&mut self) {
        self.notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));
        let mut layers = self.layers.clone();
        for note in &mut self.notes {
            note.hit_time = self.tempo.time_at(note.start_beat);
            note.end_time = self.tempo.time_at(note.end_beat);
            note.floor = Self::travel_distance_at(&mut layers, note.start_beat, &self.tempo);
        }
        // Tails in a second sweep so the cursors only walk forward per pass.
        for note in &mut self.notes {
            note.tail_floor = if note.is_hold() {
                Self::travel_distance_at(&mut layers, note.end_beat, &self.tempo)
            } else {
                note.floor
            };
        }
        debug!("Line {}: prepared {} notes.", self.index, self.notes.len());
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::from_alpha(self.world.alpha)
    }

    /// Splits `point - line origin` into `(along, perpendicular)` components.
    pub fn project(&self, point: [f64; 2]) -> (f64, f64) {
        let dx = point[0] - self.world.x;
        let dy = point[1] - self.world.y;
        let [ax, ay] = self.world.direction();
        let [nx, ny] = self.world.normal();
        (dx * ax + dy * ay, dx * nx + dy * ny)
    }

    /// Signed distance, in chart units, from the line to a note's head.
    pub fn note_distance(&self, note: &Note) -> f64 {
        (note.floor - self.world.travel_distance) * note.speed * DISTANCE_TO_CHART_UNITS + note.y_offset
    }

    pub fn note_tail_distance(&self, note: &Note) -> f64 {
        (note.tail_floor - self.world.travel_distance) * note.speed * DISTANCE_TO_CHART_UNITS
            + note.y_offset
    }

    /// Where a note's head sits in chart space.
    pub fn note_position(&self, note: &Note) -> [f64; 2] {
        let side = if note.above { 1.0 } else { -1.0 };
        let dist = self.note_distance(note) * side;
        let [ax, ay] = self.world.direction();
        let [nx, ny] = self.world.normal();
        [
            self.world.x + ax * note.position_x + nx * dist,
            self.world.y + ay * note.position_x + ny * dist,
        ]
    }

    pub fn is_note_visible(&self, note: &Note, song_time: f64) -> bool {
        let done = if note.is_hold() {
            note.state.judgment != Judgment::Unjudged && (!note.is_fake || song_time >= note.end_time)
        } else {
            note.state.judgment != Judgment::Unjudged || note.state.pending_perfect.is_some()
        };
        if done {
            return false;
        }
        if song_time < note.hit_time - note.visible_time {
            return false;
        }

        let dist = if note.is_hold() && song_time >= note.hit_time {
            self.note_tail_distance(note)
        } else {
            self.note_distance(note)
        };
        if self.is_cover && dist < 0.0 {
            return false;
        }

        match self.alpha_mode() {
            AlphaMode::Visible(_) => true,
            AlphaMode::Hidden => false,
            AlphaMode::BelowOnly => (if note.above { dist } else { -dist }) < 0.0,
            AlphaMode::RevealWithin(range) => dist <= range,
            AlphaMode::HideWithin(range) => dist > range,
        }
    }
}

/// Every judge line of a chart, addressed by index.
#[derive(Debug, Clone, Default)]
pub struct LineArena {
    lines: Vec<JudgeLine>,
    /// Parents before children.
    update_order: Vec<usize>,
}

impl LineArena {
    pub fn new(lines: Vec<JudgeLine>) -> Result<Self, ChartError> {
        let count = lines.len();
        for line in &lines {
            if let Some(parent) = line.parent {
                if parent >= count {
                    return Err(ChartError::ParentOutOfRange { line: line.index, parent, count });
                }
            }
        }

        // 0 = unvisited, 1 = on the current chain, 2 = placed.
        let mut marks = vec![0u8; count];
        let mut update_order = Vec::with_capacity(count);
        for start in 0..count {
            let mut chain = Vec::new();
            let mut cursor = Some(start);
            while let Some(i) = cursor {
                match marks[i] {
                    2 => break,
                    1 => return Err(ChartError::ParentCycle { line: i }),
                    _ => {
                        marks[i] = 1;
                        chain.push(i);
                        cursor = lines[i].parent;
                    }
                }
            }
            for &i in chain.iter().rev() {
                marks[i] = 2;
                update_order.push(i);
            }
        }

        Ok(Self { lines, update_order })
    }

    /// Evaluates every line at `beat` and resolves parent transforms.
    pub fn update(&mut self, beat: f64) {
        for &i in &self.update_order {
            self.lines[i].evaluate(beat);
            if let Some(parent) = self.lines[i].parent {
                let parent_frame = self.lines[parent].world;
                let line = &mut self.lines[i];
                let (x, y) = parent_frame.compose(line.local.x, line.local.y);
                line.world.x = x;
                line.world.y = y;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[JudgeLine] {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut [JudgeLine] {
        &mut self.lines
    }

    pub fn get(&self, index: usize) -> Option<&JudgeLine> {
        self.lines.get(index)
    }

    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.lines.get(id.line)?.notes.get(id.note)
    }

    pub fn note_ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.lines.iter().enumerate().flat_map(|(line, l)| {
            (0..l.notes.len()).map(move |note| NoteId { line, note })
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::beat::BeatFraction;
    use crate::game::easing::Easing;
    use crate::game::event::Event;
    use crate::game::note::{NoteKind, NoteState};

    fn constant(value: f64) -> EventTrack {
        EventTrack::from_events(vec![Event::new(
            0.0,
            f64::INFINITY,
            Value::Scalar(value),
            Value::Scalar(value),
            Easing::linear(),
        )])
    }

    fn line_at(index: usize, x: f64, y: f64, rotation: f64) -> JudgeLine {
        let mut line = JudgeLine::new(index, &TempoMap::default(), 1.0);
        line.layers.insert(
            LayerId(0),
            EventLayer {
                alpha: Some(constant(255.0)),
                move_x: Some(constant(x)),
                move_y: Some(constant(y)),
                rotate: Some(constant(rotation)),
                speed: Some(SpeedTrack::from_events(vec![Event::new(
                    0.0,
                    f64::INFINITY,
                    Value::Scalar(1.0),
                    Value::Scalar(1.0),
                    Easing::linear(),
                )])),
            },
        );
        line
    }

    fn tap(beat: i64) -> Note {
        Note {
            kind: NoteKind::Tap,
            start: BeatFraction::whole(beat),
            start_beat: beat as f64,
            end_beat: beat as f64,
            position_x: 0.0,
            y_offset: 0.0,
            speed: 1.0,
            size: 1.0,
            alpha: 255.0,
            visible_time: 999_999.0,
            is_fake: false,
            above: true,
            hit_time: 0.0,
            end_time: 0.0,
            floor: 0.0,
            tail_floor: 0.0,
            state: NoteState::default(),
        }
    }

    #[test]
    fn alpha_mode_boundaries() {
        assert_eq!(AlphaMode::from_alpha(255.0), AlphaMode::Visible(1.0));
        assert_eq!(AlphaMode::from_alpha(-1.0), AlphaMode::Hidden);
        assert_eq!(AlphaMode::from_alpha(-2.0), AlphaMode::BelowOnly);
        assert_eq!(AlphaMode::from_alpha(-100.0), AlphaMode::Hidden);
        assert_eq!(AlphaMode::from_alpha(-100.5), AlphaMode::RevealWithin(0.05));
        assert_eq!(AlphaMode::from_alpha(-1000.0), AlphaMode::RevealWithin(90.0));
        assert_eq!(AlphaMode::from_alpha(-1500.0), AlphaMode::HideWithin(50.0));
    }

    #[test]
    fn bpm_factor_scales_line_beats() {
        let tempo = TempoMap::from_points(&[(0.0, 120.0)]);
        let line = JudgeLine::new(0, &tempo, 2.0);
        assert_eq!(line.line_beat(8.0), 4.0);
        // Line beat 4 and chart beat 8 land on the same second.
        assert!((line.tempo.time_at(4.0) - tempo.time_at(8.0)).abs() < 1e-9);
        assert_eq!(JudgeLine::new(1, &tempo, 0.0).bpm_factor, 1.0);
    }

    #[test]
    fn child_follows_parent_rotation() {
        let parent = line_at(0, 100.0, 0.0, 90.0);
        let mut child = line_at(1, 10.0, 0.0, 0.0);
        child.parent = Some(0);
        let mut arena = LineArena::new(vec![parent, child]).unwrap();
        arena.update(1.0);
        let world = arena.get(1).unwrap().world;
        // A clockwise quarter turn sends local +x to -y.
        assert!((world.x - 100.0).abs() < 1e-9);
        assert!((world.y + 10.0).abs() < 1e-9);
        assert_eq!(arena.get(1).unwrap().local.x, 10.0);
    }

    #[test]
    fn parent_cycles_and_bad_indices_are_rejected() {
        let mut a = line_at(0, 0.0, 0.0, 0.0);
        let mut b = line_at(1, 0.0, 0.0, 0.0);
        a.parent = Some(1);
        b.parent = Some(0);
        assert!(matches!(LineArena::new(vec![a, b]), Err(ChartError::ParentCycle { .. })));

        let mut lone = line_at(0, 0.0, 0.0, 0.0);
        lone.parent = Some(0);
        assert!(matches!(LineArena::new(vec![lone]), Err(ChartError::ParentCycle { line: 0 })));

        let mut orphan = line_at(0, 0.0, 0.0, 0.0);
        orphan.parent = Some(3);
        assert!(matches!(
            LineArena::new(vec![orphan]),
            Err(ChartError::ParentOutOfRange { parent: 3, .. })
        ));
    }

    #[test]
    fn projection_splits_along_and_across() {
        let mut line = line_at(0, 0.0, 0.0, 90.0);
        line.evaluate(0.0);
        // Rotated a quarter turn clockwise, the line runs along -y.
        let (along, across) = line.project([0.0, -50.0]);
        assert!((along - 50.0).abs() < 1e-9);
        assert!(across.abs() < 1e-9);
    }

    #[test]
    fn notes_fall_towards_the_line() {
        let mut line = line_at(0, 0.0, 0.0, 0.0);
        line.notes.push(tap(4));
        line.prepare_notes();
        let note = line.notes[0].clone();
        assert!((note.hit_time - 2.0).abs() < 1e-9);
        assert!((note.floor - 2.0).abs() < 1e-9);

        line.evaluate(2.0);
        assert!((line.note_distance(&note) - 120.0).abs() < 1e-9);
        assert!(line.is_note_visible(&note, 1.0));
        let pos = line.note_position(&note);
        assert!((pos[1] - 120.0).abs() < 1e-9);

        line.evaluate(5.0);
        assert!(line.note_distance(&note) < 0.0);
        assert!(!line.is_note_visible(&note, 2.5));
        line.is_cover = false;
        assert!(line.is_note_visible(&note, 2.5));
    }

    #[test]
    fn negative_alpha_hides_notes() {
        let mut line = line_at(0, 0.0, 0.0, 0.0);
        line.notes.push(tap(4));
        line.prepare_notes();
        line.layers.get_mut(&LayerId(0)).unwrap().alpha = Some(constant(-50.0));
        line.evaluate(0.0);
        let note = line.notes[0].clone();
        assert!(!line.is_note_visible(&note, 0.0));
        assert_eq!(line.opacity, 0.0);

        line.layers.get_mut(&LayerId(0)).unwrap().alpha = Some(constant(-600.0));
        line.evaluate(0.0);
        // 240 chart units away and the reveal range is 50.
        assert!(!line.is_note_visible(&note, 0.0));
        line.evaluate(3.5);
        assert!(line.is_note_visible(&note, 1.75));
    }

    #[test]
    fn opacity_follows_summed_alpha() {
        let mut line = line_at(0, 0.0, 0.0, 0.0);
        line.layers.insert(
            LayerId(1),
            EventLayer { alpha: Some(constant(-127.5)), ..Default::default() },
        );
        line.evaluate(0.0);
        assert!((line.opacity - 0.5).abs() < 1e-12);

        line.layers.get_mut(&LayerId(1)).unwrap().alpha = Some(constant(100.0));
        line.evaluate(1.0);
        assert_eq!(line.opacity, 1.0);
    }

    #[test]
    fn judge_window_holds_each_note_once() {
        let mut window = JudgeWindow::default();
        assert!(window.insert(3));
        assert!(!window.insert(3));
        assert_eq!(window.len(), 1);
        assert!(window.remove(3));
        assert!(!window.remove(3));
        assert!(window.is_empty());
    }
}
