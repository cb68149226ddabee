use crate::game::beat::BeatFraction;
use crate::game::event::{EventData, EventTrack, SpeedTrack};
use crate::game::line::{EventLayer, ExtendedTracks, JudgeLine, LayerId, LineArena};
use crate::game::note::{Note, NoteKind, NoteState};
use crate::game::timing::TempoMap;
use crate::game::value::Value;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("line {line} names parent {parent}, but the chart has only {count} lines")]
    ParentOutOfRange { line: usize, parent: usize, count: usize },
    #[error("line {line} is its own ancestor")]
    ParentCycle { line: usize },
    #[error("chart JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read chart: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartMeta {
    pub name: String,
    pub charter: String,
    /// Milliseconds added to the song time before the chart starts.
    pub offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoPointData {
    #[serde(rename = "startTime")]
    pub start: BeatFraction,
    pub bpm: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventLayerData {
    pub alpha_events: Option<Vec<EventData>>,
    #[serde(rename = "moveXEvents")]
    pub move_x_events: Option<Vec<EventData>>,
    #[serde(rename = "moveYEvents")]
    pub move_y_events: Option<Vec<EventData>>,
    pub rotate_events: Option<Vec<EventData>>,
    pub speed_events: Option<Vec<EventData>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedData {
    #[serde(rename = "scaleXEvents")]
    pub scale_x_events: Option<Vec<EventData>>,
    #[serde(rename = "scaleYEvents")]
    pub scale_y_events: Option<Vec<EventData>>,
    pub incline_events: Option<Vec<EventData>>,
    pub color_events: Option<Vec<EventData>>,
    pub text_events: Option<Vec<EventData>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteData {
    #[serde(rename = "type")]
    pub kind: u8,
    pub start_time: BeatFraction,
    pub end_time: BeatFraction,
    pub position_x: f64,
    pub y_offset: f64,
    pub speed: f64,
    pub size: f64,
    pub alpha: f64,
    pub visible_time: f64,
    pub is_fake: bool,
    pub above: bool,
}

impl Default for NoteData {
    fn default() -> Self {
        Self {
            kind: NoteKind::Tap.code(),
            start_time: BeatFraction::default(),
            end_time: BeatFraction::default(),
            position_x: 0.0,
            y_offset: 0.0,
            speed: 1.0,
            size: 1.0,
            alpha: 255.0,
            visible_time: 999_999.0,
            is_fake: false,
            above: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineData {
    /// Index of the parent line; negative for none.
    pub father: i64,
    pub bpmfactor: f64,
    pub is_cover: bool,
    pub z_order: i32,
    /// Absent layers arrive as `null` and keep their slot.
    pub event_layers: Vec<Option<EventLayerData>>,
    pub extended: Option<ExtendedData>,
    pub notes: Vec<NoteData>,
}

impl Default for LineData {
    fn default() -> Self {
        Self {
            father: -1,
            bpmfactor: 1.0,
            is_cover: true,
            z_order: 0,
            event_layers: Vec::new(),
            extended: None,
            notes: Vec::new(),
        }
    }
}

/// The in-memory chart model, as deserialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartData {
    #[serde(rename = "META")]
    pub meta: ChartMeta,
    #[serde(rename = "BPMList")]
    pub bpm_list: Vec<TempoPointData>,
    #[serde(rename = "judgeLineList")]
    pub lines: Vec<LineData>,
}

impl ChartData {
    pub fn from_json(text: &str) -> Result<Self, ChartError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A chart ready to play: tempo map plus line arena with cached note timings.
#[derive(Debug, Clone)]
pub struct Chart {
    pub meta: ChartMeta,
    pub tempo: TempoMap,
    pub lines: LineArena,
    /// Notes that count towards score; fakes excluded.
    pub total_notes: u32,
}

impl Chart {
    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let text = std::fs::read_to_string(path)?;
        let chart = Self::build(ChartData::from_json(&text)?)?;
        info!(
            "Loaded chart '{}' from {:?}: {} lines, {} notes.",
            chart.meta.name,
            path,
            chart.lines.len(),
            chart.total_notes
        );
        Ok(chart)
    }

    pub fn build(data: ChartData) -> Result<Self, ChartError> {
        let points: Vec<(f64, f64)> =
            data.bpm_list.iter().map(|p| (p.start.to_beat(), p.bpm)).collect();
        let tempo = TempoMap::from_points(&points);

        let mut lines = Vec::with_capacity(data.lines.len());
        for (index, line_data) in data.lines.into_iter().enumerate() {
            lines.push(build_line(index, line_data, &tempo));
        }
        let total_notes = lines
            .iter()
            .flat_map(|line| line.notes.iter())
            .filter(|note| !note.is_fake)
            .count() as u32;
        let lines = LineArena::new(lines)?;

        Ok(Self { meta: data.meta, tempo, lines, total_notes })
    }

    /// Chart offset in seconds.
    pub fn offset_sec(&self) -> f64 {
        self.meta.offset / 1000.0
    }

    /// Song time at which the last note finishes.
    pub fn last_note_time(&self) -> f64 {
        self.lines
            .lines()
            .iter()
            .flat_map(|line| line.notes.iter())
            .map(|note| note.end_time)
            .fold(0.0, f64::max)
    }
}

fn track(raw: Option<Vec<EventData>>, default: f64) -> Option<EventTrack> {
    raw.filter(|events| !events.is_empty())
        .map(|events| EventTrack::new(events, Value::Scalar(default)))
}

fn build_line(index: usize, data: LineData, tempo: &TempoMap) -> JudgeLine {
    let mut line = JudgeLine::new(index, tempo, data.bpmfactor);
    line.parent = usize::try_from(data.father).ok();
    line.is_cover = data.is_cover;
    line.z_order = data.z_order;

    let mut layers = BTreeMap::new();
    for (slot, layer) in data.event_layers.into_iter().enumerate() {
        let Some(layer) = layer else {
            continue;
        };
        let Ok(id) = u8::try_from(slot) else {
            warn!("Line {}: ignoring event layer {} past the last layer id.", index, slot);
            continue;
        };
        layers.insert(
            LayerId(id),
            EventLayer {
                alpha: track(layer.alpha_events, 0.0),
                move_x: track(layer.move_x_events, 0.0),
                move_y: track(layer.move_y_events, 0.0),
                rotate: track(layer.rotate_events, 0.0),
                speed: layer.speed_events.filter(|e| !e.is_empty()).map(SpeedTrack::new),
            },
        );
    }
    line.layers = layers;

    if let Some(ext) = data.extended {
        line.extended = ExtendedTracks {
            scale_x: track(ext.scale_x_events, 1.0),
            scale_y: track(ext.scale_y_events, 1.0),
            incline: track(ext.incline_events, 0.0),
            color: ext
                .color_events
                .filter(|e| !e.is_empty())
                .map(|e| EventTrack::new(e, Value::Vector(vec![255.0, 255.0, 255.0]))),
            text: ext
                .text_events
                .filter(|e| !e.is_empty())
                .map(|e| EventTrack::new(e, Value::Text(String::new()))),
        };
    }

    line.notes = data.notes.into_iter().filter_map(|n| build_note(index, n)).collect();
    line.prepare_notes();
    line
}

fn build_note(line: usize, data: NoteData) -> Option<Note> {
    let Some(kind) = NoteKind::from_code(data.kind) else {
        warn!("Line {}: skipping note with unknown type {}.", line, data.kind);
        return None;
    };
    let start_beat = data.start_time.to_beat();
    let end_beat = if kind == NoteKind::Hold {
        let end = data.end_time.to_beat();
        if end < start_beat {
            warn!("Line {}: hold at beat {} ends before it starts.", line, data.start_time);
            start_beat
        } else {
            end
        }
    } else {
        start_beat
    };
    Some(Note {
        kind,
        start: data.start_time,
        start_beat,
        end_beat,
        position_x: data.position_x,
        y_offset: data.y_offset * data.speed,
        speed: data.speed,
        size: data.size,
        alpha: data.alpha,
        visible_time: data.visible_time,
        is_fake: data.is_fake,
        above: data.above,
        hit_time: 0.0,
        end_time: 0.0,
        floor: 0.0,
        tail_floor: 0.0,
        state: NoteState::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "META": { "name": "Sample", "offset": 50 },
        "BPMList": [
            { "startTime": [0, 0, 1], "bpm": 120 },
            { "startTime": [8, 0, 1], "bpm": 240 }
        ],
        "judgeLineList": [
            {
                "eventLayers": [
                    {
                        "speedEvents": [{ "startBeat": 0, "start": 10, "end": 10 }],
                        "alphaEvents": [{ "startBeat": 0, "start": 255, "end": 255 }]
                    },
                    null
                ],
                "notes": [
                    { "type": 1, "startTime": [10, 0, 1], "endTime": [10, 0, 1] },
                    { "type": 2, "startTime": [4, 1, 2], "endTime": [6, 0, 1], "yOffset": 10, "speed": 2 },
                    { "type": 9, "startTime": [1, 0, 1], "endTime": [1, 0, 1] },
                    { "type": 3, "startTime": [2, 0, 1], "endTime": [2, 0, 1], "isFake": true }
                ]
            },
            { "father": 0, "bpmfactor": 2.0, "notes": [] }
        ]
    }"#;

    #[test]
    fn builds_lines_and_caches_note_timing() {
        let chart = Chart::build(ChartData::from_json(CHART).unwrap()).unwrap();
        assert_eq!(chart.lines.len(), 2);
        assert_eq!(chart.total_notes, 2);
        assert!((chart.offset_sec() - 0.05).abs() < 1e-12);

        let line = chart.lines.get(0).unwrap();
        assert_eq!(line.layers.len(), 1);
        let kinds: Vec<NoteKind> = line.notes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoteKind::Flick, NoteKind::Hold, NoteKind::Tap]);

        let hold = &line.notes[1];
        assert!((hold.hit_time - 2.25).abs() < 1e-9);
        assert!((hold.end_time - 3.0).abs() < 1e-9);
        assert!((hold.floor - 22.5).abs() < 1e-9);
        assert!((hold.tail_floor - 30.0).abs() < 1e-9);
        assert_eq!(hold.y_offset, 20.0);

        // Beat 10 sits two beats into the 240 bpm section.
        let tap = &line.notes[2];
        assert!((tap.hit_time - 4.5).abs() < 1e-9);
        assert!((chart.last_note_time() - 4.5).abs() < 1e-9);

        assert_eq!(chart.lines.get(1).unwrap().parent, Some(0));
    }

    #[test]
    fn bezier_flag_decides_between_points_and_easing_type() {
        let json = r#"{
            "judgeLineList": [
                { "eventLayers": [{ "moveXEvents": [
                    { "startBeat": 0, "endBeat": 2, "start": 0, "end": 100,
                      "easingType": 5, "bezier": 0, "bezierPoints": [0, 0, 0, 0] }
                ] }] },
                { "eventLayers": [{ "moveXEvents": [
                    { "startBeat": 0, "endBeat": 2, "start": 0, "end": 100,
                      "easingType": 5, "bezier": 1, "bezierPoints": [0, 0, 0, 0] }
                ] }] }
            ]
        }"#;
        let mut chart = Chart::build(ChartData::from_json(json).unwrap()).unwrap();
        chart.lines.update(1.0);
        assert!((chart.lines.get(0).unwrap().local.x - 25.0).abs() < 1e-9);
        assert!((chart.lines.get(1).unwrap().local.x - 50.0).abs() < 1e-4);
    }

    #[test]
    fn bad_parents_fail_the_build() {
        let data = ChartData {
            lines: vec![LineData { father: 5, ..Default::default() }],
            ..Default::default()
        };
        let err = Chart::build(data).unwrap_err();
        assert!(matches!(err, ChartError::ParentOutOfRange { line: 0, parent: 5, count: 1 }));
        assert!(err.to_string().contains("parent 5"));
    }

    #[test]
    fn empty_chart_is_playable() {
        let chart = Chart::build(ChartData::default()).unwrap();
        assert!(chart.lines.is_empty());
        assert_eq!(chart.tempo.bpm_at(0.0), 120.0);
        assert_eq!(chart.last_note_time(), 0.0);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(ChartData::from_json("{ nope"), Err(ChartError::Json(_))));
    }
}
