use linesync::config;
use linesync::core::clock::{AudioSource, MonotonicClock, PlaybackClock};
use linesync::core::input::InputEvent;
use linesync::game::chart::{Chart, ChartData};
use linesync::game::gameplay::{self, GameStatus};
use linesync::game::judgment::StatisticsSnapshot;
use linesync::game::note::NoteKind;
use log::{error, info, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const EXPORT_FPS: f64 = 60.0;
/// Seconds of silence played after the last note.
const TAIL_PADDING: f64 = 1.0;
/// Spread of the simulated player's timing, in seconds.
const PLAYER_SPREAD: f64 = 0.06;

/// Audio stand-in for export mode: never plays, only remembers where it was put.
struct SilentTrack {
    position: f64,
    duration: f64,
}

impl AudioSource for SilentTrack {
    fn position(&self) -> f64 {
        self.position
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn is_playing(&self) -> bool {
        false
    }
    fn rate(&self) -> f64 {
        1.0
    }
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn seek(&mut self, position: f64) {
        self.position = position;
    }
    fn set_rate(&mut self, _rate: f64) {}
}

/// Wall-clock driven track whose reported position wobbles like a real driver.
struct JitteryTrack {
    started: Option<Instant>,
    base: f64,
    rate: f64,
    duration: f64,
    jitter: f64,
    rng: RefCell<StdRng>,
}

impl JitteryTrack {
    fn true_position(&self) -> f64 {
        let running = self.started.map_or(0.0, |s| s.elapsed().as_secs_f64() * self.rate);
        (self.base + running).min(self.duration)
    }
}

impl AudioSource for JitteryTrack {
    fn position(&self) -> f64 {
        let noise = self.rng.borrow_mut().random_range(-self.jitter..=self.jitter);
        self.true_position() + noise
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn is_playing(&self) -> bool {
        self.started.is_some()
    }
    fn rate(&self) -> f64 {
        self.rate
    }
    fn play(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }
    fn pause(&mut self) {
        self.base = self.true_position();
        self.started = None;
    }
    fn seek(&mut self, position: f64) {
        self.base = position;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
    fn set_rate(&mut self, rate: f64) {
        self.base = self.true_position();
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
        self.rate = rate;
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Results {
    chart: String,
    played_at: String,
    autoplay: bool,
    statistics: StatisticsSnapshot,
}

fn demo_chart() -> Result<ChartData, serde_json::Error> {
    let mut notes = Vec::new();
    for beat in 0..32i64 {
        let kind = match beat % 8 {
            3 => NoteKind::Flick,
            5 | 6 => NoteKind::Drag,
            7 => NoteKind::Hold,
            _ => NoteKind::Tap,
        };
        let end = if kind == NoteKind::Hold { beat + 2 } else { beat };
        notes.push(serde_json::json!({
            "type": kind.code(),
            "startTime": [beat + 4, 0, 1],
            "endTime": [end + 4, 0, 1],
            "positionX": ((beat % 5) as f64 - 2.0) * 120.0,
        }));
    }
    serde_json::from_value(serde_json::json!({
        "META": { "name": "Demo", "charter": "linesync", "offset": 0 },
        "BPMList": [
            { "startTime": [0, 0, 1], "bpm": 150 },
            { "startTime": [20, 0, 1], "bpm": 180 }
        ],
        "judgeLineList": [{
            "eventLayers": [{
                "speedEvents": [
                    { "startBeat": 0, "endBeat": 16, "start": 8, "end": 12, "easingType": 2 },
                    { "startBeat": 16, "start": 12, "end": 12 }
                ],
                "alphaEvents": [{ "startBeat": 0, "start": 255, "end": 255 }],
                "rotateEvents": [
                    { "startBeat": 16, "endBeat": 24, "start": 0, "end": 15, "easingType": 6 }
                ]
            }],
            "notes": notes
        }]
    }))
}

/// Presses for every note with a little human spread.
fn simulate_player(chart: &Chart, seed: u64) -> Vec<InputEvent> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut events = Vec::new();
    let offset = chart.offset_sec();
    let mut id = 0u32;
    for line in chart.lines.lines() {
        for note in line.notes.iter().filter(|n| !n.is_fake) {
            id += 1;
            let press = note.hit_time + offset + rng.random_range(-PLAYER_SPREAD..=PLAYER_SPREAD);
            events.push(InputEvent::key_down(id, press));
            let release = match note.kind {
                NoteKind::Hold => note.end_time + offset,
                _ => press + 0.05,
            };
            events.push(InputEvent::release(id, release));
        }
    }
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

fn run_export(state: &mut gameplay::State, inputs: &[InputEvent], duration: f64) {
    let mut clock = PlaybackClock::new(SilentTrack { position: 0.0, duration }, MonotonicClock::default());
    let mut next_input = 0;
    let mut frame = 0u64;
    loop {
        let tick = clock.set_frame(frame, EXPORT_FPS);
        while next_input < inputs.len() && inputs[next_input].time <= tick.time {
            gameplay::queue_input(state, inputs[next_input]);
            next_input += 1;
        }
        gameplay::update(state, tick.time);
        if tick.completed {
            break;
        }
        frame += 1;
    }
}

fn run_realtime(state: &mut gameplay::State, inputs: &[InputEvent], duration: f64) {
    let track = JitteryTrack {
        started: None,
        base: 0.0,
        rate: state.time_scale,
        duration,
        jitter: 0.015,
        rng: RefCell::new(StdRng::seed_from_u64(rand::rng().random())),
    };
    let mut clock = PlaybackClock::new(track, MonotonicClock::default());
    clock.set_rate(state.time_scale);
    clock.play();
    let mut next_input = 0;
    loop {
        let tick = clock.update();
        while next_input < inputs.len() && inputs[next_input].time <= tick.time {
            gameplay::queue_input(state, inputs[next_input]);
            next_input += 1;
        }
        gameplay::update(state, tick.time);
        if tick.completed {
            break;
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("linesync::game::timing", LevelFilter::Warn)
        .filter_module("linesync::game::event", LevelFilter::Warn)
        .init();

    info!("linesync starting...");
    config::load();
    let prefs = config::get();

    let mut chart_path: Option<PathBuf> = None;
    let mut realtime = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--realtime" => realtime = true,
            _ => chart_path = Some(PathBuf::from(arg)),
        }
    }

    let chart = match &chart_path {
        Some(path) => Chart::load(path),
        None => {
            info!("No chart given; playing the built-in demo.");
            demo_chart().map_err(Into::into).and_then(Chart::build)
        }
    };
    let chart = match chart {
        Ok(chart) => chart,
        Err(e) => {
            error!("Failed to load chart: {}", e);
            return Err(e.into());
        }
    };

    let name = chart.meta.name.clone();
    let duration = chart.last_note_time() + chart.offset_sec() + TAIL_PADDING;
    let inputs = if prefs.autoplay { Vec::new() } else { simulate_player(&chart, 0x5eed) };
    let mut state = gameplay::init(chart, &prefs);

    if realtime {
        info!("Playing in real time ({:.1}s).", duration);
        run_realtime(&mut state, &inputs, duration);
    } else {
        info!("Exporting at {} fps ({:.1}s).", EXPORT_FPS, duration);
        run_export(&mut state, &inputs, duration);
    }
    gameplay::finish(&mut state);
    debug_assert_eq!(state.status, GameStatus::Finished);

    let results = Results {
        chart: name,
        played_at: chrono::Local::now().to_rfc3339(),
        autoplay: prefs.autoplay,
        statistics: state.statistics.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
