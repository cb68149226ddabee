use log::{debug, info};
use std::collections::VecDeque;
use std::time::Instant;

/// Rolling window of audio-position biases used to smooth song time.
pub const BIAS_WINDOW: usize = 60;

/// What the clock needs from an audio output.
pub trait AudioSource {
    /// Reported playback position in seconds; may jitter.
    fn position(&self) -> f64;
    fn duration(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn rate(&self) -> f64;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: f64);
    fn set_rate(&mut self, rate: f64);
}

/// Monotonic seconds.
pub trait WallClock {
    fn now(&self) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl WallClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    pub time: f64,
    /// True on the single tick that reaches the end of the song.
    pub completed: bool,
}

#[derive(Debug, Clone)]
struct Reference {
    song_time: f64,
    wall_time: f64,
    rate: f64,
    biases: VecDeque<f64>,
    bias_sum: f64,
}

impl Reference {
    fn new(song_time: f64, wall_time: f64, rate: f64) -> Self {
        Self { song_time, wall_time, rate, biases: VecDeque::with_capacity(BIAS_WINDOW), bias_sum: 0.0 }
    }

    fn push_bias(&mut self, bias: f64) -> f64 {
        if self.biases.len() == BIAS_WINDOW {
            if let Some(old) = self.biases.pop_front() {
                self.bias_sum -= old;
            }
        }
        self.biases.push_back(bias);
        self.bias_sum += bias;
        self.bias_sum / self.biases.len() as f64
    }
}

/// Smoothed song time over a jittery audio position.
pub struct PlaybackClock<A: AudioSource, W: WallClock = MonotonicClock> {
    audio: A,
    wall: W,
    state: ClockState,
    reference: Reference,
    time: f64,
    rate: f64,
    completed: bool,
}

impl<A: AudioSource, W: WallClock> PlaybackClock<A, W> {
    pub fn new(audio: A, wall: W) -> Self {
        let rate = audio.rate();
        let now = wall.now();
        Self {
            audio,
            wall,
            state: ClockState::Stopped,
            reference: Reference::new(0.0, now, 0.0),
            time: 0.0,
            rate,
            completed: false,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Re-takes the reference snapshot at the current estimate.
    fn rebase(&mut self) {
        let rate = if self.state == ClockState::Playing { self.rate } else { 0.0 };
        self.reference = Reference::new(self.time, self.wall.now(), rate);
    }

    pub fn play(&mut self) {
        if self.state == ClockState::Playing {
            return;
        }
        if self.state == ClockState::Finished {
            self.seek(0.0);
        }
        self.audio.play();
        self.time = self.audio.position();
        self.state = ClockState::Playing;
        self.rebase();
        info!("Playback started at {:.3}s (rate {}).", self.time, self.rate);
    }

    pub fn pause(&mut self) {
        if self.state != ClockState::Playing {
            return;
        }
        self.update();
        self.audio.pause();
        if self.state == ClockState::Playing {
            self.state = ClockState::Paused;
        }
        self.rebase();
        debug!("Playback paused at {:.3}s.", self.time);
    }

    pub fn resume(&mut self) {
        if self.state == ClockState::Paused {
            self.play();
        }
    }

    pub fn seek(&mut self, position: f64) {
        let duration = self.audio.duration();
        let target = position.clamp(0.0, duration.max(0.0));
        self.audio.seek(target);
        self.time = target;
        if target < duration {
            self.completed = false;
            if self.state == ClockState::Finished {
                self.state = ClockState::Paused;
            }
        }
        self.rebase();
        debug!("Seeked to {:.3}s.", target);
    }

    pub fn set_rate(&mut self, rate: f64) {
        if !(rate.is_finite() && rate > 0.0) {
            return;
        }
        self.update();
        self.audio.set_rate(rate);
        self.rate = rate;
        self.rebase();
    }

    /// Export mode: takes `time` as-is, bypassing the filter.
    pub fn set_time(&mut self, time: f64) -> ClockTick {
        let duration = self.audio.duration();
        self.time = time.clamp(0.0, duration.max(0.0));
        if self.time < duration {
            self.completed = false;
            if self.state == ClockState::Finished {
                self.state = ClockState::Paused;
            }
        }
        self.check_completion()
    }

    /// Export mode at a fixed frame rate.
    pub fn set_frame(&mut self, frame: u64, fps: f64) -> ClockTick {
        self.set_time(frame as f64 / fps)
    }

    pub fn update(&mut self) -> ClockTick {
        if self.state == ClockState::Playing {
            let r = &mut self.reference;
            let elapsed = self.wall.now() - r.wall_time;
            let bias = elapsed * r.rate - self.audio.position();
            let mean_bias = r.push_bias(bias);
            self.time = r.song_time + (elapsed - mean_bias - r.song_time) * r.rate;
        }
        self.check_completion()
    }

    fn check_completion(&mut self) -> ClockTick {
        let duration = self.audio.duration();
        let completed = !self.completed && self.time >= duration;
        if completed {
            self.completed = true;
            self.time = duration;
            if self.audio.is_playing() {
                self.audio.pause();
            }
            self.state = ClockState::Finished;
            info!("Playback finished at {:.3}s.", duration);
        }
        ClockTick { time: self.time, completed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<f64>>);

    impl ManualClock {
        fn advance(&self, dt: f64) {
            self.0.set(self.0.get() + dt);
        }
    }

    impl WallClock for ManualClock {
        fn now(&self) -> f64 {
            self.0.get()
        }
    }

    /// Audio that reports its position with seeded jitter.
    struct JitteryAudio {
        wall: ManualClock,
        base: f64,
        started_at: Option<f64>,
        rate: f64,
        duration: f64,
        jitter: f64,
        rng: RefCell<StdRng>,
    }

    impl JitteryAudio {
        fn new(wall: ManualClock, duration: f64, jitter: f64) -> Self {
            Self {
                wall,
                base: 0.0,
                started_at: None,
                rate: 1.0,
                duration,
                jitter,
                rng: RefCell::new(StdRng::seed_from_u64(7)),
            }
        }

        fn true_position(&self) -> f64 {
            match self.started_at {
                Some(t) => (self.base + (self.wall.now() - t) * self.rate).min(self.duration),
                None => self.base,
            }
        }
    }

    impl AudioSource for JitteryAudio {
        fn position(&self) -> f64 {
            let noise = if self.jitter > 0.0 {
                self.rng.borrow_mut().random_range(-self.jitter..self.jitter)
            } else {
                0.0
            };
            self.true_position() + noise
        }
        fn duration(&self) -> f64 {
            self.duration
        }
        fn is_playing(&self) -> bool {
            self.started_at.is_some()
        }
        fn rate(&self) -> f64 {
            self.rate
        }
        fn play(&mut self) {
            if self.started_at.is_none() {
                self.started_at = Some(self.wall.now());
            }
        }
        fn pause(&mut self) {
            self.base = self.true_position();
            self.started_at = None;
        }
        fn seek(&mut self, position: f64) {
            self.base = position;
            if self.started_at.is_some() {
                self.started_at = Some(self.wall.now());
            }
        }
        fn set_rate(&mut self, rate: f64) {
            self.base = self.true_position();
            if self.started_at.is_some() {
                self.started_at = Some(self.wall.now());
            }
            self.rate = rate;
        }
    }

    fn clock(duration: f64, jitter: f64) -> (ManualClock, PlaybackClock<JitteryAudio, ManualClock>) {
        let wall = ManualClock::default();
        let audio = JitteryAudio::new(wall.clone(), duration, jitter);
        (wall.clone(), PlaybackClock::new(audio, wall))
    }

    #[test]
    fn clean_audio_is_followed_exactly() {
        let (wall, mut clock) = clock(10.0, 0.0);
        clock.play();
        for _ in 0..30 {
            wall.advance(1.0 / 60.0);
            clock.update();
        }
        assert!((clock.time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn jitter_is_smoothed_towards_the_true_position() {
        let (wall, mut clock) = clock(100.0, 0.02);
        clock.play();
        let mut worst = 0.0f64;
        for frame in 0..600 {
            wall.advance(1.0 / 60.0);
            let tick = clock.update();
            if frame >= 120 {
                let truth = clock.audio().true_position();
                worst = worst.max((tick.time - truth).abs());
            }
        }
        // Raw samples stray up to 20ms; the smoothed estimate stays well inside that.
        assert!(worst < 0.01, "error {}", worst);
    }

    #[test]
    fn pause_freezes_time() {
        let (wall, mut clock) = clock(10.0, 0.0);
        clock.play();
        wall.advance(1.0);
        clock.update();
        clock.pause();
        let frozen = clock.time();
        wall.advance(3.0);
        assert_eq!(clock.update().time, frozen);
        assert_eq!(clock.state(), ClockState::Paused);
        clock.resume();
        wall.advance(0.5);
        assert!((clock.update().time - 1.5).abs() < 1e-9);
    }

    #[test]
    fn completion_fires_once_and_rearms_on_seek() {
        let (wall, mut clock) = clock(2.0, 0.0);
        clock.play();
        wall.advance(2.5);
        assert!(clock.update().completed);
        assert_eq!(clock.state(), ClockState::Finished);
        wall.advance(1.0);
        assert!(!clock.update().completed);
        assert_eq!(clock.time(), 2.0);

        clock.seek(1.0);
        clock.play();
        wall.advance(1.5);
        assert!(clock.update().completed);
    }

    #[test]
    fn export_frames_clamp_and_complete_once() {
        let (_, mut clock) = clock(1.0, 0.0);
        assert_eq!(clock.set_frame(30, 60.0).time, 0.5);
        assert_eq!(clock.set_time(-1.0).time, 0.0);
        assert!(clock.set_time(5.0).completed);
        assert!(!clock.set_time(5.0).completed);
        assert!(!clock.set_time(0.9).completed);
        assert!(clock.set_frame(60, 60.0).completed);
    }
}
