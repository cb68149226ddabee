use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputKind {
    Tap,
    /// Velocity in chart units per second.
    Drag { velocity: [f64; 2] },
    Release,
}

/// One edge from a pointer or key, timestamped in song seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    pub id: u32,
    pub time: f64,
    /// Chart-space position; `None` for keyboard input.
    pub position: Option<[f64; 2]>,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn tap(id: u32, time: f64, position: [f64; 2]) -> Self {
        Self { id, time, position: Some(position), kind: InputKind::Tap }
    }

    pub fn key_down(id: u32, time: f64) -> Self {
        Self { id, time, position: None, kind: InputKind::Tap }
    }

    pub fn drag(id: u32, time: f64, position: [f64; 2], velocity: [f64; 2]) -> Self {
        Self { id, time, position: Some(position), kind: InputKind::Drag { velocity } }
    }

    pub fn release(id: u32, time: f64) -> Self {
        Self { id, time, position: None, kind: InputKind::Release }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Touch {
    pub position: Option<[f64; 2]>,
    pub velocity: [f64; 2],
    pub down_time: f64,
    /// Set once this swipe has resolved a flick; cleared when it slows down.
    pub flick_consumed: bool,
}

impl Touch {
    #[inline(always)]
    pub fn speed(&self) -> f64 {
        self.velocity[0].hypot(self.velocity[1])
    }

    /// Keys have no velocity, so a held key counts as a flick once per frame.
    pub fn can_flick(&self, threshold: f64) -> bool {
        !self.flick_consumed && (self.position.is_none() || self.speed() >= threshold)
    }
}

/// Pointers and keys currently held down.
#[derive(Debug, Clone, Default)]
pub struct TouchSet {
    touches: HashMap<u32, Touch>,
}

impl TouchSet {
    /// Folds one event into the set. Returns true when it starts a new touch.
    pub fn apply(&mut self, event: &InputEvent, flick_threshold: f64) -> bool {
        match event.kind {
            InputKind::Tap => {
                let fresh = !self.touches.contains_key(&event.id);
                self.touches.insert(
                    event.id,
                    Touch {
                        position: event.position,
                        velocity: [0.0, 0.0],
                        down_time: event.time,
                        flick_consumed: false,
                    },
                );
                fresh
            }
            InputKind::Drag { velocity } => {
                let touch = self.touches.entry(event.id).or_insert(Touch {
                    position: event.position,
                    velocity,
                    down_time: event.time,
                    flick_consumed: false,
                });
                if event.position.is_some() {
                    touch.position = event.position;
                }
                touch.velocity = velocity;
                if touch.speed() < flick_threshold {
                    touch.flick_consumed = false;
                }
                false
            }
            InputKind::Release => {
                self.touches.remove(&event.id);
                false
            }
        }
    }

    /// Lets held keys flick again; pointers re-arm only by slowing down.
    pub fn rearm_keys(&mut self) {
        for touch in self.touches.values_mut().filter(|t| t.position.is_none()) {
            touch.flick_consumed = false;
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Touch> {
        self.touches.values_mut()
    }

    pub fn len(&self) -> usize {
        self.touches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.touches.is_empty()
    }

    pub fn clear(&mut self) {
        self.touches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_follow_their_edges() {
        let mut set = TouchSet::default();
        assert!(set.apply(&InputEvent::tap(1, 0.0, [10.0, 0.0]), 75.0));
        assert!(!set.apply(&InputEvent::drag(1, 0.1, [20.0, 0.0], [100.0, 0.0]), 75.0));
        let touch = set.touches[&1];
        assert_eq!(touch.position, Some([20.0, 0.0]));
        assert!(touch.can_flick(75.0));
        set.apply(&InputEvent::release(1, 0.2), 75.0);
        assert!(set.is_empty());
    }

    #[test]
    fn flick_rearms_after_slowing_down() {
        let mut set = TouchSet::default();
        set.apply(&InputEvent::tap(7, 0.0, [0.0, 0.0]), 75.0);
        set.apply(&InputEvent::drag(7, 0.05, [0.0, 10.0], [0.0, 200.0]), 75.0);
        for touch in set.iter_mut() {
            touch.flick_consumed = true;
        }
        set.apply(&InputEvent::drag(7, 0.1, [0.0, 20.0], [0.0, 150.0]), 75.0);
        assert!(!set.touches[&7].can_flick(75.0));
        set.apply(&InputEvent::drag(7, 0.2, [0.0, 21.0], [0.0, 10.0]), 75.0);
        set.apply(&InputEvent::drag(7, 0.25, [0.0, 40.0], [0.0, 90.0]), 75.0);
        assert!(set.touches[&7].can_flick(75.0));
    }

    #[test]
    fn held_keys_flick_again_after_rearming() {
        let mut set = TouchSet::default();
        set.apply(&InputEvent::key_down(2, 0.0), 75.0);
        set.apply(&InputEvent::tap(3, 0.0, [0.0, 0.0]), 75.0);
        assert!(set.touches[&2].can_flick(75.0));
        for touch in set.iter_mut() {
            touch.flick_consumed = true;
        }
        set.rearm_keys();
        assert!(set.touches[&2].can_flick(75.0));
        assert!(set.touches[&3].flick_consumed);
        assert_eq!(set.len(), 2);
    }
}
