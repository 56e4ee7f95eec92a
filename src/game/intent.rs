//! Normalized player intents
//!
//! Raw key/mouse plumbing lives in the client shell; it only has to report
//! which bindings are held and where the cursor meets the ground plane.

use std::collections::HashSet;

/// Logical bindings the simulation understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Forward,
    Back,
    Left,
    Right,
    Fire,
}

impl Binding {
    /// Map a lower-cased key name (`KeyboardEvent.key` style) to a binding
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "w" | "arrowup" => Some(Self::Forward),
            "s" | "arrowdown" => Some(Self::Back),
            "a" | "arrowleft" => Some(Self::Left),
            "d" | "arrowright" => Some(Self::Right),
            " " | "space" => Some(Self::Fire),
            _ => None,
        }
    }
}

/// Held bindings plus the last known aim point
#[derive(Debug, Clone, Default)]
pub struct KeyState {
    held: HashSet<Binding>,
    aim_x: f32,
    aim_z: f32,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for keys the game ignores
    pub fn press(&mut self, key: &str) -> bool {
        match Binding::from_key(&key.to_lowercase()) {
            Some(binding) => {
                self.held.insert(binding);
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self, key: &str) {
        if let Some(binding) = Binding::from_key(&key.to_lowercase()) {
            self.held.remove(&binding);
        }
    }

    /// Cursor position projected onto the ground plane
    pub fn aim_at(&mut self, world_x: f32, world_z: f32) {
        self.aim_x = world_x;
        self.aim_z = world_z;
    }

    pub fn is_held(&self, binding: Binding) -> bool {
        self.held.contains(&binding)
    }

    /// Collapse the held bindings into this frame's intent
    pub fn intent(&self) -> InputIntent {
        let axis = |neg: Binding, pos: Binding| {
            let mut v = 0.0;
            if self.is_held(neg) {
                v -= 1.0;
            }
            if self.is_held(pos) {
                v += 1.0;
            }
            v
        };

        InputIntent {
            move_x: axis(Binding::Left, Binding::Right),
            move_z: axis(Binding::Forward, Binding::Back),
            aim_x: self.aim_x,
            aim_z: self.aim_z,
            fire: self.is_held(Binding::Fire),
        }
    }
}

/// One frame of player intent. Each move axis is in `[-1, 1]`; the axes are
/// not normalized against each other, so diagonal movement is faster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputIntent {
    pub move_x: f32,
    pub move_z: f32,
    pub aim_x: f32,
    pub aim_z: f32,
    pub fire: bool,
}

impl InputIntent {
    /// Clamp axes into range
    pub fn sanitized(self) -> Self {
        Self {
            move_x: self.move_x.clamp(-1.0, 1.0),
            move_z: self.move_z.clamp(-1.0, 1.0),
            ..self
        }
    }
}
