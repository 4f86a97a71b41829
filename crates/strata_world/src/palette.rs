// palette.rs - 256-entry RGBA8 voxel palette
//
// Index 0 is reserved for empty space and cannot be reassigned.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8 {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Palette {
    entries: Vec<Rgba8>, // always 256 entries
}

impl Palette {
    pub const LEN: usize = 256;

    pub fn new() -> Self {
        Self {
            entries: vec![Rgba8::TRANSPARENT; Self::LEN],
        }
    }

    /// Opaque grayscale ramp; handy default for generated worlds.
    pub fn grayscale() -> Self {
        let mut palette = Self::new();
        for index in 1..Self::LEN {
            let level = index as u8;
            palette.entries[index] = Rgba8::new(level, level, level, 255);
        }
        palette
    }

    pub fn get(&self, index: u8) -> Rgba8 {
        self.entries[index as usize]
    }

    /// Assign a palette entry. Index 0 stays the empty entry; writes to it
    /// are ignored.
    pub fn set(&mut self, index: u8, color: Rgba8) {
        if index == 0 {
            return;
        }
        self.entries[index as usize] = color;
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
