//! Joypad matrix (P1, `$FF00`).
//!
//! Bits 4 and 5 select the direction and button rows (active low). The low
//! nibble reports the selected rows, where a pressed key reads as 0.

use emu_core::memory::Addressable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// (is a direction key, bit within its row)
    fn line(self) -> (bool, u8) {
        match self {
            Button::Right => (true, 0x01),
            Button::Left => (true, 0x02),
            Button::Up => (true, 0x04),
            Button::Down => (true, 0x08),
            Button::A => (false, 0x01),
            Button::B => (false, 0x02),
            Button::Select => (false, 0x04),
            Button::Start => (false, 0x08),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joypad {
    select: u8,
    directions: u8,
    buttons: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self {
            select: 0x30,
            directions: 0x0F,
            buttons: 0x0F,
        }
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    fn row_mut(&mut self, direction: bool) -> &mut u8 {
        if direction {
            &mut self.directions
        } else {
            &mut self.buttons
        }
    }

    /// Returns true when the key was up before, i.e. the interrupt should fire
    pub fn press(&mut self, button: Button) -> bool {
        let (direction, bit) = button.line();
        let row = self.row_mut(direction);
        let was_released = *row & bit != 0;
        *row &= !bit;
        was_released
    }

    pub fn release(&mut self, button: Button) {
        let (direction, bit) = button.line();
        *self.row_mut(direction) |= bit;
    }
}

impl Addressable for Joypad {
    fn name(&self) -> &str {
        "Joypad"
    }

    fn read(&self, _addr: u16) -> u8 {
        let mut low = 0x0F;
        if self.select & 0x10 == 0 {
            low &= self.directions;
        }
        if self.select & 0x20 == 0 {
            low &= self.buttons;
        }
        0xC0 | self.select | low
    }

    fn write(&mut self, _addr: u16, val: u8) {
        self.select = val & 0x30;
    }
}
