//! Edge flags - bit-packed direction, access, speed and shortcut marker
//!
//! Layout (u32, stored in the edge record's flags slot):
//!
//!   bit  0      forward   (node_a → node_b traversable)
//!   bit  1      backward  (node_b → node_a traversable)
//!   bit  2      shortcut  (edge created by CH contraction)
//!   bits 3-5    access    (bit 3 + Mode as u8)
//!   bits 8-15   speed     (km/h, 0..=255)
//!
//! Flags are always stored from node_a's point of view. Iterators hand out
//! flags oriented from the base node, swapping forward/backward as needed.

use std::fmt;
use std::str::FromStr;

use butterfly_common::{suggest_correction, Error};
use serde::{Deserialize, Serialize};

pub mod bits {
    pub const FORWARD: u32 = 1 << 0;
    pub const BACKWARD: u32 = 1 << 1;
    pub const BOTH: u32 = FORWARD | BACKWARD;
    pub const SHORTCUT: u32 = 1 << 2;
    pub const ACCESS_SHIFT: u32 = 3;
    pub const ACCESS_MASK: u32 = 0b111 << ACCESS_SHIFT;
    pub const SPEED_SHIFT: u32 = 8;
    pub const SPEED_MASK: u32 = 0xFF << SPEED_SHIFT;
}

/// Speed written by `EdgeFlags::default_flags` (km/h)
pub const DEFAULT_SPEED_KMH: u32 = 50;

/// Travel mode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    #[default]
    Car = 0,
    Bike = 1,
    Foot = 2,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Mode::Car, Mode::Bike, Mode::Foot]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Car => "car",
            Mode::Bike => "bike",
            Mode::Foot => "foot",
        }
    }

    pub fn from_u8(v: u8) -> Option<Mode> {
        match v {
            0 => Some(Mode::Car),
            1 => Some(Mode::Bike),
            2 => Some(Mode::Foot),
            _ => None,
        }
    }

    #[inline]
    fn access_bit(self) -> u32 {
        1 << (bits::ACCESS_SHIFT + self as u32)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(mode) = Mode::all()
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
        {
            return Ok(*mode);
        }

        let names: Vec<&str> = Mode::all().iter().map(|m| m.name()).collect();
        let msg = match suggest_correction(s.trim(), &names) {
            Some(suggestion) => format!("unknown mode '{s}', did you mean '{suggestion}'?"),
            None => format!("unknown mode '{s}', expected one of: {}", names.join(", ")),
        };
        Err(Error::Config(msg))
    }
}

impl TryFrom<String> for Mode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.name().to_string()
    }
}

/// Bit-packed edge flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EdgeFlags(u32);

impl EdgeFlags {
    /// Flags matching no direction: the edge exists but is never traversed
    pub const HIDDEN: EdgeFlags = EdgeFlags(0);

    pub const fn from_bits(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Flags for an edge open to every mode at `DEFAULT_SPEED_KMH`
    pub fn default_flags(both_directions: bool) -> Self {
        Self::new(Mode::all(), DEFAULT_SPEED_KMH, true, both_directions)
    }

    /// Build flags; speeds above 255 km/h are clamped to the 8-bit field
    pub fn new(modes: &[Mode], speed_kmh: u32, forward: bool, backward: bool) -> Self {
        let mut raw = 0;
        if forward {
            raw |= bits::FORWARD;
        }
        if backward {
            raw |= bits::BACKWARD;
        }
        for mode in modes {
            raw |= mode.access_bit();
        }
        raw |= speed_kmh.min(0xFF) << bits::SPEED_SHIFT;
        Self(raw)
    }

    /// Flags for a CH shortcut usable by `mode`
    pub fn shortcut(mode: Mode, forward: bool, backward: bool) -> Self {
        let mut flags = Self::new(&[mode], 0, forward, backward);
        flags.0 |= bits::SHORTCUT;
        flags
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        self.0 & bits::FORWARD != 0
    }

    #[inline]
    pub fn is_backward(self) -> bool {
        self.0 & bits::BACKWARD != 0
    }

    #[inline]
    pub fn is_both_directions(self) -> bool {
        self.0 & bits::BOTH == bits::BOTH
    }

    #[inline]
    pub fn is_shortcut(self) -> bool {
        self.0 & bits::SHORTCUT != 0
    }

    #[inline]
    pub fn has_access(self, mode: Mode) -> bool {
        self.0 & mode.access_bit() != 0
    }

    #[inline]
    pub fn speed_kmh(self) -> u32 {
        (self.0 & bits::SPEED_MASK) >> bits::SPEED_SHIFT
    }

    /// Same flags seen from the other endpoint
    #[inline]
    pub fn swap_direction(self) -> Self {
        let dir = self.0 & bits::BOTH;
        if dir == bits::BOTH || dir == 0 {
            return self;
        }
        Self(self.0 ^ bits::BOTH)
    }

    /// Copy with the direction bits replaced
    pub fn with_direction(self, forward: bool, backward: bool) -> Self {
        let mut raw = self.0 & !bits::BOTH;
        if forward {
            raw |= bits::FORWARD;
        }
        if backward {
            raw |= bits::BACKWARD;
        }
        Self(raw)
    }
}

impl fmt::Display for EdgeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match (self.is_forward(), self.is_backward()) {
            (true, true) => "<->",
            (true, false) => "->",
            (false, true) => "<-",
            (false, false) => "x",
        };
        write!(f, "{dir}")?;
        for mode in Mode::all() {
            if self.has_access(*mode) {
                write!(f, " {mode}")?;
            }
        }
        if self.is_shortcut() {
            write!(f, " shortcut")?;
        } else {
            write!(f, " {}km/h", self.speed_kmh())?;
        }
        Ok(())
    }
}
