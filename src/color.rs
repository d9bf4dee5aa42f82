//!
//! Channel layouts and brightness buffers.
//!
//! A [`Color`] is a short buffer of 8-bit brightness levels, one per PWM
//! channel of the LED package. The number of channels is fixed by the
//! [`LedType`], from a bare single-color indicator up to an RGBW package.
//!
//! Brightness levels are always 0..=255; the conversion to timer counts
//! happens at the PWM boundary via [`brightness_to_duty`].

use smart_leds::RGB8;

/// Largest number of PWM channels any supported LED package uses.
pub const MAX_CHANNELS: usize = 4;

/// Full-scale brightness level.
pub const MAX_BRIGHTNESS: u8 = 255;

/// Supported LED package layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedType {
    /// One channel, a plain single-color LED
    Single,

    /// Two independent channels (e.g. a red/green bicolor package)
    Dual,

    /// Red, green, blue
    Rgb,

    /// Red, green, yellow
    Rgy,

    /// Red, green, blue, white
    Rgbw,
}

impl LedType {
    /// The number of PWM channels this layout drives
    pub const fn channel_count(self) -> usize {
        match self {
            LedType::Single => 1,
            LedType::Dual => 2,
            LedType::Rgb | LedType::Rgy => 3,
            LedType::Rgbw => 4,
        }
    }
}

/// A per-channel brightness tuple.
///
/// The buffer always holds [`MAX_CHANNELS`] bytes; only the first
/// `channel_count()` of them are meaningful. Unused trailing channels
/// stay zero, so two colors compare equal whenever their used channels do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    channels: [u8; MAX_CHANNELS],
    count: u8,
}

impl Color {
    /// A single-channel brightness
    pub const fn single(level: u8) -> Self {
        Self {
            channels: [level, 0, 0, 0],
            count: 1,
        }
    }

    /// A two-channel color
    pub const fn dual(c1: u8, c2: u8) -> Self {
        Self {
            channels: [c1, c2, 0, 0],
            count: 2,
        }
    }

    /// A red/green/blue color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            channels: [r, g, b, 0],
            count: 3,
        }
    }

    /// A red/green/yellow color
    pub const fn rgy(r: u8, g: u8, y: u8) -> Self {
        Self {
            channels: [r, g, y, 0],
            count: 3,
        }
    }

    /// A red/green/blue/white color
    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self {
            channels: [r, g, b, w],
            count: 4,
        }
    }

    /// An all-dark color spanning `channel_count` channels
    pub const fn dark(channel_count: usize) -> Self {
        Self {
            channels: [0; MAX_CHANNELS],
            count: channel_count as u8,
        }
    }

    /// The number of channels this color describes
    pub const fn channel_count(&self) -> usize {
        self.count as usize
    }

    /// The brightness levels, one per channel
    pub fn as_slice(&self) -> &[u8] {
        &self.channels[..self.count as usize]
    }

    /// Brightness level of a single channel (zero for unused channels)
    pub const fn channel(&self, index: usize) -> u8 {
        self.channels[index]
    }

    /// True if every channel is at zero brightness
    pub fn is_off(&self) -> bool {
        self.as_slice().iter().all(|&level| level == 0)
    }
}

impl From<RGB8> for Color {
    fn from(rgb: RGB8) -> Self {
        Color::rgb(rgb.r, rgb.g, rgb.b)
    }
}

/// Scale a brightness level into timer counts.
#[inline]
pub const fn brightness_to_duty(brightness: u8, max_duty_cycle: u16) -> u16 {
    ((brightness as u32 * max_duty_cycle as u32) / MAX_BRIGHTNESS as u32) as u16
}

/// Recover the brightness level a duty cycle corresponds to.
#[inline]
pub const fn duty_to_brightness(duty: u16, max_duty_cycle: u16) -> u8 {
    ((duty as u32 * MAX_BRIGHTNESS as u32) / max_duty_cycle as u32) as u8
}
