//!
//! The hardware boundary.
//!
//! Everything below the animation engine is reduced to the [`PwmSink`]
//! trait: a duty-cycle write per channel, plus global start/stop of the PWM
//! peripheral. The [`LedController`] bundles a sink with the LED layout and
//! the timer period so the engine can scale brightness into counts.

use crate::color::LedType;
use crate::engine::Error;

/// Hardware backend for one LED package.
///
/// Implementations write duty cycles to the PWM compare registers (or to a
/// test recorder). `start` and `stop` gate the PWM peripheral as a whole;
/// they may be called redundantly and must tolerate that.
pub trait PwmSink {
    /// The number of PWM channels this sink drives
    fn channel_count(&self) -> usize;

    /// Write a duty cycle, in timer counts, to one channel
    fn set_duty_cycle(&mut self, channel: usize, duty: u16);

    /// Enable the PWM peripheral
    fn start(&mut self);

    /// Disable the PWM peripheral
    fn stop(&mut self);
}

/// A [`PwmSink`] paired with its LED layout and timer period.
pub struct LedController<S: PwmSink> {
    sink: S,
    led_type: LedType,
    max_duty_cycle: u16,
}

impl<S: PwmSink> LedController<S> {
    /// Bundle a sink with its layout and timer period.
    ///
    /// The sink must drive at least as many channels as the layout uses,
    /// and the timer period must be non-zero.
    pub fn new(sink: S, led_type: LedType, max_duty_cycle: u16) -> Result<Self, Error> {
        if sink.channel_count() < led_type.channel_count() {
            return Err(Error::InvalidLedType);
        }
        if max_duty_cycle == 0 {
            return Err(Error::InvalidArgument);
        }

        Ok(Self {
            sink,
            led_type,
            max_duty_cycle,
        })
    }

    /// The LED layout this controller drives
    pub fn led_type(&self) -> LedType {
        self.led_type
    }

    /// The number of PWM channels in use
    pub fn channel_count(&self) -> usize {
        self.led_type.channel_count()
    }

    /// The timer period, i.e. the duty cycle for full brightness
    pub fn max_duty_cycle(&self) -> u16 {
        self.max_duty_cycle
    }

    pub(crate) fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
