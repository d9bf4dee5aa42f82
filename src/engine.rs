//!
//! The animation engine.
//!
//! An [`Animator`] drives one LED package. The host queues a borrowed
//! [`Animation`] descriptor, calls [`start`], and then feeds the engine the
//! current millisecond tick on every pass of its main loop:
//!
//! * Each [`Animation`] is an immutable, caller-owned configuration record
//! * [`Animator::update`] computes the duty cycle of every channel for the
//!     current tick and writes it to the [`PwmSink`]
//! * Finite animations count down their repeat budget and report
//!     [`Event::Completed`] through the callback when it drains
//! * [`Animator::current_color`] reads back the last emitted brightness
//!     levels, which is what the transition layer keys its decisions on
//!
//! The engine never blocks, never allocates, and deduplicates identical
//! ticks, so it is safe to poll as fast as the host loop spins.
//!
//! [`start`]: Animator::start
//! [`PwmSink`]: crate::controller::PwmSink

use heapless::Vec;

use crate::color::{brightness_to_duty, duty_to_brightness, Color, MAX_CHANNELS};
use crate::controller::{LedController, PwmSink};
use crate::curve::{interpolate, Curve};

/// Errors reported by the engine and the transition layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A descriptor color does not match the controller's channel layout
    InvalidColor,

    /// A brightness level is outside the usable range
    InvalidBrightness,

    /// The requested pattern is not available for this LED
    PatternNotSupported,

    /// A descriptor was handed to a setter for a different animation kind
    InvalidAnimationType,

    /// The PWM sink does not provide enough channels for the LED layout
    InvalidLedType,

    /// A malformed argument (wrong slice length, empty transition map)
    InvalidArgument,

    /// A computed duty cycle exceeds the timer period
    InvalidValue,

    /// The transition manager is mid-transition; retry once it drains
    Busy,
}

/// Lifecycle notifications delivered through the event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// An animation began executing
    Started,

    /// A finite animation ran out of repeats
    Completed,

    /// The animation was stopped by the host
    Stopped,

    /// A transition left Idle and began arbitrating
    TransitionStarted,

    /// A transition finished and the target animation was installed
    TransitionCompleted,

    /// A transition was skipped because its conditions were already met
    TransitionSkipped,

    /// The engine hit an error mid-update and halted output
    Error(Error),
}

impl Event {
    /// True for the error notification, false for every lifecycle event
    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error(_))
    }
}

/// Receives `(kind, event, descriptor)` for every notification.
///
/// One callback serves both the engine and the transition manager wrapping
/// it. The descriptor is the engine's currently queued animation, if any.
pub type EventCallback = dyn FnMut(AnimationKind, Event, Option<&Animation>);

/// Tag identifying an animation variant, plus the engine-internal idle tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnimationKind {
    /// Nothing queued; `update` is a no-op
    None,
    /// One-shot switch to all channels dark
    Off,
    Solid,
    Blink,
    Flash,
    Breath,
    Pulse,
    FadeIn,
    FadeOut,
    AlternatingColors,
    ColorCycle,
}

/// An immutable animation configuration.
///
/// Descriptors are owned by the caller and handed to the engine by
/// reference; they must outlive the animation. Multi-color variants borrow
/// their color table the same way. Repeat counts are signed: `-1` (or any
/// negative value) repeats forever, a positive value runs that many cycles,
/// and `0` is treated as already complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation<'a> {
    /// Switch every channel off, once
    Off,

    /// Hold one color, forever or for a fixed time
    Solid {
        color: Color,
        /// Display time in milliseconds; 0 keeps the color indefinitely
        execution_ms: u32,
    },

    /// Symmetric on/off square wave
    Blink {
        color: Color,
        /// One full on/off cycle in milliseconds
        period_ms: u16,
        repeat: i8,
    },

    /// Asymmetric on/off square wave
    Flash {
        color: Color,
        on_ms: u16,
        off_ms: u16,
        repeat: i8,
    },

    /// Smooth rise-and-fall ramp
    Breath {
        color: Color,
        rise_ms: u16,
        fall_ms: u16,
        repeat: i8,
        /// Start bright and dip to dark instead
        invert: bool,
    },

    /// Ramp from dark up to the color
    FadeIn {
        color: Color,
        duration_ms: u16,
        repeat: i8,
    },

    /// Ramp from the color down to dark
    FadeOut {
        color: Color,
        duration_ms: u16,
        repeat: i8,
    },

    /// Rise, hold bright, fall, hold dark
    Pulse {
        color: Color,
        rise_ms: u16,
        hold_on_ms: u16,
        fall_ms: u16,
        hold_off_ms: u16,
        repeat: i8,
    },

    /// Hard-switch through a color table, one slot per `duration_ms`
    AlternatingColors {
        colors: &'a [Color],
        duration_ms: u16,
        repeat: i8,
    },

    /// Cross-fade through a color table, holding then blending per slot
    ColorCycle {
        colors: &'a [Color],
        transition_ms: u16,
        hold_ms: u16,
        repeat: i8,
        /// Keep showing the final color instead of clearing on completion
        leave_last_color: bool,
    },
}

impl<'a> Animation<'a> {
    /// The tag for this descriptor
    pub fn kind(&self) -> AnimationKind {
        match self {
            Animation::Off => AnimationKind::Off,
            Animation::Solid { .. } => AnimationKind::Solid,
            Animation::Blink { .. } => AnimationKind::Blink,
            Animation::Flash { .. } => AnimationKind::Flash,
            Animation::Breath { .. } => AnimationKind::Breath,
            Animation::Pulse { .. } => AnimationKind::Pulse,
            Animation::FadeIn { .. } => AnimationKind::FadeIn,
            Animation::FadeOut { .. } => AnimationKind::FadeOut,
            Animation::AlternatingColors { .. } => AnimationKind::AlternatingColors,
            Animation::ColorCycle { .. } => AnimationKind::ColorCycle,
        }
    }

    /// Whether the first tick of this animation shows a lit LED.
    ///
    /// Used when planning a cross-fade: an animation that begins dark is
    /// faded toward black rather than toward its nominal color.
    pub fn starts_high(&self) -> bool {
        match self {
            Animation::Solid { .. }
            | Animation::Blink { .. }
            | Animation::Flash { .. }
            | Animation::FadeOut { .. }
            | Animation::AlternatingColors { .. } => true,
            Animation::ColorCycle {
                leave_last_color, ..
            } => *leave_last_color,
            Animation::Breath { invert, .. } => *invert,
            Animation::FadeIn { .. } | Animation::Pulse { .. } | Animation::Off => false,
        }
    }

    /// The nominal color this animation displays, for transition planning.
    ///
    /// Multi-color animations report their first table entry; [`Off`]
    /// reports all channels dark at the given layout width.
    ///
    /// [`Off`]: Animation::Off
    pub fn target_color(&self, channel_count: usize) -> Color {
        match self {
            Animation::Off => Color::dark(channel_count),
            Animation::Solid { color, .. }
            | Animation::Blink { color, .. }
            | Animation::Flash { color, .. }
            | Animation::Breath { color, .. }
            | Animation::FadeIn { color, .. }
            | Animation::FadeOut { color, .. }
            | Animation::Pulse { color, .. } => *color,
            Animation::AlternatingColors { colors, .. }
            | Animation::ColorCycle { colors, .. } => colors.first().copied().unwrap_or_default(),
        }
    }

    fn validate(&self, channel_count: usize) -> Result<(), Error> {
        let check = |color: &Color| {
            if color.channel_count() == channel_count {
                Ok(())
            } else {
                Err(Error::InvalidColor)
            }
        };

        match self {
            Animation::Off => Ok(()),
            Animation::Solid { color, .. }
            | Animation::Blink { color, .. }
            | Animation::Flash { color, .. }
            | Animation::Breath { color, .. }
            | Animation::FadeIn { color, .. }
            | Animation::FadeOut { color, .. }
            | Animation::Pulse { color, .. } => check(color),
            Animation::AlternatingColors { colors, .. }
            | Animation::ColorCycle { colors, .. } => {
                if colors.is_empty() {
                    return Err(Error::InvalidColor);
                }
                colors.iter().try_for_each(check)
            }
        }
    }
}

/// The animation engine for one LED package.
///
/// Owns the [`LedController`] and with it the PWM sink. All remaining state
/// fits in the handle itself; nothing is allocated.
pub struct Animator<'a, S: PwmSink> {
    controller: LedController<S>,
    callback: Option<&'a mut EventCallback>,
    descriptor: Option<&'a Animation<'a>>,
    kind: AnimationKind,
    curve: Curve,
    start_tick: u32,
    last_tick: Option<u32>,
    repeat_remaining: i8,
    running: bool,
    current_color: [u8; MAX_CHANNELS],
}

impl<'a, S: PwmSink> Animator<'a, S> {
    /// Create an idle engine around a validated controller.
    pub fn new(controller: LedController<S>, callback: Option<&'a mut EventCallback>) -> Self {
        Self {
            controller,
            callback,
            descriptor: None,
            kind: AnimationKind::None,
            curve: Curve::default(),
            start_tick: 0,
            last_tick: None,
            repeat_remaining: 0,
            running: false,
            current_color: [0; MAX_CHANNELS],
        }
    }

    /// The controller this engine drives
    pub fn controller(&self) -> &LedController<S> {
        &self.controller
    }

    /// Select the brightness ramp shape used by the fading animations
    pub fn set_curve(&mut self, curve: Curve) {
        self.curve = curve;
    }

    /// The tag of the currently queued animation
    pub fn kind(&self) -> AnimationKind {
        self.kind
    }

    /// The currently queued descriptor, if any
    pub fn descriptor(&self) -> Option<&'a Animation<'a>> {
        self.descriptor
    }

    /// True between [`start`] and completion or [`stop`]
    ///
    /// [`start`]: Animator::start
    /// [`stop`]: Animator::stop
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The brightness levels last written to the PWM, one per channel.
    ///
    /// This reflects what the LED is actually showing, not the target of
    /// the queued animation.
    pub fn current_color(&self) -> &[u8] {
        &self.current_color[..self.controller.channel_count()]
    }

    /// Queue an animation without starting it.
    ///
    /// Validates the descriptor colors against the controller layout, then
    /// records the descriptor and resets the cycle state. Nothing is
    /// written to the PWM until the first [`update`] after [`start`].
    /// Idempotent.
    ///
    /// [`update`]: Animator::update
    /// [`start`]: Animator::start
    pub fn set_animation(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        descriptor.validate(self.controller.channel_count())?;

        self.descriptor = Some(descriptor);
        self.kind = descriptor.kind();
        self.running = false;
        self.start_tick = 0;

        #[cfg(feature = "defmt")]
        defmt::debug!("animation queued: {}", self.kind);

        Ok(())
    }

    /// Queue a [`Animation::Solid`] descriptor, rejecting any other kind
    pub fn set_solid(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::Solid { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::Blink`] descriptor, rejecting any other kind
    pub fn set_blink(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::Blink { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::Flash`] descriptor, rejecting any other kind
    pub fn set_flash(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::Flash { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::Breath`] descriptor, rejecting any other kind
    pub fn set_breath(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::Breath { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::Pulse`] descriptor, rejecting any other kind
    pub fn set_pulse(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::Pulse { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::FadeIn`] descriptor, rejecting any other kind
    pub fn set_fade_in(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::FadeIn { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue a [`Animation::FadeOut`] descriptor, rejecting any other kind
    pub fn set_fade_out(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::FadeOut { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue an [`Animation::AlternatingColors`] descriptor, rejecting any other kind
    pub fn set_alternating_colors(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::AlternatingColors { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue an [`Animation::ColorCycle`] descriptor, rejecting any other kind
    pub fn set_color_cycle(&mut self, descriptor: &'a Animation<'a>) -> Result<(), Error> {
        match descriptor {
            Animation::ColorCycle { .. } => self.set_animation(descriptor),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Queue the one-shot off animation
    pub fn set_off(&mut self) {
        self.descriptor = None;
        self.kind = AnimationKind::Off;
        self.running = false;
        self.start_tick = 0;
    }

    /// Begin executing the queued animation on the next [`update`].
    ///
    /// [`update`]: Animator::update
    pub fn start(&mut self) {
        self.running = true;
        self.start_tick = 0;
        self.notify(Event::Started);

        #[cfg(feature = "defmt")]
        defmt::debug!("animation started: {}", self.kind);
    }

    /// Stop executing without finishing the current cycle.
    ///
    /// With `leave_last_color` the LED keeps showing whatever was last
    /// emitted; otherwise every channel is cleared to zero. The queued
    /// descriptor is retained so a following transition can still identify
    /// the outgoing animation.
    pub fn stop(&mut self, leave_last_color: bool) -> Result<(), Error> {
        self.notify(Event::Stopped);

        if !leave_last_color {
            self.stop_and_clear()?;
        }

        self.running = false;
        self.kind = AnimationKind::None;

        #[cfg(feature = "defmt")]
        defmt::debug!("animation stopped");

        Ok(())
    }

    /// Advance the animation to `tick` (milliseconds) and emit duty cycles.
    ///
    /// Calling twice with the same tick is a no-op on the second call.
    pub fn update(&mut self, tick: u32) -> Result<(), Error> {
        if self.last_tick == Some(tick) {
            return Ok(());
        }

        let result = match self.kind {
            AnimationKind::None => {
                self.running = false;
                Ok(())
            }
            AnimationKind::Off => self.update_off(),
            AnimationKind::Solid => self.update_solid(tick),
            AnimationKind::Blink => self.update_blink(tick),
            AnimationKind::Flash => self.update_flash(tick),
            AnimationKind::Breath => self.update_breath(tick),
            AnimationKind::Pulse => self.update_pulse(tick),
            AnimationKind::FadeIn => self.update_fade(tick, true),
            AnimationKind::FadeOut => self.update_fade(tick, false),
            AnimationKind::AlternatingColors => self.update_alternating(tick),
            AnimationKind::ColorCycle => self.update_color_cycle(tick),
        };

        self.last_tick = Some(tick);
        result
    }

    /// Emit brightness levels through the color path.
    ///
    /// Starts the PWM peripheral, converts each level into timer counts,
    /// records it for read-back, and writes the channel. The slice length
    /// must equal the controller's channel count.
    pub fn write_color(&mut self, levels: &[u8]) -> Result<(), Error> {
        if levels.len() != self.controller.channel_count() {
            return Err(Error::InvalidArgument);
        }

        self.controller.sink_mut().start();

        let max_duty = self.controller.max_duty_cycle();
        for (channel, &level) in levels.iter().enumerate() {
            let duty = brightness_to_duty(level, max_duty);
            self.current_color[channel] = level;
            self.controller.sink_mut().set_duty_cycle(channel, duty);
        }

        Ok(())
    }

    // Emit raw duty cycles, recording the brightness each corresponds to.
    // A value past the timer period halts the animation: the offending and
    // following channels are not written and the callback sees the error.
    fn write_duty(&mut self, duties: &[u16]) -> Result<(), Error> {
        self.controller.sink_mut().start();

        let max_duty = self.controller.max_duty_cycle();
        for (channel, &duty) in duties.iter().enumerate() {
            if duty > max_duty {
                self.notify(Event::Error(Error::InvalidValue));
                self.kind = AnimationKind::None;
                return Err(Error::InvalidValue);
            }
            self.current_color[channel] = duty_to_brightness(duty, max_duty);
            self.controller.sink_mut().set_duty_cycle(channel, duty);
        }

        Ok(())
    }

    // Stop the peripheral and clear the output. Emitting the zeros goes
    // through the color path, which re-enables the PWM with zero duty, so
    // read-back and clean-entry detection keep working afterwards.
    fn stop_and_clear(&mut self) -> Result<(), Error> {
        self.controller.sink_mut().stop();
        self.current_color = [0; MAX_CHANNELS];

        let zeros = [0u8; MAX_CHANNELS];
        let count = self.controller.channel_count();
        self.write_color(&zeros[..count])
    }

    pub(crate) fn power_on(&mut self) {
        self.controller.sink_mut().start();
    }

    pub(crate) fn notify(&mut self, event: Event) {
        let kind = self.kind;
        let descriptor = self.descriptor;
        if let Some(callback) = self.callback.as_mut() {
            callback(kind, event, descriptor);
        }
    }

    // First tick of a cycle: latch the start time and re-read the repeat
    // budget from the descriptor. Returns true when the budget is already
    // drained (a zero-repeat descriptor completes before emitting anything).
    fn begin_cycle(
        &mut self,
        tick: u32,
        repeat: i8,
        stop_on_completion: bool,
    ) -> Result<bool, Error> {
        if self.start_tick != 0 {
            return Ok(false);
        }

        self.start_tick = tick;
        self.repeat_remaining = repeat;

        if repeat == 0 {
            self.finish(stop_on_completion)?;
            return Ok(true);
        }

        Ok(false)
    }

    // Cycle boundary: spend one repeat unless the budget is infinite.
    // Returns true when the animation just finished.
    fn handle_repeat(&mut self, repeat: i8, stop_on_completion: bool) -> Result<bool, Error> {
        if repeat != -1 {
            self.repeat_remaining = self.repeat_remaining.saturating_sub(1);
        }

        if self.repeat_remaining == 0 {
            self.finish(stop_on_completion)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn finish(&mut self, stop_on_completion: bool) -> Result<(), Error> {
        self.running = false;
        self.notify(Event::Completed);
        if stop_on_completion {
            self.stop_and_clear()?;
        }
        self.kind = AnimationKind::None;
        Ok(())
    }

    fn update_off(&mut self) -> Result<(), Error> {
        if !self.running {
            return Ok(());
        }

        self.notify(Event::Completed);

        let zeros = [0u8; MAX_CHANNELS];
        let count = self.controller.channel_count();
        self.write_color(&zeros[..count])?;

        self.running = false;
        self.kind = AnimationKind::None;

        Ok(())
    }

    fn update_solid(&mut self, tick: u32) -> Result<(), Error> {
        let (color, execution_ms) = match self.descriptor {
            Some(Animation::Solid {
                color,
                execution_ms,
            }) => (*color, *execution_ms),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }

        if self.start_tick == 0 {
            self.start_tick = tick;

            // The color only needs emitting once
            self.write_color(color.as_slice())?;
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        if execution_ms > 0 && elapsed >= execution_ms {
            self.running = false;
            self.stop_and_clear()?;
            self.notify(Event::Completed);
            self.kind = AnimationKind::None;
        }

        Ok(())
    }

    fn update_blink(&mut self, tick: u32) -> Result<(), Error> {
        let (color, period_ms, repeat) = match self.descriptor {
            Some(Animation::Blink {
                color,
                period_ms,
                repeat,
            }) => (*color, *period_ms as u32, *repeat),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, false)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        if elapsed >= period_ms {
            self.start_tick = tick;
            self.handle_repeat(repeat, false)?;
        } else if elapsed >= period_ms / 2 {
            self.stop_and_clear()?;
        } else {
            self.write_color(color.as_slice())?;
        }

        Ok(())
    }

    fn update_flash(&mut self, tick: u32) -> Result<(), Error> {
        let (color, on_ms, off_ms, repeat) = match self.descriptor {
            Some(Animation::Flash {
                color,
                on_ms,
                off_ms,
                repeat,
            }) => (*color, *on_ms as u32, *off_ms as u32, *repeat),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, false)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let cycle = on_ms + off_ms;

        if elapsed < on_ms {
            self.write_color(color.as_slice())?;
        } else if elapsed < cycle {
            self.stop_and_clear()?;
        }

        if elapsed >= cycle {
            self.start_tick = tick;
            self.handle_repeat(repeat, false)?;
        }

        Ok(())
    }

    fn update_breath(&mut self, tick: u32) -> Result<(), Error> {
        let (color, rise_ms, fall_ms, repeat, invert) = match self.descriptor {
            Some(Animation::Breath {
                color,
                rise_ms,
                fall_ms,
                repeat,
                invert,
            }) => (*color, *rise_ms as u32, *fall_ms as u32, *repeat, *invert),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, !invert)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let cycle = rise_ms + fall_ms;
        if cycle == 0 {
            self.start_tick = tick;
            self.handle_repeat(repeat, !invert)?;
            return Ok(());
        }

        let time_in_cycle = elapsed % cycle;
        let max_duty = self.controller.max_duty_cycle();
        let mut duties: Vec<u16, MAX_CHANNELS> = Vec::new();

        for channel in 0..self.controller.channel_count() {
            let peak = brightness_to_duty(color.channel(channel), max_duty);
            let duty = if time_in_cycle < rise_ms {
                self.curve.fade(time_in_cycle, rise_ms, peak, !invert)
            } else {
                self.curve
                    .fade(time_in_cycle - rise_ms, fall_ms, peak, invert)
            };
            duties.push(duty).ok();
        }

        self.write_duty(&duties)?;

        if elapsed >= cycle {
            self.start_tick = tick;
            self.handle_repeat(repeat, !invert)?;
        }

        Ok(())
    }

    fn update_fade(&mut self, tick: u32, fading_in: bool) -> Result<(), Error> {
        let (color, duration_ms, repeat) = match (self.descriptor, fading_in) {
            (
                Some(Animation::FadeIn {
                    color,
                    duration_ms,
                    repeat,
                }),
                true,
            )
            | (
                Some(Animation::FadeOut {
                    color,
                    duration_ms,
                    repeat,
                }),
                false,
            ) => (*color, *duration_ms as u32, *repeat),
            _ => return Err(Error::InvalidAnimationType),
        };

        // A finished fade-out clears the LED; a finished fade-in holds it
        let stop_on_completion = !fading_in;

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, stop_on_completion)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let max_duty = self.controller.max_duty_cycle();
        let mut duties: Vec<u16, MAX_CHANNELS> = Vec::new();

        for channel in 0..self.controller.channel_count() {
            let peak = brightness_to_duty(color.channel(channel), max_duty);
            duties
                .push(self.curve.fade(elapsed, duration_ms, peak, fading_in))
                .ok();
        }

        self.write_duty(&duties)?;

        if elapsed >= duration_ms {
            self.start_tick = tick;
            self.handle_repeat(repeat, stop_on_completion)?;
        }

        Ok(())
    }

    fn update_pulse(&mut self, tick: u32) -> Result<(), Error> {
        let (color, rise_ms, hold_on_ms, fall_ms, hold_off_ms, repeat) = match self.descriptor {
            Some(Animation::Pulse {
                color,
                rise_ms,
                hold_on_ms,
                fall_ms,
                hold_off_ms,
                repeat,
            }) => (
                *color,
                *rise_ms as u32,
                *hold_on_ms as u32,
                *fall_ms as u32,
                *hold_off_ms as u32,
                *repeat,
            ),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, false)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let cycle = rise_ms + hold_on_ms + fall_ms + hold_off_ms;
        if cycle == 0 {
            self.start_tick = tick;
            self.handle_repeat(repeat, false)?;
            return Ok(());
        }

        let time_in_cycle = elapsed % cycle;
        let max_duty = self.controller.max_duty_cycle();
        let mut duties: Vec<u16, MAX_CHANNELS> = Vec::new();

        for channel in 0..self.controller.channel_count() {
            let peak = brightness_to_duty(color.channel(channel), max_duty);
            let duty = if time_in_cycle < rise_ms {
                self.curve.fade(time_in_cycle, rise_ms, peak, true)
            } else if time_in_cycle < rise_ms + hold_on_ms {
                peak
            } else if time_in_cycle < rise_ms + hold_on_ms + fall_ms {
                self.curve
                    .fade(time_in_cycle - rise_ms - hold_on_ms, fall_ms, peak, false)
            } else {
                0
            };
            duties.push(duty).ok();
        }

        self.write_duty(&duties)?;

        if elapsed >= cycle {
            self.start_tick = tick;
            self.handle_repeat(repeat, false)?;
        }

        Ok(())
    }

    fn update_alternating(&mut self, tick: u32) -> Result<(), Error> {
        let (colors, duration_ms, repeat) = match self.descriptor {
            Some(Animation::AlternatingColors {
                colors,
                duration_ms,
                repeat,
            }) => (*colors, *duration_ms as u32, *repeat),
            _ => return Err(Error::InvalidAnimationType),
        };

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, true)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let cycle = duration_ms * colors.len() as u32;
        if cycle == 0 {
            self.start_tick = tick;
            self.handle_repeat(repeat, true)?;
            return Ok(());
        }

        let time_in_cycle = elapsed % cycle;
        let index = (time_in_cycle / duration_ms) as usize;
        self.write_color(colors[index].as_slice())?;

        if repeat > 0 && elapsed as u64 >= cycle as u64 * repeat as u64 {
            self.running = false;
            self.stop_and_clear()?;
            self.notify(Event::Completed);
            self.kind = AnimationKind::None;
        }

        Ok(())
    }

    fn update_color_cycle(&mut self, tick: u32) -> Result<(), Error> {
        let (colors, transition_ms, hold_ms, repeat, leave_last_color) = match self.descriptor {
            Some(Animation::ColorCycle {
                colors,
                transition_ms,
                hold_ms,
                repeat,
                leave_last_color,
            }) => (
                *colors,
                *transition_ms as u32,
                *hold_ms as u32,
                *repeat,
                *leave_last_color,
            ),
            _ => return Err(Error::InvalidAnimationType),
        };

        let stop_on_completion = !leave_last_color;

        if !self.running {
            return Ok(());
        }
        if self.begin_cycle(tick, repeat, stop_on_completion)? {
            return Ok(());
        }

        let elapsed = tick.wrapping_sub(self.start_tick);
        let cycle = transition_ms + hold_ms;
        if cycle == 0 {
            self.start_tick = tick;
            self.handle_repeat(repeat, stop_on_completion)?;
            return Ok(());
        }

        // The closing lap of the table ends one blend short, so a kept
        // final color lands on the slot color instead of fading onward
        let laps = cycle * colors.len() as u32;
        let total = if self.repeat_remaining == -1 || self.repeat_remaining > 1 {
            laps
        } else {
            laps - transition_ms
        };

        let time_in_cycle = elapsed % cycle;
        let index = ((elapsed / cycle) as usize) % colors.len();
        let next = (index + 1) % colors.len();

        if time_in_cycle < hold_ms {
            self.write_color(colors[index].as_slice())?;
        } else {
            let transition_elapsed = time_in_cycle - hold_ms;
            let count = self.controller.channel_count();
            let mut blended = [0u8; MAX_CHANNELS];
            interpolate(
                transition_elapsed,
                transition_ms,
                colors[index].as_slice(),
                colors[next].as_slice(),
                &mut blended[..count],
            );
            self.write_color(&blended[..count])?;
        }

        if elapsed >= total {
            self.start_tick = tick;
            self.handle_repeat(repeat, stop_on_completion)?;
        }

        Ok(())
    }
}
