//!
//! Glitch-free switching between animations.
//!
//! A [`TransitionManager`] wraps an [`Animator`] and arbitrates the switch
//! from whatever is currently showing to a queued target animation. Four
//! strategies are available:
//!
//! * [`Imminent`] installs the target on the next tick
//! * [`Interpolate`] cross-fades the LED from its instantaneous color to
//!     the target's starting color, then installs it
//! * [`UponCompletion`] waits for the running animation to finish
//! * [`AtCleanEntry`] waits for a tick on which every channel is dark
//!
//! The waiting strategies carry a timeout; hitting it is not an error but a
//! force-advance, so a switch request always lands eventually. Transitions
//! can also be looked up from a caller-owned table keyed by *which*
//! descriptor is leaving and *which* is arriving — see
//! [`TransitionManager::set_mapping`] and the [`transition_map!`] macro.
//!
//! [`Imminent`]: Strategy::Imminent
//! [`Interpolate`]: Strategy::Interpolate
//! [`UponCompletion`]: Strategy::UponCompletion
//! [`AtCleanEntry`]: Strategy::AtCleanEntry
//! [`transition_map!`]: crate::transition_map

use crate::color::{Color, MAX_CHANNELS};
use crate::controller::PwmSink;
use crate::curve::interpolate;
use crate::engine::{Animation, AnimationKind, Animator, Error, Event};

/// Cross-fade length used when an [`Interpolate`] duration is unspecified.
///
/// [`Interpolate`]: Strategy::Interpolate
pub const DEFAULT_INTERPOLATE_MS: u16 = 200;

/// Wait limit used when an [`UponCompletion`] duration is unspecified.
///
/// [`UponCompletion`]: Strategy::UponCompletion
pub const DEFAULT_UPON_COMPLETION_TIMEOUT_MS: u16 = 5000;

/// Wait limit used when an [`AtCleanEntry`] duration is unspecified.
///
/// [`AtCleanEntry`]: Strategy::AtCleanEntry
pub const DEFAULT_CLEAN_ENTRY_TIMEOUT_MS: u16 = 2000;

/// The shared off descriptor installed by [`TransitionManager::to_off`].
pub const OFF: Animation<'static> = Animation::Off;

/// How to get from the running animation to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strategy {
    /// Switch on the next tick; the duration is ignored
    Imminent,

    /// Cross-fade over the duration, then switch
    Interpolate,

    /// Wait for the running animation to complete, up to the duration
    UponCompletion,

    /// Wait for a tick where the LED is fully dark, up to the duration
    AtCleanEntry,
}

impl Strategy {
    // A zero duration from the caller or the map means "use the default
    // for this strategy".
    fn resolve_duration(self, duration_ms: u16) -> u16 {
        match self {
            Strategy::Imminent => 0,
            Strategy::Interpolate => {
                if duration_ms == 0 {
                    DEFAULT_INTERPOLATE_MS
                } else {
                    duration_ms
                }
            }
            Strategy::UponCompletion => {
                if duration_ms == 0 {
                    DEFAULT_UPON_COMPLETION_TIMEOUT_MS
                } else {
                    duration_ms
                }
            }
            Strategy::AtCleanEntry => {
                if duration_ms == 0 {
                    DEFAULT_CLEAN_ENTRY_TIMEOUT_MS
                } else {
                    duration_ms
                }
            }
        }
    }
}

/// One row of a transition map.
///
/// Rows are matched by reference identity on both descriptors: an explicit
/// row wins over the default strategy exactly when the engine is leaving
/// `from` for `to` — a structurally equal copy of either descriptor does
/// not match.
pub struct TransitionRule<'a> {
    pub from: &'a Animation<'a>,
    pub to: &'a Animation<'a>,
    pub strategy: Strategy,
    /// Raw duration; 0 selects the strategy's default
    pub duration_ms: u16,
}

impl<'a> TransitionRule<'a> {
    /// Build a map row
    pub const fn new(
        from: &'a Animation<'a>,
        to: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Self {
        Self {
            from,
            to,
            strategy,
            duration_ms,
        }
    }
}

/// Where the manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionState {
    /// No transition requested
    Idle,
    /// Resolving the strategy and capturing color snapshots
    Setup,
    /// Arbitrating (fading, or waiting for the switch condition)
    Ongoing,
    /// Installing the target on the next tick
    Completed,
}

/// Arbitrates animation switches on top of an [`Animator`].
///
/// Call [`update`] with the same tick stream the engine gets; the manager
/// advances its state machine first and then drives the engine, except
/// while an [`Interpolate`] fade owns the PWM output.
///
/// [`update`]: TransitionManager::update
/// [`Interpolate`]: Strategy::Interpolate
pub struct TransitionManager<'m, 'a, S: PwmSink> {
    engine: &'m mut Animator<'a, S>,
    map: Option<&'a [TransitionRule<'a>]>,
    state: TransitionState,
    target: Option<&'a Animation<'a>>,
    strategy: Option<Strategy>,
    duration_ms: u16,
    last_tick: u32,
    current_color: [u8; MAX_CHANNELS],
    target_color: [u8; MAX_CHANNELS],
}

impl<'m, 'a, S: PwmSink> TransitionManager<'m, 'a, S> {
    /// Wrap an engine; the manager starts Idle with no map.
    pub fn new(engine: &'m mut Animator<'a, S>) -> Self {
        Self {
            engine,
            map: None,
            state: TransitionState::Idle,
            target: None,
            strategy: None,
            duration_ms: 0,
            last_tick: 0,
            current_color: [0; MAX_CHANNELS],
            target_color: [0; MAX_CHANNELS],
        }
    }

    /// Register the caller-owned transition map.
    ///
    /// An empty map is rejected; pass no map at all to always use the
    /// default strategy.
    pub fn set_mapping(&mut self, map: &'a [TransitionRule<'a>]) -> Result<(), Error> {
        if map.is_empty() {
            return Err(Error::InvalidArgument);
        }
        self.map = Some(map);
        Ok(())
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Animator<'a, S> {
        self.engine
    }

    /// Current state machine position
    pub fn state(&self) -> TransitionState {
        self.state
    }

    /// True while a transition is anywhere between request and install
    pub fn is_busy(&self) -> bool {
        self.state != TransitionState::Idle
    }

    /// True when every channel of the LED currently reads zero
    pub fn is_led_off(&self) -> bool {
        self.engine.current_color().iter().all(|&level| level == 0)
    }

    /// Request a switch to `target` with an explicit strategy.
    ///
    /// Only accepted while Idle; otherwise nothing changes and [`Busy`] is
    /// returned. A request to go off while the LED already is off is
    /// acknowledged with [`Event::TransitionSkipped`] and no state change.
    /// A `duration_ms` of zero selects the strategy's default.
    ///
    /// [`Busy`]: Error::Busy
    pub fn execute(
        &mut self,
        target: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        self.begin(target, Some(strategy), duration_ms)
    }

    /// Request a switch to `target`, resolving the strategy from the map.
    ///
    /// Falls back to [`Interpolate`] with the default duration when no row
    /// matches.
    ///
    /// [`Interpolate`]: Strategy::Interpolate
    pub fn execute_with_map(&mut self, target: &'a Animation<'a>) -> Result<(), Error> {
        self.begin(target, None, 0)
    }

    /// Abort the transition and return to Idle.
    ///
    /// The queued target is dropped without being installed and the PWM is
    /// left exactly as the last tick wrote it; re-issue [`execute`] to
    /// switch after all.
    ///
    /// [`execute`]: TransitionManager::execute
    pub fn stop(&mut self) {
        self.target = None;
        self.strategy = None;
        self.duration_ms = 0;
        self.state = TransitionState::Idle;

        #[cfg(feature = "defmt")]
        defmt::debug!("transition aborted");
    }

    /// Advance the transition, then the engine, to `tick` (milliseconds).
    ///
    /// While an [`Interpolate`] fade is ongoing the engine update is
    /// suppressed so the two never fight over the PWM output.
    ///
    /// [`Interpolate`]: Strategy::Interpolate
    pub fn update(&mut self, tick: u32) -> Result<(), Error> {
        match self.state {
            TransitionState::Idle => {}
            TransitionState::Setup => self.state_setup(tick)?,
            TransitionState::Ongoing => self.state_ongoing(tick)?,
            TransitionState::Completed => self.state_completed()?,
        }

        if self.strategy != Some(Strategy::Interpolate) {
            self.engine.update(tick)?;
        }

        Ok(())
    }

    fn begin(
        &mut self,
        target: &'a Animation<'a>,
        strategy: Option<Strategy>,
        duration_ms: u16,
    ) -> Result<(), Error> {
        if self.state != TransitionState::Idle {
            return Err(Error::Busy);
        }

        if target.kind() == AnimationKind::Off {
            if self.is_led_off() {
                // Nothing to do; acknowledge and stay Idle
                self.engine.notify(Event::TransitionSkipped);
                return Ok(());
            }

            // Freeze the last color on screen; the transition fades or
            // force-switches from there
            if self.engine.is_running() {
                self.engine.stop(true)?;
            }
        }

        self.target = Some(target);
        self.strategy = strategy;
        self.duration_ms = duration_ms;
        self.state = TransitionState::Setup;

        #[cfg(feature = "defmt")]
        defmt::debug!("transition requested: {}", target.kind());

        Ok(())
    }

    fn find_in_map(&self, target: &'a Animation<'a>) -> Option<(Strategy, u16)> {
        let map = self.map?;
        let from = self.engine.descriptor()?;

        map.iter()
            .find(|rule| core::ptr::eq(rule.from, from) && core::ptr::eq(rule.to, target))
            .map(|rule| (rule.strategy, rule.duration_ms))
    }

    fn state_setup(&mut self, tick: u32) -> Result<(), Error> {
        let target = match self.target {
            Some(target) => target,
            None => {
                self.state = TransitionState::Idle;
                return Ok(());
            }
        };

        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => {
                let (strategy, duration_ms) = self
                    .find_in_map(target)
                    .unwrap_or((Strategy::Interpolate, DEFAULT_INTERPOLATE_MS));
                self.strategy = Some(strategy);
                self.duration_ms = duration_ms;
                strategy
            }
        };

        self.duration_ms = strategy.resolve_duration(self.duration_ms);

        if strategy == Strategy::Interpolate {
            let count = self.engine.controller().channel_count();

            self.current_color = [0; MAX_CHANNELS];
            self.current_color[..count].copy_from_slice(self.engine.current_color());

            // An animation that begins dark is faded toward black, not
            // toward its nominal color
            let target_color = if target.starts_high() {
                target.target_color(count)
            } else {
                Color::dark(count)
            };
            self.target_color = [0; MAX_CHANNELS];
            self.target_color[..count].copy_from_slice(target_color.as_slice());

            if self.current_color == self.target_color {
                // Nothing to blend; adopt the target right away
                self.engine.notify(Event::TransitionStarted);
                self.state = TransitionState::Completed;
                return Ok(());
            }

            self.engine.power_on();
        }

        self.last_tick = tick;
        self.engine.notify(Event::TransitionStarted);
        self.state = TransitionState::Ongoing;

        #[cfg(feature = "defmt")]
        defmt::debug!("transition ongoing: {} over {=u16} ms", strategy, self.duration_ms);

        Ok(())
    }

    fn state_ongoing(&mut self, tick: u32) -> Result<(), Error> {
        let strategy = match self.strategy {
            Some(strategy) => strategy,
            None => {
                self.state = TransitionState::Idle;
                return Ok(());
            }
        };

        let elapsed = tick.wrapping_sub(self.last_tick);
        let duration = self.duration_ms as u32;

        match strategy {
            Strategy::Imminent => {
                self.state = TransitionState::Completed;
            }

            Strategy::Interpolate => {
                let count = self.engine.controller().channel_count();
                if elapsed >= duration {
                    // The blend can stop one count short of the target;
                    // land on it exactly before installing
                    let target_color = self.target_color;
                    self.engine.write_color(&target_color[..count])?;
                    self.state = TransitionState::Completed;
                } else {
                    let mut blended = [0u8; MAX_CHANNELS];
                    interpolate(
                        elapsed,
                        duration,
                        &self.current_color[..count],
                        &self.target_color[..count],
                        &mut blended[..count],
                    );
                    self.engine.write_color(&blended[..count])?;
                }
            }

            Strategy::UponCompletion => {
                if elapsed > duration {
                    // Timed out waiting; force the switch so the request
                    // is never lost
                    self.state = TransitionState::Completed;
                } else if !self.engine.is_running() {
                    self.state = TransitionState::Completed;
                }
            }

            Strategy::AtCleanEntry => {
                if self.is_led_off() {
                    self.state = TransitionState::Completed;
                } else if elapsed > duration {
                    self.state = TransitionState::Completed;
                }
            }
        }

        Ok(())
    }

    fn state_completed(&mut self) -> Result<(), Error> {
        self.engine.notify(Event::TransitionCompleted);

        if let Some(target) = self.target.take() {
            self.engine.set_animation(target)?;
            self.engine.start();
        }

        self.strategy = None;
        self.duration_ms = 0;
        self.state = TransitionState::Idle;

        #[cfg(feature = "defmt")]
        defmt::debug!("transition completed");

        Ok(())
    }
}

impl<'m, 'a, S: PwmSink> TransitionManager<'m, 'a, S> {
    /// Transition to all channels dark
    pub fn to_off(&mut self, strategy: Strategy, duration_ms: u16) -> Result<(), Error> {
        self.execute(&OFF, strategy, duration_ms)
    }

    /// Transition to a [`Animation::Solid`] descriptor
    pub fn to_solid(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::Solid { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::Blink`] descriptor
    pub fn to_blink(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::Blink { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::Flash`] descriptor
    pub fn to_flash(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::Flash { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::Breath`] descriptor
    pub fn to_breath(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::Breath { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::Pulse`] descriptor
    pub fn to_pulse(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::Pulse { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::FadeIn`] descriptor
    pub fn to_fade_in(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::FadeIn { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to a [`Animation::FadeOut`] descriptor
    pub fn to_fade_out(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::FadeOut { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to an [`Animation::AlternatingColors`] descriptor
    pub fn to_alternating_colors(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::AlternatingColors { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }

    /// Transition to an [`Animation::ColorCycle`] descriptor
    pub fn to_color_cycle(
        &mut self,
        descriptor: &'a Animation<'a>,
        strategy: Strategy,
        duration_ms: u16,
    ) -> Result<(), Error> {
        match descriptor {
            Animation::ColorCycle { .. } => self.execute(descriptor, strategy, duration_ms),
            _ => Err(Error::InvalidAnimationType),
        }
    }
}
