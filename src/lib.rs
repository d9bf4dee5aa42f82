#![cfg_attr(not(test), no_std)]

//!
//! This crate turns a stream of millisecond ticks into smoothly animated
//! light on a small PWM-driven LED (single, dual, tri- or quad-channel).
//!
//! In most cases:
//!
//! * The host wraps its PWM peripheral in a [`PwmSink`] and bundles it
//!     with the LED layout into a [`LedController`]
//! * An [`Animator`] executes one [`Animation`] descriptor at a time,
//!     computing per-channel duty cycles on every tick
//! * A [`TransitionManager`] layered on top arbitrates switches between
//!     animations so the LED never visibly glitches
//! * Lifecycle events ([`Event`]) flow back through a single callback
//!
//! There is no internal timer and no allocation: the host polls
//! [`TransitionManager::update`] (or [`Animator::update`] directly) from
//! its main loop with a monotonically non-decreasing millisecond count,
//! and all descriptors and handles are caller-owned.
//!
//! [`PwmSink`]: crate::controller::PwmSink
//! [`LedController`]: crate::controller::LedController
//! [`Animator`]: crate::engine::Animator
//! [`Animation`]: crate::engine::Animation
//! [`Event`]: crate::engine::Event
//! [`TransitionManager`]: crate::transition::TransitionManager
//! [`TransitionManager::update`]: crate::transition::TransitionManager::update
//! [`Animator::update`]: crate::engine::Animator::update

pub mod color;
pub mod controller;
pub mod curve;
pub mod engine;
pub mod transition;

pub mod reexports {
    pub use smart_leds::colors;
    pub use smart_leds::RGB8;
}

/// Build an array of [`TransitionRule`]s from a table.
///
/// Each row names the outgoing descriptor, the incoming descriptor, the
/// [`Strategy`] to use between exactly that pair, and a duration (0 picks
/// the strategy's default):
///
/// ```rust
/// use limelight::engine::Animation;
/// use limelight::color::Color;
/// use limelight::transition_map;
///
/// static ERROR_BLINK: Animation = Animation::Blink {
///     color: Color::rgb(255, 0, 0),
///     period_ms: 500,
///     repeat: -1,
/// };
/// static ALL_GOOD: Animation = Animation::Solid {
///     color: Color::rgb(0, 255, 0),
///     execution_ms: 0,
/// };
///
/// let map = transition_map! {
///     | from        | to          | strategy     | duration_ms |
///     | ERROR_BLINK | ALL_GOOD    | AtCleanEntry |        1000 |
///     | ALL_GOOD    | ERROR_BLINK | Imminent     |           0 |
/// };
/// assert_eq!(map.len(), 2);
/// ```
///
/// [`TransitionRule`]: crate::transition::TransitionRule
/// [`Strategy`]: crate::transition::Strategy
#[macro_export]
macro_rules! transition_map {
    (| from | to | strategy | duration_ms | $(| $from:ident | $to:ident | $strategy:ident | $duration:literal |)+) => {
        {
            #[allow(unused_imports)]
            use $crate::transition::Strategy::*;
            [
                $(
                    $crate::transition::TransitionRule::new(&$from, &$to, $strategy, $duration),
                )+
            ]
        }
    };
}
