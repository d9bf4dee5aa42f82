//!
//! Brightness ramp shapes.
//!
//! Every fading animation (breath, pulse, fade in/out) maps its position in
//! the ramp to a duty cycle through a [`Curve`]. The quadratic curve is the
//! default: it is integer-only, cheap enough for a 1 ms tick on a small
//! MCU, and perceptually much smoother than a linear ramp. The remaining
//! curves trade cycles for shape and require single-precision floats.
//!
//! The color interpolation used by the color-cycle animation and by the
//! interpolating transition lives here as well, since it is the same
//! mathematical operation in both places.

use micromath::F32Ext;

const PI_HALF: f32 = core::f32::consts::FRAC_PI_2;

/// Steepness of the exponential shaping applied by the float curves.
const EXP_STEEPNESS: f32 = 3.0;

/// The shape of a brightness ramp.
///
/// A curve maps `(elapsed, duration)` to a duty cycle in `0..=peak`, either
/// rising from dark to `peak` or falling back down. Curves are pure; all
/// ramp state lives in the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Curve {
    /// Integer-only quadratic ramp. The default, and the only curve that
    /// needs no floating point.
    Quadratic,

    /// Exponential ramp, `(e^(3t) - 1) / (e^3 - 1)`
    Exponential,

    /// Quarter sine wave with exponential shaping
    Sine,

    /// Polynomial approximation of [`Curve::Sine`], cheaper on targets
    /// without a fast libm
    SineApprox,
}

impl Default for Curve {
    fn default() -> Self {
        Curve::Quadratic
    }
}

impl Curve {
    /// Compute the duty cycle at `elapsed` of a ramp of length `duration`.
    ///
    /// `peak` is the duty cycle at full brightness for the channel being
    /// ramped. `fading_in` selects the rising side; the falling side is its
    /// mirror. Input time past the end of the ramp saturates, so a late
    /// tick can never push the result outside `0..=peak`.
    pub fn fade(self, elapsed: u32, duration: u32, peak: u16, fading_in: bool) -> u16 {
        if peak == 0 {
            return 0;
        }
        if duration == 0 {
            return if fading_in { peak } else { 0 };
        }

        match self {
            Curve::Quadratic => quadratic(elapsed, duration, peak, fading_in),
            Curve::Exponential => exponential(progress(elapsed, duration, fading_in), peak),
            Curve::Sine => sine(progress(elapsed, duration, fading_in), peak),
            Curve::SineApprox => sine_approx(progress(elapsed, duration, fading_in), peak),
        }
    }
}

fn quadratic(elapsed: u32, duration: u32, peak: u16, fading_in: bool) -> u16 {
    let peak = peak as u32;

    // Normalize time straight into the duty range, saturating at the peak
    let normalized = ((elapsed as u64 * peak as u64) / duration as u64).min(peak as u64) as u32;

    let duty = if fading_in {
        (normalized * normalized) / peak
    } else {
        let inverse = peak - normalized;
        (inverse * inverse) / peak
    };

    duty as u16
}

/// Normalized ramp position, mirrored for the falling side.
fn progress(elapsed: u32, duration: u32, fading_in: bool) -> f32 {
    let p = (elapsed as f32 / duration as f32).min(1.0);
    if fading_in {
        p
    } else {
        1.0 - p
    }
}

fn exponential(progress: f32, peak: u16) -> u16 {
    let shaped = (F32Ext::exp(progress * EXP_STEEPNESS) - 1.0) / (F32Ext::exp(EXP_STEEPNESS) - 1.0);
    scale_to_peak(shaped, peak)
}

fn sine(progress: f32, peak: u16) -> u16 {
    let shaped = F32Ext::exp(F32Ext::sin(progress * PI_HALF) * EXP_STEEPNESS);
    let full_scale = F32Ext::exp(F32Ext::sin(PI_HALF) * EXP_STEEPNESS);
    scale_to_peak((shaped - 1.0) / (full_scale - 1.0), peak)
}

// sin(x) ~ x - x^3/6 + x^5/120, good to a fraction of a percent on [0, pi/2]
fn fast_sine(x: f32) -> f32 {
    let x2 = x * x;
    let x3 = x2 * x;
    let x5 = x3 * x2;
    x - (x3 / 6.0) + (x5 / 120.0)
}

// e^x ~ 1 + x + x^2/2 + x^3/6
fn fast_exp(x: f32) -> f32 {
    1.0 + x + (x * x / 2.0) + (x * x * x / 6.0)
}

fn sine_approx(progress: f32, peak: u16) -> u16 {
    let shaped = fast_exp(fast_sine(progress * PI_HALF) * EXP_STEEPNESS);
    let full_scale = fast_exp(fast_sine(PI_HALF) * EXP_STEEPNESS);
    scale_to_peak((shaped - 1.0) / (full_scale - 1.0), peak)
}

fn scale_to_peak(fraction: f32, peak: u16) -> u16 {
    let duty = (fraction * peak as f32) as u32;
    duty.min(peak as u32) as u16
}

/// Blend `from` toward `to` at `elapsed` of a `duration`-long cross-fade.
///
/// Fixed-point throughout, scaled by 1000: the blend factor is
/// `t²` (or plain `t` when the `linear-interpolation` feature is enabled)
/// with `t` clamped to `0..=1`. One output channel is written per input
/// channel; the result lands exactly on `from` at `elapsed = 0` but may
/// stop one count short of `to` at the far end, so callers that need the
/// exact target write it themselves once the fade is over.
pub fn interpolate(elapsed: u32, duration: u32, from: &[u8], to: &[u8], out: &mut [u8]) {
    let fraction = if duration == 0 {
        1000
    } else {
        ((elapsed as u64 * 1000) / duration as u64).min(1000) as u32
    };

    #[cfg(not(feature = "linear-interpolation"))]
    let blend = (fraction * fraction) / 1000;
    #[cfg(feature = "linear-interpolation")]
    let blend = fraction;

    for (channel, (&f, &t)) in out.iter_mut().zip(from.iter().zip(to.iter())) {
        let delta = t as i32 - f as i32;
        *channel = (f as i32 + (delta * blend as i32) / 1000) as u8;
    }
}
