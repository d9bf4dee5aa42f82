use limelight::color::{brightness_to_duty, duty_to_brightness};
use limelight::curve::{interpolate, Curve};

const ALL_CURVES: [Curve; 4] = [
    Curve::Quadratic,
    Curve::Exponential,
    Curve::Sine,
    Curve::SineApprox,
];

#[test]
fn quadratic_known_points() {
    // n = elapsed * peak / duration, duty = n^2 / peak
    assert_eq!(Curve::Quadratic.fade(0, 1000, 1000, true), 0);
    assert_eq!(Curve::Quadratic.fade(500, 1000, 1000, true), 250);
    assert_eq!(Curve::Quadratic.fade(1000, 1000, 1000, true), 1000);

    // The falling side mirrors the rise
    assert_eq!(Curve::Quadratic.fade(0, 1000, 1000, false), 1000);
    assert_eq!(Curve::Quadratic.fade(500, 1000, 1000, false), 250);
    assert_eq!(Curve::Quadratic.fade(1000, 1000, 1000, false), 0);
}

#[test]
fn fade_input_saturates_past_the_ramp() {
    assert_eq!(Curve::Quadratic.fade(1500, 1000, 1000, true), 1000);
    assert_eq!(Curve::Quadratic.fade(1500, 1000, 1000, false), 0);
    assert_eq!(Curve::Quadratic.fade(u32::MAX, 1000, 1000, true), 1000);
}

#[test]
fn zero_length_ramp_is_instant() {
    for curve in ALL_CURVES.iter() {
        assert_eq!(curve.fade(5, 0, 1000, true), 1000);
        assert_eq!(curve.fade(5, 0, 1000, false), 0);
    }
}

#[test]
fn zero_peak_stays_dark() {
    for curve in ALL_CURVES.iter() {
        assert_eq!(curve.fade(500, 1000, 0, true), 0);
        assert_eq!(curve.fade(500, 1000, 0, false), 0);
    }
}

#[test]
fn every_curve_spans_the_full_range_monotonically() {
    for curve in ALL_CURVES.iter() {
        assert_eq!(curve.fade(0, 1000, 1000, true), 0, "{:?} rise start", curve);
        let end = curve.fade(1000, 1000, 1000, true);
        assert!(end >= 999, "{:?} rise end: {}", curve, end);

        let mut last = 0;
        for elapsed in (0..=1000).step_by(50) {
            let duty = curve.fade(elapsed, 1000, 1000, true);
            assert!(duty <= 1000, "{:?} out of range at {}", curve, elapsed);
            assert!(
                duty >= last,
                "{:?} dipped at {}: {} < {}",
                curve,
                elapsed,
                duty,
                last
            );
            last = duty;
        }

        let mut last = curve.fade(0, 1000, 1000, false);
        assert!(last >= 999, "{:?} fall start: {}", curve, last);
        for elapsed in (0..=1000).step_by(50) {
            let duty = curve.fade(elapsed, 1000, 1000, false);
            assert!(
                duty <= last,
                "{:?} rose at {}: {} > {}",
                curve,
                elapsed,
                duty,
                last
            );
            last = duty;
        }
        assert_eq!(last, 0, "{:?} fall end", curve);
    }
}

#[test]
fn interpolation_endpoints_are_exact() {
    let from = [10u8, 20, 200];
    let to = [200u8, 20, 10];
    let mut out = [0u8; 3];

    interpolate(0, 500, &from, &to, &mut out);
    assert_eq!(out, from);

    interpolate(500, 500, &from, &to, &mut out);
    assert_eq!(out, to);

    // Time past the fade clamps to the target
    interpolate(900, 500, &from, &to, &mut out);
    assert_eq!(out, to);
}

#[test]
fn interpolation_blends_quadratically() {
    let from = [255u8, 0, 0];
    let to = [0u8, 0, 255];
    let mut out = [0u8; 3];

    // Halfway in time is a quarter of the way over
    interpolate(100, 200, &from, &to, &mut out);
    assert_eq!(out, [192, 0, 63]);
}

#[test]
fn brightness_duty_round_trip_is_near_identity() {
    for &max_duty in &[255u16, 1000, 65535] {
        for brightness in 0..=255u16 {
            let brightness = brightness as u8;
            let duty = brightness_to_duty(brightness, max_duty);
            assert!(duty <= max_duty);

            let back = duty_to_brightness(duty, max_duty);
            let diff = (i16::from(back) - i16::from(brightness)).abs();
            assert!(
                diff <= 1,
                "brightness {} -> duty {} -> {} (max_duty {})",
                brightness,
                duty,
                back,
                max_duty
            );
        }
    }
}
