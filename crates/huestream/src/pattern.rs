//! Built-in color sources for `huestream stream`.
//!
//! Each pattern is a pure function of the channel count and the time since
//! streaming started, so the render loop can call it at any cadence.

use std::f64::consts::TAU;
use std::time::Duration;

use huestream_core::Rgb;

use crate::cli::Pattern;
use crate::error::CliError;

/// Degrees per second the rainbow advances.
const RAINBOW_SPEED: f64 = 90.0;
/// Seconds for one full pulse.
const PULSE_PERIOD: f64 = 2.0;
/// Brightness floor so pulsing lights never switch fully off.
const PULSE_FLOOR: f64 = 0.05;

/// Parse `ff8000`, `#ff8000`, or `FF8000`.
pub fn parse_hex(input: &str) -> Result<Rgb, CliError> {
    let invalid = || CliError::Validation {
        field: "color".into(),
        reason: format!("'{input}' is not a 6-digit hex color"),
    };
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let byte = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| invalid());
    Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?))
}

#[derive(Debug, Clone, Copy)]
pub struct ColorSource {
    pattern: Pattern,
    base: Rgb,
}

impl ColorSource {
    pub fn new(pattern: Pattern, base: Rgb) -> Self {
        Self { pattern, base }
    }

    /// Colors for every channel at `elapsed`.
    pub fn frame(&self, channels: usize, elapsed: Duration) -> Vec<Rgb> {
        let t = elapsed.as_secs_f64();
        match self.pattern {
            Pattern::Solid => vec![self.base; channels],
            Pattern::Pulse => {
                let wave = 0.5 * (1.0 - (TAU * t / PULSE_PERIOD).cos());
                vec![scale(self.base, PULSE_FLOOR + (1.0 - PULSE_FLOOR) * wave); channels]
            }
            Pattern::Rainbow => (0..channels)
                .map(|i| {
                    hsv(RAINBOW_SPEED.mul_add(t, spread(i, channels)) % 360.0)
                })
                .collect(),
        }
    }
}

/// Hue offset of channel `i` out of `n`, evenly around the wheel.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn spread(i: usize, n: usize) -> f64 {
    i as f64 * 360.0 / n as f64
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
fn unit_to_byte(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn scale(color: Rgb, factor: f64) -> Rgb {
    let c = |v: u8| unit_to_byte(f64::from(v) / 255.0 * factor);
    Rgb::new(c(color.r), c(color.g), c(color.b))
}

/// Fully saturated, full-value color at `hue` degrees.
fn hsv(hue: f64) -> Rgb {
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h {
        h if h < 1.0 => (1.0, x, 0.0),
        h if h < 2.0 => (x, 1.0, 0.0),
        h if h < 3.0 => (0.0, 1.0, x),
        h if h < 4.0 => (0.0, x, 1.0),
        h if h < 5.0 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    Rgb::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
}
