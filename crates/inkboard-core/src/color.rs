//! Stroke colors: per-author derived hues and CSS color parsing.

use serde::{Deserialize, Serialize};

/// RGBA8 color used by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from an HSL triple (hue in degrees, saturation and
    /// lightness in `0.0..=1.0`).
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match h {
            h if h < 60.0 => (c, x, 0.0),
            h if h < 120.0 => (x, c, 0.0),
            h if h < 180.0 => (0.0, c, x),
            h if h < 240.0 => (0.0, x, c),
            h if h < 300.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(to_u8(r), to_u8(g), to_u8(b), 255)
    }

    /// Parse a CSS color string.
    ///
    /// Supports `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(..)`, `rgba(..)` and
    /// `hsl(..)`. Returns `None` for anything else.
    pub fn parse_css(input: &str) -> Option<Self> {
        let s = input.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(args) = function_args(&lower, "hsl") {
            let [h, sat, light] = args.as_slice() else {
                return None;
            };
            let h = h.trim_end_matches("deg").parse::<f64>().ok()?;
            return Some(Self::from_hsl(h, percent(sat)?, percent(light)?));
        }
        if let Some(args) = function_args(&lower, "rgba").or_else(|| function_args(&lower, "rgb")) {
            let channel = |v: &str| v.parse::<f64>().ok().map(|v| v.round().clamp(0.0, 255.0) as u8);
            return match args.as_slice() {
                [r, g, b] => Some(Self::new(channel(r)?, channel(g)?, channel(b)?, 255)),
                [r, g, b, a] => {
                    let alpha = a.parse::<f64>().ok()?.clamp(0.0, 1.0);
                    Some(Self::new(
                        channel(r)?,
                        channel(g)?,
                        channel(b)?,
                        (alpha * 255.0).round() as u8,
                    ))
                }
                _ => None,
            };
        }

        None
    }

    /// Parse a CSS color, falling back to black for unsupported input.
    pub fn parse_css_or_black(input: &str) -> Self {
        Self::parse_css(input).unwrap_or_else(|| {
            log::warn!("Unsupported stroke color '{}', drawing in black", input);
            Self::BLACK
        })
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    match hex.len() {
        3 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn function_args<'a>(s: &'a str, name: &str) -> Option<Vec<&'a str>> {
    let inner = s.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')?;
    Some(
        inner
            .split(|c: char| c == ',' || c.is_whitespace() || c == '/')
            .filter(|part| !part.is_empty())
            .collect(),
    )
}

fn percent(s: &str) -> Option<f64> {
    let value = s.strip_suffix('%')?.parse::<f64>().ok()?;
    Some(value / 100.0)
}

/// Deterministic hue (0..360) derived from a user id.
///
/// Uses the classic `hash * 31 + code_unit` string hash over UTF-16 code
/// units with 32-bit wrapping on the shift, so the same id yields the same
/// hue on every client.
pub fn author_hue(user_id: &str) -> u16 {
    let mut acc: f64 = 0.0;
    for unit in user_id.encode_utf16() {
        let shifted = to_int32(acc).wrapping_shl(5);
        acc = f64::from(unit) + (f64::from(shifted) - acc);
    }
    (acc.abs() % 360.0) as u16
}

/// CSS color for an author: `hsl(<hue>, 70%, 50%)`.
pub fn author_color(user_id: &str) -> String {
    format!("hsl({}, 70%, 50%)", author_hue(user_id))
}

/// ECMAScript ToInt32 for the integral values produced by [`author_hue`].
fn to_int32(value: f64) -> i32 {
    (value.trunc() as i64) as i32
}
