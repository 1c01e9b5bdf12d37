//! Static style table
//!
//! Colors in RGB565 and every length, radius and stroke width of the face.
//! Lengths are in grid units (see [`crate::geometry::GRID_SIZE`]), stroke
//! widths in pixels.
//!
//! To convert from 8-bit RGB: R>>3, G>>2, B>>3

use embedded_graphics::pixelcolor::Rgb565;

// ============================================================================
// Base Colors
// ============================================================================

/// Interactive background - very dark gray-blue
pub const COLOR_BACKGROUND: Rgb565 = Rgb565::new(18 >> 3, 23 >> 2, 24 >> 3);

/// Low-power background
pub const BLACK: Rgb565 = Rgb565::new(0, 0, 0);

/// Pure white - ticks, hands and cap
pub const WHITE: Rgb565 = Rgb565::new(31, 63, 31);

// ============================================================================
// Forecast Colors
// ============================================================================

/// Rain in daylight and on the minute ticks - bright blue
pub const COLOR_RAIN_DAY: Rgb565 = Rgb565::new(33 >> 3, 150 >> 2, 243 >> 3);

/// Rain after dark - deep blue
pub const COLOR_RAIN_NIGHT: Rgb565 = Rgb565::new(13 >> 3, 71 >> 2, 161 >> 3);

/// Accent of a clear daytime sky, as 8-bit channels
pub const SUN_RGB: (u8, u8, u8) = (255, 213, 79);

/// Gray an overcast daytime sky fades to
pub const SKY_DAY_NEUTRAL: u8 = 255;

/// Gray of an overcast night sky
pub const SKY_NIGHT_NEUTRAL: u8 = 160;

/// Gray of a clear night sky
pub const SKY_NIGHT_ACCENT: u8 = 80;

// ============================================================================
// Calendar Colors
// ============================================================================

/// Cycled by position in the active event list
pub const CALENDAR_PALETTE: [Rgb565; 3] = [
    Rgb565::new(255 >> 3, 112 >> 2, 67 >> 3),
    Rgb565::new(102 >> 3, 187 >> 2, 106 >> 3),
    Rgb565::new(171 >> 3, 71 >> 2, 188 >> 3),
];

/// Convert 8-bit channels into RGB565
pub const fn rgb888(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Mix two 8-bit colors channel by channel, `weight * a + (1 - weight) * b`
pub fn blend_rgb888(weight: f32, a: (u8, u8, u8), b: (u8, u8, u8)) -> Rgb565 {
    let weight = if weight.is_nan() { 1.0 } else { weight.clamp(0.0, 1.0) };
    let mix = |a: u8, b: u8| (weight * a as f32 + (1.0 - weight) * b as f32) as u8;
    rgb888(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

// ============================================================================
// Dimensions
// ============================================================================

/// Every length and stroke width used by the renderer
///
/// Built once at startup with [`FaceStyle::default`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceStyle {
    /// Outer end of minute and hour ticks
    pub tick_end: f32,
    /// Minute tick length with no rain
    pub minor_tick_length: f32,
    /// Minute tick length at the assumed maximum rain
    pub minor_tick_max_length: f32,
    /// Inner end of hour ticks
    pub major_tick_start: f32,
    pub minor_tick_stroke: u32,
    pub major_tick_stroke: u32,

    pub hour_hand_length: f32,
    pub minute_hand_length: f32,
    pub second_hand_length: f32,
    /// Width of the hour hand at the pivot
    pub hour_hand_base: f32,
    /// Width of the minute hand at the pivot
    pub minute_hand_base: f32,
    /// Width of both hands where the taper starts
    pub hand_tip: f32,
    /// Length of the tapered tip of both hands
    pub hand_tip_length: f32,
    pub second_hand_stroke: u32,
    /// Center cap radius
    pub cap_radius: f32,

    /// Label rows below the center for the first and second event
    pub calendar_label_offsets: [f32; 2],
}

impl Default for FaceStyle {
    fn default() -> Self {
        Self {
            tick_end: 7.5,
            minor_tick_length: 0.5,
            minor_tick_max_length: 4.0,
            major_tick_start: 6.0,
            minor_tick_stroke: 2,
            major_tick_stroke: 4,

            hour_hand_length: 4.0,
            minute_hand_length: 6.0,
            second_hand_length: 7.0,
            hour_hand_base: 0.3,
            minute_hand_base: 0.22,
            hand_tip: 0.1,
            hand_tip_length: 0.5,
            second_hand_stroke: 2,
            cap_radius: 0.3,

            calendar_label_offsets: [1.6, 2.8],
        }
    }
}

impl FaceStyle {
    /// Label row used when only one event is active
    pub fn single_label_offset(&self) -> f32 {
        (self.calendar_label_offsets[0] + self.calendar_label_offsets[1]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend_rgb888(1.0, (255, 255, 255), SUN_RGB), WHITE);
        assert_eq!(blend_rgb888(0.0, (255, 255, 255), SUN_RGB), rgb888(255, 213, 79));
    }

    #[test]
    fn test_single_label_sits_between_rows() {
        let style = FaceStyle::default();
        assert!((style.single_label_offset() - 2.2).abs() < 1e-6);
    }
}
