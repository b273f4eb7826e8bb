//! RGB color values for file hues and the activity histogram.
//!
//! Colors derive a total order so that histogram key lists sort
//! deterministically: two runs over the same input always render the
//! same stacked-bar ordering.

use serde::{Deserialize, Serialize};

/// An opaque RGB color value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Black, the starting color identity of a person entity.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Mid gray, the conventional catch-all file hue.
    pub const GRAY: Self = Self::new(128, 128, 128);

    /// Create a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linearly interpolate from `self` toward `other` by `t` in `[0, 1]`.
    ///
    /// Used for the exponentially-weighted running blend of a person's
    /// color identity: each file touch pulls the blend toward the file
    /// hue with weight `1 / sample_count`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            lerp_channel(self.r, other.r, t),
            lerp_channel(self.g, other.g, t),
            lerp_channel(self.b, other.b, t),
        )
    }
}

/// Interpolate a single channel, rounding to the nearest value.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    let blended = f32::from(from) + (f32::from(to) - f32::from(from)) * t;
    blended.round().clamp(0.0, 255.0) as u8
}
