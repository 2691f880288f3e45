use std::convert::Infallible;

use crate::error::ArgumentError;
use crate::pixel::{Pixel, PixelOps};

/// A pure per-pixel operation. Implementations must not share mutable state,
/// they are called concurrently from every worker of a pass.
pub trait PixelTransform: Sync {
    fn apply(&self, pixel: Pixel) -> Pixel;
    fn name(&self) -> String;
}

/// Per-pixel operation that can reject a single pixel. A failure only affects
/// the pixel it was raised for.
pub trait FalliblePixelTransform: Sync {
    type Error: std::fmt::Display + Send;

    fn try_apply(&self, pixel: Pixel) -> Result<Pixel, Self::Error>;
    fn name(&self) -> String;
}

impl<T: PixelTransform> FalliblePixelTransform for T {
    type Error = Infallible;

    #[inline]
    fn try_apply(&self, pixel: Pixel) -> Result<Pixel, Infallible> {
        Ok(self.apply(pixel))
    }

    fn name(&self) -> String {
        PixelTransform::name(self)
    }
}

/// Multiplies R, G and B by `factor`, truncating and saturating at 255.
/// Alpha is kept as is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brightness {
    factor: f32,
}

impl Brightness {
    pub fn new(factor: f32) -> Result<Self, ArgumentError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(ArgumentError::InvalidFactor(factor));
        }
        Ok(Self { factor })
    }

    /// `percent` of 25 means 25% brighter, i.e. a factor of 1.25.
    pub fn from_percent(percent: i32) -> Result<Self, ArgumentError> {
        Self::new(1.0 + percent as f32 / 100.0)
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl PixelTransform for Brightness {
    #[inline]
    fn apply(&self, pixel: Pixel) -> Pixel {
        pixel.scale_rgb(self.factor)
    }

    fn name(&self) -> String {
        return "Brightness".to_string()
    }
}
