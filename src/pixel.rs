pub type SubPixel = u8;
pub type Pixel = [SubPixel; CHANNELS_PER_PIXEL];

pub const CHANNELS_PER_PIXEL: usize = 4;
pub const ALPHA: usize = 3;
pub const MAX_SUBPIXEL: SubPixel = SubPixel::MAX;

pub trait PixelOps {
    fn scale_rgb(self, factor: f32) -> Self;
}

/// Multiplies one channel and truncates toward zero, saturating at both ends.
/// `as` from float to int already clamps negatives and NaN to 0.
#[inline]
pub fn scale_subpixel(value: SubPixel, factor: f32) -> SubPixel {
    let scaled = (f32::from(value) * factor) as u32;
    scaled.min(u32::from(MAX_SUBPIXEL)) as SubPixel
}

impl PixelOps for Pixel {
    fn scale_rgb(self, factor: f32) -> Self {
        let [r, g, b, a] = self;
        [
            scale_subpixel(r, factor),
            scale_subpixel(g, factor),
            scale_subpixel(b, factor),
            a,
        ]
    }
}
