use std::io::Cursor;
use std::str::FromStr;

use image::{DynamicImage, ImageError, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ArgumentError, CodecError};
use crate::grid::PixelGrid;

pub trait ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelGrid, CodecError>;
    /// Raster containers cannot hold a zero-sized image, so an empty grid is
    /// an `Encode` error.
    fn encode(&self, grid: &PixelGrid) -> Result<Vec<u8>, CodecError>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            _ => Err(ArgumentError::UnknownFormat(s.to_string())),
        }
    }
}

/// Codec backed by the `image` crate. Decoding accepts any container the
/// crate recognises; encoding writes `format`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterCodec {
    pub format: OutputFormat,
}

impl RasterCodec {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

fn decode_error(err: ImageError) -> CodecError {
    match err {
        ImageError::Unsupported(err) => CodecError::UnsupportedFormat(err.to_string()),
        other => CodecError::CorruptData(other.to_string()),
    }
}

impl ImageCodec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelGrid, CodecError> {
        let image = image::load_from_memory(bytes).map_err(decode_error)?;
        Ok(PixelGrid::from_dynamic(&image))
    }

    fn encode(&self, grid: &PixelGrid) -> Result<Vec<u8>, CodecError> {
        if grid.is_empty() {
            return Err(CodecError::Encode("cannot encode an empty image".to_string()));
        }
        let rgba = grid
            .to_rgba_image()
            .map_err(|err| CodecError::Encode(err.to_string()))?;
        let rgba = DynamicImage::ImageRgba8(rgba);
        // JPEG has no alpha channel
        let image = match self.format {
            OutputFormat::Png => rgba,
            OutputFormat::Jpeg => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        };
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, self.format.image_format())
            .map_err(|err| CodecError::Encode(err.to_string()))?;
        Ok(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_one() -> PixelGrid {
        PixelGrid::from_rows(vec![vec![[200, 200, 200, 255], [10, 10, 10, 255]]]).unwrap()
    }

    #[test]
    fn png_keeps_every_channel() {
        let codec = RasterCodec::new(OutputFormat::Png);
        let grid = PixelGrid::from_rows(vec![
            vec![[1, 2, 3, 4], [250, 251, 252, 253]],
            vec![[0, 0, 0, 0], [255, 255, 255, 255]],
        ])
        .unwrap();
        let bytes = codec.encode(&grid).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), grid);
    }

    #[test]
    fn jpeg_output_is_opaque() {
        let codec = RasterCodec::new(OutputFormat::Jpeg);
        let bytes = codec.encode(&two_by_one()).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert!(decoded.pixels().iter().all(|p| p[3] == 255));
    }

    #[test]
    fn unknown_bytes_are_unsupported() {
        let codec = RasterCodec::default();
        assert!(matches!(
            codec.decode(b"definitely not an image"),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn truncated_png_is_corrupt() {
        let codec = RasterCodec::default();
        let bytes = codec.encode(&two_by_one()).unwrap();
        assert!(matches!(
            codec.decode(&bytes[..bytes.len() / 2]),
            Err(CodecError::CorruptData(_))
        ));
    }

    #[test]
    fn empty_grid_is_not_encoded() {
        let result = RasterCodec::default().encode(&PixelGrid::empty());
        assert!(matches!(result, Err(CodecError::Encode(message)) if message.contains("empty")));
    }

    #[test]
    fn format_names() {
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }
}
