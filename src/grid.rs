use image::{DynamicImage, RgbaImage};
use itertools::Itertools;

use crate::error::GridError;
use crate::pixel::{Pixel, CHANNELS_PER_PIXEL};

/// Row-major pixel storage. Every row has `width` pixels; a grid with zero
/// rows is the empty image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelGrid {
    data: Vec<Pixel>,
    width: usize,
    height: usize,
}

impl PixelGrid {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<Pixel>>) -> Result<Self, GridError> {
        let height = rows.len();
        if height == 0 {
            return Ok(Self::empty());
        }
        if !rows.iter().map(Vec::len).all_equal() {
            let lengths = rows.iter().map(Vec::len).dedup().join(", ");
            return Err(GridError::malformed(format!(
                "rows differ in length ({lengths})"
            )));
        }
        let width = rows[0].len();
        let data: Vec<Pixel> = rows.into_iter().flatten().collect();
        Self::from_vec(data, width, height)
    }

    pub fn from_vec(data: Vec<Pixel>, width: usize, height: usize) -> Result<Self, GridError> {
        if height == 0 && width == 0 && data.is_empty() {
            return Ok(Self::empty());
        }
        if width == 0 || height == 0 {
            return Err(GridError::malformed(format!(
                "a non-empty grid needs width and height >= 1, got {width}x{height}"
            )));
        }
        let expected = width.checked_mul(height).ok_or_else(|| {
            GridError::malformed(format!("{width}x{height} overflows the address space"))
        })?;
        if data.len() != expected {
            return Err(GridError::malformed(format!(
                "{} pixels cannot fill a {width}x{height} grid",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self::from(&image.to_rgba8())
    }

    /// (width, height)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn index(&self, row: usize, col: usize) -> Result<usize, GridError> {
        if row >= self.height || col >= self.width {
            return Err(GridError::IndexOutOfRange {
                row,
                col,
                width: self.width,
                height: self.height,
            });
        }
        Ok(row * self.width + col)
    }

    /// Converts a flat index back to (row, col).
    pub fn coordinates(&self, idx: usize) -> (usize, usize) {
        (idx / self.width.max(1), idx % self.width.max(1))
    }

    pub fn get(&self, row: usize, col: usize) -> Result<Pixel, GridError> {
        let idx = self.index(row, col)?;
        Ok(self.data[idx])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Result<&mut Pixel, GridError> {
        let idx = self.index(row, col)?;
        Ok(&mut self.data[idx])
    }

    pub fn set(&mut self, row: usize, col: usize, pixel: Pixel) -> Result<(), GridError> {
        *self.get_mut(row, col)? = pixel;
        Ok(())
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.data
    }

    /// Fails when a side does not fit the `u32` dimensions of `image`.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, GridError> {
        let side = |value: usize| {
            u32::try_from(value).map_err(|_| {
                GridError::malformed(format!(
                    "{}x{} is too large for an RGBA image",
                    self.width, self.height
                ))
            })
        };
        let (width, height) = (side(self.width)?, side(self.height)?);
        let raw: Vec<u8> = self.data.iter().flatten().copied().collect();
        RgbaImage::from_raw(width, height, raw).ok_or_else(|| {
            GridError::malformed(format!(
                "{} pixels cannot fill a {}x{} image",
                self.data.len(),
                self.width,
                self.height
            ))
        })
    }
}

impl From<&RgbaImage> for PixelGrid {
    fn from(image: &RgbaImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        if width == 0 || height == 0 {
            return Self::empty();
        }
        let data = image
            .as_raw()
            .chunks_exact(CHANNELS_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect();
        Self {
            data,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PixelGrid {
        PixelGrid::from_rows(vec![
            vec![[1, 1, 1, 255], [2, 2, 2, 255], [3, 3, 3, 255]],
            vec![[4, 4, 4, 255], [5, 5, 5, 255], [6, 6, 6, 255]],
        ])
        .unwrap()
    }

    #[test]
    fn nested_rows_are_row_major() {
        let grid = sample();
        assert_eq!(grid.dimensions(), (3, 2));
        assert_eq!(grid.get(1, 0).unwrap(), [4, 4, 4, 255]);
        assert_eq!(grid.pixels()[5], [6, 6, 6, 255]);
        assert_eq!(grid.coordinates(4), (1, 1));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let result = PixelGrid::from_rows(vec![vec![[0; 4]; 3], vec![[0; 4]; 2]]);
        assert!(matches!(result, Err(GridError::Malformed { .. })));
    }

    #[test]
    fn empty_rows_are_rejected() {
        let result = PixelGrid::from_rows(vec![vec![], vec![]]);
        assert!(matches!(result, Err(GridError::Malformed { .. })));
    }

    #[test]
    fn flat_length_must_match() {
        let result = PixelGrid::from_vec(vec![[0; 4]; 5], 3, 2);
        assert!(matches!(result, Err(GridError::Malformed { .. })));
        assert!(PixelGrid::from_vec(vec![[0; 4]; 6], 3, 2).is_ok());
    }

    #[test]
    fn zero_rows_is_empty() {
        let grid = PixelGrid::from_rows(vec![]).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.dimensions(), (0, 0));
    }

    #[test]
    fn out_of_range_access() {
        let mut grid = sample();
        assert_eq!(
            grid.get(2, 0),
            Err(GridError::IndexOutOfRange {
                row: 2,
                col: 0,
                width: 3,
                height: 2
            })
        );
        assert!(grid.set(0, 3, [0; 4]).is_err());
        grid.set(0, 2, [9, 9, 9, 9]).unwrap();
        assert_eq!(grid.get(0, 2).unwrap(), [9, 9, 9, 9]);
    }

    #[test]
    fn rgba_image_conversion_keeps_layout() {
        let grid = sample();
        let image = grid.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1).0, [6, 6, 6, 255]);
        assert_eq!(PixelGrid::from(&image), grid);
    }

    #[test]
    fn empty_grid_converts_to_empty_image() {
        let image = PixelGrid::empty().to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (0, 0));
    }
}
