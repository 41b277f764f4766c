//! `ndarray` views of pixel grids. Arrays are indexed `[row, column]`, that is
//! `(height, width)`.

use ndarray::{Array2, ArrayView2};

use crate::error::FormatError;
use crate::pixels::{PixelData, PixelGrid};

impl PixelGrid {
    /// Copy the samples into an array, widened to `u32`.
    pub fn to_array(&self) -> Array2<u32> {
        Array2::from_shape_fn((self.height(), self.width()), |(y, x)| {
            self.get(x, y).unwrap_or(0)
        })
    }

    pub fn from_array_u8(array: ArrayView2<'_, u8>) -> Result<Self, FormatError> {
        let (height, width) = array.dim();
        PixelGrid::new(width, height, PixelData::U8(array.iter().copied().collect()))
    }

    pub fn from_array_u16(array: ArrayView2<'_, u16>) -> Result<Self, FormatError> {
        let (height, width) = array.dim();
        PixelGrid::new(width, height, PixelData::U16(array.iter().copied().collect()))
    }

    pub fn from_array_u32(array: ArrayView2<'_, u32>) -> Result<Self, FormatError> {
        let (height, width) = array.dim();
        PixelGrid::new(width, height, PixelData::U32(array.iter().copied().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn to_array_shape() {
        let grid = PixelGrid::from_u16(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let arr = grid.to_array();
        assert_eq!(arr.dim(), (2, 3));
        assert_eq!(arr[[0, 2]], 3);
        assert_eq!(arr[[1, 0]], 4);
    }

    #[test]
    fn from_array_roundtrip() {
        let arr = array![[1u16, 2], [3, 4], [5, 6]];
        let grid = PixelGrid::from_array_u16(arr.view()).unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.get(1, 2), Some(6));
        assert_eq!(grid.to_array(), arr.mapv(u32::from));
    }

    #[test]
    fn transposed_view_is_logical_order() {
        let arr = array![[1u8, 2], [3, 4]];
        let grid = PixelGrid::from_array_u8(arr.t()).unwrap();
        assert_eq!(grid.rows(), vec![vec![1, 3], vec![2, 4]]);
    }

    #[test]
    fn wide_samples() {
        let arr = array![[u32::MAX]];
        let grid = PixelGrid::from_array_u32(arr.view()).unwrap();
        assert_eq!(grid.bit_depth(), 32);
        assert_eq!(grid.to_array()[[0, 0]], u32::MAX);
    }
}
