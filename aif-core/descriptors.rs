use crate::error::{CoreError, CoreResult};

/// Element type of a descriptor matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    U8,
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Empty,
    F32(Vec<f32>),
    U8(Vec<u8>),
}

/// Row-major descriptor table, one row per key-point.
///
/// A matrix built by [`DescriptorMatrix::empty`] has no rows and no element
/// type. Matrices built from data always carry their element type, even with
/// zero rows, so that width and type survive an empty detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorMatrix {
    rows: usize,
    cols: usize,
    data: Storage,
}

impl Default for DescriptorMatrix {
    fn default() -> Self {
        Self::empty()
    }
}

impl DescriptorMatrix {
    pub fn empty() -> Self {
        Self { rows: 0, cols: 0, data: Storage::Empty }
    }

    /// Wrap row-major `f32` data with `cols` elements per row
    pub fn from_f32(cols: usize, data: Vec<f32>) -> CoreResult<Self> {
        let rows = Self::row_count(cols, data.len())?;
        Ok(Self { rows, cols, data: Storage::F32(data) })
    }

    /// Wrap row-major packed `u8` data with `cols` bytes per row
    pub fn from_u8(cols: usize, data: Vec<u8>) -> CoreResult<Self> {
        let rows = Self::row_count(cols, data.len())?;
        Ok(Self { rows, cols, data: Storage::U8(data) })
    }

    fn row_count(cols: usize, len: usize) -> CoreResult<usize> {
        if cols == 0 {
            return if len == 0 {
                Ok(0)
            } else {
                Err(CoreError::DescriptorShape { len, cols })
            };
        }
        if len % cols != 0 {
            return Err(CoreError::DescriptorShape { len, cols });
        }
        Ok(len / cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn element_type(&self) -> Option<ElementType> {
        match self.data {
            Storage::Empty => None,
            Storage::F32(_) => Some(ElementType::F32),
            Storage::U8(_) => Some(ElementType::U8),
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            Storage::F32(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            Storage::U8(data) => Some(data),
            _ => None,
        }
    }

    pub fn row_f32(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        self.as_f32().map(|data| &data[row * self.cols..(row + 1) * self.cols])
    }

    pub fn row_u8(&self, row: usize) -> Option<&[u8]> {
        if row >= self.rows {
            return None;
        }
        self.as_u8().map(|data| &data[row * self.cols..(row + 1) * self.cols])
    }

    /// Concatenate rows of `parts` in order.
    ///
    /// Parts without rows are skipped; width and element type come from the
    /// first part that has rows. If no part has rows the result is
    /// [`DescriptorMatrix::empty`].
    pub fn vstack(parts: &[DescriptorMatrix]) -> CoreResult<Self> {
        let Some(first) = parts.iter().find(|p| !p.is_empty()) else {
            return Ok(Self::empty());
        };
        let cols = first.cols;

        for part in parts.iter().filter(|p| !p.is_empty()) {
            if part.cols != cols || part.element_type() != first.element_type() {
                return Err(first.incompatible(part));
            }
        }

        let rows: usize = parts.iter().map(|p| p.rows).sum();
        let data = match first.data {
            Storage::F32(_) => Storage::F32(
                parts.iter().filter_map(|p| p.as_f32()).flatten().copied().collect(),
            ),
            Storage::U8(_) => Storage::U8(
                parts.iter().filter_map(|p| p.as_u8()).flatten().copied().collect(),
            ),
            Storage::Empty => Storage::Empty,
        };
        Ok(Self { rows, cols, data })
    }

    /// Block-diagonal composition of two matrices: rows of `first` become
    /// `[first | 0]`, rows of `second` become `[0 | second]`.
    pub fn hconcat_padded(first: &DescriptorMatrix, second: &DescriptorMatrix) -> CoreResult<Self> {
        let element_type = match (first.element_type(), second.element_type()) {
            (Some(a), Some(b)) if a != b => return Err(first.incompatible(second)),
            (Some(t), _) | (None, Some(t)) => t,
            (None, None) => return Ok(Self::empty()),
        };

        let rows = first.rows + second.rows;
        let cols = first.cols + second.cols;
        let data = match element_type {
            ElementType::F32 => Storage::F32(block_diagonal(
                first.as_f32().unwrap_or(&[]),
                (first.rows, first.cols),
                second.as_f32().unwrap_or(&[]),
                (second.rows, second.cols),
            )),
            ElementType::U8 => Storage::U8(block_diagonal(
                first.as_u8().unwrap_or(&[]),
                (first.rows, first.cols),
                second.as_u8().unwrap_or(&[]),
                (second.rows, second.cols),
            )),
        };
        Ok(Self { rows, cols, data })
    }

    fn incompatible(&self, other: &DescriptorMatrix) -> CoreError {
        CoreError::IncompatibleDescriptors {
            expected_cols: self.cols,
            expected_type: self.element_type().unwrap_or(ElementType::U8),
            actual_cols: other.cols,
            actual_type: other.element_type().unwrap_or(ElementType::U8),
        }
    }
}

fn block_diagonal<T: Copy + Default>(
    a: &[T],
    (a_rows, a_cols): (usize, usize),
    b: &[T],
    (b_rows, b_cols): (usize, usize),
) -> Vec<T> {
    let cols = a_cols + b_cols;
    let mut out = vec![T::default(); (a_rows + b_rows) * cols];
    for r in 0..a_rows {
        out[r * cols..r * cols + a_cols].copy_from_slice(&a[r * a_cols..(r + 1) * a_cols]);
    }
    for r in 0..b_rows {
        let offset = (a_rows + r) * cols + a_cols;
        out[offset..offset + b_cols].copy_from_slice(&b[r * b_cols..(r + 1) * b_cols]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_validation() {
        let m = DescriptorMatrix::from_f32(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 2);
        assert_eq!(m.row_f32(1), Some(&[3.0, 4.0][..]));
        assert_eq!(m.row_u8(0), None);

        let err = DescriptorMatrix::from_u8(3, vec![0; 4]);
        assert!(matches!(err, Err(CoreError::DescriptorShape { len: 4, cols: 3 })));
    }

    #[test]
    fn test_typed_empty_keeps_type() {
        let m = DescriptorMatrix::from_u8(32, Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.element_type(), Some(ElementType::U8));
        assert_eq!(DescriptorMatrix::empty().element_type(), None);
    }

    #[test]
    fn test_vstack_skips_empty_parts() {
        let parts = vec![
            DescriptorMatrix::from_u8(2, Vec::new()).unwrap(),
            DescriptorMatrix::from_u8(2, vec![1, 2]).unwrap(),
            DescriptorMatrix::empty(),
            DescriptorMatrix::from_u8(2, vec![3, 4, 5, 6]).unwrap(),
        ];
        let m = DescriptorMatrix::vstack(&parts).unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.as_u8(), Some(&[1, 2, 3, 4, 5, 6][..]));
    }

    #[test]
    fn test_vstack_all_empty() {
        let parts = vec![
            DescriptorMatrix::from_f32(4, Vec::new()).unwrap(),
            DescriptorMatrix::empty(),
        ];
        let m = DescriptorMatrix::vstack(&parts).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.element_type(), None);
    }

    #[test]
    fn test_vstack_rejects_mixed_widths() {
        let parts = vec![
            DescriptorMatrix::from_u8(2, vec![1, 2]).unwrap(),
            DescriptorMatrix::from_u8(3, vec![1, 2, 3]).unwrap(),
        ];
        assert!(matches!(
            DescriptorMatrix::vstack(&parts),
            Err(CoreError::IncompatibleDescriptors { .. })
        ));
    }

    #[test]
    fn test_hconcat_padded_is_block_diagonal() {
        let a = DescriptorMatrix::from_f32(2, vec![1.0, 2.0]).unwrap();
        let b = DescriptorMatrix::from_f32(1, vec![7.0, 8.0]).unwrap();
        let m = DescriptorMatrix::hconcat_padded(&a, &b).unwrap();
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 3);
        assert_eq!(
            m.as_f32(),
            Some(&[1.0, 2.0, 0.0, 0.0, 0.0, 7.0, 0.0, 0.0, 8.0][..])
        );
    }

    #[test]
    fn test_hconcat_padded_rejects_mixed_types() {
        let a = DescriptorMatrix::from_f32(1, vec![1.0]).unwrap();
        let b = DescriptorMatrix::from_u8(1, vec![1]).unwrap();
        assert!(DescriptorMatrix::hconcat_padded(&a, &b).is_err());
    }
}
