//! Array abstraction consumed by the engine.
//!
//! The engine never owns array storage. It reads shape/stride metadata, asks
//! for device pointers, and attaches freshly allocated buffers to outputs.

pub mod dtypes;

use std::fmt;

pub use dtypes::Dtype;
use serde::{Deserialize, Serialize};

/// Raw device address handed to the GEMM primitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    pub const NULL: DevicePtr = DevicePtr(0);

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Pointer advanced by `bytes`.
    #[inline]
    pub fn offset(self, bytes: usize) -> DevicePtr {
        DevicePtr(self.0 + bytes as u64)
    }
}

impl fmt::Debug for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:#x})", self.0)
    }
}

/// Contiguity flags maintained alongside an array's strides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArrayFlags {
    pub row_contiguous: bool,
    pub col_contiguous: bool,
}

impl ArrayFlags {
    /// Derive flags from a shape and element strides.
    ///
    /// Dimensions of extent 1 never break contiguity.
    pub fn from_layout(shape: &[usize], strides: &[usize]) -> Self {
        let mut row_contiguous = true;
        let mut expected = 1usize;
        for (&dim, &stride) in shape.iter().zip(strides).rev() {
            if dim != 1 && stride != expected {
                row_contiguous = false;
            }
            expected *= dim;
        }

        let mut col_contiguous = true;
        expected = 1;
        for (&dim, &stride) in shape.iter().zip(strides) {
            if dim != 1 && stride != expected {
                col_contiguous = false;
            }
            expected *= dim;
        }

        Self {
            row_contiguous,
            col_contiguous,
        }
    }
}

/// Row-major strides for `shape`, in elements.
pub fn compute_strides(shape: &[usize]) -> smallvec::SmallVec<[usize; 4]> {
    let mut strides = smallvec::SmallVec::from_elem(0usize, shape.len());
    let mut acc = 1usize;
    for (stride, &dim) in strides.iter_mut().zip(shape).rev() {
        *stride = acc;
        acc *= dim;
    }
    strides
}

/// Array handle provided by the host framework.
///
/// Clones share storage, the way a graph array handle does.
pub trait DeviceArray: Clone {
    /// Backing allocation produced by [`crate::context::CommandEncoder::malloc_async`].
    type Buffer;

    fn shape(&self) -> &[usize];
    /// Strides in elements.
    fn strides(&self) -> &[usize];
    fn dtype(&self) -> Dtype;
    fn flags(&self) -> ArrayFlags;
    /// Address of the first element, or [`DevicePtr::NULL`] when no storage is attached.
    fn device_ptr(&self) -> DevicePtr;
    fn set_data(&mut self, buffer: Self::Buffer);

    #[inline]
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Extent of dimension `axis`, counting from the back when negative.
    fn dim(&self, axis: isize) -> usize {
        let ndim = self.ndim() as isize;
        let index = if axis < 0 { ndim + axis } else { axis };
        self.shape()[index as usize]
    }

    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    fn nbytes(&self) -> usize {
        self.size() * self.dtype().size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_ignore_unit_dimensions() {
        let flags = ArrayFlags::from_layout(&[1, 4, 8], &[999, 8, 1]);
        assert!(flags.row_contiguous);
        assert!(!flags.col_contiguous);
    }

    #[test]
    fn transposed_strides_are_column_contiguous() {
        let flags = ArrayFlags::from_layout(&[4, 8], &[1, 4]);
        assert!(!flags.row_contiguous);
        assert!(flags.col_contiguous);
    }

    #[test]
    fn compute_strides_is_row_major() {
        assert_eq!(compute_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
        assert!(compute_strides(&[]).is_empty());
    }
}
