//! CPU implementation of the collaborator traits.
//!
//! Arrays live in host memory and the encoder runs a reference GEMM eagerly,
//! so the engine can be exercised and checked without a GPU. Pointers handed
//! to the GEMM are real host addresses; the reference reads memory through
//! them exactly as the launch describes, so an unnormalized operand produces
//! wrong numbers here just as it would on a device.

mod encoder;
pub mod quantize;
mod reference;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use encoder::{EncoderStats, HostEncoder, LaunchRecord};
pub use quantize::{QuantizedWeights, dequantize, quantize};
use smallvec::SmallVec;

use crate::{
    context::Device, error::QmmError, tensor::{ArrayFlags, DeviceArray, DevicePtr, Dtype, compute_strides}
};

/// A simulated device with a configurable compute capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostDevice {
    pub ordinal: usize,
    pub major: i32,
    pub minor: i32,
}

impl HostDevice {
    pub const fn new(ordinal: usize, major: i32, minor: i32) -> Self {
        Self { ordinal, major, minor }
    }

    /// Device 0 reporting compute capability 10.0.
    pub const fn block_scaled() -> Self {
        Self::new(0, 10, 0)
    }
}

impl Device for HostDevice {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn compute_capability_major(&self) -> i32 {
        self.major
    }

    fn compute_capability_minor(&self) -> i32 {
        self.minor
    }
}

/// Shared host allocation.
#[derive(Clone, Debug)]
pub struct HostBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    base: u64,
    len: usize,
}

impl HostBuffer {
    /// Allocate `len` zero bytes, failing instead of aborting when the
    /// allocator cannot satisfy the request.
    pub fn zeroed(len: usize) -> Result<Self, QmmError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).map_err(|_| QmmError::BufferCreationFailed(len))?;
        bytes.resize(len, 0);
        Ok(Self::from_vec(bytes))
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        // The vector is never resized, so its heap address is stable.
        let base = bytes.as_ptr() as u64;
        let len = bytes.len();
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
            base,
            len,
        }
    }

    #[inline]
    pub fn base(&self) -> DevicePtr {
        DevicePtr(self.base)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `ptr` points into this allocation.
    pub fn contains(&self, ptr: DevicePtr) -> bool {
        ptr.0 >= self.base && ptr.0 < self.base + self.len.max(1) as u64
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn same_allocation(&self, other: &HostBuffer) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

/// Strided view over a [`HostBuffer`].
#[derive(Clone, Debug)]
pub struct HostArray {
    shape: SmallVec<[usize; 4]>,
    strides: SmallVec<[usize; 4]>,
    dtype: Dtype,
    /// In elements.
    offset: usize,
    storage: Option<HostBuffer>,
}

impl HostArray {
    /// Array whose storage is attached later through [`DeviceArray::set_data`].
    pub fn declared(shape: &[usize], dtype: Dtype) -> Self {
        Self {
            shape: SmallVec::from_slice(shape),
            strides: compute_strides(shape),
            dtype,
            offset: 0,
            storage: None,
        }
    }

    /// Row-contiguous array over raw little-endian element bytes.
    pub fn from_bytes(shape: &[usize], dtype: Dtype, bytes: Vec<u8>) -> Result<Self, QmmError> {
        let expected = shape.iter().product::<usize>() * dtype.size_bytes();
        if bytes.len() != expected {
            return Err(QmmError::InvalidOperation(format!(
                "{} bytes cannot back a {:?} array of shape {:?} ({} bytes)",
                bytes.len(),
                dtype,
                shape,
                expected
            )));
        }
        let mut array = Self::declared(shape, dtype);
        array.storage = Some(HostBuffer::from_vec(bytes));
        Ok(array)
    }

    /// Row-contiguous floating point array encoded from f32 values.
    pub fn from_f32(shape: &[usize], dtype: Dtype, values: &[f32]) -> Result<Self, QmmError> {
        let size = dtype.size_bytes();
        let mut bytes = vec![0u8; values.len() * size];
        for (chunk, &value) in bytes.chunks_exact_mut(size).zip(values) {
            dtype.write_f32(value, chunk);
        }
        Self::from_bytes(shape, dtype, bytes)
    }

    /// View sharing this array's storage with new metadata.
    pub fn view(&self, shape: &[usize], strides: &[usize], offset: usize) -> Self {
        Self {
            shape: SmallVec::from_slice(shape),
            strides: SmallVec::from_slice(strides),
            dtype: self.dtype,
            offset,
            storage: self.storage.clone(),
        }
    }

    /// View with the last two dimensions swapped.
    pub fn transposed(&self) -> Self {
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        let ndim = shape.len();
        if ndim >= 2 {
            shape.swap(ndim - 1, ndim - 2);
            strides.swap(ndim - 1, ndim - 2);
        }
        Self {
            shape,
            strides,
            dtype: self.dtype,
            offset: self.offset,
            storage: self.storage.clone(),
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn storage(&self) -> Option<&HostBuffer> {
        self.storage.as_ref()
    }

    /// Whether both arrays view the same allocation.
    pub fn shares_storage(&self, other: &HostArray) -> bool {
        match (&self.storage, &other.storage) {
            (Some(lhs), Some(rhs)) => lhs.same_allocation(rhs),
            _ => false,
        }
    }

    /// Element bytes in logical row-major order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, QmmError> {
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| QmmError::InvalidOperation("array has no storage attached".to_string()))?;
        let size = self.dtype.size_bytes();
        let bytes = storage.lock();
        let mut out = Vec::with_capacity(self.size() * size);
        for index in self.logical_offsets() {
            let start = (self.offset + index) * size;
            let element = bytes.get(start..start + size).ok_or_else(|| {
                QmmError::InvalidOperation(format!("view of shape {:?} strides {:?} exceeds its storage", self.shape, self.strides))
            })?;
            out.extend_from_slice(element);
        }
        Ok(out)
    }

    /// Values in logical row-major order, decoded to f32.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, QmmError> {
        let size = self.dtype.size_bytes();
        Ok(self.to_bytes()?.chunks_exact(size).map(|chunk| self.dtype.read_f32(chunk)).collect())
    }

    /// Element offsets (relative to `offset`) in logical row-major order.
    fn logical_offsets(&self) -> Vec<usize> {
        let mut offsets = vec![0usize];
        for (&dim, &stride) in self.shape.iter().zip(&self.strides) {
            let mut next = Vec::with_capacity(offsets.len() * dim);
            for base in &offsets {
                next.extend((0..dim).map(|i| base + i * stride));
            }
            offsets = next;
        }
        offsets
    }
}

impl DeviceArray for HostArray {
    type Buffer = HostBuffer;

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn strides(&self) -> &[usize] {
        &self.strides
    }

    fn dtype(&self) -> Dtype {
        self.dtype
    }

    fn flags(&self) -> ArrayFlags {
        ArrayFlags::from_layout(&self.shape, &self.strides)
    }

    fn device_ptr(&self) -> DevicePtr {
        match &self.storage {
            Some(storage) => storage.base().offset(self.offset * self.dtype.size_bytes()),
            None => DevicePtr::NULL,
        }
    }

    fn set_data(&mut self, buffer: HostBuffer) {
        self.strides = compute_strides(&self.shape);
        self.offset = 0;
        self.storage = Some(buffer);
    }
}
