//! Device and stream abstractions the engine enqueues work on.

pub mod scope;

pub use scope::OperationScope;

use crate::{error::QmmError, operation::GemmPrimitive, tensor::DeviceArray};

/// A GPU the engine can target.
pub trait Device {
    /// Index identifying the device within the process.
    fn ordinal(&self) -> usize;
    fn compute_capability_major(&self) -> i32;
    fn compute_capability_minor(&self) -> i32;
}

/// Command encoder bound to a single stream.
///
/// Everything enqueued through one encoder executes in issue order, so a copy
/// enqueued before a launch is complete before the launch reads it.
pub trait CommandEncoder: GemmPrimitive {
    type Device: Device;
    type Array: DeviceArray;

    fn device(&self) -> &Self::Device;

    /// Track `array` as read by the work being enqueued.
    fn set_input_array(&mut self, array: &Self::Array);

    /// Track `array` as written by the work being enqueued.
    fn set_output_array(&mut self, array: &Self::Array);

    /// Keep `array` alive until the enqueued work completes, then release it.
    fn add_temporary(&mut self, array: Self::Array);

    /// Enqueue a copy of `array` into fresh row-contiguous storage.
    fn contiguous_copy(&mut self, array: &Self::Array) -> Result<Self::Array, QmmError>;

    /// Stream-ordered allocation of `nbytes` bytes.
    fn malloc_async(&mut self, nbytes: usize) -> Result<<Self::Array as DeviceArray>::Buffer, QmmError>;
}
