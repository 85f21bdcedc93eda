use tracing::trace;

use super::{HostArray, HostBuffer, HostDevice, reference};
use crate::{
    context::CommandEncoder, error::QmmError, kernels::qmm::{MatmulDescriptor, QmmPlanKey}, operation::{GemmPrimitive, GemmStatus, MatmulBinding}, tensor::{DeviceArray, DevicePtr}
};

/// Allocation and copy counters of a [`HostEncoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub allocations: usize,
    pub allocated_bytes: usize,
    pub copies: usize,
    pub copied_bytes: usize,
    pub released_temporaries: usize,
}

/// One GEMM launch as seen by the encoder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchRecord {
    pub key: QmmPlanKey,
    pub binding: MatmulBinding,
}

/// Single-stream encoder executing on the host.
///
/// Work runs eagerly in issue order. Inputs, outputs and temporaries stay
/// referenced until [`HostEncoder::synchronize`].
pub struct HostEncoder {
    device: HostDevice,
    inputs: Vec<HostArray>,
    outputs: Vec<HostArray>,
    temporaries: Vec<HostArray>,
    launches: Vec<LaunchRecord>,
    stats: EncoderStats,
    execute: bool,
}

impl HostEncoder {
    pub fn new(device: HostDevice) -> Self {
        Self {
            device,
            inputs: Vec::new(),
            outputs: Vec::new(),
            temporaries: Vec::new(),
            launches: Vec::new(),
            stats: EncoderStats::default(),
            execute: true,
        }
    }

    /// Record launches without running the reference arithmetic.
    pub fn record_only(mut self) -> Self {
        self.execute = false;
        self
    }

    #[inline]
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    #[inline]
    pub fn launches(&self) -> &[LaunchRecord] {
        &self.launches
    }

    #[inline]
    pub fn pending_temporaries(&self) -> &[HostArray] {
        &self.temporaries
    }

    #[inline]
    pub fn inputs(&self) -> &[HostArray] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[HostArray] {
        &self.outputs
    }

    /// Complete all enqueued work and release temporaries.
    pub fn synchronize(&mut self) {
        self.stats.released_temporaries += self.temporaries.len();
        self.temporaries.clear();
        self.inputs.clear();
        self.outputs.clear();
    }

    fn resolve(&self, ptr: DevicePtr) -> Option<(HostBuffer, usize)> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .filter_map(HostArray::storage)
            .find(|storage| storage.contains(ptr))
            .map(|storage| (storage.clone(), (ptr.0 - storage.base().0) as usize))
    }
}

impl GemmPrimitive for HostEncoder {
    fn execute_matmul(&mut self, descriptor: &MatmulDescriptor, binding: &MatmulBinding) -> Result<(), GemmStatus> {
        self.launches.push(LaunchRecord {
            key: *descriptor.key(),
            binding: *binding,
        });
        if !self.execute {
            return Ok(());
        }
        reference::execute(descriptor, binding, |ptr| self.resolve(ptr))
    }
}

impl CommandEncoder for HostEncoder {
    type Device = HostDevice;
    type Array = HostArray;

    fn device(&self) -> &HostDevice {
        &self.device
    }

    fn set_input_array(&mut self, array: &HostArray) {
        self.inputs.push(array.clone());
    }

    fn set_output_array(&mut self, array: &HostArray) {
        self.outputs.push(array.clone());
    }

    fn add_temporary(&mut self, array: HostArray) {
        trace!(shape = ?array.shape(), "temporary registered for deferred release");
        self.temporaries.push(array);
    }

    fn contiguous_copy(&mut self, array: &HostArray) -> Result<HostArray, QmmError> {
        let bytes = array.to_bytes()?;
        self.stats.copies += 1;
        self.stats.copied_bytes += bytes.len();
        self.stats.allocations += 1;
        self.stats.allocated_bytes += bytes.len();
        HostArray::from_bytes(array.shape(), array.dtype(), bytes)
    }

    fn malloc_async(&mut self, nbytes: usize) -> Result<HostBuffer, QmmError> {
        let buffer = HostBuffer::zeroed(nbytes)?;
        self.stats.allocations += 1;
        self.stats.allocated_bytes += nbytes;
        Ok(buffer)
    }
}
