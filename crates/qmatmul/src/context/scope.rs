use smallvec::SmallVec;
use tracing::trace;

use super::CommandEncoder;
use crate::{error::QmmError, tensor::DeviceArray};

/// Execution scope of one engine operation.
///
/// Temporaries created inside the scope are handed to the encoder's deferred
/// release list when the scope ends, on success and on every error path alike.
/// The encoder releases them only after the work already enqueued completes.
pub struct OperationScope<'a, E: CommandEncoder> {
    encoder: &'a mut E,
    temporaries: SmallVec<[E::Array; 3]>,
}

impl<'a, E: CommandEncoder> OperationScope<'a, E> {
    pub fn new(encoder: &'a mut E) -> Self {
        Self {
            encoder,
            temporaries: SmallVec::new(),
        }
    }

    #[inline]
    pub fn encoder(&mut self) -> &mut E {
        &mut *self.encoder
    }

    #[inline]
    pub fn device(&self) -> &E::Device {
        self.encoder.device()
    }

    /// Materialise a row-contiguous copy of `array` owned by this scope.
    pub fn copy_to_temporary(&mut self, array: &E::Array) -> Result<E::Array, QmmError> {
        let copy = self.encoder.contiguous_copy(array)?;
        trace!(shape = ?array.shape(), strides = ?array.strides(), bytes = copy.nbytes(), "materialised contiguous temporary");
        self.temporaries.push(copy.clone());
        Ok(copy)
    }

    /// Number of temporaries the scope currently owns.
    #[inline]
    pub fn temporary_count(&self) -> usize {
        self.temporaries.len()
    }
}

impl<E: CommandEncoder> Drop for OperationScope<'_, E> {
    fn drop(&mut self) {
        if !self.temporaries.is_empty() {
            trace!(count = self.temporaries.len(), "releasing operation temporaries to encoder");
        }
        for temporary in self.temporaries.drain(..) {
            self.encoder.add_temporary(temporary);
        }
    }
}
