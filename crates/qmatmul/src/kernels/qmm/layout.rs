use tracing::trace;

use crate::{
    context::{CommandEncoder, OperationScope}, error::QmmError, tensor::DeviceArray
};

/// Whether the trailing two dimensions are packed row-major.
///
/// Arrays of rank below two fall back to whole-array row contiguity.
pub fn is_packed_matrix<A: DeviceArray>(array: &A) -> bool {
    let ndim = array.ndim();
    if ndim < 2 {
        return array.flags().row_contiguous;
    }
    let shape = array.shape();
    let strides = array.strides();
    strides[ndim - 2] == shape[ndim - 1] && strides[ndim - 1] == 1
}

/// Return `array` unchanged when its trailing matrix is packed, otherwise a
/// packed copy owned by `scope`.
pub fn normalize_matrix<E: CommandEncoder>(array: &E::Array, scope: &mut OperationScope<'_, E>) -> Result<E::Array, QmmError> {
    if is_packed_matrix(array) {
        trace!(shape = ?array.shape(), "matrix already packed");
        return Ok(array.clone());
    }
    scope.copy_to_temporary(array)
}

/// Same policy as [`normalize_matrix`] keyed on whole-array row contiguity.
pub fn normalize_any<E: CommandEncoder>(array: &E::Array, scope: &mut OperationScope<'_, E>) -> Result<E::Array, QmmError> {
    if array.flags().row_contiguous {
        trace!(shape = ?array.shape(), "array already row contiguous");
        return Ok(array.clone());
    }
    scope.copy_to_temporary(array)
}
