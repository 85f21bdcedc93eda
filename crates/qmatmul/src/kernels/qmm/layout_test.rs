use super::layout::{is_packed_matrix, normalize_any, normalize_matrix};
use crate::{
    context::OperationScope, host::{HostArray, HostDevice, HostEncoder}, tensor::{DeviceArray, Dtype}
};

fn sequential(rows: usize, cols: usize) -> HostArray {
    let values: Vec<f32> = (0..rows * cols).map(|v| v as f32).collect();
    HostArray::from_f32(&[rows, cols], Dtype::F32, &values).expect("array")
}

#[test]
fn packed_matrix_is_returned_without_copy() {
    let mut encoder = HostEncoder::new(HostDevice::block_scaled());
    let input = sequential(4, 8);
    {
        let mut scope = OperationScope::new(&mut encoder);
        let normalized = normalize_matrix(&input, &mut scope).expect("normalize");
        assert_eq!(normalized.device_ptr(), input.device_ptr());
        assert!(normalized.shares_storage(&input));
        assert_eq!(normalized.strides(), input.strides());
        assert_eq!(scope.temporary_count(), 0);
    }
    assert_eq!(encoder.stats().copies, 0);
    assert_eq!(encoder.stats().allocations, 0);
    assert!(encoder.pending_temporaries().is_empty());
}

#[test]
fn column_major_matrix_gets_exactly_one_packed_copy() {
    let mut encoder = HostEncoder::new(HostDevice::block_scaled());
    let input = sequential(8, 4).transposed();
    assert!(!is_packed_matrix(&input));

    let normalized = {
        let mut scope = OperationScope::new(&mut encoder);
        let normalized = normalize_matrix(&input, &mut scope).expect("normalize");
        assert_eq!(scope.temporary_count(), 1);
        normalized
    };

    assert_eq!(normalized.shape(), &[4, 8]);
    assert_eq!(normalized.strides(), &[8, 1]);
    assert!(is_packed_matrix(&normalized));
    assert!(!normalized.shares_storage(&input));
    assert_eq!(normalized.to_f32_vec().expect("read"), input.to_f32_vec().expect("read"));

    assert_eq!(encoder.stats().copies, 1);
    assert_eq!(encoder.pending_temporaries().len(), 1);
    encoder.synchronize();
    assert!(encoder.pending_temporaries().is_empty());
    assert_eq!(encoder.stats().released_temporaries, 1);
}

#[test]
fn padded_rows_are_not_packed() {
    let backing = sequential(4, 16);
    let padded = backing.view(&[4, 8], &[16, 1], 0);
    assert!(!is_packed_matrix(&padded));
    assert!(!padded.flags().row_contiguous);
}

#[test]
fn trailing_matrix_check_ignores_leading_batch_strides() {
    let backing = sequential(6, 8);
    // Two 2x8 matrices separated by a padding matrix.
    let batched = backing.view(&[2, 2, 8], &[32, 8, 1], 0);
    assert!(is_packed_matrix(&batched));
    assert!(!batched.flags().row_contiguous);

    let mut encoder = HostEncoder::new(HostDevice::block_scaled());
    {
        let mut scope = OperationScope::new(&mut encoder);
        let same = normalize_matrix(&batched, &mut scope).expect("normalize");
        assert!(same.shares_storage(&batched));
        let packed = normalize_any(&batched, &mut scope).expect("normalize");
        assert!(packed.flags().row_contiguous);
        assert_eq!(packed.to_f32_vec().expect("read"), batched.to_f32_vec().expect("read"));
    }
    assert_eq!(encoder.stats().copies, 1);
}

#[test]
fn vectors_fall_back_to_row_contiguity() {
    let backing = sequential(1, 8);
    let strided = backing.view(&[4], &[2], 0);
    let dense = backing.view(&[8], &[1], 0);
    assert!(!is_packed_matrix(&strided));
    assert!(is_packed_matrix(&dense));
}
