use super::capability::{ComputeCapability, MIN_BLOCK_SCALED_SCORE, check};
use crate::{error::QmmError, host::HostDevice};

#[test]
fn score_combines_major_and_minor() {
    assert_eq!(ComputeCapability { major: 10, minor: 0 }.score(), 1000);
    assert_eq!(ComputeCapability { major: 9, minor: 9 }.score(), 990);
    assert_eq!(ComputeCapability { major: 12, minor: 1 }.score(), 1210);
    assert_eq!(MIN_BLOCK_SCALED_SCORE, 1000);
}

#[test]
fn capability_10_0_passes() {
    check(&HostDevice::new(0, 10, 0)).expect("10.0 supports block-scaled matmul");
}

#[test]
fn capability_10_1_passes() {
    check(&HostDevice::new(0, 10, 1)).expect("10.1 supports block-scaled matmul");
}

#[test]
fn score_990_is_rejected() {
    match check(&HostDevice::new(0, 9, 9)) {
        Err(err @ QmmError::UnsupportedDevice { .. }) => {
            let message = err.to_string();
            assert!(message.contains("10.0"), "{message}");
            assert!(message.contains("9.9"), "{message}");
        }
        other => panic!("expected unsupported device, got {other:?}"),
    }
}

#[test]
fn hopper_is_rejected() {
    assert!(matches!(
        check(&HostDevice::new(1, 9, 0)),
        Err(QmmError::UnsupportedDevice { major: 9, minor: 0, .. })
    ));
}
