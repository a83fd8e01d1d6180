use opencl3::types::cl_uint;
use tracing::warn;

use crate::ClError;

/// Mismatches past this count are only counted, not logged.
const MAX_REPORTED: usize = 16;

/// Value expected at index `i` of the source and destination buffers.
#[inline(always)]
pub fn identity(i: usize) -> cl_uint {
    i as cl_uint
}

/// Checks that `data[i] == i` for every element.
///
/// The whole slice is scanned so the error can carry the total number of
/// mismatches; the reported index and values are those of the first one.
pub fn check_identity(data: &[cl_uint]) -> Result<(), ClError> {
    let mut first = None;
    let mut mismatches = 0usize;

    for (i, &actual) in data.iter().enumerate() {
        let expected = identity(i);
        if actual == expected {
            continue;
        }
        if mismatches < MAX_REPORTED {
            warn!("MisMatch!  dst[{i}] == {actual:08X}, want {expected:08X}");
        }
        mismatches += 1;
        first.get_or_insert((i, expected, actual));
    }

    match first {
        None => Ok(()),
        Some((index, expected, actual)) => {
            warn!("Found {mismatches} mismatches / {} values", data.len());
            Err(ClError::CopyVerificationFailure {
                index,
                expected,
                actual,
                mismatches,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_sequence_passes() {
        let data: Vec<cl_uint> = (0..4096).map(identity).collect();
        assert!(check_identity(&data).is_ok());
        assert!(check_identity(&[]).is_ok());
    }

    #[test]
    fn first_mismatch_is_reported() {
        let mut data: Vec<cl_uint> = (0..64).map(identity).collect();
        data[10] = 99;
        data[40] = 0;

        match check_identity(&data) {
            Err(ClError::CopyVerificationFailure {
                index,
                expected,
                actual,
                mismatches,
            }) => {
                assert_eq!((index, expected, actual), (10, 10, 99));
                assert_eq!(mismatches, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zeroed_buffer_fails_at_index_one() {
        let data = vec![0 as cl_uint; 32];
        match check_identity(&data) {
            Err(ClError::CopyVerificationFailure { index, mismatches, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(mismatches, 31);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
