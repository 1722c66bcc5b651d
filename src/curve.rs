//! Embedding tokens into the curve and recovering them.
//!
//! A token is a 64-bit game value. It is lifted to the group as `t·G`,
//! which is deterministic and injective over the whole token range since
//! the group order far exceeds 2^64. Recovery is a baby-step/giant-step
//! search restricted to a bound: a point that is not `t·G` for any `t`
//! under the bound yields `None`, never a wrong answer.

use std::collections::HashMap;
use std::sync::OnceLock;

use elliptic_curve::group::GroupEncoding;
use k256::{ProjectivePoint, Scalar};

/// The largest value usable as a token; `u64::MAX` is reserved.
pub const MAX_TOKEN: u64 = u64::MAX - 1;

/// Tokens recoverable by default: anything below 2^24.
pub const DEFAULT_RECOVERY_BOUND: u64 = 1 << 24;

/// Baby-step table size; one giant step covers this many tokens.
const BABY_STEPS: u64 = 1 << 12;

/// Maps a token to the curve.
pub fn to_curve(token: u64) -> ProjectivePoint {
    debug_assert!(token <= MAX_TOKEN);
    ProjectivePoint::GENERATOR * Scalar::from(token)
}

fn baby_table() -> &'static HashMap<Vec<u8>, u64> {
    static TABLE: OnceLock<HashMap<Vec<u8>, u64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::with_capacity(BABY_STEPS as usize);
        let mut acc = ProjectivePoint::IDENTITY;
        for j in 0..BABY_STEPS {
            table.insert(acc.to_bytes().to_vec(), j);
            acc += ProjectivePoint::GENERATOR;
        }
        table
    })
}

/// Maps a curve point back to a token, searching `0..bound`.
pub fn from_curve_bounded(point: &ProjectivePoint, bound: u64) -> Option<u64> {
    let table = baby_table();
    let giant = ProjectivePoint::GENERATOR * -Scalar::from(BABY_STEPS);

    let steps = bound.div_ceil(BABY_STEPS);
    let mut gamma = *point;
    for i in 0..steps {
        if let Some(&j) = table.get(gamma.to_bytes().as_slice()) {
            let token = i * BABY_STEPS + j;
            if token < bound {
                return Some(token);
            }
        }
        gamma += giant;
    }
    None
}

/// Maps a curve point back to a token within the default bound.
pub fn from_curve(point: &ProjectivePoint) -> Option<u64> {
    from_curve_bounded(point, DEFAULT_RECOVERY_BOUND)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_curve_mapping_is_invertible() {
        for t in 0..64 {
            assert_eq!(from_curve(&to_curve(t)), Some(t));
        }
    }

    #[test]
    fn test_mapping_straddles_giant_steps() {
        for t in (BABY_STEPS - 2)..(BABY_STEPS + 2) {
            assert_eq!(from_curve(&to_curve(t)), Some(t));
        }
    }

    #[test]
    fn test_out_of_bound_token_is_not_recovered() {
        let p = to_curve(DEFAULT_RECOVERY_BOUND + 1);
        assert_eq!(from_curve(&p), None);
    }

    #[test]
    fn test_garbage_point_is_not_recovered() {
        use elliptic_curve::Group;
        use rand_core::OsRng;

        let p = ProjectivePoint::random(&mut OsRng);
        assert_eq!(from_curve_bounded(&p, 1 << 16), None);
    }
}
