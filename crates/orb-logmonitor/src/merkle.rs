//! RFC 6962 Merkle tree construction and consistency-proof verification.
//!
//! Uses `sha2` rather than the `blake3` hashing used elsewhere in the
//! workspace: RFC 6962 fixes SHA-256 as the tree hash, so the transparency
//! log's wire format isn't ours to choose.

use sha2::{Digest, Sha256};

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// `MTH` leaf hash: `SHA256(0x00 || leaf_input)` (RFC 6962 §2.1).
pub fn leaf_hash(leaf_input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(leaf_input);
    hasher.finalize().into()
}

fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Largest power of two strictly less than `n` (RFC 6962's `k`). Callers
/// only invoke this with `n >= 2`.
fn largest_power_of_two_below(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

/// Compute the Merkle Tree Hash (`MTH`) over an ordered list of leaf hashes.
///
/// `MTH({}) = SHA256()` for an empty tree; a single-leaf tree's root is the
/// leaf hash itself; otherwise the tree splits at the largest power of two
/// below the leaf count (RFC 6962 §2.1).
pub fn root_hash(leaves: &[[u8; 32]]) -> [u8; 32] {
    match leaves.len() {
        0 => Sha256::digest([]).into(),
        1 => leaves[0],
        n => {
            let k = largest_power_of_two_below(n);
            let left = root_hash(&leaves[..k]);
            let right = root_hash(&leaves[k..]);
            node_hash(&left, &right)
        }
    }
}

/// Errors a consistency-proof verification can fail with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// `first` and `second` roots were claimed equal but the proof was
    /// non-empty, or vice versa.
    #[error("proof shape does not match claimed tree sizes")]
    MalformedProof,
    /// The proof ran out of nodes before the reconstruction completed.
    #[error("insufficient proof components")]
    InsufficientProof,
    /// The proof reconstructed a first-tree root that doesn't match the
    /// locally-known one.
    #[error("first root does not match")]
    FirstRootMismatch,
    /// The proof reconstructed a second-tree root that doesn't match the
    /// STH presented for it.
    #[error("second root does not match")]
    SecondRootMismatch,
}

/// Verify a Merkle consistency proof between a tree of size `first` with
/// root `first_root` and a tree of size `second` with root `second_root`
/// (RFC 6962 §2.1.2), requiring `first <= second`.
///
/// This is the node-hash-only half of branch D (spec.md §4.3): it confirms
/// the claimed growth is consistent with the previously stored root without
/// needing to re-fetch every leaf. The monitor still recomputes the full
/// root from fetched entries afterwards as a second, independent check.
pub fn verify_consistency_proof(
    first: u64,
    second: u64,
    first_root: &[u8; 32],
    second_root: &[u8; 32],
    proof: &[[u8; 32]],
) -> Result<(), ConsistencyError> {
    if first == second {
        if !proof.is_empty() {
            return Err(ConsistencyError::MalformedProof);
        }
        return if first_root == second_root {
            Ok(())
        } else {
            Err(ConsistencyError::SecondRootMismatch)
        };
    }
    if first == 0 {
        return if proof.is_empty() { Ok(()) } else { Err(ConsistencyError::MalformedProof) };
    }
    if proof.is_empty() {
        return Err(ConsistencyError::InsufficientProof);
    }

    let mut node = first - 1;
    let mut last_node = second - 1;
    while node % 2 == 1 {
        node /= 2;
        last_node /= 2;
    }

    let mut idx = 0usize;
    let (mut fr, mut sr) = if node > 0 {
        idx += 1;
        (proof[0], proof[0])
    } else {
        (*first_root, *first_root)
    };

    while node > 0 {
        let sibling = *proof.get(idx).ok_or(ConsistencyError::InsufficientProof)?;
        if node % 2 == 1 {
            fr = node_hash(&sibling, &fr);
            sr = node_hash(&sibling, &sr);
            idx += 1;
        } else if node < last_node {
            sr = node_hash(&sr, &sibling);
            idx += 1;
        }
        node /= 2;
        last_node /= 2;
    }

    while last_node > 0 {
        let sibling = *proof.get(idx).ok_or(ConsistencyError::InsufficientProof)?;
        sr = node_hash(&sr, &sibling);
        idx += 1;
        last_node /= 2;
    }

    if fr != *first_root {
        return Err(ConsistencyError::FirstRootMismatch);
    }
    if sr != *second_root {
        return Err(ConsistencyError::SecondRootMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<[u8; 32]> {
        (0..n).map(|i| leaf_hash(format!("leaf-{i}").as_bytes())).collect()
    }

    #[test]
    fn empty_tree_root_is_the_empty_sha256() {
        let root = root_hash(&[]);
        let expected: [u8; 32] = Sha256::digest([]).into();
        assert_eq!(root, expected);
    }

    #[test]
    fn single_leaf_root_is_the_leaf_hash() {
        let l = leaves(1);
        assert_eq!(root_hash(&l), l[0]);
    }

    #[test]
    fn three_leaf_tree_splits_at_the_largest_power_of_two_below() {
        let l = leaves(3);
        let expected = node_hash(&node_hash(&l[0], &l[1]), &l[2]);
        assert_eq!(root_hash(&l), expected);
    }

    #[test]
    fn growing_a_tree_by_appending_leaves_is_consistent() {
        let all = leaves(7);
        let first_root = root_hash(&all[..4]);
        let second_root = root_hash(&all);

        // Construct the consistency proof by hand for this small case using
        // the same SUBPROOF structure RFC 6962 defines for provers: size 4
        // is already a power of two, so the proof is just the root of the
        // remaining suffix [4..7).
        let proof = vec![root_hash(&all[4..7])];

        verify_consistency_proof(4, 7, &first_root, &second_root, &proof).unwrap();
    }

    #[test]
    fn equal_sizes_require_an_empty_proof_and_equal_roots() {
        let l = leaves(5);
        let root = root_hash(&l);
        verify_consistency_proof(5, 5, &root, &root, &[]).unwrap();
        assert_eq!(
            verify_consistency_proof(5, 5, &root, &leaf_hash(b"other"), &[]),
            Err(ConsistencyError::SecondRootMismatch)
        );
    }

    #[test]
    fn tampered_second_root_is_rejected() {
        let all = leaves(7);
        let first_root = root_hash(&all[..4]);
        let proof = vec![root_hash(&all[4..7])];
        let bogus_second_root = leaf_hash(b"not-the-real-root");

        assert_eq!(
            verify_consistency_proof(4, 7, &first_root, &bogus_second_root, &proof),
            Err(ConsistencyError::SecondRootMismatch)
        );
    }
}
