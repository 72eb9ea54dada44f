// ============ Compliance Sparse Merkle Tree ============
// Membership primitive behind every compliance rule.
//
// A rule commits to a set of 32-byte keys (lock script hashes) through the
// root of a 256-level sparse Merkle tree. Present keys map to
// SMT_VALUE_EXISTING, absent keys to the zero value, so the same compiled
// proof format proves both inclusion and exclusion.

#![cfg_attr(feature = "no_std", no_std)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use blake2b_rs::Blake2b;
use rce_types::{new_blake2b, Error, MAX_UPDATES_PER_TX};
use sparse_merkle_tree::{traits::Hasher, CompiledMerkleProof, H256};

// ============ Leaf Values ============

pub const SMT_VALUE_EXISTING: [u8; 32] = {
    let mut value = [0u8; 32];
    value[0] = 1;
    value
};
pub const SMT_VALUE_NOT_EXISTING: [u8; 32] = [0u8; 32];

pub fn existence_value(exists: bool) -> [u8; 32] {
    if exists {
        SMT_VALUE_EXISTING
    } else {
        SMT_VALUE_NOT_EXISTING
    }
}

// ============ Hasher ============

/// CKB-personalised blake2b plugged into the tree
pub struct Blake2bHasher(Blake2b);

impl Default for Blake2bHasher {
    fn default() -> Self {
        Blake2bHasher(new_blake2b())
    }
}

impl Hasher for Blake2bHasher {
    fn write_h256(&mut self, h: &H256) {
        self.0.update(h.as_slice());
    }

    fn write_byte(&mut self, b: u8) {
        self.0.update(&[b][..]);
    }

    fn finish(self) -> H256 {
        let mut hash = [0u8; 32];
        self.0.finalize(&mut hash);
        hash.into()
    }
}

// ============ State Set ============

/// Keys and the values a proof must attest to, sorted and deduplicated.
/// Inserting an existing key overwrites its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmtState {
    pairs: BTreeMap<[u8; 32], [u8; 32]>,
    capacity: usize,
}

impl SmtState {
    pub fn new(capacity: usize) -> Self {
        Self {
            pairs: BTreeMap::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, key: [u8; 32], value: [u8; 32]) -> Result<(), Error> {
        if self.pairs.len() >= self.capacity && !self.pairs.contains_key(&key) {
            return Err(Error::NotEnoughBuff);
        }
        self.pairs.insert(key, value);
        Ok(())
    }

    pub fn insert_existence(&mut self, key: [u8; 32], exists: bool) -> Result<(), Error> {
        self.insert(key, existence_value(exists))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, key: &[u8; 32]) -> Option<&[u8; 32]> {
        self.pairs.get(key)
    }

    fn leaves(&self) -> Vec<(H256, H256)> {
        self.pairs
            .iter()
            .map(|(k, v)| (H256::from(*k), H256::from(*v)))
            .collect()
    }
}

impl Default for SmtState {
    fn default() -> Self {
        Self::new(MAX_UPDATES_PER_TX)
    }
}

// ============ Verification ============

/// Checks that a state set is consistent with a root under a proof
pub trait ProofVerifier {
    fn verify(&self, root: &[u8; 32], state: &SmtState, proof: &[u8]) -> bool;
}

impl<V: ProofVerifier + ?Sized> ProofVerifier for &V {
    fn verify(&self, root: &[u8; 32], state: &SmtState, proof: &[u8]) -> bool {
        (**self).verify(root, state, proof)
    }
}

/// Verifier backed by compiled sparse-merkle-tree proofs
#[derive(Clone, Copy, Debug, Default)]
pub struct SmtVerifier;

impl ProofVerifier for SmtVerifier {
    fn verify(&self, root: &[u8; 32], state: &SmtState, proof: &[u8]) -> bool {
        if state.is_empty() {
            return false;
        }
        let compiled = CompiledMerkleProof(proof.to_vec());
        matches!(
            compiled.verify::<Blake2bHasher>(&H256::from(*root), state.leaves()),
            Ok(true)
        )
    }
}

// ============ Tree Builder ============

#[cfg(feature = "std")]
pub use builder::ComplianceTree;

#[cfg(feature = "std")]
mod builder {
    use super::*;
    use sparse_merkle_tree::{default_store::DefaultStore, error::Error as TreeError, SparseMerkleTree};

    type Tree = SparseMerkleTree<Blake2bHasher, H256, DefaultStore<H256>>;

    /// Off-chain copy of a compliance list, used to publish roots and proofs
    #[derive(Default)]
    pub struct ComplianceTree {
        tree: Tree,
    }

    impl ComplianceTree {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn from_keys(keys: &[[u8; 32]]) -> Result<Self, TreeError> {
            let mut tree = Self::new();
            for key in keys {
                tree.insert(*key)?;
            }
            Ok(tree)
        }

        pub fn insert(&mut self, key: [u8; 32]) -> Result<(), TreeError> {
            self.tree.update(key.into(), SMT_VALUE_EXISTING.into())?;
            Ok(())
        }

        pub fn remove(&mut self, key: [u8; 32]) -> Result<(), TreeError> {
            self.tree.update(key.into(), H256::zero())?;
            Ok(())
        }

        pub fn contains(&self, key: &[u8; 32]) -> Result<bool, TreeError> {
            let value = self.tree.get(&H256::from(*key))?;
            Ok(!value.is_zero())
        }

        pub fn root(&self) -> [u8; 32] {
            (*self.tree.root()).into()
        }

        /// Compiled proof covering `keys`, valid for any values of those keys
        pub fn proof(&self, keys: &[[u8; 32]]) -> Result<Vec<u8>, TreeError> {
            let keys: Vec<H256> = keys.iter().map(|k| H256::from(*k)).collect();
            let proof = self.tree.merkle_proof(keys.clone())?;
            let compiled = proof.compile(keys)?;
            Ok(compiled.0)
        }
    }
}

// ============ Tests ============
