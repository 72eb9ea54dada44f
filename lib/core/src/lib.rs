// ============ RCE Core ============
// Compliance-rule engine shared by rc-lock, rce-validator and xudt-rce:
// lazy transaction access, molecule views, rule-tree resolution, proof
// matching, compliance-cell transitions and the sighash-all signer check.

#![cfg_attr(feature = "no_std", no_std)]

extern crate alloc;

pub mod builder;
pub mod cursor;
pub mod evaluator;
pub mod mol;
pub mod resolver;
pub mod sighash;
pub mod syscalls;
pub mod transition;
pub mod type_id;

#[cfg(feature = "ckb")]
pub mod ckb;

#[cfg(test)]
mod test_tx;

pub use cursor::{ByteSource, Cursor, SliceSource, TxDataSource};
pub use evaluator::{Evaluation, Evaluator, ProofArray, ProofEntry, Subject};
pub use resolver::{find_rce_cell, resolve, Resolver, RuleSet};
pub use sighash::{generate_sighash_all, sighash_all, verify_blake160_sighash_all, SighashAll};
pub use syscalls::{Source, Transaction};
pub use transition::{validate_transition, Payload, Policy, SmtUpdateItem, UpdateAction};
pub use type_id::validate_type_id;

pub use rce_smt::{ProofVerifier, SmtVerifier};
pub use rce_types::{Error, Limits};
