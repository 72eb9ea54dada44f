// ============ Compliance Cell State Transition ============
// Decides whether a compliance cell may move from its old payload to a new
// one. Shape changes are governed by the freeze-type flag; rule updates must
// be proven incremental against the old root with a single shared proof.

use alloc::vec::Vec;

use rce_smt::{ProofVerifier, SmtState};
use rce_types::{unpack_existence, Error, Rule, MAX_PROOF_LENGTH, MAX_UPDATES_PER_TX};

/// Shape and content of a compliance cell, without the child list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    Rule(Rule),
    CellVec,
}

impl Payload {
    pub fn is_rule(&self) -> bool {
        matches!(self, Payload::Rule(_))
    }

    fn same_shape(&self, other: &Payload) -> bool {
        self.is_rule() == other.is_rule()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    pub append_only: bool,
    pub freeze_type: bool,
}

/// `struct SmtUpdateItem { key: Byte32, packed_values: byte }`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SmtUpdateItem {
    pub key: [u8; 32],
    pub packed_values: u8,
}

impl SmtUpdateItem {
    pub const SERIALIZED_SIZE: usize = 32 + 1;
}

/// Update items plus the proof shared by the old and new state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateAction {
    pub items: Vec<SmtUpdateItem>,
    pub proof: Vec<u8>,
}

// ============ Validation ============

pub fn validate_transition<V: ProofVerifier>(
    verifier: &V,
    old: Option<&Payload>,
    new: &Payload,
    policy: Policy,
    update: Option<&UpdateAction>,
) -> Result<(), Error> {
    if policy.freeze_type {
        if let Some(old) = old {
            if !old.same_shape(new) {
                return Err(Error::TypeFrozen);
            }
        }
    }

    let new_rule = match new {
        Payload::CellVec => return Ok(()),
        Payload::Rule(rule) => rule,
    };
    // a missing or non-rule old cell is the empty tree
    let old_root = match old {
        Some(Payload::Rule(rule)) => rule.smt_root,
        _ => [0u8; 32],
    };
    let update = update.ok_or(Error::InvalidMolFormat)?;

    let mut old_state = SmtState::new(MAX_UPDATES_PER_TX);
    let mut new_state = SmtState::new(MAX_UPDATES_PER_TX);
    for item in &update.items {
        let (old_exists, new_exists) = unpack_existence(item.packed_values)?;
        if policy.append_only && !new_exists {
            return Err(Error::AppendOnly);
        }
        new_state.insert_existence(item.key, new_exists)?;
        old_state.insert_existence(item.key, old_exists)?;
    }

    if update.proof.len() > MAX_PROOF_LENGTH {
        return Err(Error::InvalidMolFormat);
    }
    if !verifier.verify(&old_root, &old_state, &update.proof) {
        return Err(Error::SmtVerifyFailed);
    }
    if !verifier.verify(&new_rule.smt_root, &new_state, &update.proof) {
        return Err(Error::SmtVerifyFailed);
    }
    Ok(())
}

// ============ Tests ============
