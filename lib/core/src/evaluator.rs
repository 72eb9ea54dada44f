// ============ Proof Matching ============
// Matches a proof array 1:1 against a resolved rule set and combines the
// per-rule outcomes into an allow/deny decision.
//
// Per rule:
//   emergency halt  -> abort
//   blacklist       -> every selected key proven absent, else abort
//   whitelist       -> every selected key proven present, else unsatisfied
// After the walk, any unsatisfied whitelist rule rejects.

use alloc::vec::Vec;

use rce_smt::{ProofVerifier, SmtState};
use rce_types::{Error, Rule, MAX_PROOF_LENGTH, PROOF_MASK_BOTH, PROOF_MASK_INPUT, PROOF_MASK_OUTPUT};

use crate::mol::SmtProofEntryVec;
use crate::resolver::RuleSet;

// ============ Proofs ============

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProofEntry {
    pub mask: u8,
    pub proof: Vec<u8>,
}

/// Indexed proof list, one entry per rule
pub trait ProofArray {
    fn len(&self) -> usize;

    fn entry(&self, index: usize) -> Result<ProofEntry, Error>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProofArray for [ProofEntry] {
    fn len(&self) -> usize {
        <[ProofEntry]>::len(self)
    }

    fn entry(&self, index: usize) -> Result<ProofEntry, Error> {
        self.get(index).cloned().ok_or(Error::IndexOutOfBound)
    }
}

impl ProofArray for SmtProofEntryVec<'_> {
    fn len(&self) -> usize {
        SmtProofEntryVec::len(self)
    }

    fn entry(&self, index: usize) -> Result<ProofEntry, Error> {
        let view = self.get(index)?;
        if view.proof.len() > MAX_PROOF_LENGTH {
            return Err(Error::InvalidMolFormat);
        }
        Ok(ProofEntry {
            mask: view.mask,
            proof: view.proof.to_vec()?,
        })
    }
}

// ============ Subject ============

/// Keys whose compliance is being decided, split by transaction side
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subject {
    inputs: Vec<[u8; 32]>,
    outputs: Vec<[u8; 32]>,
    forced_mask: Option<u8>,
}

impl Subject {
    pub fn new(inputs: Vec<[u8; 32]>, outputs: Vec<[u8; 32]>) -> Self {
        Self {
            inputs,
            outputs,
            forced_mask: None,
        }
    }

    /// One identity standing on both sides; entry masks are ignored
    pub fn single(key: [u8; 32]) -> Self {
        Self {
            inputs: alloc::vec![key],
            outputs: alloc::vec![key],
            forced_mask: Some(PROOF_MASK_BOTH),
        }
    }

    pub fn inputs(&self) -> &[[u8; 32]] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[[u8; 32]] {
        &self.outputs
    }

    fn effective_mask(&self, entry_mask: u8) -> u8 {
        self.forced_mask.unwrap_or(entry_mask)
    }

    /// Whether `mask` selects every side that has keys
    fn covered_by(&self, mask: u8) -> bool {
        (self.inputs.is_empty() || mask & PROOF_MASK_INPUT != 0)
            && (self.outputs.is_empty() || mask & PROOF_MASK_OUTPUT != 0)
    }

    fn selected_state(&self, mask: u8, exists: bool) -> Result<SmtState, Error> {
        let mut state = SmtState::new(self.inputs.len() + self.outputs.len());
        if mask & PROOF_MASK_INPUT != 0 {
            for key in &self.inputs {
                state.insert_existence(*key, exists)?;
            }
        }
        if mask & PROOF_MASK_OUTPUT != 0 {
            for key in &self.outputs {
                state.insert_existence(*key, exists)?;
            }
        }
        Ok(state)
    }
}

// ============ Evaluator ============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub rules_checked: usize,
    pub whitelist_satisfied: bool,
}

pub struct Evaluator<V: ProofVerifier> {
    verifier: V,
}

impl<V: ProofVerifier> Evaluator<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn evaluate<P: ProofArray + ?Sized>(
        &self,
        subject: &Subject,
        rule_set: &RuleSet,
        proofs: &P,
    ) -> Result<Evaluation, Error> {
        if proofs.len() != rule_set.len() {
            return Err(Error::ProofLengthMismatched);
        }

        let mut whitelist_satisfied = true;
        for (index, rule) in rule_set.rules().iter().enumerate() {
            if rule.flags.is_emergency_halt() {
                return Err(Error::RceEmergencyHalt);
            }
            let entry = proofs.entry(index)?;
            let satisfied = self.check_rule(subject, rule, &entry)?;
            if rule.flags.is_whitelist() {
                whitelist_satisfied &= satisfied;
            } else if !satisfied {
                return Err(Error::OnBlackList);
            }
        }

        if rule_set.has_whitelist() && !whitelist_satisfied {
            return Err(Error::NotOnWhiteList);
        }
        Ok(Evaluation {
            rules_checked: rule_set.len(),
            whitelist_satisfied,
        })
    }

    /// Whether the subject's selected keys have the existence the rule
    /// demands, with the mask covering every populated side
    fn check_rule(&self, subject: &Subject, rule: &Rule, entry: &ProofEntry) -> Result<bool, Error> {
        let mask = subject.effective_mask(entry.mask);
        if !subject.covered_by(mask) {
            return Ok(false);
        }
        let state = subject.selected_state(mask, rule.flags.is_whitelist())?;
        if state.is_empty() {
            return Ok(true);
        }
        Ok(self.verifier.verify(&rule.smt_root, &state, &entry.proof))
    }
}

// ============ Tests ============
