// ============ RCE SDK ============
// Off-chain helpers for the compliance scripts: script and cell builders,
// compliance lists that publish roots, proofs and update actions, a signer,
// and a mock transaction that runs every script on the host.

pub mod deployment;
pub mod mock;
pub mod signer;

pub use deployment::{DeploymentInfo, ScriptDeployment, RCE_VALIDATOR, RC_LOCK, XUDT_RCE};
pub use mock::{MockCell, MockTransaction};
pub use rce_core::builder;
pub use rce_smt::ComplianceTree;
pub use signer::Signer;

use rce_core::SmtUpdateItem;
use rce_types::{
    blake160, blake2b_256, pack_existence, Error, RcLockArgs, RceValidatorArgs, Rule, RuleFlags,
    XudtFlags, PROOF_MASK_BOTH, RCE_HASH, RCE_HASH_TYPE,
};

// ============ Errors ============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    UnknownScript(String),
    InvalidHashType(String),
    InvalidHex(String),
    Json(String),
    Tree(String),
    InvalidSecret,
    Signing,
    MissingWitness,
    Script(Error),
}

impl From<sparse_merkle_tree::error::Error> for SdkError {
    fn from(err: sparse_merkle_tree::error::Error) -> Self {
        SdkError::Tree(format!("{:?}", err))
    }
}

// ============ Compliance Lists ============

/// A black or white list of lock script hashes, kept as a sparse merkle
/// tree, matching one `Rule` in a compliance cell
pub struct ComplianceList {
    tree: ComplianceTree,
    flags: RuleFlags,
}

impl ComplianceList {
    pub fn black_list(keys: &[[u8; 32]]) -> Result<Self, SdkError> {
        Ok(Self {
            tree: ComplianceTree::from_keys(keys)?,
            flags: RuleFlags::black_list(),
        })
    }

    pub fn white_list(keys: &[[u8; 32]]) -> Result<Self, SdkError> {
        Ok(Self {
            tree: ComplianceTree::from_keys(keys)?,
            flags: RuleFlags::white_list(),
        })
    }

    pub fn with_emergency_halt(mut self) -> Self {
        self.flags = RuleFlags(self.flags.0 | RuleFlags::EMERGENCY_HALT);
        self
    }

    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    pub fn rule(&self) -> Rule {
        Rule {
            smt_root: self.root(),
            flags: self.flags,
        }
    }

    pub fn contains(&self, key: &[u8; 32]) -> Result<bool, SdkError> {
        Ok(self.tree.contains(key)?)
    }

    pub fn proof(&self, keys: &[[u8; 32]]) -> Result<Vec<u8>, SdkError> {
        Ok(self.tree.proof(keys)?)
    }

    /// Proof entry with the mask the rc-lock forces anyway
    pub fn proof_entry(&self, keys: &[[u8; 32]]) -> Result<(u8, Vec<u8>), SdkError> {
        Ok((PROOF_MASK_BOTH, self.proof(keys)?))
    }

    /// Apply `insert` and `remove`, returning the serialized SmtUpdateAction
    /// that proves the change against the previous root
    pub fn update(&mut self, insert: &[[u8; 32]], remove: &[[u8; 32]]) -> Result<Vec<u8>, SdkError> {
        let mut items = Vec::with_capacity(insert.len() + remove.len());
        let mut keys = Vec::with_capacity(insert.len() + remove.len());
        for (key, new_exists) in insert
            .iter()
            .map(|k| (*k, true))
            .chain(remove.iter().map(|k| (*k, false)))
        {
            let old_exists = self.tree.contains(&key)?;
            items.push(SmtUpdateItem {
                key,
                packed_values: pack_existence(old_exists, new_exists),
            });
            keys.push(key);
        }
        let proof = self.tree.proof(&keys)?;

        for key in insert {
            self.tree.insert(*key)?;
        }
        for key in remove {
            self.tree.remove(*key)?;
        }
        Ok(builder::update_action(&items, &proof))
    }
}

// ============ RCE SDK ============

pub struct RceSdk {
    pub deployment: DeploymentInfo,
}

impl RceSdk {
    pub fn new(deployment: DeploymentInfo) -> Self {
        Self { deployment }
    }

    fn script(&self, name: &str, args: &[u8]) -> Result<Vec<u8>, SdkError> {
        let code_hash = self.deployment.code_hash(name)?;
        let hash_type = self.deployment.hash_type(name)?;
        Ok(builder::script(&code_hash, hash_type, args))
    }

    /// rc-lock script; `rc_root` switches on compliance checking
    pub fn rc_lock_script(&self, pubkey_hash: [u8; 20], rc_root: Option<[u8; 32]>) -> Result<Vec<u8>, SdkError> {
        let (args, len) = RcLockArgs { pubkey_hash, rc_root }.serialize();
        self.script(RC_LOCK, &args[..len])
    }

    pub fn rce_validator_script(&self, type_id: [u8; 32], flags: u8) -> Result<Vec<u8>, SdkError> {
        let args = RceValidatorArgs { type_id, flags }.serialize();
        self.script(RCE_VALIDATOR, &args)
    }

    /// xUDT with extensions carried in its args
    pub fn xudt_script(&self, owner_lock_hash: &[u8; 32], extensions: &[Vec<u8>]) -> Result<Vec<u8>, SdkError> {
        self.script(XUDT_RCE, &xudt_args(owner_lock_hash, XudtFlags::InArgs, extensions))
    }

    /// xUDT whose extensions travel in the witness, committed by blake160
    pub fn xudt_script_in_witness(&self, owner_lock_hash: &[u8; 32], extensions: &[Vec<u8>]) -> Result<Vec<u8>, SdkError> {
        self.script(XUDT_RCE, &xudt_args(owner_lock_hash, XudtFlags::InWitness, extensions))
    }
}

// ============ Free Builders ============

pub fn script_hash(script: &[u8]) -> [u8; 32] {
    blake2b_256(script)
}

/// The compliance extension entry of an xUDT ScriptVec
pub fn rce_extension(rc_root: &[u8; 32]) -> Vec<u8> {
    builder::script(&RCE_HASH, RCE_HASH_TYPE, rc_root)
}

pub fn xudt_args(owner_lock_hash: &[u8; 32], flags: XudtFlags, extensions: &[Vec<u8>]) -> Vec<u8> {
    let mut args = owner_lock_hash.to_vec();
    args.extend_from_slice(&flags.as_u32().to_le_bytes());
    match flags {
        XudtFlags::Plain => {}
        XudtFlags::InArgs => args.extend_from_slice(&builder::script_vec(extensions)),
        XudtFlags::InWitness => args.extend_from_slice(&blake160(&builder::script_vec(extensions))),
    }
    args
}

pub fn udt_amount(amount: u128) -> Vec<u8> {
    amount.to_le_bytes().to_vec()
}

// ============ Tests ============
