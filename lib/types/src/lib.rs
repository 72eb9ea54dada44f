// ============ RCE Types ============
// Shared definitions for the regulation compliance scripts
// Mirrors the molecule schemas in rce.mol / rc_lock.mol / xudt_rce.mol

#![cfg_attr(feature = "no_std", no_std)]

use blake2b_rs::{Blake2b, Blake2bBuilder};

// ============ Size Constants ============

pub const BLAKE2B_BLOCK_SIZE: usize = 32;
pub const BLAKE160_SIZE: usize = 20;
pub const PUBKEY_SIZE: usize = 33;
pub const SIGNATURE_SIZE: usize = 65;
pub const RECID_INDEX: usize = 64;

pub const SCRIPT_SIZE: usize = 32 * 1024;
pub const MAX_WITNESS_SIZE: usize = 32 * 1024;
pub const ONE_BATCH_SIZE: usize = 32 * 1024;
pub const READ_CACHE_SIZE: usize = 256;

pub const MAX_UPDATES_PER_TX: usize = 1024;
pub const MAX_PROOF_LENGTH: usize = 33 * MAX_UPDATES_PER_TX;
pub const MAX_LOCK_SCRIPT_HASH_COUNT: usize = 2048;

pub const MAX_RULE_DEPTH: usize = 16;
pub const MAX_RULES: usize = 8192;

/// CKB hashes everything with this blake2b personalization
pub const CKB_HASH_PERSONALIZATION: &[u8] = b"ckb-default-hash";

// ============ Extension Constants ============

/// Code hash under which the built-in compliance extension is registered
pub const RCE_HASH: [u8; 32] = {
    let mut hash = [0u8; 32];
    hash[0] = 1;
    hash
};
pub const RCE_HASH_TYPE: u8 = 1;

pub const HASH_TYPE_DATA: u8 = 0;
pub const HASH_TYPE_TYPE: u8 = 1;
pub const HASH_TYPE_DATA1: u8 = 2;
pub const HASH_TYPE_DATA2: u8 = 4;

// ============ Proof Mask ============

pub const PROOF_MASK_INPUT: u8 = 0x1;
pub const PROOF_MASK_OUTPUT: u8 = 0x2;
pub const PROOF_MASK_BOTH: u8 = PROOF_MASK_INPUT | PROOF_MASK_OUTPUT;

// ============ Hashing ============

pub fn new_blake2b() -> Blake2b {
    Blake2bBuilder::new(BLAKE2B_BLOCK_SIZE)
        .personal(CKB_HASH_PERSONALIZATION)
        .build()
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = new_blake2b();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

pub fn blake160(data: &[u8]) -> [u8; BLAKE160_SIZE] {
    let hash = blake2b_256(data);
    let mut out = [0u8; BLAKE160_SIZE];
    out.copy_from_slice(&hash[..BLAKE160_SIZE]);
    out
}

// ============ Host Interface ============

/// Where a transaction item is loaded from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Input,
    Output,
    CellDep,
    HeaderDep,
    GroupInput,
    GroupOutput,
}

/// Errors reported by the transaction snapshot layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SysError {
    IndexOutOfBound,
    ItemMissing,
    LengthNotEnough(usize),
    Encoding,
    Unknown(u64),
}

// ============ Errors ============

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    // syscall
    IndexOutOfBound,
    ItemMissing,
    LengthNotEnough,
    SysEncoding,
    Syscall,

    // generic
    ArgumentsLen,
    Encoding,
    ScriptTooLong,
    Overflowing,
    Amount,

    // secp256k1
    SecpRecoverPubkey,
    SecpParseSignature,
    SecpSerializePubkey,
    PubkeyBlake160Hash,

    // xUDT / compliance
    CantLoadLib,
    InvalidArgs,
    NotEnoughBuff,
    InvalidFlag,
    InvalidArgsFormat,
    InvalidWitnessFormat,
    InvalidMolFormat,
    Blake2bError,
    HashMismatched,
    RcRulesTooDeep,
    TooManyRcRules,
    RcRulesProofsMismatched,
    SmtVerifyFailed,
    RceEmergencyHalt,
    NotValidated,
    TooManyLock,
    OnBlackList,
    NotOnWhiteList,
    TypeFrozen,
    AppendOnly,
    Eof,
    RceCellNotFound,
    TypeIdMismatch,
    TooManyTypeIdCells,

    // rc lock
    UnknownFlags,
    LockScriptHashNotFound,
    ProofLengthMismatched,

    /// Non-zero exit code of an external xUDT extension
    Extension(i8),
}

impl Error {
    /// Script exit code reported to the chain
    pub fn code(&self) -> i8 {
        match self {
            Error::IndexOutOfBound => 1,
            Error::ItemMissing => 2,
            Error::LengthNotEnough => 3,
            Error::SysEncoding => 4,
            Error::Syscall => -3,

            Error::ArgumentsLen => -1,
            Error::Encoding => -2,
            Error::ScriptTooLong => -21,
            Error::Overflowing => -51,
            Error::Amount => -52,

            Error::SecpRecoverPubkey => -11,
            Error::SecpParseSignature => -14,
            Error::SecpSerializePubkey => -15,
            Error::PubkeyBlake160Hash => -31,

            Error::CantLoadLib => 40,
            Error::InvalidArgs => 41,
            Error::NotEnoughBuff => 42,
            Error::InvalidFlag => 43,
            Error::InvalidArgsFormat => 44,
            Error::InvalidWitnessFormat => 45,
            Error::InvalidMolFormat => 46,
            Error::Blake2bError => 47,
            Error::HashMismatched => 48,
            Error::RcRulesTooDeep => 49,
            Error::TooManyRcRules => 50,
            Error::RcRulesProofsMismatched => 51,
            Error::SmtVerifyFailed => 52,
            Error::RceEmergencyHalt => 53,
            Error::NotValidated => 54,
            Error::TooManyLock => 55,
            Error::OnBlackList => 56,
            Error::NotOnWhiteList => 57,
            Error::TypeFrozen => 58,
            Error::AppendOnly => 59,
            Error::Eof => 60,
            Error::RceCellNotFound => 61,
            Error::TypeIdMismatch => 62,
            Error::TooManyTypeIdCells => 63,

            Error::UnknownFlags => 80,
            Error::LockScriptHashNotFound => 81,
            Error::ProofLengthMismatched => 82,

            Error::Extension(code) => *code,
        }
    }
}

impl From<SysError> for Error {
    fn from(err: SysError) -> Self {
        match err {
            SysError::IndexOutOfBound => Error::IndexOutOfBound,
            SysError::ItemMissing => Error::ItemMissing,
            SysError::LengthNotEnough(_) => Error::LengthNotEnough,
            SysError::Encoding => Error::SysEncoding,
            SysError::Unknown(_) => Error::Syscall,
        }
    }
}

// ============ Configuration ============

/// Bounds applied while resolving a rule tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub max_rule_depth: usize,
    pub max_rules: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_rule_depth: MAX_RULE_DEPTH,
            max_rules: MAX_RULES,
        }
    }
}

// ============ Compliance Rules ============

/// Policy flags of a single compliance rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleFlags(pub u8);

impl RuleFlags {
    pub const EMERGENCY_HALT: u8 = 0x1;
    pub const WHITE_LIST: u8 = 0x2;

    pub fn black_list() -> Self {
        Self(0)
    }

    pub fn white_list() -> Self {
        Self(Self::WHITE_LIST)
    }

    pub fn is_emergency_halt(&self) -> bool {
        self.0 & Self::EMERGENCY_HALT != 0
    }

    pub fn is_whitelist(&self) -> bool {
        self.0 & Self::WHITE_LIST != 0
    }

    pub fn is_blacklist(&self) -> bool {
        !self.is_whitelist()
    }
}

/// Leaf of a compliance tree, `RCRule { smt_root: Byte32, flags: byte }`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    pub smt_root: [u8; 32],
    pub flags: RuleFlags,
}

impl Rule {
    pub const SERIALIZED_SIZE: usize = 32 + 1;

    pub fn serialize(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut buf = [0u8; Self::SERIALIZED_SIZE];
        buf[0..32].copy_from_slice(&self.smt_root);
        buf[32] = self.flags.0;
        buf
    }

    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() != Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            smt_root: data[0..32].try_into().ok()?,
            flags: RuleFlags(data[32]),
        })
    }
}

// ============ SMT Update Nibbles ============

pub const EXISTENCE_NOT_EXISTING: u8 = 0;
pub const EXISTENCE_EXISTING: u8 = 1;

/// Decode `packed_values` of an SmtUpdateItem into (old_exists, new_exists).
/// High nibble is the old state, low nibble the new one.
pub fn unpack_existence(packed: u8) -> Result<(bool, bool), Error> {
    let decode = |nibble: u8| match nibble {
        EXISTENCE_EXISTING => Ok(true),
        EXISTENCE_NOT_EXISTING => Ok(false),
        _ => Err(Error::InvalidMolFormat),
    };
    Ok((decode(packed >> 4)?, decode(packed & 0x0F)?))
}

pub fn pack_existence(old_exists: bool, new_exists: bool) -> u8 {
    ((old_exists as u8) << 4) | (new_exists as u8)
}

// ============ rc-lock Args ============

pub const RC_LOCK_FLAGS_PLAIN: u8 = 0;
pub const RC_LOCK_FLAGS_RC: u8 = 1;

/// `flags | pubkey_hash(20) | rc_root(32, Rc only)`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RcLockArgs {
    pub pubkey_hash: [u8; 20],
    pub rc_root: Option<[u8; 32]>,
}

impl RcLockArgs {
    pub const PLAIN_SIZE: usize = 1 + 20;
    pub const RC_SIZE: usize = 1 + 20 + 32;

    pub fn flags(&self) -> u8 {
        if self.rc_root.is_some() {
            RC_LOCK_FLAGS_RC
        } else {
            RC_LOCK_FLAGS_PLAIN
        }
    }

    pub fn parse(args: &[u8]) -> Result<Self, Error> {
        let flags = *args.first().ok_or(Error::ArgumentsLen)?;
        let mut pubkey_hash = [0u8; 20];
        match flags {
            RC_LOCK_FLAGS_PLAIN => {
                if args.len() < Self::PLAIN_SIZE {
                    return Err(Error::ArgumentsLen);
                }
                pubkey_hash.copy_from_slice(&args[1..21]);
                Ok(Self { pubkey_hash, rc_root: None })
            }
            RC_LOCK_FLAGS_RC => {
                if args.len() < Self::RC_SIZE {
                    return Err(Error::ArgumentsLen);
                }
                pubkey_hash.copy_from_slice(&args[1..21]);
                let mut rc_root = [0u8; 32];
                rc_root.copy_from_slice(&args[21..53]);
                Ok(Self { pubkey_hash, rc_root: Some(rc_root) })
            }
            _ => Err(Error::UnknownFlags),
        }
    }

    pub fn serialize(&self) -> ([u8; Self::RC_SIZE], usize) {
        let mut buf = [0u8; Self::RC_SIZE];
        buf[0] = self.flags();
        buf[1..21].copy_from_slice(&self.pubkey_hash);
        match &self.rc_root {
            Some(root) => {
                buf[21..53].copy_from_slice(root);
                (buf, Self::RC_SIZE)
            }
            None => (buf, Self::PLAIN_SIZE),
        }
    }
}

// ============ rce-validator Args ============

pub const RCE_FLAG_APPEND_ONLY: u8 = 0x1;
pub const RCE_FLAG_FREEZE_TYPE: u8 = 0x2;

/// `type_id(32) | flags(1)`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RceValidatorArgs {
    pub type_id: [u8; 32],
    pub flags: u8,
}

impl RceValidatorArgs {
    pub const SERIALIZED_SIZE: usize = 33;

    pub fn append_only(&self) -> bool {
        self.flags & RCE_FLAG_APPEND_ONLY != 0
    }

    pub fn freeze_type(&self) -> bool {
        self.flags & RCE_FLAG_FREEZE_TYPE != 0
    }

    pub fn serialize(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut buf = [0u8; Self::SERIALIZED_SIZE];
        buf[0..32].copy_from_slice(&self.type_id);
        buf[32] = self.flags;
        buf
    }

    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() != Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            type_id: data[0..32].try_into().ok()?,
            flags: data[32],
        })
    }
}

// ============ xUDT Args ============

pub const XUDT_FLAGS_SIZE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XudtFlags {
    Plain,
    InArgs,
    InWitness,
}

impl XudtFlags {
    pub fn from_u32(value: u32) -> Result<Self, Error> {
        match value {
            0 => Ok(XudtFlags::Plain),
            1 => Ok(XudtFlags::InArgs),
            2 => Ok(XudtFlags::InWitness),
            _ => Err(Error::InvalidFlag),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            XudtFlags::Plain => 0,
            XudtFlags::InArgs => 1,
            XudtFlags::InWitness => 2,
        }
    }
}

// ============ Tests ============
