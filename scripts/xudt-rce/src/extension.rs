// ============ xUDT Extensions ============
// Extension scripts listed by an xUDT are looked up in a registry. The
// compliance extension is built in; anything else comes from a loader.

use alloc::boxed::Box;
use alloc::ffi::CString;
use alloc::format;
use alloc::vec::Vec;

use rce_core::mol::{SmtProofEntryVec, WitnessArgsView, XudtWitnessInput};
use rce_core::syscalls::collect_lock_hashes;
use rce_core::{Evaluator, Resolver, SmtVerifier, Source, Subject, Transaction, TxDataSource};
use rce_types::{Error, Limits, MAX_LOCK_SCRIPT_HASH_COUNT, RCE_HASH, RCE_HASH_TYPE};

/// One validation rule plugged into an xUDT
pub trait Extension<T: Transaction> {
    /// `index` is the extension's position in the xUDT's list; `args` are
    /// the extension script's own args
    fn validate(&self, tx: &T, owner_mode: bool, index: usize, args: &[u8]) -> Result<(), Error>;
}

/// Source of extensions that are not built in
pub trait ExtensionLoader<T: Transaction> {
    fn load(&self, code_hash: &[u8; 32], hash_type: u8) -> Result<Box<dyn Extension<T> + '_>, Error>;
}

/// Loader with nothing to offer
#[derive(Clone, Copy, Debug, Default)]
pub struct NoLoader;

impl<T: Transaction> ExtensionLoader<T> for NoLoader {
    fn load(&self, _code_hash: &[u8; 32], _hash_type: u8) -> Result<Box<dyn Extension<T> + '_>, Error> {
        Err(Error::CantLoadLib)
    }
}

/// argv of an external extension: `owner_mode("1"/"0") index hex(args)`
pub fn extension_argv(owner_mode: bool, index: usize, args: &[u8]) -> Result<Vec<CString>, Error> {
    [
        format!("{}", owner_mode as u8),
        format!("{}", index),
        hex::encode(args),
    ]
    .into_iter()
    .map(|arg| CString::new(arg).map_err(|_| Error::InvalidArgs))
    .collect()
}

// ============ Compliance Extension ============

/// Every group input and output lock must pass the rules under the root
/// given as the extension args
#[derive(Clone, Copy, Debug, Default)]
pub struct RceExtension {
    pub limits: Limits,
}

impl<T: Transaction> Extension<T> for RceExtension {
    fn validate(&self, tx: &T, owner_mode: bool, index: usize, args: &[u8]) -> Result<(), Error> {
        if owner_mode {
            return Ok(());
        }
        let root: [u8; 32] = args.try_into().map_err(|_| Error::InvalidArgs)?;
        let rule_set = Resolver::new(tx, self.limits).resolve(&root)?;

        let witness = TxDataSource::witness(tx, 0, Source::GroupInput)?;
        let witness_args = WitnessArgsView::parse(witness.cursor())?;
        let input_type = witness_args.input_type.ok_or(Error::InvalidMolFormat)?;
        let input = XudtWitnessInput::parse(input_type)?;
        let proofs = SmtProofEntryVec::parse(input.structure(index)?)?;
        if proofs.len() != rule_set.len() {
            return Err(Error::RcRulesProofsMismatched);
        }

        let subject = Subject::new(
            collect_lock_hashes(tx, Source::GroupInput, MAX_LOCK_SCRIPT_HASH_COUNT)?,
            collect_lock_hashes(tx, Source::GroupOutput, MAX_LOCK_SCRIPT_HASH_COUNT)?,
        );
        Evaluator::new(SmtVerifier).evaluate(&subject, &rule_set, &proofs)?;
        Ok(())
    }
}

// ============ Registry ============

pub enum Resolved<'a, T: Transaction> {
    BuiltIn(&'a RceExtension),
    Loaded(Box<dyn Extension<T> + 'a>),
}

impl<'a, T: Transaction> Resolved<'a, T> {
    pub fn is_built_in(&self) -> bool {
        matches!(self, Resolved::BuiltIn(_))
    }

    pub fn validate(&self, tx: &T, owner_mode: bool, index: usize, args: &[u8]) -> Result<(), Error> {
        match self {
            Resolved::BuiltIn(rce) => rce.validate(tx, owner_mode, index, args),
            Resolved::Loaded(ext) => ext.validate(tx, owner_mode, index, args),
        }
    }
}

pub struct ExtensionRegistry<'l, L> {
    rce: RceExtension,
    loader: &'l L,
}

impl<'l, L> ExtensionRegistry<'l, L> {
    pub fn new(loader: &'l L, limits: Limits) -> Self {
        Self {
            rce: RceExtension { limits },
            loader,
        }
    }

    pub fn resolve<T: Transaction>(&self, code_hash: &[u8; 32], hash_type: u8) -> Result<Resolved<'_, T>, Error>
    where
        L: ExtensionLoader<T>,
    {
        if code_hash == &RCE_HASH && hash_type == RCE_HASH_TYPE {
            return Ok(Resolved::BuiltIn(&self.rce));
        }
        self.loader.load(code_hash, hash_type).map(Resolved::Loaded)
    }
}

// ============ Tests ============
