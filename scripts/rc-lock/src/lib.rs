// ============ RC Lock Script ============
// secp256k1/blake160 sighash-all lock, optionally gated by a regulation
// compliance rule tree.
//
// Args:    flags(1) | pubkey_hash(20) | rc_root(32, flags == 1 only)
// Witness: WitnessArgs.lock = signature(65) [| lock_script_hash(32) | proofs]
//
// With a compliance root, the lock script hash named in the witness must
// belong to one of the inputs and must pass every rule the root resolves to.

#![cfg_attr(feature = "ckb", no_std)]

use rce_core::mol::{RcLockWitnessLock, WitnessArgsView};
use rce_core::syscalls::load_script_args;
use rce_core::{
    verify_blake160_sighash_all, ByteSource, Evaluator, Resolver, SmtVerifier, Source, Subject,
    Transaction, TxDataSource,
};
use rce_types::{Error, Limits, RcLockArgs, SysError};

// ============ Script Entry Point ============

pub fn verify_rc_lock<T: Transaction>(tx: &T, limits: Limits) -> Result<(), Error> {
    let args = load_script_args(tx)?;
    let args = RcLockArgs::parse(&args)?;

    verify_blake160_sighash_all(tx, &args.pubkey_hash)?;

    if let Some(rc_root) = args.rc_root {
        verify_compliance(tx, &rc_root, limits)?;
    }
    Ok(())
}

// ============ Compliance ============

fn verify_compliance<T: Transaction>(tx: &T, rc_root: &[u8; 32], limits: Limits) -> Result<(), Error> {
    let rule_set = Resolver::new(tx, limits).resolve(rc_root)?;

    let witness = TxDataSource::witness(tx, 0, Source::GroupInput)?;
    if witness.total_size() == 0 {
        return Err(Error::InvalidMolFormat);
    }
    let witness_args = WitnessArgsView::parse(witness.cursor())?;
    let lock = witness_args.lock.ok_or(Error::InvalidMolFormat)?;
    let lock = RcLockWitnessLock::parse(lock)?;
    let lock_script_hash = lock.lock_script_hash.ok_or(Error::InvalidMolFormat)?;
    let proofs = lock.proofs.ok_or(Error::InvalidMolFormat)?;

    if !is_input_lock(tx, &lock_script_hash)? {
        return Err(Error::LockScriptHashNotFound);
    }

    Evaluator::new(SmtVerifier).evaluate(&Subject::single(lock_script_hash), &rule_set, &proofs)?;
    Ok(())
}

fn is_input_lock<T: Transaction>(tx: &T, hash: &[u8; 32]) -> Result<bool, Error> {
    for index in 0.. {
        match tx.load_cell_lock_hash(index, Source::Input) {
            Ok(lock_hash) if &lock_hash == hash => return Ok(true),
            Ok(_) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(false)
}
