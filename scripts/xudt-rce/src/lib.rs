// ============ xUDT with Compliance Extension ============
// Extensible UDT: the simple-UDT amount rule plus a list of extension
// scripts, one of which may be the built-in compliance extension.
//
// Args:    owner_lock_hash(32) | flags(u32 le) | extension data
//          flags 0: none | 1: ScriptVec in args | 2: blake160 of the
//          ScriptVec carried in the witness
// Witness: WitnessArgs.input_type = XudtWitnessInput
//          { raw_extension_data, structure[i] = proofs for extension i }
// Data:    amount(u128 le) | anything

#![cfg_attr(feature = "ckb", no_std)]

extern crate alloc;

pub mod extension;
#[cfg(feature = "ckb")]
pub mod spawn;

use alloc::vec::Vec;

use rce_core::mol::{ScriptVec, WitnessArgsView, XudtWitnessInput};
use rce_core::syscalls::load_script_args;
use rce_core::{Cursor, SliceSource, Source, Transaction, TxDataSource};
use rce_types::{
    blake160, blake2b_256, Error, Limits, SysError, XudtFlags, BLAKE160_SIZE,
    MAX_LOCK_SCRIPT_HASH_COUNT, XUDT_FLAGS_SIZE,
};

pub use extension::{Extension, ExtensionLoader, ExtensionRegistry, NoLoader, RceExtension, Resolved};

const OWNER_HASH_SIZE: usize = 32;
const AMOUNT_SIZE: usize = 16;

// ============ Script Entry Point ============

pub fn verify_xudt<T, L>(tx: &T, loader: &L, limits: Limits) -> Result<(), Error>
where
    T: Transaction,
    L: ExtensionLoader<T>,
{
    let args = load_script_args(tx)?;
    if args.len() < OWNER_HASH_SIZE {
        return Err(Error::ArgumentsLen);
    }
    let (input_locks, owner_mode) = scan_input_locks(tx, &args)?;

    let extensions = load_extension_data(tx, &args)?;
    simple_udt(tx, owner_mode)?;

    let raw = match extensions {
        Some(raw) => raw,
        None => return Ok(()),
    };
    let source = SliceSource::new(&raw);
    let scripts = parse_script_vec(source.cursor())?;
    let registry = ExtensionRegistry::new(loader, limits);

    for index in 0..scripts.len() {
        let script = scripts.get(index)?;
        let resolved = registry.resolve::<T>(&script.code_hash(), script.hash_type())?;
        // the compliance extension always runs
        if !resolved.is_built_in() && is_validated(&script.raw(), &input_locks)? {
            continue;
        }
        let ext_args = script.args().to_vec()?;
        resolved.validate(tx, owner_mode, index, &ext_args)?;
    }
    Ok(())
}

// ============ Args ============

/// The first `MAX_LOCK_SCRIPT_HASH_COUNT` input lock hashes, and whether the
/// owner lock unlocks one of the inputs. Owner mode needs args holding the
/// owner lock hash and nothing else, so an xUDT with extensions never runs
/// in it.
fn scan_input_locks<T: Transaction>(tx: &T, args: &[u8]) -> Result<(Vec<[u8; 32]>, bool), Error> {
    let owner = if args.len() == OWNER_HASH_SIZE { Some(args) } else { None };
    let mut hashes = Vec::new();
    for index in 0.. {
        let hash = match tx.load_cell_lock_hash(index, Source::Input) {
            Ok(hash) => hash,
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        };
        // locks past the table are still searched for the owner
        if hashes.len() < MAX_LOCK_SCRIPT_HASH_COUNT {
            hashes.push(hash);
        }
        if owner == Some(&hash[..]) {
            return Ok((hashes, true));
        }
    }
    Ok((hashes, false))
}

/// ScriptVec with every item checked as a Script
fn parse_script_vec(cursor: Cursor<'_>) -> Result<ScriptVec<'_>, Error> {
    let scripts = ScriptVec::parse(cursor).map_err(|_| Error::InvalidArgsFormat)?;
    for index in 0..scripts.len() {
        scripts.get(index).map_err(|_| Error::InvalidArgsFormat)?;
    }
    Ok(scripts)
}

pub fn parse_flags(args: &[u8]) -> Result<XudtFlags, Error> {
    if args.len() < OWNER_HASH_SIZE + XUDT_FLAGS_SIZE {
        return Ok(XudtFlags::Plain);
    }
    let mut raw = [0u8; XUDT_FLAGS_SIZE];
    raw.copy_from_slice(&args[OWNER_HASH_SIZE..OWNER_HASH_SIZE + XUDT_FLAGS_SIZE]);
    XudtFlags::from_u32(u32::from_le_bytes(raw))
}

/// Serialized extension ScriptVec, from the args or from the witness
fn load_extension_data<T: Transaction>(tx: &T, args: &[u8]) -> Result<Option<Vec<u8>>, Error> {
    let tail = args.get(OWNER_HASH_SIZE + XUDT_FLAGS_SIZE..).unwrap_or(&[]);
    let raw = match parse_flags(args)? {
        XudtFlags::Plain => return Ok(None),
        XudtFlags::InArgs => {
            let source = SliceSource::new(tail);
            parse_script_vec(source.cursor())?;
            tail.to_vec()
        }
        XudtFlags::InWitness => {
            if tail.len() != BLAKE160_SIZE {
                return Err(Error::InvalidFlag);
            }
            let raw = load_witness_extension_data(tx)?;
            if blake160(&raw)[..] != tail[..] {
                return Err(Error::HashMismatched);
            }
            raw
        }
    };
    if raw.is_empty() {
        return Err(Error::InvalidArgsFormat);
    }
    Ok(Some(raw))
}

fn load_witness_extension_data<T: Transaction>(tx: &T) -> Result<Vec<u8>, Error> {
    let witness = TxDataSource::witness(tx, 0, Source::GroupInput)?;
    let witness_args = WitnessArgsView::parse(witness.cursor())?;
    let input_type = witness_args.input_type.ok_or(Error::InvalidMolFormat)?;
    if input_type.is_empty() {
        return Err(Error::InvalidMolFormat);
    }
    let input = XudtWitnessInput::parse(input_type)?;
    let raw = input.raw_extension_data().ok_or(Error::InvalidMolFormat)?;
    raw.to_vec()
}

/// An extension script equal to an input lock has already run as that lock
fn is_validated(script: &Cursor<'_>, input_locks: &[[u8; 32]]) -> Result<bool, Error> {
    let hash = blake2b_256(&script.to_vec()?);
    // whole hash; a shared blake160 prefix is not the same script
    Ok(input_locks.contains(&hash))
}

// ============ Simple UDT ============

/// Without the owner's lock, group outputs may not hold more tokens than
/// group inputs
pub fn simple_udt<T: Transaction>(tx: &T, owner_mode: bool) -> Result<(), Error> {
    if owner_mode {
        return Ok(());
    }
    let input_amount = sum_amounts(tx, Source::GroupInput)?;
    let output_amount = sum_amounts(tx, Source::GroupOutput)?;
    if input_amount < output_amount {
        return Err(Error::Amount);
    }
    Ok(())
}

fn sum_amounts<T: Transaction>(tx: &T, source: Source) -> Result<u128, Error> {
    let mut total: u128 = 0;
    for index in 0.. {
        let mut buf = [0u8; AMOUNT_SIZE];
        match tx.load_cell_data(&mut buf, 0, index, source) {
            Ok(len) if len < AMOUNT_SIZE => return Err(Error::Encoding),
            Ok(_) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
        total = total
            .checked_add(u128::from_le_bytes(buf))
            .ok_or(Error::Overflowing)?;
    }
    Ok(total)
}
