// ============ Type ID ============
// A type script using this rule exists as exactly one live cell. Its id is
// fixed at creation to blake2b(first input | u64le(output index)).

use rce_types::{new_blake2b, Error, SysError};

use crate::syscalls::{Source, Transaction};

fn has_cell<T: Transaction>(tx: &T, index: usize, source: Source) -> Result<bool, Error> {
    match tx.load_cell_lock_hash(index, source) {
        Ok(_) => Ok(true),
        Err(SysError::IndexOutOfBound) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Position of the first output carrying the running script as its type
fn first_group_output_index<T: Transaction>(tx: &T) -> Result<usize, Error> {
    let script_hash = tx.load_script_hash()?;
    for index in 0.. {
        match tx.load_cell_type_hash(index, Source::Output) {
            Ok(Some(hash)) if hash == script_hash => return Ok(index),
            Ok(_) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::TypeIdMismatch)
}

pub fn calculate_type_id(first_input: &[u8], output_index: usize) -> [u8; 32] {
    let mut hasher = new_blake2b();
    hasher.update(first_input);
    hasher.update(&(output_index as u64).to_le_bytes());
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}

pub fn validate_type_id<T: Transaction>(tx: &T, type_id: &[u8; 32]) -> Result<(), Error> {
    if has_cell(tx, 1, Source::GroupInput)? || has_cell(tx, 1, Source::GroupOutput)? {
        return Err(Error::TooManyTypeIdCells);
    }
    // transfers and burns keep whatever id the cell already has
    if has_cell(tx, 0, Source::GroupInput)? {
        return Ok(());
    }
    let first_input = tx.load_input(0, Source::Input)?;
    let output_index = first_group_output_index(tx)?;
    if &calculate_type_id(&first_input, output_index) != type_id {
        return Err(Error::TypeIdMismatch);
    }
    Ok(())
}

// ============ Tests ============
