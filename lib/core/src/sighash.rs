// ============ Sighash-All Message ============
// Assembles the signed message of a secp256k1/blake160 lock and checks the
// signer.
//
// message = blake2b(
//     tx_hash
//   | u64le(len(w0)) | w0 with the WitnessArgs.lock content zeroed
//   | for each further group input witness: u64le(len) | bytes
//   | for each witness past the inputs:    u64le(len) | bytes )
//
// Witnesses are streamed through a caller-supplied chunk buffer; the lock
// field of the first witness must fall inside its first chunk.

use alloc::vec;

use blake2b_rs::Blake2b;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rce_types::{
    blake160, new_blake2b, Error, Source, SysError, BLAKE160_SIZE, MAX_WITNESS_SIZE, PUBKEY_SIZE,
    RECID_INDEX, SIGNATURE_SIZE,
};

use crate::mol::witness_lock_range;
use crate::syscalls::Transaction;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SighashAll {
    pub message: [u8; 32],
    pub signature: [u8; SIGNATURE_SIZE],
}

// ============ Message Assembly ============

pub fn generate_sighash_all<T: Transaction>(tx: &T, chunk: &mut [u8]) -> Result<SighashAll, Error> {
    let witness_len = tx.load_witness(chunk, 0, 0, Source::GroupInput)?;
    let read_len = witness_len.min(chunk.len());

    let lock = witness_lock_range(&chunk[..read_len], witness_len)?;
    if lock.len() < SIGNATURE_SIZE {
        return Err(Error::ArgumentsLen);
    }
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&chunk[lock.start..lock.start + SIGNATURE_SIZE]);

    let tx_hash = tx.load_tx_hash()?;
    let mut hasher = new_blake2b();
    hasher.update(&tx_hash);

    for byte in &mut chunk[lock] {
        *byte = 0;
    }
    hasher.update(&(witness_len as u64).to_le_bytes());
    hasher.update(&chunk[..read_len]);
    if read_len < witness_len {
        hash_witness(tx, &mut hasher, chunk, read_len, 0, Source::GroupInput, false)?;
    }

    for index in 1.. {
        match hash_witness(tx, &mut hasher, chunk, 0, index, Source::GroupInput, true) {
            Ok(()) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }

    let inputs_len = tx.inputs_len()?;
    for index in inputs_len.. {
        match hash_witness(tx, &mut hasher, chunk, 0, index, Source::Input, true) {
            Ok(()) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }

    let mut message = [0u8; 32];
    hasher.finalize(&mut message);
    Ok(SighashAll { message, signature })
}

/// Sighash with the default `MAX_WITNESS_SIZE` chunk
pub fn sighash_all<T: Transaction>(tx: &T) -> Result<SighashAll, Error> {
    let mut chunk = vec![0u8; MAX_WITNESS_SIZE];
    generate_sighash_all(tx, &mut chunk)
}

/// Feed witness `index` from `start` onward into `hasher`, one chunk at a
/// time, optionally preceded by its remaining length
fn hash_witness<T: Transaction>(
    tx: &T,
    hasher: &mut Blake2b,
    chunk: &mut [u8],
    start: usize,
    index: usize,
    source: Source,
    with_length: bool,
) -> Result<(), SysError> {
    let len = tx.load_witness(chunk, start, index, source)?;
    if with_length {
        hasher.update(&(len as u64).to_le_bytes());
    }
    let mut offset = len.min(chunk.len());
    hasher.update(&chunk[..offset]);
    while offset < len {
        let current = tx.load_witness(chunk, start + offset, index, source)?;
        let read = current.min(chunk.len());
        if read == 0 {
            return Err(SysError::LengthNotEnough(len));
        }
        hasher.update(&chunk[..read]);
        offset += read;
    }
    Ok(())
}

// ============ Signature Check ============

/// blake160 of the compressed public key that signed `message`
pub fn recover_blake160(message: &[u8; 32], signature: &[u8; SIGNATURE_SIZE]) -> Result<[u8; BLAKE160_SIZE], Error> {
    let mut recovery_id = RecoveryId::from_byte(signature[RECID_INDEX]).ok_or(Error::SecpParseSignature)?;
    let mut sig = Signature::from_slice(&signature[..RECID_INDEX]).map_err(|_| Error::SecpParseSignature)?;
    // high-S signatures are valid; (r, n - s) recovers the same key with
    // the y parity flipped
    if let Some(low) = sig.normalize_s() {
        sig = low;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }
    let key = VerifyingKey::recover_from_prehash(message, &sig, recovery_id)
        .map_err(|_| Error::SecpRecoverPubkey)?;
    let point = key.as_affine().to_encoded_point(true);
    let pubkey = point.as_bytes();
    if pubkey.len() != PUBKEY_SIZE {
        return Err(Error::SecpSerializePubkey);
    }
    Ok(blake160(pubkey))
}

pub fn verify_blake160_sighash_all<T: Transaction>(tx: &T, pubkey_hash: &[u8; BLAKE160_SIZE]) -> Result<(), Error> {
    let sighash = sighash_all(tx)?;
    let recovered = recover_blake160(&sighash.message, &sighash.signature)?;
    if &recovered != pubkey_hash {
        return Err(Error::PubkeyBlake160Hash);
    }
    Ok(())
}

// ============ Tests ============
