// ============ Signer ============
// secp256k1 key that fills the sighash-all signature into the first group
// witness of a mock transaction.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rce_core::mol::witness_lock_range;
use rce_core::{sighash_all, Source};
use rce_types::{blake160, BLAKE160_SIZE, RECID_INDEX, SIGNATURE_SIZE};

use crate::mock::MockTransaction;
use crate::SdkError;

pub struct Signer {
    key: SigningKey,
}

impl Signer {
    pub fn from_secret(secret: &[u8; 32]) -> Result<Self, SdkError> {
        let key = SigningKey::from_slice(secret).map_err(|_| SdkError::InvalidSecret)?;
        Ok(Self { key })
    }

    pub fn pubkey(&self) -> [u8; 33] {
        let point = self.key.verifying_key().as_affine().to_encoded_point(true);
        let mut pubkey = [0u8; 33];
        pubkey.copy_from_slice(point.as_bytes());
        pubkey
    }

    pub fn pubkey_hash(&self) -> [u8; BLAKE160_SIZE] {
        blake160(&self.pubkey())
    }

    /// Recoverable signature: r | s | recovery id
    pub fn sign_prehash(&self, message: &[u8; 32]) -> Result<[u8; SIGNATURE_SIZE], SdkError> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(message)
            .map_err(|_| SdkError::Signing)?;
        let mut signature = [0u8; SIGNATURE_SIZE];
        signature[..RECID_INDEX].copy_from_slice(&sig.to_bytes());
        signature[RECID_INDEX] = recid.to_byte();
        Ok(signature)
    }

    /// Sign `tx` in place. The first group witness must already carry a
    /// lock field of at least 65 bytes; its first 65 bytes are replaced.
    pub fn sign(&self, tx: &mut MockTransaction) -> Result<[u8; SIGNATURE_SIZE], SdkError> {
        let message = sighash_all(tx).map_err(SdkError::Script)?.message;
        let signature = self.sign_prehash(&message)?;

        let position = tx
            .group_position(0, Source::GroupInput)
            .ok_or(SdkError::MissingWitness)?;
        let witness = tx.witness_mut(position).ok_or(SdkError::MissingWitness)?;
        let lock = witness_lock_range(witness, witness.len()).map_err(SdkError::Script)?;
        witness[lock.start..lock.start + SIGNATURE_SIZE].copy_from_slice(&signature);
        Ok(signature)
    }
}

// ============ Tests ============
