// ============ Molecule Views ============
// Verify-and-project readers over cursor-backed molecule data.
//
// Layouts (all numbers u32 little-endian):
//   table   | total_size | offset[0..n] | fields |
//   dynvec  | total_size | offset[0..n] | items  |   (empty: total_size == 4)
//   fixvec  | item_count | items |
//   union   | item_id | content |
//   option  | empty (None) or the inner value |

use core::ops::Range;

use molecule::NUMBER_SIZE;
use rce_types::{Error, Rule, MAX_PROOF_LENGTH, SIGNATURE_SIZE};

use crate::cursor::Cursor;
use crate::transition::{Payload, SmtUpdateItem, UpdateAction};

use alloc::vec::Vec;

// ============ Primitive Layouts ============

/// Split a table into its first `N` fields. Extra trailing fields are
/// tolerated so newer schema revisions still parse.
pub fn table_fields<const N: usize>(cursor: Cursor<'_>) -> Result<[Cursor<'_>; N], Error> {
    let total = cursor.unpack_number()?;
    if total != cursor.len() {
        return Err(Error::InvalidMolFormat);
    }
    let empty = cursor.slice(0, 0)?;
    let mut fields = [empty; N];
    if total == NUMBER_SIZE {
        return if N == 0 { Ok(fields) } else { Err(Error::InvalidMolFormat) };
    }

    let header = cursor.number_at(NUMBER_SIZE)?;
    if header % NUMBER_SIZE != 0 || header < NUMBER_SIZE * 2 || header > total {
        return Err(Error::InvalidMolFormat);
    }
    let field_count = header / NUMBER_SIZE - 1;
    if field_count < N {
        return Err(Error::InvalidMolFormat);
    }

    let mut start = header;
    for (i, field) in fields.iter_mut().enumerate() {
        let end = if i + 1 == field_count {
            total
        } else {
            cursor.number_at(NUMBER_SIZE * (i + 2))?
        };
        if end < start || end > total {
            return Err(Error::InvalidMolFormat);
        }
        *field = cursor.slice(start, end - start)?;
        start = end;
    }
    Ok(fields)
}

/// Vector of variable-size items
#[derive(Clone, Copy, Debug)]
pub struct DynVec<'a> {
    cursor: Cursor<'a>,
    len: usize,
}

impl<'a> DynVec<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let total = cursor.unpack_number()?;
        if total != cursor.len() {
            return Err(Error::InvalidMolFormat);
        }
        if total == NUMBER_SIZE {
            return Ok(Self { cursor, len: 0 });
        }
        let header = cursor.number_at(NUMBER_SIZE)?;
        if header % NUMBER_SIZE != 0 || header < NUMBER_SIZE * 2 || header > total {
            return Err(Error::InvalidMolFormat);
        }
        Ok(Self {
            cursor,
            len: header / NUMBER_SIZE - 1,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<Cursor<'a>, Error> {
        if index >= self.len {
            return Err(Error::IndexOutOfBound);
        }
        let header = NUMBER_SIZE * (self.len + 1);
        let start = self.cursor.number_at(NUMBER_SIZE * (index + 1))?;
        let end = if index + 1 == self.len {
            self.cursor.len()
        } else {
            self.cursor.number_at(NUMBER_SIZE * (index + 2))?
        };
        if start < header || end < start || end > self.cursor.len() {
            return Err(Error::InvalidMolFormat);
        }
        self.cursor.slice(start, end - start)
    }
}

/// Vector of fixed-size items
#[derive(Clone, Copy, Debug)]
pub struct FixVec<'a> {
    cursor: Cursor<'a>,
    item_size: usize,
    len: usize,
}

impl<'a> FixVec<'a> {
    pub fn parse(cursor: Cursor<'a>, item_size: usize) -> Result<Self, Error> {
        let len = cursor.unpack_number()?;
        let expected = len
            .checked_mul(item_size)
            .and_then(|n| n.checked_add(NUMBER_SIZE))
            .ok_or(Error::InvalidMolFormat)?;
        if expected != cursor.len() {
            return Err(Error::InvalidMolFormat);
        }
        Ok(Self {
            cursor,
            item_size,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<Cursor<'a>, Error> {
        if index >= self.len {
            return Err(Error::IndexOutOfBound);
        }
        self.cursor
            .slice(NUMBER_SIZE + index * self.item_size, self.item_size)
    }

    /// All items back to back
    pub fn raw_items(&self) -> Result<Cursor<'a>, Error> {
        self.cursor.skip(NUMBER_SIZE)
    }
}

/// Content of a `Bytes` value
pub fn bytes_content(cursor: Cursor<'_>) -> Result<Cursor<'_>, Error> {
    FixVec::parse(cursor, 1)?.raw_items()
}

/// Content of a `BytesOpt` value
pub fn bytes_opt(cursor: Cursor<'_>) -> Result<Option<Cursor<'_>>, Error> {
    if cursor.is_empty() {
        return Ok(None);
    }
    bytes_content(cursor).map(Some)
}

pub fn union_parts(cursor: Cursor<'_>) -> Result<(usize, Cursor<'_>), Error> {
    Ok((cursor.unpack_number()?, cursor.skip(NUMBER_SIZE)?))
}

// ============ Script ============

#[derive(Clone, Copy, Debug)]
pub struct ScriptView<'a> {
    raw: Cursor<'a>,
    code_hash: [u8; 32],
    hash_type: u8,
    args: Cursor<'a>,
}

impl<'a> ScriptView<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let [code_hash, hash_type, args] = table_fields::<3>(cursor)?;
        Ok(Self {
            raw: cursor,
            code_hash: code_hash.to_array()?,
            hash_type: hash_type.to_array::<1>()?[0],
            args: bytes_content(args)?,
        })
    }

    pub fn code_hash(&self) -> [u8; 32] {
        self.code_hash
    }

    pub fn hash_type(&self) -> u8 {
        self.hash_type
    }

    pub fn args(&self) -> Cursor<'a> {
        self.args
    }

    /// The full serialized script, as hashed into a script hash
    pub fn raw(&self) -> Cursor<'a> {
        self.raw
    }
}

/// `ScriptVec`, the extension list of an xUDT
#[derive(Clone, Copy, Debug)]
pub struct ScriptVec<'a>(DynVec<'a>);

impl<'a> ScriptVec<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        DynVec::parse(cursor).map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<ScriptView<'a>, Error> {
        ScriptView::parse(self.0.get(index)?)
    }
}

// ============ WitnessArgs ============

#[derive(Clone, Copy, Debug)]
pub struct WitnessArgsView<'a> {
    pub lock: Option<Cursor<'a>>,
    pub input_type: Option<Cursor<'a>>,
    pub output_type: Option<Cursor<'a>>,
}

impl<'a> WitnessArgsView<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let [lock, input_type, output_type] = table_fields::<3>(cursor)?;
        Ok(Self {
            lock: bytes_opt(lock)?,
            input_type: bytes_opt(input_type)?,
            output_type: bytes_opt(output_type)?,
        })
    }
}

/// Byte range of the `WitnessArgs.lock` content within a witness, computed
/// from a prefix of the witness. The whole lock field must lie inside
/// `prefix`; `full_size` is the length of the complete witness.
pub fn witness_lock_range(prefix: &[u8], full_size: usize) -> Result<Range<usize>, Error> {
    let number = |offset: usize| -> Result<usize, Error> {
        let bytes = prefix
            .get(offset..offset + NUMBER_SIZE)
            .ok_or(Error::Encoding)?;
        Ok(molecule::unpack_number(bytes) as usize)
    };

    if number(0)? != full_size {
        return Err(Error::Encoding);
    }
    let lock_start = number(NUMBER_SIZE)?;
    if lock_start % NUMBER_SIZE != 0 || lock_start < NUMBER_SIZE * 4 {
        return Err(Error::Encoding);
    }
    let lock_end = number(NUMBER_SIZE * 2)?;
    if lock_end < lock_start + NUMBER_SIZE {
        // lock is None
        return Err(Error::Encoding);
    }
    let content_len = number(lock_start)?;
    let content_start = lock_start + NUMBER_SIZE;
    if content_start + content_len != lock_end || lock_end > prefix.len() {
        return Err(Error::Encoding);
    }
    Ok(content_start..lock_end)
}

// ============ Compliance Cell ============

pub const RC_DATA_RULE: usize = 0;
pub const RC_DATA_CELL_VEC: usize = 1;

/// `Byte32Vec` of child compliance-cell hashes
#[derive(Clone, Copy, Debug)]
pub struct Byte32Vec<'a>(FixVec<'a>);

impl<'a> Byte32Vec<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        FixVec::parse(cursor, 32).map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<[u8; 32], Error> {
        self.0.get(index)?.to_array()
    }
}

/// Payload of a compliance cell: `union RCData { RCRule, RCCellVec }`
#[derive(Clone, Copy, Debug)]
pub enum RcData<'a> {
    Rule(Rule),
    CellVec(Byte32Vec<'a>),
}

impl<'a> RcData<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let (item_id, content) = union_parts(cursor)?;
        match item_id {
            RC_DATA_RULE => {
                let bytes = content.to_array::<{ Rule::SERIALIZED_SIZE }>()?;
                Rule::deserialize(&bytes)
                    .map(RcData::Rule)
                    .ok_or(Error::InvalidMolFormat)
            }
            RC_DATA_CELL_VEC => Byte32Vec::parse(content).map(RcData::CellVec),
            _ => Err(Error::InvalidMolFormat),
        }
    }

    pub fn payload(&self) -> Payload {
        match self {
            RcData::Rule(rule) => Payload::Rule(*rule),
            RcData::CellVec(_) => Payload::CellVec,
        }
    }
}

// ============ Proof Entries ============

/// `table SmtProofEntry { mask: byte, proof: SmtProof }`
#[derive(Clone, Copy, Debug)]
pub struct SmtProofEntryView<'a> {
    pub mask: u8,
    pub proof: Cursor<'a>,
}

impl<'a> SmtProofEntryView<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let [mask, proof] = table_fields::<2>(cursor)?;
        Ok(Self {
            mask: mask.to_array::<1>()?[0],
            proof: bytes_content(proof)?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SmtProofEntryVec<'a>(DynVec<'a>);

impl<'a> SmtProofEntryVec<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        DynVec::parse(cursor).map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<SmtProofEntryView<'a>, Error> {
        SmtProofEntryView::parse(self.0.get(index).map_err(|_| Error::InvalidMolFormat)?)
    }
}

// ============ SMT Update ============

/// `table SmtUpdateAction { updates: SmtUpdateItemVec, proof: SmtProof }`
#[derive(Clone, Copy, Debug)]
pub struct SmtUpdateActionView<'a> {
    updates: FixVec<'a>,
    proof: Cursor<'a>,
}

impl<'a> SmtUpdateActionView<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let [updates, proof] = table_fields::<2>(cursor)?;
        Ok(Self {
            updates: FixVec::parse(updates, SmtUpdateItem::SERIALIZED_SIZE)?,
            proof: bytes_content(proof)?,
        })
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn item(&self, index: usize) -> Result<SmtUpdateItem, Error> {
        let bytes = self
            .updates
            .get(index)
            .map_err(|_| Error::InvalidMolFormat)?
            .to_array::<{ SmtUpdateItem::SERIALIZED_SIZE }>()?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        Ok(SmtUpdateItem {
            key,
            packed_values: bytes[32],
        })
    }

    /// Materialize the action. The proof is bounded before it is read.
    pub fn load(&self) -> Result<UpdateAction, Error> {
        if self.proof.len() > MAX_PROOF_LENGTH {
            return Err(Error::InvalidMolFormat);
        }
        let mut items = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            items.push(self.item(i)?);
        }
        Ok(UpdateAction {
            items,
            proof: self.proof.to_vec()?,
        })
    }
}

// ============ rc-lock Witness ============

/// Content of `WitnessArgs.lock` for rc-lock:
/// `signature(65) | lock_script_hash(32) | SmtProofEntryVec`,
/// the last two present only for compliance-enabled locks
#[derive(Clone, Copy, Debug)]
pub struct RcLockWitnessLock<'a> {
    pub signature: [u8; SIGNATURE_SIZE],
    pub lock_script_hash: Option<[u8; 32]>,
    pub proofs: Option<SmtProofEntryVec<'a>>,
}

impl<'a> RcLockWitnessLock<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        if cursor.len() < SIGNATURE_SIZE {
            return Err(Error::ArgumentsLen);
        }
        let signature = cursor.slice(0, SIGNATURE_SIZE)?.to_array()?;
        let rest = cursor.skip(SIGNATURE_SIZE)?;
        if rest.is_empty() {
            return Ok(Self {
                signature,
                lock_script_hash: None,
                proofs: None,
            });
        }
        let lock_script_hash = rest.slice(0, 32)?.to_array()?;
        let proofs = SmtProofEntryVec::parse(rest.skip(32)?)?;
        Ok(Self {
            signature,
            lock_script_hash: Some(lock_script_hash),
            proofs: Some(proofs),
        })
    }
}

// ============ xUDT Witness ============

/// `table XudtWitnessInput { raw_extension_data: ScriptVecOpt, structure: BytesVec }`
#[derive(Clone, Copy, Debug)]
pub struct XudtWitnessInput<'a> {
    raw_extension_data: Option<Cursor<'a>>,
    structure: DynVec<'a>,
}

impl<'a> XudtWitnessInput<'a> {
    pub fn parse(cursor: Cursor<'a>) -> Result<Self, Error> {
        let [raw, structure] = table_fields::<2>(cursor)?;
        let raw_extension_data = if raw.is_empty() {
            None
        } else {
            ScriptVec::parse(raw)?;
            Some(raw)
        };
        Ok(Self {
            raw_extension_data,
            structure: DynVec::parse(structure)?,
        })
    }

    /// Serialized `ScriptVec`, if present
    pub fn raw_extension_data(&self) -> Option<Cursor<'a>> {
        self.raw_extension_data
    }

    pub fn structure_len(&self) -> usize {
        self.structure.len()
    }

    /// Content of `structure[index]`
    pub fn structure(&self, index: usize) -> Result<Cursor<'a>, Error> {
        bytes_content(self.structure.get(index)?)
    }
}

// ============ Tests ============
