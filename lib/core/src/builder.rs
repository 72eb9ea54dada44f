// ============ Molecule Builders ============
// Serializers for the structures the views in `mol` read. Used by the
// off-chain SDK to assemble transactions and by tests.

use alloc::vec::Vec;

use molecule::{pack_number, NUMBER_SIZE};
use rce_types::Rule;

use crate::mol::{RC_DATA_CELL_VEC, RC_DATA_RULE};
use crate::transition::SmtUpdateItem;

fn push_number(out: &mut Vec<u8>, n: usize) {
    out.extend_from_slice(&pack_number(n as molecule::Number)[..]);
}

// ============ Primitive Layouts ============

pub fn bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NUMBER_SIZE + data.len());
    push_number(&mut out, data.len());
    out.extend_from_slice(data);
    out
}

pub fn bytes_opt(data: Option<&[u8]>) -> Vec<u8> {
    data.map(bytes).unwrap_or_default()
}

pub fn fixvec(item_count: usize, raw_items: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NUMBER_SIZE + raw_items.len());
    push_number(&mut out, item_count);
    out.extend_from_slice(raw_items);
    out
}

/// Offsets header followed by the parts. Tables and dynvecs share it.
fn with_header(parts: &[Vec<u8>]) -> Vec<u8> {
    let header = NUMBER_SIZE * (parts.len() + 1);
    let total = header + parts.iter().map(Vec::len).sum::<usize>();
    let mut out = Vec::with_capacity(total);
    push_number(&mut out, total);
    let mut offset = header;
    for part in parts {
        push_number(&mut out, offset);
        offset += part.len();
    }
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

pub fn table(fields: &[Vec<u8>]) -> Vec<u8> {
    with_header(fields)
}

pub fn dynvec(items: &[Vec<u8>]) -> Vec<u8> {
    with_header(items)
}

pub fn union(item_id: usize, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NUMBER_SIZE + content.len());
    push_number(&mut out, item_id);
    out.extend_from_slice(content);
    out
}

// ============ Blockchain Types ============

pub fn script(code_hash: &[u8; 32], hash_type: u8, args: &[u8]) -> Vec<u8> {
    table(&[code_hash.to_vec(), alloc::vec![hash_type], bytes(args)])
}

pub fn script_vec(scripts: &[Vec<u8>]) -> Vec<u8> {
    dynvec(scripts)
}

pub fn witness_args(
    lock: Option<&[u8]>,
    input_type: Option<&[u8]>,
    output_type: Option<&[u8]>,
) -> Vec<u8> {
    table(&[bytes_opt(lock), bytes_opt(input_type), bytes_opt(output_type)])
}

/// `struct CellInput { since: Uint64, previous_output: OutPoint }`
pub fn cell_input(since: u64, tx_hash: &[u8; 32], index: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + 32 + 4);
    out.extend_from_slice(&since.to_le_bytes());
    out.extend_from_slice(tx_hash);
    out.extend_from_slice(&index.to_le_bytes());
    out
}

// ============ Compliance Types ============

pub fn rc_data_rule(rule: &Rule) -> Vec<u8> {
    union(RC_DATA_RULE, &rule.serialize())
}

pub fn rc_data_cell_vec(children: &[[u8; 32]]) -> Vec<u8> {
    let raw: Vec<u8> = children.iter().flatten().copied().collect();
    union(RC_DATA_CELL_VEC, &fixvec(children.len(), &raw))
}

pub fn proof_entry(mask: u8, proof: &[u8]) -> Vec<u8> {
    table(&[alloc::vec![mask], bytes(proof)])
}

pub fn proof_entry_vec(entries: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let items: Vec<Vec<u8>> = entries
        .iter()
        .map(|(mask, proof)| proof_entry(*mask, proof))
        .collect();
    dynvec(&items)
}

pub fn update_action(items: &[SmtUpdateItem], proof: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(items.len() * SmtUpdateItem::SERIALIZED_SIZE);
    for item in items {
        raw.extend_from_slice(&item.key);
        raw.push(item.packed_values);
    }
    table(&[fixvec(items.len(), &raw), bytes(proof)])
}

/// rc-lock `WitnessArgs.lock` content
pub fn rc_lock_witness_lock(
    signature: &[u8; 65],
    lock_script_hash: Option<&[u8; 32]>,
    proofs: &[(u8, Vec<u8>)],
) -> Vec<u8> {
    let mut out = signature.to_vec();
    if let Some(hash) = lock_script_hash {
        out.extend_from_slice(hash);
        out.extend_from_slice(&proof_entry_vec(proofs));
    }
    out
}

pub fn xudt_witness_input(raw_extension_data: Option<&[u8]>, structure: &[Vec<u8>]) -> Vec<u8> {
    let items: Vec<Vec<u8>> = structure.iter().map(|s| bytes(s)).collect();
    table(&[
        raw_extension_data.map(<[u8]>::to_vec).unwrap_or_default(),
        dynvec(&items),
    ])
}
