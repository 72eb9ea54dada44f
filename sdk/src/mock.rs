// ============ Mock Transaction ============
// In-memory transaction snapshot implementing `rce_core::Transaction`, so
// every script can be driven end to end on the host.
//
// Group sources follow the VM: the N-th group input is the N-th input whose
// lock or type equals the running script, and its witness is the witness at
// that input's position. Same for outputs.

use rce_core::builder;
use rce_core::{Source, Transaction};
use rce_types::{blake2b_256, SysError};

// ============ Cells ============

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockCell {
    pub lock_hash: [u8; 32],
    pub type_hash: Option<[u8; 32]>,
    pub data: Vec<u8>,
}

impl MockCell {
    pub fn new(lock_hash: [u8; 32]) -> Self {
        Self {
            lock_hash,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_hash: [u8; 32]) -> Self {
        self.type_hash = Some(type_hash);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

#[derive(Clone, Debug)]
struct MockInput {
    cell: MockCell,
    cell_input: Vec<u8>,
    in_group: bool,
}

#[derive(Clone, Debug)]
struct MockOutput {
    cell: MockCell,
    in_group: bool,
}

// ============ Transaction ============

#[derive(Clone, Debug)]
pub struct MockTransaction {
    script: Vec<u8>,
    script_hash: [u8; 32],
    tx_hash: [u8; 32],
    inputs: Vec<MockInput>,
    outputs: Vec<MockOutput>,
    cell_deps: Vec<MockCell>,
    witnesses: Vec<Vec<u8>>,
}

impl MockTransaction {
    /// Transaction validated by the serialized `script`
    pub fn new(script: Vec<u8>) -> Self {
        let script_hash = blake2b_256(&script);
        Self {
            script,
            script_hash,
            tx_hash: [0x11; 32],
            inputs: Vec::new(),
            outputs: Vec::new(),
            cell_deps: Vec::new(),
            witnesses: Vec::new(),
        }
    }

    pub fn script_hash(&self) -> [u8; 32] {
        self.script_hash
    }

    /// Swap the running script, e.g. once a Type ID is known
    pub fn with_script(mut self, script: Vec<u8>) -> Self {
        self.script_hash = blake2b_256(&script);
        self.script = script;
        self
    }

    pub fn with_tx_hash(mut self, tx_hash: [u8; 32]) -> Self {
        self.tx_hash = tx_hash;
        self
    }

    /// Append an input; `in_group` marks it as guarded by the running script
    pub fn input(mut self, cell: MockCell, in_group: bool) -> Self {
        let index = self.inputs.len();
        let previous_tx = blake2b_256(&(index as u64).to_le_bytes());
        self.inputs.push(MockInput {
            cell,
            cell_input: builder::cell_input(0, &previous_tx, index as u32),
            in_group,
        });
        self
    }

    pub fn output(mut self, cell: MockCell, in_group: bool) -> Self {
        self.outputs.push(MockOutput { cell, in_group });
        self
    }

    pub fn cell_dep(mut self, cell: MockCell) -> Self {
        self.cell_deps.push(cell);
        self
    }

    pub fn witness(mut self, witness: Vec<u8>) -> Self {
        self.witnesses.push(witness);
        self
    }

    pub fn set_witness(&mut self, index: usize, witness: Vec<u8>) {
        if index >= self.witnesses.len() {
            self.witnesses.resize(index + 1, Vec::new());
        }
        self.witnesses[index] = witness;
    }

    pub fn witness_at(&self, index: usize) -> Option<&[u8]> {
        self.witnesses.get(index).map(Vec::as_slice)
    }

    pub fn witness_mut(&mut self, index: usize) -> Option<&mut Vec<u8>> {
        self.witnesses.get_mut(index)
    }

    /// Transaction-level index of the `index`-th group member in `source`
    pub fn group_position(&self, index: usize, source: Source) -> Option<usize> {
        match source {
            Source::GroupInput => self
                .inputs
                .iter()
                .enumerate()
                .filter(|(_, input)| input.in_group)
                .nth(index)
                .map(|(i, _)| i),
            Source::GroupOutput => self
                .outputs
                .iter()
                .enumerate()
                .filter(|(_, output)| output.in_group)
                .nth(index)
                .map(|(i, _)| i),
            _ => Some(index),
        }
    }

    fn cell(&self, index: usize, source: Source) -> Result<&MockCell, SysError> {
        let position = self.group_position(index, source).ok_or(SysError::IndexOutOfBound)?;
        let cell = match source {
            Source::Input | Source::GroupInput => self.inputs.get(position).map(|i| &i.cell),
            Source::Output | Source::GroupOutput => self.outputs.get(position).map(|o| &o.cell),
            Source::CellDep => self.cell_deps.get(position),
            Source::HeaderDep => None,
        };
        cell.ok_or(SysError::IndexOutOfBound)
    }
}

fn partial_copy(data: &[u8], buf: &mut [u8], offset: usize) -> usize {
    if offset >= data.len() {
        return 0;
    }
    let available = data.len() - offset;
    let n = available.min(buf.len());
    buf[..n].copy_from_slice(&data[offset..offset + n]);
    available
}

impl Transaction for MockTransaction {
    fn load_script(&self) -> Result<Vec<u8>, SysError> {
        Ok(self.script.clone())
    }

    fn load_script_hash(&self) -> Result<[u8; 32], SysError> {
        Ok(self.script_hash)
    }

    fn load_tx_hash(&self) -> Result<[u8; 32], SysError> {
        Ok(self.tx_hash)
    }

    fn load_witness(&self, buf: &mut [u8], offset: usize, index: usize, source: Source) -> Result<usize, SysError> {
        if matches!(source, Source::CellDep | Source::HeaderDep) {
            return Err(SysError::IndexOutOfBound);
        }
        let position = self.group_position(index, source).ok_or(SysError::IndexOutOfBound)?;
        let witness = self.witnesses.get(position).ok_or(SysError::IndexOutOfBound)?;
        Ok(partial_copy(witness, buf, offset))
    }

    fn load_cell_data(&self, buf: &mut [u8], offset: usize, index: usize, source: Source) -> Result<usize, SysError> {
        let cell = self.cell(index, source)?;
        Ok(partial_copy(&cell.data, buf, offset))
    }

    fn load_cell_lock_hash(&self, index: usize, source: Source) -> Result<[u8; 32], SysError> {
        self.cell(index, source).map(|cell| cell.lock_hash)
    }

    fn load_cell_type_hash(&self, index: usize, source: Source) -> Result<Option<[u8; 32]>, SysError> {
        self.cell(index, source).map(|cell| cell.type_hash)
    }

    fn load_input(&self, index: usize, source: Source) -> Result<Vec<u8>, SysError> {
        if !matches!(source, Source::Input | Source::GroupInput) {
            return Err(SysError::IndexOutOfBound);
        }
        let position = self.group_position(index, source).ok_or(SysError::IndexOutOfBound)?;
        self.inputs
            .get(position)
            .map(|input| input.cell_input.clone())
            .ok_or(SysError::IndexOutOfBound)
    }

    fn inputs_len(&self) -> Result<usize, SysError> {
        Ok(self.inputs.len())
    }
}

// ============ Tests ============
