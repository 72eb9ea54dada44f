// In-crate transaction double for unit tests. The full-featured mock lives
// in rce-sdk.

use core::cell::RefCell;

use rce_types::{Source, SysError};

use crate::syscalls::Transaction;

#[derive(Default)]
pub struct TestTx {
    pub script: Vec<u8>,
    pub script_hash: [u8; 32],
    pub tx_hash: [u8; 32],
    /// All witnesses, indexed like `Source::Input`
    pub witnesses: RefCell<Vec<Vec<u8>>>,
    /// Input indices belonging to the running script group
    pub group_inputs: Vec<usize>,
    pub group_outputs: Vec<usize>,
    pub inputs: Vec<Vec<u8>>,
    pub input_locks: Vec<[u8; 32]>,
    pub output_types: Vec<Option<[u8; 32]>>,
    pub cell_deps: Vec<(Option<[u8; 32]>, Vec<u8>)>,
}

impl TestTx {
    /// Every witness belongs to the group, one input per witness
    pub fn with_group_witnesses(witnesses: Vec<Vec<u8>>) -> Self {
        let count = witnesses.len();
        Self {
            witnesses: RefCell::new(witnesses),
            group_inputs: (0..count).collect(),
            inputs: (0..count).map(|i| vec![i as u8; 44]).collect(),
            input_locks: (0..count).map(|i| [i as u8; 32]).collect(),
            ..Default::default()
        }
    }

    pub fn add_cell_dep(&mut self, type_hash: Option<[u8; 32]>, data: Vec<u8>) {
        self.cell_deps.push((type_hash, data));
    }

    pub fn truncate_witness(&self, index: usize, len: usize) {
        if let Some(w) = self.witnesses.borrow_mut().get_mut(index) {
            w.truncate(len);
        }
    }

    fn witness_index(&self, index: usize, source: Source) -> Result<usize, SysError> {
        match source {
            Source::Input | Source::Output => Ok(index),
            Source::GroupInput => self.group_inputs.get(index).copied().ok_or(SysError::IndexOutOfBound),
            Source::GroupOutput => self.group_outputs.get(index).copied().ok_or(SysError::IndexOutOfBound),
            _ => Err(SysError::IndexOutOfBound),
        }
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

impl Transaction for TestTx {
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
        let index = self.witness_index(index, source)?;
        let witnesses = self.witnesses.borrow();
        let witness = witnesses.get(index).ok_or(SysError::IndexOutOfBound)?;
        Ok(partial_copy(witness, buf, offset))
    }

    fn load_cell_data(&self, buf: &mut [u8], offset: usize, index: usize, source: Source) -> Result<usize, SysError> {
        match source {
            Source::CellDep => {
                let (_, data) = self.cell_deps.get(index).ok_or(SysError::IndexOutOfBound)?;
                Ok(partial_copy(data, buf, offset))
            }
            _ => Err(SysError::IndexOutOfBound),
        }
    }

    fn load_cell_lock_hash(&self, index: usize, source: Source) -> Result<[u8; 32], SysError> {
        match source {
            Source::Input => self.input_locks.get(index).copied().ok_or(SysError::IndexOutOfBound),
            Source::GroupInput => {
                let i = self.witness_index(index, source)?;
                self.input_locks.get(i).copied().ok_or(SysError::IndexOutOfBound)
            }
            Source::Output => {
                if index < self.output_types.len() {
                    Ok([0u8; 32])
                } else {
                    Err(SysError::IndexOutOfBound)
                }
            }
            Source::GroupOutput => self.witness_index(index, source).map(|_| [0u8; 32]),
            _ => Err(SysError::IndexOutOfBound),
        }
    }

    fn load_cell_type_hash(&self, index: usize, source: Source) -> Result<Option<[u8; 32]>, SysError> {
        match source {
            Source::CellDep => self.cell_deps.get(index).map(|(h, _)| *h).ok_or(SysError::IndexOutOfBound),
            Source::Output => self.output_types.get(index).copied().ok_or(SysError::IndexOutOfBound),
            _ => Err(SysError::IndexOutOfBound),
        }
    }

    fn load_input(&self, index: usize, source: Source) -> Result<Vec<u8>, SysError> {
        match source {
            Source::Input => self.inputs.get(index).cloned().ok_or(SysError::IndexOutOfBound),
            _ => Err(SysError::IndexOutOfBound),
        }
    }

    fn inputs_len(&self) -> Result<usize, SysError> {
        Ok(self.inputs.len())
    }
}
