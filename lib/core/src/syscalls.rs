// ============ Transaction Snapshot Access ============
// Everything the scripts read comes through this trait. On chain it is
// backed by CKB syscalls; off chain by rce-sdk's MockTransaction.

use alloc::vec::Vec;

use rce_types::{Error, SysError, SCRIPT_SIZE};

pub use rce_types::Source;

use crate::cursor::SliceSource;
use crate::mol::ScriptView;

/// Read-only view of the transaction being validated.
///
/// `load_witness` and `load_cell_data` follow the partial-loading convention
/// of the VM: they copy as many bytes starting at `offset` as fit into `buf`
/// and return the number of bytes available from `offset`, which may be
/// larger than `buf.len()`. An empty `buf` therefore queries the length.
pub trait Transaction {
    fn load_script(&self) -> Result<Vec<u8>, SysError>;

    fn load_script_hash(&self) -> Result<[u8; 32], SysError>;

    fn load_tx_hash(&self) -> Result<[u8; 32], SysError>;

    fn load_witness(
        &self,
        buf: &mut [u8],
        offset: usize,
        index: usize,
        source: Source,
    ) -> Result<usize, SysError>;

    fn load_cell_data(
        &self,
        buf: &mut [u8],
        offset: usize,
        index: usize,
        source: Source,
    ) -> Result<usize, SysError>;

    fn load_cell_lock_hash(&self, index: usize, source: Source) -> Result<[u8; 32], SysError>;

    fn load_cell_type_hash(
        &self,
        index: usize,
        source: Source,
    ) -> Result<Option<[u8; 32]>, SysError>;

    /// Serialized `CellInput` (since + out point)
    fn load_input(&self, index: usize, source: Source) -> Result<Vec<u8>, SysError>;

    fn inputs_len(&self) -> Result<usize, SysError>;
}

// ============ Helpers ============

/// Args of the currently running script
pub fn load_script_args<T: Transaction>(tx: &T) -> Result<Vec<u8>, Error> {
    let script = tx.load_script()?;
    if script.len() > SCRIPT_SIZE {
        return Err(Error::ScriptTooLong);
    }
    let source = SliceSource::new(&script);
    let view = ScriptView::parse(source.cursor()).map_err(|_| Error::Encoding)?;
    view.args().to_vec()
}

/// Lock hashes of every cell in `source`, at most `max` of them
pub fn collect_lock_hashes<T: Transaction>(
    tx: &T,
    source: Source,
    max: usize,
) -> Result<Vec<[u8; 32]>, Error> {
    let mut hashes = Vec::new();
    for index in 0.. {
        match tx.load_cell_lock_hash(index, source) {
            Ok(hash) => {
                if hashes.len() >= max {
                    return Err(Error::TooManyLock);
                }
                hashes.push(hash);
            }
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(hashes)
}

pub fn count_cells<T: Transaction>(tx: &T, source: Source) -> Result<usize, Error> {
    let mut count = 0;
    loop {
        match tx.load_cell_lock_hash(count, source) {
            Ok(_) => count += 1,
            Err(SysError::IndexOutOfBound) => return Ok(count),
            Err(err) => return Err(err.into()),
        }
    }
}
