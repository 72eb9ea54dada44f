// ============ CKB-VM Backend ============
// `Transaction` over the ckb-std syscalls.

use alloc::vec::Vec;

use ckb_std::ckb_constants::Source as CkbSource;
use ckb_std::ckb_types::prelude::*;
use ckb_std::error::SysError as CkbSysError;
use ckb_std::{high_level, syscalls};

use rce_types::{Source, SysError};

use crate::syscalls::Transaction;

fn to_ckb_source(source: Source) -> CkbSource {
    match source {
        Source::Input => CkbSource::Input,
        Source::Output => CkbSource::Output,
        Source::CellDep => CkbSource::CellDep,
        Source::HeaderDep => CkbSource::HeaderDep,
        Source::GroupInput => CkbSource::GroupInput,
        Source::GroupOutput => CkbSource::GroupOutput,
    }
}

fn from_ckb_error(err: CkbSysError) -> SysError {
    match err {
        CkbSysError::IndexOutOfBound => SysError::IndexOutOfBound,
        CkbSysError::ItemMissing => SysError::ItemMissing,
        CkbSysError::LengthNotEnough(n) => SysError::LengthNotEnough(n),
        CkbSysError::Encoding => SysError::Encoding,
        CkbSysError::Unknown(code) => SysError::Unknown(code),
        #[allow(unreachable_patterns)]
        _ => SysError::Unknown(u64::MAX),
    }
}

/// Partial loads report the full remaining length through LengthNotEnough
fn partial(result: Result<usize, CkbSysError>) -> Result<usize, SysError> {
    match result {
        Ok(n) => Ok(n),
        Err(CkbSysError::LengthNotEnough(n)) => Ok(n),
        Err(err) => Err(from_ckb_error(err)),
    }
}

/// The transaction the running script validates
#[derive(Clone, Copy, Debug, Default)]
pub struct CkbTransaction;

impl Transaction for CkbTransaction {
    fn load_script(&self) -> Result<Vec<u8>, SysError> {
        high_level::load_script()
            .map(|script| script.as_slice().to_vec())
            .map_err(from_ckb_error)
    }

    fn load_script_hash(&self) -> Result<[u8; 32], SysError> {
        high_level::load_script_hash().map_err(from_ckb_error)
    }

    fn load_tx_hash(&self) -> Result<[u8; 32], SysError> {
        high_level::load_tx_hash().map_err(from_ckb_error)
    }

    fn load_witness(&self, buf: &mut [u8], offset: usize, index: usize, source: Source) -> Result<usize, SysError> {
        partial(syscalls::load_witness(buf, offset, index, to_ckb_source(source)))
    }

    fn load_cell_data(&self, buf: &mut [u8], offset: usize, index: usize, source: Source) -> Result<usize, SysError> {
        partial(syscalls::load_cell_data(buf, offset, index, to_ckb_source(source)))
    }

    fn load_cell_lock_hash(&self, index: usize, source: Source) -> Result<[u8; 32], SysError> {
        high_level::load_cell_lock_hash(index, to_ckb_source(source)).map_err(from_ckb_error)
    }

    fn load_cell_type_hash(&self, index: usize, source: Source) -> Result<Option<[u8; 32]>, SysError> {
        high_level::load_cell_type_hash(index, to_ckb_source(source)).map_err(from_ckb_error)
    }

    fn load_input(&self, index: usize, source: Source) -> Result<Vec<u8>, SysError> {
        high_level::load_input(index, to_ckb_source(source))
            .map(|input| input.as_slice().to_vec())
            .map_err(from_ckb_error)
    }

    fn inputs_len(&self) -> Result<usize, SysError> {
        let mut count = 0;
        loop {
            let mut buf = [0u8; 0];
            match partial(syscalls::load_input(&mut buf, 0, count, CkbSource::Input)) {
                Ok(_) => count += 1,
                Err(SysError::IndexOutOfBound) => return Ok(count),
                Err(err) => return Err(err),
            }
        }
    }
}
