// ============ Spawned Extensions ============
// Runs an external extension as a child process from a cell dep. The child
// receives `extension_argv` and reports through its exit code.

use alloc::boxed::Box;
use alloc::ffi::CString;
use alloc::vec::Vec;
use core::ffi::CStr;

use ckb_std::ckb_types::core::ScriptHashType;
use ckb_std::{high_level, syscalls};
use rce_core::ckb::CkbTransaction;
use rce_types::{Error, HASH_TYPE_DATA, HASH_TYPE_DATA1, HASH_TYPE_DATA2, HASH_TYPE_TYPE};

use crate::extension::{extension_argv, Extension, ExtensionLoader};

fn script_hash_type(hash_type: u8) -> Result<ScriptHashType, Error> {
    match hash_type {
        HASH_TYPE_DATA => Ok(ScriptHashType::Data),
        HASH_TYPE_TYPE => Ok(ScriptHashType::Type),
        HASH_TYPE_DATA1 => Ok(ScriptHashType::Data1),
        HASH_TYPE_DATA2 => Ok(ScriptHashType::Data2),
        _ => Err(Error::CantLoadLib),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SpawnLoader;

impl ExtensionLoader<CkbTransaction> for SpawnLoader {
    fn load(&self, code_hash: &[u8; 32], hash_type: u8) -> Result<Box<dyn Extension<CkbTransaction> + '_>, Error> {
        let hash_type = script_hash_type(hash_type)?;
        high_level::look_for_dep_with_hash2(code_hash, hash_type).map_err(|_| Error::CantLoadLib)?;
        Ok(Box::new(SpawnedExtension {
            code_hash: *code_hash,
            hash_type,
        }))
    }
}

struct SpawnedExtension {
    code_hash: [u8; 32],
    hash_type: ScriptHashType,
}

impl Extension<CkbTransaction> for SpawnedExtension {
    fn validate(&self, _tx: &CkbTransaction, owner_mode: bool, index: usize, args: &[u8]) -> Result<(), Error> {
        let argv_owned = extension_argv(owner_mode, index, args)?;
        let argv: Vec<&CStr> = argv_owned.iter().map(CString::as_c_str).collect();

        let pid = high_level::spawn_cell(&self.code_hash, self.hash_type, &argv, &[])
            .map_err(|_| Error::CantLoadLib)?;
        match syscalls::wait(pid).map_err(|_| Error::CantLoadLib)? {
            0 => Ok(()),
            code => Err(Error::Extension(code)),
        }
    }
}
