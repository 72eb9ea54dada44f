// ============ xUDT with Compliance Extension: CKB-VM Entry Point ============
// Type script for extensible UDT cells. Built-in compliance extension;
// other extensions are spawned from cell deps.

#![cfg_attr(feature = "ckb", no_std)]
#![cfg_attr(feature = "ckb", no_main)]

#[cfg(feature = "ckb")]
ckb_std::default_alloc!();

#[cfg(feature = "ckb")]
ckb_std::entry!(program);

// ============ CKB-VM Entry Point ============

#[cfg(feature = "ckb")]
fn program() -> i8 {
    use rce_core::ckb::CkbTransaction;
    use rce_types::Limits;
    use xudt_rce::spawn::SpawnLoader;
    use xudt_rce::verify_xudt;

    match verify_xudt(&CkbTransaction, &SpawnLoader, Limits::default()) {
        Ok(()) => 0,
        Err(err) => {
            ckb_std::debug!("xudt-rce rejected: {:?}", err);
            err.code()
        }
    }
}

// ============ Native Entry Point ============

#[cfg(not(feature = "ckb"))]
fn main() {
    println!("xUDT RCE Type Script: compile with --features ckb for CKB-VM");
}

// ============ Tests ============
