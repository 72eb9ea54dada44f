// ============ RCE Validator Type Script: CKB-VM Entry Point ============
// Type script for compliance cells: Type-ID uniqueness, freeze/append-only
// policy and proven incremental rule updates.

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
    use rce_validator::verify_rce_validator;

    match verify_rce_validator(&CkbTransaction) {
        Ok(()) => 0,
        Err(err) => {
            ckb_std::debug!("rce-validator rejected: {:?}", err);
            err.code()
        }
    }
}

// ============ Native Entry Point ============

#[cfg(not(feature = "ckb"))]
fn main() {
    println!("RCE Validator Type Script: compile with --features ckb for CKB-VM");
}

// ============ Tests ============
