// ============ RC Lock Script: CKB-VM Entry Point ============
// secp256k1/blake160 lock; with a compliance root in its args the signer's
// identity must also pass every rule the root resolves to.

#![cfg_attr(feature = "ckb", no_std)]
#![cfg_attr(feature = "ckb", no_main)]

#[cfg(feature = "ckb")]
ckb_std::default_alloc!();

#[cfg(feature = "ckb")]
ckb_std::entry!(program);

// ============ CKB-VM Entry Point ============

#[cfg(feature = "ckb")]
fn program() -> i8 {
    use rc_lock::verify_rc_lock;
    use rce_core::ckb::CkbTransaction;
    use rce_types::Limits;

    match verify_rc_lock(&CkbTransaction, Limits::default()) {
        Ok(()) => 0,
        Err(err) => {
            ckb_std::debug!("rc-lock rejected: {:?}", err);
            err.code()
        }
    }
}

// ============ Native Entry Point ============

#[cfg(not(feature = "ckb"))]
fn main() {
    println!("RC Lock Script: compile with --features ckb for CKB-VM");
}

// ============ Tests ============
