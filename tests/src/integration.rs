// ============ RCE Integration Tests ============
// Full lifecycles across the three scripts: compliance cells are created and
// updated under rce-validator, then consulted by rc-lock spends and xUDT
// transfers through cell deps.

use rc_lock::verify_rc_lock;
use rce_core::type_id::calculate_type_id;
use rce_core::{resolve, sighash_all, Source, Transaction};
use rce_sdk::{
    builder, rce_extension, script_hash, udt_amount, xudt_args, ComplianceList, DeploymentInfo,
    MockCell, MockTransaction, RceSdk, Signer, RCE_VALIDATOR, RC_LOCK, XUDT_RCE,
};
use rce_types::*;
use rce_validator::verify_rce_validator;
use xudt_rce::{verify_xudt, NoLoader};

// ============ Constants ============

const ADMIN: [u8; 32] = [0xAD; 32];
const MALLORY: [u8; 32] = [0x4D; 32];

// ============ Helper Functions ============

fn sdk() -> RceSdk {
    let mut deployment = DeploymentInfo::new("devnet");
    deployment.add_binary(RC_LOCK, "secp256k1 lock with compliance rules", b"rc-lock");
    deployment.add_binary(RCE_VALIDATOR, "compliance cell type script", b"rce-validator");
    deployment.add_binary(XUDT_RCE, "extensible UDT", b"xudt-rce");
    RceSdk::new(deployment)
}

/// Validator script of a compliance cell created by the first input of
/// `creation`; returns the creation transaction with the script installed
fn install_validator(sdk: &RceSdk, creation: MockTransaction, flags: u8) -> MockTransaction {
    let first_input = creation.load_input(0, Source::Input).unwrap();
    let type_id = calculate_type_id(&first_input, 0);
    creation.with_script(sdk.rce_validator_script(type_id, flags).unwrap())
}

fn update_witness(action: &[u8]) -> Vec<u8> {
    builder::witness_args(None, Some(action), None)
}

/// Create a compliance cell holding `data`, checked by rce-validator
fn create_cell(sdk: &RceSdk, flags: u8, data: Vec<u8>, witness: Vec<u8>) -> (MockTransaction, Vec<u8>) {
    let tx = install_validator(sdk, MockTransaction::new(Vec::new()).input(MockCell::new(ADMIN), false), flags);
    let type_hash = tx.script_hash();
    let tx = tx
        .output(MockCell::new(ADMIN).with_type(type_hash).with_data(data), true)
        .witness(witness);
    let script = tx.load_script().unwrap();
    (tx, script)
}

fn update_cell(script: &[u8], old: Vec<u8>, new: Vec<u8>, witness: Vec<u8>) -> MockTransaction {
    let tx = MockTransaction::new(script.to_vec());
    let type_hash = tx.script_hash();
    tx.input(MockCell::new(ADMIN).with_type(type_hash).with_data(old), true)
        .output(MockCell::new(ADMIN).with_type(type_hash).with_data(new), true)
        .witness(witness)
}

/// Signed rc-lock spend proving the lock's own hash against the rules
fn rc_spend(signer: &Signer, lock_script: Vec<u8>, rule_cells: &[([u8; 32], Vec<u8>)], proofs: &[(u8, Vec<u8>)]) -> MockTransaction {
    let mut tx = MockTransaction::new(lock_script);
    let own = tx.script_hash();
    tx = tx.input(MockCell::new(own), true).output(MockCell::new([0x0F; 32]), false);
    for (type_hash, data) in rule_cells {
        tx = tx.cell_dep(MockCell::new(ADMIN).with_type(*type_hash).with_data(data.clone()));
    }
    let lock = builder::rc_lock_witness_lock(&[0u8; 65], Some(&own), proofs);
    tx = tx.witness(builder::witness_args(Some(&lock), None, None));
    signer.sign(&mut tx).unwrap();
    tx
}

// ============ Lifecycle ============

#[test]
fn test_blacklist_lifecycle() {
    let sdk = sdk();
    let alice = Signer::from_secret(&[0x01; 32]).unwrap();
    let bob = Signer::from_secret(&[0x02; 32]).unwrap();

    // the compliance cell's type hash is the root both locks point at
    let placeholder = install_validator(&sdk, MockTransaction::new(Vec::new()).input(MockCell::new(ADMIN), false), RCE_FLAG_APPEND_ONLY);
    let rc_root = placeholder.script_hash();
    let alice_lock = sdk.rc_lock_script(alice.pubkey_hash(), Some(rc_root)).unwrap();
    let bob_lock = sdk.rc_lock_script(bob.pubkey_hash(), Some(rc_root)).unwrap();
    let alice_hash = script_hash(&alice_lock);
    let bob_hash = script_hash(&bob_lock);

    // create with one entry
    let mut list = ComplianceList::black_list(&[]).unwrap();
    let action = list.update(&[MALLORY], &[]).unwrap();
    let v1 = builder::rc_data_rule(&list.rule());
    let (creation, validator) = create_cell(&sdk, RCE_FLAG_APPEND_ONLY, v1.clone(), update_witness(&action));
    assert_eq!(creation.script_hash(), rc_root);
    assert_eq!(verify_rce_validator(&creation), Ok(()));

    // both spend freely under v1
    let proofs = vec![list.proof_entry(&[alice_hash]).unwrap()];
    let tx = rc_spend(&alice, alice_lock.clone(), &[(rc_root, v1.clone())], &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Ok(()));

    // append alice
    let action = list.update(&[alice_hash], &[]).unwrap();
    let v2 = builder::rc_data_rule(&list.rule());
    let update = update_cell(&validator, v1, v2.clone(), update_witness(&action));
    assert_eq!(verify_rce_validator(&update), Ok(()));

    // under v2 alice is denied and bob is not
    let proofs = vec![list.proof_entry(&[alice_hash]).unwrap()];
    let tx = rc_spend(&alice, alice_lock, &[(rc_root, v2.clone())], &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Err(Error::OnBlackList));

    let proofs = vec![list.proof_entry(&[bob_hash]).unwrap()];
    let tx = rc_spend(&bob, bob_lock, &[(rc_root, v2)], &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Ok(()));
}

#[test]
fn test_whitelist_removal_lifecycle() {
    let sdk = sdk();
    let carol = Signer::from_secret(&[0x03; 32]).unwrap();
    let placeholder = install_validator(&sdk, MockTransaction::new(Vec::new()).input(MockCell::new(ADMIN), false), 0);
    let rc_root = placeholder.script_hash();
    let carol_lock = sdk.rc_lock_script(carol.pubkey_hash(), Some(rc_root)).unwrap();
    let carol_hash = script_hash(&carol_lock);

    let mut list = ComplianceList::white_list(&[]).unwrap();
    let action = list.update(&[carol_hash, MALLORY], &[]).unwrap();
    let v1 = builder::rc_data_rule(&list.rule());
    let (creation, validator) = create_cell(&sdk, 0, v1.clone(), update_witness(&action));
    assert_eq!(verify_rce_validator(&creation), Ok(()));

    let proofs = vec![list.proof_entry(&[carol_hash]).unwrap()];
    let tx = rc_spend(&carol, carol_lock.clone(), &[(rc_root, v1.clone())], &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Ok(()));

    // removal is allowed without the append-only flag
    let action = list.update(&[], &[carol_hash]).unwrap();
    let v2 = builder::rc_data_rule(&list.rule());
    assert_eq!(verify_rce_validator(&update_cell(&validator, v1, v2.clone(), update_witness(&action))), Ok(()));

    let proofs = vec![list.proof_entry(&[carol_hash]).unwrap()];
    let tx = rc_spend(&carol, carol_lock, &[(rc_root, v2)], &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Err(Error::NotOnWhiteList));
}

// ============ Rule Trees ============

#[test]
fn test_cell_vec_resolves_in_child_order() {
    let children: Vec<[u8; 32]> = (1..=5u8).map(|n| [n; 32]).collect();
    let mut tx = MockTransaction::new(Vec::new())
        .cell_dep(MockCell::new(ADMIN).with_type([0xCE; 32]).with_data(builder::rc_data_cell_vec(&children)));
    // deps deliberately listed in reverse
    for child in children.iter().rev() {
        let rule = Rule { smt_root: *child, flags: RuleFlags::black_list() };
        tx = tx.cell_dep(MockCell::new(ADMIN).with_type(*child).with_data(builder::rc_data_rule(&rule)));
    }
    let set = resolve(&tx, &[0xCE; 32], Limits::default()).unwrap();
    let roots: Vec<[u8; 32]> = set.rules().iter().map(|r| r.smt_root).collect();
    assert_eq!(roots, children);
}

#[test]
fn test_rc_lock_under_two_rule_tree() {
    let sdk = sdk();
    let dave = Signer::from_secret(&[0x04; 32]).unwrap();
    let root = [0xCE; 32];
    let dave_lock = sdk.rc_lock_script(dave.pubkey_hash(), Some(root)).unwrap();
    let dave_hash = script_hash(&dave_lock);

    let kyc = ComplianceList::white_list(&[dave_hash]).unwrap();
    let sanctions = ComplianceList::black_list(&[MALLORY]).unwrap();
    let cells = vec![
        (root, builder::rc_data_cell_vec(&[[0x01; 32], [0x02; 32]])),
        ([0x01; 32], builder::rc_data_rule(&kyc.rule())),
        ([0x02; 32], builder::rc_data_rule(&sanctions.rule())),
    ];
    let proofs = vec![
        kyc.proof_entry(&[dave_hash]).unwrap(),
        sanctions.proof_entry(&[dave_hash]).unwrap(),
    ];
    let tx = rc_spend(&dave, dave_lock.clone(), &cells, &proofs);
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Ok(()));

    // proofs in the wrong order no longer match their rules
    let swapped = vec![proofs[1].clone(), proofs[0].clone()];
    let tx = rc_spend(&dave, dave_lock, &cells, &swapped);
    assert!(verify_rc_lock(&tx, Limits::default()).is_err());
}

// ============ xUDT ============

#[test]
fn test_xudt_transfer_under_compliance() {
    let sdk = sdk();
    let alice = [0xA1; 32];
    let bob = [0xB0; 32];
    let root = [0xCE; 32];
    let list = ComplianceList::black_list(&[MALLORY]).unwrap();

    let build = |receiver: [u8; 32], proofs: &[(u8, Vec<u8>)]| {
        let tx = MockTransaction::new(sdk.xudt_script(&ADMIN, &[rce_extension(&root)]).unwrap());
        let type_hash = tx.script_hash();
        let structure = vec![builder::proof_entry_vec(proofs)];
        tx.input(MockCell::new(alice).with_type(type_hash).with_data(udt_amount(500)), true)
            .output(MockCell::new(receiver).with_type(type_hash).with_data(udt_amount(300)), true)
            .output(MockCell::new(alice).with_type(type_hash).with_data(udt_amount(200)), true)
            .cell_dep(MockCell::new(ADMIN).with_type(root).with_data(builder::rc_data_rule(&list.rule())))
            .witness(builder::witness_args(None, Some(&builder::xudt_witness_input(None, &structure)), None))
    };

    let proofs = vec![(PROOF_MASK_BOTH, list.proof(&[alice, bob]).unwrap())];
    assert_eq!(verify_xudt(&build(bob, &proofs), &NoLoader, Limits::default()), Ok(()));

    let proofs = vec![(PROOF_MASK_BOTH, list.proof(&[alice, MALLORY]).unwrap())];
    assert_eq!(
        verify_xudt(&build(MALLORY, &proofs), &NoLoader, Limits::default()),
        Err(Error::OnBlackList)
    );
}

#[test]
fn test_xudt_extensions_in_witness() {
    let root = [0xCE; 32];
    let list = ComplianceList::black_list(&[]).unwrap();
    let extensions = vec![rce_extension(&root)];
    let raw = builder::script_vec(&extensions);

    let tx = MockTransaction::new(builder::script(&[0xE0; 32], HASH_TYPE_TYPE, &xudt_args(&ADMIN, XudtFlags::InWitness, &extensions)));
    let type_hash = tx.script_hash();
    let lock = [0xA1; 32];
    let structure = vec![builder::proof_entry_vec(&[(PROOF_MASK_BOTH, list.proof(&[lock]).unwrap())])];
    let tx = tx
        .input(MockCell::new(lock).with_type(type_hash).with_data(udt_amount(1)), true)
        .output(MockCell::new(lock).with_type(type_hash).with_data(udt_amount(1)), true)
        .cell_dep(MockCell::new(ADMIN).with_type(root).with_data(builder::rc_data_rule(&list.rule())))
        .witness(builder::witness_args(None, Some(&builder::xudt_witness_input(Some(&raw), &structure)), None));
    assert_eq!(verify_xudt(&tx, &NoLoader, Limits::default()), Ok(()));
}

// ============ Signing ============

#[test]
fn test_signature_covers_extra_witnesses() {
    let sdk = sdk();
    let erin = Signer::from_secret(&[0x05; 32]).unwrap();
    let lock_script = sdk.rc_lock_script(erin.pubkey_hash(), None).unwrap();
    let mut tx = MockTransaction::new(lock_script);
    let own = tx.script_hash();
    tx = tx
        .input(MockCell::new(own), true)
        .input(MockCell::new(own), true)
        .witness(builder::witness_args(Some(&[0u8; 65]), None, None))
        .witness(vec![0x42; 3 * MAX_WITNESS_SIZE + 11])
        .witness(vec![0x24; 100]);
    erin.sign(&mut tx).unwrap();
    assert_eq!(verify_rc_lock(&tx, Limits::default()), Ok(()));
    let signed_message = sighash_all(&tx).unwrap().message;

    // change the last byte of the large group witness
    let mut tampered = tx.clone();
    let big = tampered.witness_mut(1).unwrap();
    let last = big.len() - 1;
    big[last] ^= 0xFF;
    assert_ne!(sighash_all(&tampered).unwrap().message, signed_message);
    assert_eq!(verify_rc_lock(&tampered, Limits::default()), Err(Error::PubkeyBlake160Hash));

    // and a witness with no input
    let mut tampered = tx;
    tampered.witness_mut(2).unwrap()[0] = 0;
    assert_eq!(verify_rc_lock(&tampered, Limits::default()), Err(Error::PubkeyBlake160Hash));
}

#[test]
fn test_deployment_drives_script_builders() {
    let sdk = sdk();
    let json = sdk.deployment.to_json().unwrap();
    let reloaded = RceSdk::new(DeploymentInfo::from_json(&json).unwrap());
    assert_eq!(
        reloaded.rc_lock_script([1; 20], None).unwrap(),
        sdk.rc_lock_script([1; 20], None).unwrap()
    );
    let script = reloaded.rce_validator_script([2; 32], RCE_FLAG_FREEZE_TYPE).unwrap();
    let expected = builder::script(
        &blake2b_256(b"rce-validator"),
        HASH_TYPE_DATA1,
        &RceValidatorArgs { type_id: [2; 32], flags: RCE_FLAG_FREEZE_TYPE }.serialize(),
    );
    assert_eq!(script, expected);
}
