// ============ RCE Fuzz / Property-Based Tests ============
// Manual property-based testing using a deterministic PRNG.
// Reproducible from the seed alone.
//
// Each test generates random rule trees, lists, witnesses or amounts and
// compares the scripts against a straightforward model.

use rce_core::{
    builder, generate_sighash_all, resolve, sighash_all, Evaluator, ProofEntry, RuleSet, SmtVerifier,
    Subject,
};
use rce_sdk::{udt_amount, ComplianceList, MockCell, MockTransaction};
use rce_types::*;
use xudt_rce::{verify_xudt, NoLoader};

// ============ Deterministic PRNG ============

struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_u128(&mut self) -> u128 {
        let hi = self.next_u64() as u128;
        let lo = self.next_u64() as u128;
        (hi << 64) | lo
    }

    fn range_usize(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        min + (self.next_u64() % (max - min) as u64) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }

    fn next_bytes_32(&mut self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        for chunk in buf.chunks_exact_mut(8) {
            chunk.copy_from_slice(&self.next_u64().to_le_bytes());
        }
        buf
    }

    fn bytes(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.next_u64() as u8).collect()
    }
}

// ============ Rule Evaluation ============

#[test]
fn fuzz_rule_evaluation_matches_model() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0001);
    let pool: Vec<[u8; 32]> = (0..12).map(|_| rng.next_bytes_32()).collect();

    for i in 0..60 {
        let rule_count = rng.range_usize(1, 4);
        let subject_key = pool[rng.range_usize(0, pool.len())];

        let mut lists = Vec::new();
        for _ in 0..rule_count {
            let members: Vec<[u8; 32]> = pool.iter().copied().filter(|_| rng.chance(40)).collect();
            let list = if rng.chance(50) {
                ComplianceList::white_list(&members).unwrap()
            } else {
                ComplianceList::black_list(&members).unwrap()
            };
            lists.push((list, members.contains(&subject_key)));
        }

        let mut rules = RuleSet::new(MAX_RULES);
        let mut proofs = Vec::new();
        for (list, _) in &lists {
            rules.push(list.rule()).unwrap();
            let (mask, proof) = list.proof_entry(&[subject_key]).unwrap();
            proofs.push(ProofEntry { mask, proof });
        }

        let blacklisted = lists.iter().any(|(list, member)| !list.rule().flags.is_whitelist() && *member);
        let outside_whitelist = lists.iter().any(|(list, member)| list.rule().flags.is_whitelist() && !*member);
        let expected = if blacklisted {
            Err(Error::OnBlackList)
        } else if outside_whitelist {
            Err(Error::NotOnWhiteList)
        } else {
            Ok(())
        };

        let result = Evaluator::new(SmtVerifier)
            .evaluate(&Subject::single(subject_key), &rules, proofs.as_slice())
            .map(|_| ());
        assert_eq!(result, expected, "iteration {}: {} rules", i, rule_count);
    }
}

#[test]
fn fuzz_stale_proofs_never_pass_changed_blacklist() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0002);

    for i in 0..40 {
        let clean: Vec<[u8; 32]> = (0..rng.range_usize(0, 6)).map(|_| rng.next_bytes_32()).collect();
        let subject_key = rng.next_bytes_32();
        let mut list = ComplianceList::black_list(&clean).unwrap();
        let (mask, stale) = list.proof_entry(&[subject_key]).unwrap();

        list.update(&[subject_key], &[]).unwrap();
        let mut rules = RuleSet::new(MAX_RULES);
        rules.push(list.rule()).unwrap();
        let proofs = vec![ProofEntry { mask, proof: stale }];
        let result = Evaluator::new(SmtVerifier).evaluate(&Subject::single(subject_key), &rules, proofs.as_slice());
        assert_eq!(result.map(|_| ()), Err(Error::OnBlackList), "iteration {}", i);
    }
}

// ============ Rule Tree Resolution ============

/// Random tree of compliance cells; returns the rules in depth-first order
fn grow(
    rng: &mut TestRng,
    hash: [u8; 32],
    depth: usize,
    next_id: &mut u64,
    tx: MockTransaction,
    rules: &mut Vec<Rule>,
) -> MockTransaction {
    let leaf = depth >= 3 || rng.chance(45);
    if leaf {
        let mut smt_root = [0u8; 32];
        smt_root[..8].copy_from_slice(&next_id.to_le_bytes());
        *next_id += 1;
        let rule = Rule { smt_root, flags: RuleFlags(rng.next_u64() as u8 & RuleFlags::WHITE_LIST) };
        rules.push(rule);
        return tx.cell_dep(MockCell::new([0; 32]).with_type(hash).with_data(builder::rc_data_rule(&rule)));
    }

    let children: Vec<[u8; 32]> = (0..rng.range_usize(0, 4)).map(|_| rng.next_bytes_32()).collect();
    let mut tx = tx.cell_dep(MockCell::new([0; 32]).with_type(hash).with_data(builder::rc_data_cell_vec(&children)));
    for child in children {
        tx = grow(rng, child, depth + 1, next_id, tx, rules);
    }
    tx
}

#[test]
fn fuzz_resolve_is_depth_first() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0003);

    for i in 0..100 {
        let root = rng.next_bytes_32();
        let mut expected = Vec::new();
        let mut next_id = 0;
        let tx = grow(&mut rng, root, 0, &mut next_id, MockTransaction::new(Vec::new()), &mut expected);

        let resolved = resolve(&tx, &root, Limits::default()).unwrap();
        assert_eq!(resolved.rules(), expected.as_slice(), "iteration {}", i);

        let limits = Limits { max_rules: expected.len().saturating_sub(1), ..Limits::default() };
        if !expected.is_empty() {
            assert_eq!(resolve(&tx, &root, limits).unwrap_err(), Error::TooManyRcRules, "iteration {}", i);
        }
    }
}

// ============ Sighash ============

#[test]
fn fuzz_sighash_independent_of_chunk_size() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0004);

    for i in 0..30 {
        let group_size = rng.range_usize(1, 3);
        let mut tx = MockTransaction::new(vec![0x01]).with_tx_hash(rng.next_bytes_32());
        for _ in 0..group_size {
            tx = tx.input(MockCell::new([0x01; 32]), true);
        }
        tx = tx.input(MockCell::new([0x02; 32]), false);

        let signature = rng.bytes(SIGNATURE_SIZE);
        let first_len = rng.range_usize(0, 3000);
        let first_extra = rng.bytes(first_len);
        tx = tx.witness(builder::witness_args(Some(&signature), Some(&first_extra), None));
        for _ in 1..group_size + 1 + rng.range_usize(0, 3) {
            let len = rng.range_usize(0, 3000);
            tx = tx.witness(rng.bytes(len));
        }

        let reference = sighash_all(&tx).unwrap();
        assert_eq!(reference.signature.to_vec(), signature);

        let mut chunk = vec![0u8; rng.range_usize(96, 2048)];
        let chunked = generate_sighash_all(&tx, &mut chunk).unwrap();
        assert_eq!(chunked, reference, "iteration {}: chunk {}", i, chunk.len());
    }
}

// ============ Update Nibbles ============

#[test]
fn fuzz_existence_nibbles() {
    for packed in 0..=u8::MAX {
        let high = packed >> 4;
        let low = packed & 0x0F;
        match unpack_existence(packed) {
            Ok((old_exists, new_exists)) => {
                assert!(high <= 1 && low <= 1, "packed {:#04x}", packed);
                assert_eq!(pack_existence(old_exists, new_exists), packed);
            }
            Err(err) => {
                assert!(high > 1 || low > 1, "packed {:#04x}", packed);
                assert_eq!(err, Error::InvalidMolFormat);
            }
        }
    }
}

// ============ xUDT Amounts ============

fn random_amount(rng: &mut TestRng) -> u128 {
    match rng.next_u64() % 4 {
        0 => rng.next_u128(),
        1 => u128::MAX - (rng.next_u64() as u128 % 4),
        _ => rng.next_u64() as u128 % 1_000_000,
    }
}

fn model_sum(amounts: &[u128]) -> Option<u128> {
    amounts.iter().try_fold(0u128, |acc, amount| acc.checked_add(*amount))
}

#[test]
fn fuzz_xudt_conservation() {
    let mut rng = TestRng::new(0xDEAD_BEEF_CAFE_0005);
    let owner = [0xAD; 32];

    for i in 0..300 {
        let inputs: Vec<u128> = (0..rng.range_usize(0, 4)).map(|_| random_amount(&mut rng)).collect();
        let outputs: Vec<u128> = (0..rng.range_usize(0, 4)).map(|_| random_amount(&mut rng)).collect();
        let owner_mode = rng.chance(15);

        let mut tx = MockTransaction::new(builder::script(&[0xE0; 32], HASH_TYPE_TYPE, &owner));
        let type_hash = tx.script_hash();
        if owner_mode {
            tx = tx.input(MockCell::new(owner), false);
        }
        for amount in &inputs {
            tx = tx.input(MockCell::new([0xA1; 32]).with_type(type_hash).with_data(udt_amount(*amount)), true);
        }
        for amount in &outputs {
            tx = tx.output(MockCell::new([0xB2; 32]).with_type(type_hash).with_data(udt_amount(*amount)), true);
        }

        let expected = if owner_mode {
            Ok(())
        } else {
            match (model_sum(&inputs), model_sum(&outputs)) {
                (None, _) | (_, None) => Err(Error::Overflowing),
                (Some(total_in), Some(total_out)) if total_in < total_out => Err(Error::Amount),
                _ => Ok(()),
            }
        };
        assert_eq!(
            verify_xudt(&tx, &NoLoader, Limits::default()),
            expected,
            "iteration {}: in {:?} out {:?}",
            i,
            inputs,
            outputs
        );
    }
}
