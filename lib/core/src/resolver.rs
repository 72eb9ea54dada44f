// ============ Rule Tree Resolution ============
// Expands a root hash into the flat, ordered list of rules it commits to.
// A hash names the cell dep whose type script hash equals it; that cell
// holds either one rule or a list of child hashes resolved left to right.

use alloc::vec::Vec;

use rce_types::{Error, Limits, Rule, SysError};

use crate::cursor::TxDataSource;
use crate::mol::RcData;
use crate::syscalls::{Source, Transaction};

// ============ Rule Set ============

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    has_whitelist: bool,
    max_rules: usize,
}

impl RuleSet {
    pub fn new(max_rules: usize) -> Self {
        Self {
            rules: Vec::new(),
            has_whitelist: false,
            max_rules,
        }
    }

    pub fn push(&mut self, rule: Rule) -> Result<(), Error> {
        if self.rules.len() >= self.max_rules {
            return Err(Error::TooManyRcRules);
        }
        self.has_whitelist |= rule.flags.is_whitelist();
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_whitelist(&self) -> bool {
        self.has_whitelist
    }
}

// ============ Cell Lookup ============

/// Index of the cell dep whose type script hash is `hash`
pub fn find_rce_cell<T: Transaction>(tx: &T, hash: &[u8; 32]) -> Result<usize, Error> {
    for index in 0.. {
        match tx.load_cell_type_hash(index, Source::CellDep) {
            Ok(Some(type_hash)) if &type_hash == hash => return Ok(index),
            Ok(_) => {}
            Err(SysError::IndexOutOfBound) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::RceCellNotFound)
}

// ============ Resolver ============

pub struct Resolver<'t, T: Transaction> {
    tx: &'t T,
    limits: Limits,
}

impl<'t, T: Transaction> Resolver<'t, T> {
    pub fn new(tx: &'t T, limits: Limits) -> Self {
        Self { tx, limits }
    }

    pub fn resolve(&self, root: &[u8; 32]) -> Result<RuleSet, Error> {
        let mut rule_set = RuleSet::new(self.limits.max_rules);
        self.gather(root, 0, &mut rule_set)?;
        Ok(rule_set)
    }

    fn gather(&self, hash: &[u8; 32], depth: usize, acc: &mut RuleSet) -> Result<(), Error> {
        // checked before the cell is touched so a bound is never reported
        // as a decoding error
        if depth > self.limits.max_rule_depth {
            return Err(Error::RcRulesTooDeep);
        }
        let index = find_rce_cell(self.tx, hash)?;
        let source = TxDataSource::cell_data(self.tx, index, Source::CellDep)?;
        match RcData::parse(source.cursor())? {
            RcData::Rule(rule) => acc.push(rule),
            RcData::CellVec(children) => {
                for i in 0..children.len() {
                    let child = children.get(i)?;
                    self.gather(&child, depth + 1, acc)?;
                }
                Ok(())
            }
        }
    }
}

pub fn resolve<T: Transaction>(tx: &T, root: &[u8; 32], limits: Limits) -> Result<RuleSet, Error> {
    Resolver::new(tx, limits).resolve(root)
}

// ============ Tests ============
