// ============ RCE Validator Type Script ============
// Guards compliance cells. Each cell is a Type-ID singleton holding either
// one rule or a list of child cell hashes.
//
// Args:    type_id(32) | flags(1)   (append-only 0x01, freeze-type 0x02)
// Witness: WitnessArgs.input_type = SmtUpdateAction, needed when the new
//          cell carries a rule

#![cfg_attr(feature = "ckb", no_std)]

use rce_core::mol::{RcData, SmtUpdateActionView, WitnessArgsView};
use rce_core::syscalls::load_script_args;
use rce_core::{
    validate_transition, validate_type_id, ByteSource, Payload, Policy, SmtVerifier, Source,
    Transaction, TxDataSource, UpdateAction,
};
use rce_types::{Error, RceValidatorArgs};

// ============ Script Entry Point ============

pub fn verify_rce_validator<T: Transaction>(tx: &T) -> Result<(), Error> {
    let args = load_script_args(tx)?;
    let args = RceValidatorArgs::deserialize(&args).ok_or(Error::ArgumentsLen)?;

    validate_type_id(tx, &args.type_id)?;

    let old = load_payload(tx, Source::GroupInput)?;
    // compliance cells are never destroyed
    let new = load_payload(tx, Source::GroupOutput)?.ok_or(Error::RceCellNotFound)?;

    let update = if new.is_rule() {
        let witness_source = if old.is_some() {
            Source::GroupInput
        } else {
            Source::GroupOutput
        };
        Some(load_update_action(tx, witness_source)?)
    } else {
        None
    };

    let policy = Policy {
        append_only: args.append_only(),
        freeze_type: args.freeze_type(),
    };
    validate_transition(&SmtVerifier, old.as_ref(), &new, policy, update.as_ref())
}

// ============ Cell Loading ============

fn load_payload<T: Transaction>(tx: &T, source: Source) -> Result<Option<Payload>, Error> {
    let data = match TxDataSource::cell_data(tx, 0, source) {
        Ok(data) => data,
        Err(Error::IndexOutOfBound) => return Ok(None),
        Err(err) => return Err(err),
    };
    if data.total_size() == 0 {
        return Err(Error::InvalidMolFormat);
    }
    Ok(Some(RcData::parse(data.cursor())?.payload()))
}

fn load_update_action<T: Transaction>(tx: &T, source: Source) -> Result<UpdateAction, Error> {
    let witness = TxDataSource::witness(tx, 0, source).map_err(|err| match err {
        Error::IndexOutOfBound => Error::InvalidMolFormat,
        other => other,
    })?;
    if witness.total_size() == 0 {
        return Err(Error::InvalidMolFormat);
    }
    let witness_args = WitnessArgsView::parse(witness.cursor())?;
    let input_type = witness_args.input_type.ok_or(Error::InvalidMolFormat)?;
    SmtUpdateActionView::parse(input_type)?.load()
}
