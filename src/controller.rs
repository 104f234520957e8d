//! Controller: the delegate authorized to act on an identity's behalf.
//!
//! Two phases per forwarded call: authorize (digest, recovered signer,
//! replay counter), then execute through the bound identity. The counter
//! advances on every successful authorization, including those whose
//! downstream call then fails; rolling it back would leave the controller
//! wedged at a consumed counter value.

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::crypto::{forward_digest, RecoverableSignature};
use crate::encoding::{CallPayload, CanonicalSerialize};
use crate::error::SignetError;
use crate::ledger::{Budget, CallCtx, ForwardOutcome, Ledger, Output};

pub(crate) fn call(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    data: &[u8],
) -> Result<Output, SignetError> {
    match CallPayload::decode(data)? {
        CallPayload::ChangeOwnership { new_owner } => {
            change_ownership(ledger, budget, ctx, new_owner)
        }
        CallPayload::ForwardOnBehalf {
            destination,
            value,
            data,
            nonce,
            signature,
        } => forward_on_behalf(ledger, budget, ctx, destination, value, &data, nonce, signature),
        _ => Err(SignetError::UnsupportedOperation),
    }
}

/// Owner-gated, with the recovery principal as the key-loss escape hatch.
fn change_ownership(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    new_owner: Address,
) -> Result<Output, SignetError> {
    let state = ledger.controller_state(ctx.this)?;
    if ctx.caller != state.owner && ctx.caller != state.recovery {
        return Err(SignetError::Unauthorized { caller: ctx.caller });
    }
    budget.charge(ledger.config.costs.state_write)?;
    ledger.controller_state_mut(ctx.this)?.owner = new_owner;
    Ok(Output::None)
}

#[allow(clippy::too_many_arguments)]
fn forward_on_behalf(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    destination: Address,
    value: U256,
    data: &[u8],
    nonce: u64,
    signature: RecoverableSignature,
) -> Result<Output, SignetError> {
    let state = ledger.controller_state(ctx.this)?;

    // Counter first: a replayed message fails both checks (the digest binds
    // the counter), and it should report as a replay.
    if nonce != state.nonce {
        return Err(SignetError::NonceMismatch {
            expected: state.nonce,
            got: nonce,
        });
    }

    let digest = forward_digest(destination, value, data, ctx.this, nonce, state.owner);
    let signer = signature.recover(digest)?;
    if signer != state.owner {
        return Err(SignetError::InvalidSignature);
    }

    // Authorized. Consume the counter before anything downstream can fail.
    budget.charge(ledger.config.costs.state_write)?;
    ledger.controller_state_mut(ctx.this)?.nonce += 1;

    let inner = CallPayload::Execute {
        to: destination,
        value,
        data: data.to_vec(),
    }
    .to_bytes();
    let outcome = match ledger.try_call(
        budget,
        ctx.this,
        state.identity,
        U256::ZERO,
        &inner,
        ctx.depth + 1,
    ) {
        Ok(_) => {
            debug!(controller = %ctx.this, %destination, nonce, "forwarded call delivered");
            ForwardOutcome::Delivered
        }
        Err(e) => {
            warn!(controller = %ctx.this, %destination, nonce, error = %e, "forwarded call reverted");
            ForwardOutcome::Reverted(e.to_string())
        }
    };
    Ok(Output::Forwarded(outcome))
}
