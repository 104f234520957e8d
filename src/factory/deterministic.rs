//! Deterministic-address clone factory: instance addresses are a pure
//! function of the factory address and its deployment counter, so callers
//! can compute them off-line, skip discovery events entirely, and batch
//! many pairs into one operation.

use alloy_primitives::Address;
use tracing::info;

use crate::encoding::CallPayload;
use crate::error::SignetError;
use crate::ledger::{self, Budget, CallCtx, Code, ContractState, Ledger, Output, PrototypeSet};

pub fn install(
    ledger: &mut Ledger,
    deployer: Address,
    prototypes: PrototypeSet,
) -> Result<Address, SignetError> {
    ledger.install(
        deployer,
        Code::DeterministicCloneFactory(prototypes),
        ContractState::None,
    )
}

/// Address the factory's deployment at `counter` occupies (or will occupy)
pub fn derive_address(factory: Address, counter: u64) -> Address {
    ledger::contract_address(factory, counter)
}

/// Addresses of the factory's nth pair (zero-based): the counter starts at
/// 1 and advances by two per pair, identity first.
pub fn nth_pair(factory: Address, n: u64) -> (Address, Address) {
    (
        derive_address(factory, 1 + 2 * n),
        derive_address(factory, 2 + 2 * n),
    )
}

pub(crate) fn call(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    protos: PrototypeSet,
    data: &[u8],
) -> Result<Output, SignetError> {
    match CallPayload::decode(data)? {
        CallPayload::DeployIdentity { owner } => {
            let addr =
                super::deploy_identity_clone(ledger, budget, ctx.this, protos.identity, owner)?;
            ledger.emit_deploy(budget, ctx.this, addr)?;
            Ok(Output::Deployed(addr))
        }
        CallPayload::DeployController {
            owner,
            identity,
            recovery,
        } => {
            let addr = super::deploy_controller_clone(
                ledger,
                budget,
                ctx.this,
                protos.controller,
                owner,
                identity,
                recovery,
            )?;
            ledger.emit_deploy(budget, ctx.this, addr)?;
            Ok(Output::Deployed(addr))
        }
        CallPayload::DeployPair { owner, recovery } => {
            let (_, controller) =
                super::deploy_clone_pair(ledger, budget, ctx.this, protos, owner, recovery, ctx.depth)?;
            ledger.emit_deploy(budget, ctx.this, controller)?;
            Ok(Output::Deployed(controller))
        }
        CallPayload::DeployPairNoEvent { owner, recovery } => {
            let (identity, controller) =
                super::deploy_clone_pair(ledger, budget, ctx.this, protos, owner, recovery, ctx.depth)?;
            info!(factory = %ctx.this, %identity, %controller, "deployed pair, no event");
            Ok(Output::None)
        }
        CallPayload::DeployMulti { recovery } => {
            deploy_multi(ledger, budget, ctx, protos, recovery)
        }
        _ => Err(SignetError::UnsupportedOperation),
    }
}

/// Deploy caller-owned pairs until the remaining budget cannot cover
/// another one. A pair is never started unless it can finish; any failure
/// inside the batch aborts the whole operation.
fn deploy_multi(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    protos: PrototypeSet,
    recovery: Address,
) -> Result<Output, SignetError> {
    let owner = ctx.caller;
    let pair_cost = ledger.config.costs.pair_cost();
    let mut deployed = 0u64;
    while budget.remaining() >= pair_cost {
        super::deploy_clone_pair(ledger, budget, ctx.this, protos, owner, recovery, ctx.depth)
            .map_err(|e| SignetError::BatchAborted(e.to_string()))?;
        deployed += 1;
    }
    if deployed == 0 {
        return Err(SignetError::BatchAborted(format!(
            "budget cannot cover a single pair (needs {pair_cost})"
        )));
    }
    info!(factory = %ctx.this, pairs = deployed, owner = %owner, "deployed pair batch");
    Ok(Output::None)
}
