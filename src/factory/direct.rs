//! Direct factory: every instance carries its own full logic. The baseline
//! strategy, and the most expensive per instance.

use alloy_primitives::Address;
use tracing::info;

use crate::encoding::CallPayload;
use crate::error::SignetError;
use crate::ledger::{
    Budget, CallCtx, Code, ContractState, ControllerState, IdentityState, Ledger, Logic, Output,
};

pub fn install(ledger: &mut Ledger, deployer: Address) -> Result<Address, SignetError> {
    ledger.install(deployer, Code::DirectFactory, ContractState::None)
}

pub(crate) fn call(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    data: &[u8],
) -> Result<Output, SignetError> {
    match CallPayload::decode(data)? {
        CallPayload::DeployIdentity { owner } => {
            budget.charge(ledger.config.costs.full_deploy)?;
            let addr = ledger.install(
                ctx.this,
                Code::Full(Logic::Identity),
                ContractState::Identity(IdentityState { owner }),
            )?;
            ledger.emit_deploy(budget, ctx.this, addr)?;
            info!(factory = %ctx.this, identity = %addr, "deployed identity");
            Ok(Output::Deployed(addr))
        }
        CallPayload::DeployController {
            owner,
            identity,
            recovery,
        } => {
            budget.charge(ledger.config.costs.full_deploy)?;
            let addr = ledger.install(
                ctx.this,
                Code::Full(Logic::Controller),
                ContractState::Controller(ControllerState {
                    identity,
                    owner,
                    recovery,
                    nonce: 0,
                }),
            )?;
            ledger.emit_deploy(budget, ctx.this, addr)?;
            info!(factory = %ctx.this, controller = %addr, "deployed controller");
            Ok(Output::Deployed(addr))
        }
        _ => Err(SignetError::UnsupportedOperation),
    }
}
