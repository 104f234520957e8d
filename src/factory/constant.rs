//! Constant-prototype clone factory: the prototype addresses are baked into
//! the factory's code value at construction, so provisioning never reads
//! factory storage. Adds atomic pair deployment.

use alloy_primitives::Address;
use tracing::info;

use crate::encoding::CallPayload;
use crate::error::SignetError;
use crate::ledger::{Budget, CallCtx, Code, ContractState, Ledger, Output, PrototypeSet};

pub fn install(
    ledger: &mut Ledger,
    deployer: Address,
    prototypes: PrototypeSet,
) -> Result<Address, SignetError> {
    ledger.install(
        deployer,
        Code::ConstantCloneFactory(prototypes),
        ContractState::None,
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
            let (identity, controller) =
                super::deploy_clone_pair(ledger, budget, ctx.this, protos, owner, recovery, ctx.depth)?;
            // One discovery event, carrying the controller.
            ledger.emit_deploy(budget, ctx.this, controller)?;
            info!(factory = %ctx.this, %identity, %controller, "deployed pair");
            Ok(Output::Deployed(controller))
        }
        _ => Err(SignetError::UnsupportedOperation),
    }
}
