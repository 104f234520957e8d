//! Provisioning strategies for identity/controller pairs, cheapest last.

pub mod clone;
pub mod constant;
pub mod deterministic;
pub mod direct;

use alloy_primitives::{Address, U256};

use crate::encoding::{CallPayload, CanonicalSerialize};
use crate::error::SignetError;
use crate::ledger::{
    Budget, Code, ContractState, ControllerState, IdentityState, Ledger, Logic, PrototypeSet,
};

/// Deploy the two shared prototypes clone factories provision from.
/// Prototypes are stateless: their own storage stays zeroed and unused.
pub fn install_prototypes(
    ledger: &mut Ledger,
    deployer: Address,
) -> Result<PrototypeSet, SignetError> {
    let identity = ledger.install(
        deployer,
        Code::Full(Logic::Identity),
        Logic::Identity.empty_state(),
    )?;
    let controller = ledger.install(
        deployer,
        Code::Full(Logic::Controller),
        Logic::Controller.empty_state(),
    )?;
    Ok(PrototypeSet {
        identity,
        controller,
    })
}

pub(crate) fn deploy_identity_clone(
    ledger: &mut Ledger,
    budget: &mut Budget,
    factory: Address,
    prototype: Address,
    owner: Address,
) -> Result<Address, SignetError> {
    budget.charge(ledger.config.costs.clone_deploy)?;
    ledger.install(
        factory,
        Code::Clone { prototype },
        ContractState::Identity(IdentityState { owner }),
    )
}

pub(crate) fn deploy_controller_clone(
    ledger: &mut Ledger,
    budget: &mut Budget,
    factory: Address,
    prototype: Address,
    owner: Address,
    identity: Address,
    recovery: Address,
) -> Result<Address, SignetError> {
    budget.charge(ledger.config.costs.clone_deploy)?;
    ledger.install(
        factory,
        Code::Clone { prototype },
        ContractState::Controller(ControllerState {
            identity,
            owner,
            recovery,
            nonce: 0,
        }),
    )
}

/// One atomic pair: identity clone, controller clone bound to it, identity
/// handed to the controller through its own ownership gate. No point at
/// which the identity is observably owned by anyone but the factory or the
/// controller.
pub(crate) fn deploy_clone_pair(
    ledger: &mut Ledger,
    budget: &mut Budget,
    factory: Address,
    protos: PrototypeSet,
    owner: Address,
    recovery: Address,
    depth: u32,
) -> Result<(Address, Address), SignetError> {
    let identity = deploy_identity_clone(ledger, budget, factory, protos.identity, factory)?;
    let controller = deploy_controller_clone(
        ledger,
        budget,
        factory,
        protos.controller,
        owner,
        identity,
        recovery,
    )?;
    let handover = CallPayload::ChangeOwnership {
        new_owner: controller,
    }
    .to_bytes();
    ledger.dispatch(budget, factory, identity, U256::ZERO, &handover, depth + 1)?;
    Ok((identity, controller))
}
