//! Clone factory: instances are lightweight proxies onto shared prototypes
//! held in the factory's own storage, read back on every deployment.

use alloy_primitives::Address;
use tracing::info;

use crate::encoding::CallPayload;
use crate::error::SignetError;
use crate::ledger::{
    Budget, CallCtx, Code, ContractState, FactoryState, Ledger, Output, PrototypeSet,
};

pub fn install(
    ledger: &mut Ledger,
    deployer: Address,
    prototypes: PrototypeSet,
) -> Result<Address, SignetError> {
    ledger.install(
        deployer,
        Code::CloneFactory,
        ContractState::Factory(FactoryState { prototypes }),
    )
}

pub(crate) fn call(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    data: &[u8],
) -> Result<Output, SignetError> {
    // Prototype addresses live in storage; fetching them is a charged read.
    budget.charge(ledger.config.costs.state_read)?;
    let protos = ledger.factory_prototypes(ctx.this)?;

    match CallPayload::decode(data)? {
        CallPayload::DeployIdentity { owner } => {
            let addr =
                super::deploy_identity_clone(ledger, budget, ctx.this, protos.identity, owner)?;
            ledger.emit_deploy(budget, ctx.this, addr)?;
            info!(factory = %ctx.this, identity = %addr, "deployed identity clone");
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
            info!(factory = %ctx.this, controller = %addr, "deployed controller clone");
            Ok(Output::Deployed(addr))
        }
        _ => Err(SignetError::UnsupportedOperation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{forward_digest, KeyPair};
    use crate::encoding::CanonicalSerialize;
    use crate::factory::{direct, install_prototypes};
    use crate::ledger::{Call, ForwardOutcome, Receipt};
    use alloy_primitives::U256;

    const BUDGET: u64 = 1_000_000;

    fn setup() -> (Ledger, Address, Address) {
        let mut ledger = Ledger::default();
        let deployer = Address::repeat_byte(0xaa);
        ledger.register_account(deployer, U256::ZERO).unwrap();
        let protos = install_prototypes(&mut ledger, deployer).unwrap();
        let factory = install(&mut ledger, deployer, protos).unwrap();
        (ledger, deployer, factory)
    }

    fn run(
        ledger: &mut Ledger,
        caller: Address,
        target: Address,
        payload: CallPayload,
    ) -> Receipt {
        ledger
            .execute(
                Call {
                    caller,
                    target,
                    value: U256::ZERO,
                    payload: payload.to_bytes(),
                },
                BUDGET,
            )
            .unwrap()
    }

    fn deployed(receipt: &Receipt) -> Address {
        match receipt.output {
            Output::Deployed(addr) => addr,
            ref other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_clone_instances_share_prototype_logic() {
        let (mut ledger, deployer, factory) = setup();
        let owner = Address::repeat_byte(0x01);

        let receipt = run(&mut ledger, deployer, factory, CallPayload::DeployIdentity { owner });
        let identity = deployed(&receipt);

        assert!(matches!(
            ledger.account(identity).unwrap().code,
            Some(Code::Clone { .. })
        ));
        assert_eq!(ledger.identity_owner(identity).unwrap(), owner);

        // The clone runs real identity logic against its own state.
        let new_owner = Address::repeat_byte(0x02);
        run(&mut ledger, owner, identity, CallPayload::ChangeOwnership { new_owner });
        assert_eq!(ledger.identity_owner(identity).unwrap(), new_owner);
    }

    #[test]
    fn test_clone_deploy_cheaper_than_direct() {
        let (mut ledger, deployer, factory) = setup();
        let direct_factory = direct::install(&mut ledger, deployer).unwrap();
        let owner = Address::repeat_byte(0x01);

        let via_clone = run(&mut ledger, deployer, factory, CallPayload::DeployIdentity { owner });
        let via_direct = run(
            &mut ledger,
            deployer,
            direct_factory,
            CallPayload::DeployIdentity { owner },
        );
        assert!(via_clone.budget_spent < via_direct.budget_spent);
    }

    #[test]
    fn test_forward_through_cloned_pair() {
        let (mut ledger, deployer, factory) = setup();
        let owner = KeyPair::generate();
        let owner_addr = owner.address();
        let recovery = Address::repeat_byte(0x77);
        let receiver = Address::repeat_byte(0xcc);
        ledger.register_account(owner_addr, U256::ZERO).unwrap();

        let identity = deployed(&run(
            &mut ledger,
            deployer,
            factory,
            CallPayload::DeployIdentity { owner: owner_addr },
        ));
        let controller = deployed(&run(
            &mut ledger,
            deployer,
            factory,
            CallPayload::DeployController {
                owner: owner_addr,
                identity,
                recovery,
            },
        ));
        run(
            &mut ledger,
            owner_addr,
            identity,
            CallPayload::ChangeOwnership {
                new_owner: controller,
            },
        );

        let data = vec![0x12, 0x34, 0x56, 0x78];
        let digest = forward_digest(receiver, U256::ZERO, &data, controller, 0, owner_addr);
        let receipt = run(
            &mut ledger,
            owner_addr,
            controller,
            CallPayload::ForwardOnBehalf {
                destination: receiver,
                value: U256::ZERO,
                data: data.clone(),
                nonce: 0,
                signature: owner.sign_digest(digest).unwrap(),
            },
        );

        assert_eq!(receipt.output, Output::Forwarded(ForwardOutcome::Delivered));
        assert_eq!(ledger.controller_state(controller).unwrap().nonce, 1);
        let calls = ledger.calls_to(receiver);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].from, identity);
        assert_eq!(calls[0].data, data);
    }

    #[test]
    fn test_clone_with_dangling_prototype_fails() {
        let (mut ledger, deployer, _factory) = setup();
        // A factory whose prototypes point at plain accounts produces clones
        // that cannot execute.
        let bogus = PrototypeSet {
            identity: Address::repeat_byte(0xe1),
            controller: Address::repeat_byte(0xe2),
        };
        let factory = install(&mut ledger, deployer, bogus).unwrap();
        let owner = Address::repeat_byte(0x01);

        let receipt = run(&mut ledger, deployer, factory, CallPayload::DeployIdentity { owner });
        let identity = deployed(&receipt);
        let err = ledger
            .execute(
                Call {
                    caller: owner,
                    target: identity,
                    value: U256::ZERO,
                    payload: CallPayload::ChangeOwnership { new_owner: owner }.to_bytes(),
                },
                BUDGET,
            )
            .unwrap_err();
        assert!(matches!(err, SignetError::NotAContract(_)));
    }
}
