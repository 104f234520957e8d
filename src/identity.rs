//! Identity: the account-like entity whose ownership can be delegated.
//!
//! Holds a single owner. The owner may reassign ownership or execute calls
//! through the identity, making the identity the effective caller and asset
//! holder for anything downstream.

use alloy_primitives::{Address, U256};

use crate::encoding::CallPayload;
use crate::error::SignetError;
use crate::ledger::{Budget, CallCtx, Ledger, Output};

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
        CallPayload::Execute { to, value, data } => execute(ledger, budget, ctx, to, value, &data),
        _ => Err(SignetError::UnsupportedOperation),
    }
}

fn change_ownership(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    new_owner: Address,
) -> Result<Output, SignetError> {
    let owner = ledger.identity_owner(ctx.this)?;
    if ctx.caller != owner {
        return Err(SignetError::Unauthorized { caller: ctx.caller });
    }
    budget.charge(ledger.config.costs.state_write)?;
    ledger.identity_state_mut(ctx.this)?.owner = new_owner;
    Ok(Output::None)
}

fn execute(
    ledger: &mut Ledger,
    budget: &mut Budget,
    ctx: CallCtx,
    to: Address,
    value: U256,
    data: &[u8],
) -> Result<Output, SignetError> {
    let owner = ledger.identity_owner(ctx.this)?;
    if ctx.caller != owner {
        return Err(SignetError::Unauthorized { caller: ctx.caller });
    }
    // The identity is the sender from here on; value moves from its balance.
    ledger
        .dispatch(budget, ctx.this, to, value, data, ctx.depth + 1)
        .map_err(|e| SignetError::DownstreamExecutionFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CanonicalSerialize;
    use crate::ledger::{Call, Code, ContractState, IdentityState, Logic};
    use alloy_primitives::U256;

    fn setup() -> (Ledger, Address, Address) {
        let mut ledger = Ledger::default();
        let owner = Address::repeat_byte(0xaa);
        ledger.register_account(owner, U256::from(1_000_000u64)).unwrap();
        let identity = ledger
            .install(
                owner,
                Code::Full(Logic::Identity),
                ContractState::Identity(IdentityState { owner }),
            )
            .unwrap();
        (ledger, owner, identity)
    }

    fn send(
        ledger: &mut Ledger,
        caller: Address,
        target: Address,
        payload: CallPayload,
    ) -> Result<crate::ledger::Receipt, SignetError> {
        ledger.execute(
            Call {
                caller,
                target,
                value: U256::ZERO,
                payload: payload.to_bytes(),
            },
            500_000,
        )
    }

    #[test]
    fn test_owner_changes_ownership() {
        let (mut ledger, owner, identity) = setup();
        let new_owner = Address::repeat_byte(0xbb);

        send(&mut ledger, owner, identity, CallPayload::ChangeOwnership { new_owner }).unwrap();
        assert_eq!(ledger.identity_owner(identity).unwrap(), new_owner);

        // The old owner lost the gate.
        let err = send(&mut ledger, owner, identity, CallPayload::ChangeOwnership { new_owner: owner })
            .unwrap_err();
        assert!(matches!(err, SignetError::Unauthorized { .. }));
    }

    #[test]
    fn test_non_owner_cannot_change_ownership() {
        let (mut ledger, _owner, identity) = setup();
        let mallory = Address::repeat_byte(0x66);

        let err = send(&mut ledger, mallory, identity, CallPayload::ChangeOwnership { new_owner: mallory })
            .unwrap_err();
        assert!(matches!(err, SignetError::Unauthorized { caller } if caller == mallory));
    }

    #[test]
    fn test_execute_routes_call_through_identity() {
        let (mut ledger, owner, identity) = setup();
        let receiver = Address::repeat_byte(0xcc);

        send(
            &mut ledger,
            owner,
            identity,
            CallPayload::Execute {
                to: receiver,
                value: U256::ZERO,
                data: vec![0x12, 0x34, 0x56, 0x78],
            },
        )
        .unwrap();

        let calls = ledger.calls_to(receiver);
        assert_eq!(calls.len(), 1);
        // The identity, not the owner, is the effective caller.
        assert_eq!(calls[0].from, identity);
        assert_eq!(calls[0].data, vec![0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_execute_spends_identity_balance() {
        let (mut ledger, owner, identity) = setup();
        let receiver = Address::repeat_byte(0xcc);

        // Fund the identity, then have it pay out.
        ledger
            .execute(
                Call {
                    caller: owner,
                    target: identity,
                    value: U256::from(400u64),
                    payload: CallPayload::Execute {
                        to: receiver,
                        value: U256::from(150u64),
                        data: vec![],
                    }
                    .to_bytes(),
                },
                500_000,
            )
            .unwrap();

        assert_eq!(ledger.balance_of(identity), U256::from(250u64));
        assert_eq!(ledger.balance_of(receiver), U256::from(150u64));
    }

    #[test]
    fn test_execute_by_non_owner_fails() {
        let (mut ledger, _owner, identity) = setup();
        let mallory = Address::repeat_byte(0x66);
        let err = send(
            &mut ledger,
            mallory,
            identity,
            CallPayload::Execute {
                to: Address::repeat_byte(0xcc),
                value: U256::ZERO,
                data: vec![],
            },
        )
        .unwrap_err();
        assert!(matches!(err, SignetError::Unauthorized { .. }));
    }

    #[test]
    fn test_deploy_ops_unsupported() {
        let (mut ledger, owner, identity) = setup();
        let err = send(
            &mut ledger,
            owner,
            identity,
            CallPayload::DeployIdentity { owner },
        )
        .unwrap_err();
        assert!(matches!(err, SignetError::UnsupportedOperation));
    }
}
