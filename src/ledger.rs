use std::collections::HashMap;
use std::fs;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::SignetError;
use crate::{controller, factory, identity};

/// Compute the address a deployer's next instance will occupy: low 20 bytes
/// of the hash of the RLP encoding of `[deployer, counter]`. Pure, so any
/// party can run it off-line before the deployment exists.
pub fn contract_address(deployer: Address, counter: u64) -> Address {
    deployer.create(counter)
}

/// The two kinds of shared logic an instance can run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Identity,
    Controller,
}

impl Logic {
    /// Zero-initialized state, as a freshly deployed prototype carries.
    pub fn empty_state(&self) -> ContractState {
        match self {
            Logic::Identity => ContractState::Identity(IdentityState::default()),
            Logic::Controller => ContractState::Controller(ControllerState {
                identity: Address::ZERO,
                owner: Address::ZERO,
                recovery: Address::ZERO,
                nonce: 0,
            }),
        }
    }
}

/// Prototype addresses a clone factory provisions from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrototypeSet {
    pub identity: Address,
    pub controller: Address,
}

/// What a deployed account executes. Clones hold a pointer to shared logic
/// and route every call through it; the constant factory variants carry
/// their prototype addresses inside the code value itself, so provisioning
/// never touches factory storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Full(Logic),
    Clone { prototype: Address },
    DirectFactory,
    CloneFactory,
    ConstantCloneFactory(PrototypeSet),
    DeterministicCloneFactory(PrototypeSet),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityState {
    pub owner: Address,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// Bound at construction, never reassigned.
    pub identity: Address,
    pub owner: Address,
    pub recovery: Address,
    /// Replay counter, 96 bits on the wire.
    pub nonce: u64,
}

/// Mutable storage a clone factory keeps its prototypes in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactoryState {
    pub prototypes: PrototypeSet,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub enum ContractState {
    #[default]
    None,
    Identity(IdentityState),
    Controller(ControllerState),
    Factory(FactoryState),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Account {
    pub balance: U256,
    /// Deployment counter. Externally-registered accounts start at 0,
    /// contract accounts at 1.
    pub nonce: u64,
    pub code: Option<Code>,
    pub state: ContractState,
}

/// Discovery event emitted by factories
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployEvent {
    pub emitter: Address,
    pub new_contract: Address,
}

/// One dispatched call, as observed by the ledger
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

/// An external operation submitted to the ledger
#[derive(Debug, Clone)]
pub struct Call {
    pub caller: Address,
    pub target: Address,
    pub value: U256,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct Receipt {
    pub output: Output,
    pub events: Vec<DeployEvent>,
    pub budget_spent: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    None,
    Deployed(Address),
    Forwarded(ForwardOutcome),
}

/// Result of a signed forward: the authorization can succeed while the
/// downstream call itself fails, and the two must stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardOutcome {
    Delivered,
    Reverted(String),
}

/// Remaining computational budget for one external operation. Spend is
/// never rolled back, even when state is.
#[derive(Debug)]
pub struct Budget {
    limit: u64,
    spent: u64,
}

impl Budget {
    pub fn new(limit: u64) -> Self {
        Budget { limit, spent: 0 }
    }

    pub fn charge(&mut self, amount: u64) -> Result<(), SignetError> {
        if self.remaining() < amount {
            return Err(SignetError::OutOfBudget {
                needed: amount,
                remaining: self.remaining(),
            });
        }
        self.spent += amount;
        Ok(())
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.spent
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }
}

/// Context a contract sees for one incoming call
#[derive(Debug, Clone, Copy)]
pub struct CallCtx {
    pub this: Address,
    pub caller: Address,
    pub value: U256,
    pub depth: u32,
}

struct Snapshot {
    accounts: HashMap<Address, Account>,
    events_len: usize,
    calls_len: usize,
}

/// The single serialized ledger every operation runs against. Operations
/// commit all-or-nothing; sub-calls can roll back independently through
/// `try_call`.
#[derive(Serialize, Deserialize)]
pub struct Ledger {
    pub config: LedgerConfig,
    accounts: HashMap<Address, Account>,
    pub events: Vec<DeployEvent>,
    #[serde(skip)]
    calls: Vec<CallRecord>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Ledger {
            config,
            accounts: HashMap::new(),
            events: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Register an externally-controlled account (counter starts at 0)
    pub fn register_account(&mut self, addr: Address, balance: U256) -> Result<(), SignetError> {
        if self.accounts.contains_key(&addr) {
            return Err(SignetError::AddressCollision(addr));
        }
        self.accounts.insert(
            addr,
            Account {
                balance,
                ..Default::default()
            },
        );
        Ok(())
    }

    /// Credit an account out of thin air (setup/genesis only)
    pub fn credit(&mut self, addr: Address, amount: U256) {
        self.accounts.entry(addr).or_default().balance += amount;
    }

    /// Create a contract account at the deployer's next derived address and
    /// advance the deployer's counter. Used both for setup (factories,
    /// prototypes) and by factories at run time; callers charge their own
    /// deployment cost.
    pub fn install(
        &mut self,
        deployer: Address,
        code: Code,
        state: ContractState,
    ) -> Result<Address, SignetError> {
        let counter = self
            .accounts
            .get(&deployer)
            .ok_or(SignetError::UnknownAccount(deployer))?
            .nonce;
        let addr = contract_address(deployer, counter);
        if self.accounts.contains_key(&addr) {
            return Err(SignetError::AddressCollision(addr));
        }
        if let Some(acct) = self.accounts.get_mut(&deployer) {
            acct.nonce += 1;
        }
        self.accounts.insert(
            addr,
            Account {
                balance: U256::ZERO,
                nonce: 1,
                code: Some(code),
                state,
            },
        );
        debug!(deployer = %deployer, address = %addr, counter, "installed contract");
        Ok(addr)
    }

    /// Run one external operation atomically
    pub fn execute(&mut self, call: Call, budget_limit: u64) -> Result<Receipt, SignetError> {
        let mut budget = Budget::new(budget_limit);
        budget.charge(self.config.costs.base_call)?;

        let snap = self.snapshot();
        match self.dispatch(
            &mut budget,
            call.caller,
            call.target,
            call.value,
            &call.payload,
            0,
        ) {
            Ok(output) => {
                let events = self.events[snap.events_len..].to_vec();
                Ok(Receipt {
                    output,
                    events,
                    budget_spent: budget.spent(),
                })
            }
            Err(e) => {
                self.restore(snap);
                Err(e)
            }
        }
    }

    /// Dispatch a call to `target`, isolated in its own snapshot: a failure
    /// rolls back the sub-call's effects and nothing else.
    pub(crate) fn try_call(
        &mut self,
        budget: &mut Budget,
        caller: Address,
        target: Address,
        value: U256,
        data: &[u8],
        depth: u32,
    ) -> Result<Output, SignetError> {
        let snap = self.snapshot();
        match self.dispatch(budget, caller, target, value, data, depth) {
            Ok(output) => Ok(output),
            Err(e) => {
                self.restore(snap);
                Err(e)
            }
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        budget: &mut Budget,
        caller: Address,
        target: Address,
        value: U256,
        data: &[u8],
        depth: u32,
    ) -> Result<Output, SignetError> {
        if depth > self.config.execution.max_call_depth {
            return Err(SignetError::CallDepthExceeded);
        }
        self.calls.push(CallRecord {
            from: caller,
            to: target,
            value,
            data: data.to_vec(),
        });
        if value > U256::ZERO {
            budget.charge(self.config.costs.value_transfer)?;
            self.transfer(caller, target, value)?;
        }

        let Some(code) = self.accounts.get(&target).and_then(|a| a.code.clone()) else {
            // Plain account: the payload is delivered, nothing executes.
            return Ok(Output::None);
        };
        let ctx = CallCtx {
            this: target,
            caller,
            value,
            depth,
        };
        match code {
            Code::Full(logic) => self.run_logic(logic, budget, ctx, data),
            Code::Clone { prototype } => {
                let logic = match self.accounts.get(&prototype).and_then(|a| a.code.clone()) {
                    Some(Code::Full(logic)) => logic,
                    _ => return Err(SignetError::NotAContract(prototype)),
                };
                self.run_logic(logic, budget, ctx, data)
            }
            Code::DirectFactory => factory::direct::call(self, budget, ctx, data),
            Code::CloneFactory => factory::clone::call(self, budget, ctx, data),
            Code::ConstantCloneFactory(protos) => {
                factory::constant::call(self, budget, ctx, protos, data)
            }
            Code::DeterministicCloneFactory(protos) => {
                factory::deterministic::call(self, budget, ctx, protos, data)
            }
        }
    }

    fn run_logic(
        &mut self,
        logic: Logic,
        budget: &mut Budget,
        ctx: CallCtx,
        data: &[u8],
    ) -> Result<Output, SignetError> {
        match logic {
            Logic::Identity => identity::call(self, budget, ctx, data),
            Logic::Controller => controller::call(self, budget, ctx, data),
        }
    }

    pub(crate) fn emit_deploy(
        &mut self,
        budget: &mut Budget,
        emitter: Address,
        new_contract: Address,
    ) -> Result<(), SignetError> {
        budget.charge(self.config.costs.event)?;
        self.events.push(DeployEvent {
            emitter,
            new_contract,
        });
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), SignetError> {
        let balance = self
            .accounts
            .get(&from)
            .map(|a| a.balance)
            .ok_or(SignetError::UnknownAccount(from))?;
        if balance < value {
            return Err(SignetError::InsufficientBalance {
                account: from,
                balance: balance.to_string(),
                needed: value.to_string(),
            });
        }
        if let Some(a) = self.accounts.get_mut(&from) {
            a.balance -= value;
        }
        self.accounts.entry(to).or_default().balance += value;
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            events_len: self.events.len(),
            calls_len: self.calls.len(),
        }
    }

    fn restore(&mut self, snap: Snapshot) {
        self.accounts = snap.accounts;
        self.events.truncate(snap.events_len);
        self.calls.truncate(snap.calls_len);
    }

    // --- Accessors ---

    pub fn account(&self, addr: Address) -> Option<&Account> {
        self.accounts.get(&addr)
    }

    pub fn balance_of(&self, addr: Address) -> U256 {
        self.accounts.get(&addr).map(|a| a.balance).unwrap_or_default()
    }

    pub fn has_code(&self, addr: Address) -> bool {
        self.accounts.get(&addr).map(|a| a.code.is_some()).unwrap_or(false)
    }

    /// The deployer counter the next `contract_address` derivation will use
    pub fn deployment_counter(&self, addr: Address) -> u64 {
        self.accounts.get(&addr).map(|a| a.nonce).unwrap_or(0)
    }

    pub fn identity_owner(&self, addr: Address) -> Result<Address, SignetError> {
        match self.accounts.get(&addr).map(|a| &a.state) {
            Some(ContractState::Identity(s)) => Ok(s.owner),
            Some(_) => Err(SignetError::NotAContract(addr)),
            None => Err(SignetError::UnknownAccount(addr)),
        }
    }

    pub fn controller_state(&self, addr: Address) -> Result<ControllerState, SignetError> {
        match self.accounts.get(&addr).map(|a| &a.state) {
            Some(ContractState::Controller(s)) => Ok(*s),
            Some(_) => Err(SignetError::NotAContract(addr)),
            None => Err(SignetError::UnknownAccount(addr)),
        }
    }

    pub(crate) fn identity_state_mut(
        &mut self,
        addr: Address,
    ) -> Result<&mut IdentityState, SignetError> {
        match self.accounts.get_mut(&addr).map(|a| &mut a.state) {
            Some(ContractState::Identity(s)) => Ok(s),
            Some(_) => Err(SignetError::NotAContract(addr)),
            None => Err(SignetError::UnknownAccount(addr)),
        }
    }

    pub(crate) fn controller_state_mut(
        &mut self,
        addr: Address,
    ) -> Result<&mut ControllerState, SignetError> {
        match self.accounts.get_mut(&addr).map(|a| &mut a.state) {
            Some(ContractState::Controller(s)) => Ok(s),
            Some(_) => Err(SignetError::NotAContract(addr)),
            None => Err(SignetError::UnknownAccount(addr)),
        }
    }

    pub(crate) fn factory_prototypes(&self, addr: Address) -> Result<PrototypeSet, SignetError> {
        match self.accounts.get(&addr).map(|a| &a.state) {
            Some(ContractState::Factory(s)) => Ok(s.prototypes),
            Some(_) => Err(SignetError::NotAContract(addr)),
            None => Err(SignetError::UnknownAccount(addr)),
        }
    }

    /// Calls delivered to `addr`, oldest first
    pub fn calls_to(&self, addr: Address) -> Vec<&CallRecord> {
        self.calls.iter().filter(|c| c.to == addr).collect()
    }

    // --- Persistence ---

    pub fn save_to_json(&self, path: &str) -> Result<(), SignetError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SignetError::Persistence(e.to_string()))?;
        fs::write(path, json).map_err(|e| SignetError::Persistence(e.to_string()))
    }

    pub fn load_from_json(path: &str) -> Result<Self, SignetError> {
        let contents =
            fs::read_to_string(path).map_err(|e| SignetError::Persistence(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| SignetError::Persistence(e.to_string()))
    }
}
