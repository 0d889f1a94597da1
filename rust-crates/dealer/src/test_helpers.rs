//! In-memory stand-ins for the chain and the advisor.

use crate::{
    Error,
    Result,
    SubmissionOutcome,
    gateway::{
        ContractCall,
        ContractGateway,
        Probe,
    },
    llm::{
        Advice,
        AdviceRequest,
        Advisor,
    },
};
use dice_poker_game::{
    Dice,
    GameState,
    Seat,
    amount::WEI_PER_UNIT,
};
use ethers::types::{
    Address,
    H256,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

pub fn dealer_address() -> Address {
    Address::repeat_byte(0xde)
}

pub fn human_address() -> Address {
    Address::repeat_byte(0x11)
}

#[derive(Clone, Debug)]
pub struct FakeTable {
    pub state: GameState,
    pub players: [Option<Address>; 2],
    pub bets: [u128; 2],
    pub dice: [Dice; 2],
    pub pot: u128,
    pub current_bet: u128,
    pub round_bets: HashMap<Address, u128>,
    pub balances: HashMap<Address, u128>,
    pub transaction_counts: HashMap<Address, u64>,
}

impl Default for FakeTable {
    fn default() -> Self {
        Self {
            state: GameState::JOINING,
            players: [None, None],
            bets: [0, 0],
            dice: [Dice::default(), Dice::default()],
            pot: 0,
            current_bet: 0,
            round_bets: HashMap::new(),
            balances: HashMap::from([(dealer_address(), 10 * WEI_PER_UNIT)]),
            transaction_counts: HashMap::new(),
        }
    }
}

/// Ways the next chain interaction can go wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakeFailure {
    ReadTransient,
    SubmitTransient,
    SubmitRevert,
    ConfirmRevert,
    ConfirmTimeout,
}

#[derive(Clone)]
pub struct FakeGateway {
    agent: Address,
    table: Arc<Mutex<FakeTable>>,
    submitted: Arc<Mutex<Vec<ContractCall>>>,
    failure: Arc<Mutex<Option<FakeFailure>>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new(dealer_address())
    }
}

impl FakeGateway {
    pub fn new(agent: Address) -> Self {
        Self {
            agent,
            table: Arc::default(),
            submitted: Arc::default(),
            failure: Arc::default(),
        }
    }

    /// A game in `state` with the human in the first seat and the dealer in
    /// the second.
    pub fn seated(state: GameState) -> Self {
        let gateway = Self::default();
        gateway.update(|table| {
            table.state = state;
            table.players = [Some(human_address()), Some(dealer_address())];
        });
        gateway
    }

    pub fn update(&self, f: impl FnOnce(&mut FakeTable)) {
        let mut table = self.table.lock().unwrap();
        f(&mut table);
    }

    pub fn table(&self) -> FakeTable {
        self.table.lock().unwrap().clone()
    }

    pub fn fail_next(&self, failure: FakeFailure) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    fn take_failure(&self, matches: &[FakeFailure]) -> Option<FakeFailure> {
        let mut failure = self.failure.lock().unwrap();
        match *failure {
            Some(f) if matches.contains(&f) => failure.take(),
            _ => None,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&FakeTable) -> T) -> Result<T> {
        if self.take_failure(&[FakeFailure::ReadTransient]).is_some() {
            return Err(Error::transient("fake rpc unavailable"));
        }
        Ok(f(&self.table.lock().unwrap()))
    }
}

impl ContractGateway for FakeGateway {
    fn agent_address(&self) -> Address {
        self.agent
    }

    async fn read_state(&self) -> Result<GameState> {
        self.read(|t| t.state)
    }

    async fn read_players(&self) -> Result<[Option<Address>; 2]> {
        self.read(|t| t.players)
    }

    async fn read_bets(&self) -> Result<[u128; 2]> {
        self.read(|t| t.bets)
    }

    async fn read_dice(&self, seat: Seat) -> Result<Dice> {
        self.read(|t| t.dice[seat.index()])
    }

    async fn read_pot(&self) -> Result<u128> {
        self.read(|t| t.pot)
    }

    async fn read_current_bet(&self) -> Result<u128> {
        self.read(|t| t.current_bet)
    }

    async fn read_round_bet(&self, player: Address) -> Result<u128> {
        self.read(|t| t.round_bets.get(&player).copied().unwrap_or(0))
    }

    async fn balance_of(&self, who: Address) -> Result<u128> {
        self.read(|t| t.balances.get(&who).copied().unwrap_or(0))
    }

    async fn transaction_count(&self, who: Address) -> Result<u64> {
        self.read(|t| t.transaction_counts.get(&who).copied().unwrap_or(0))
    }

    async fn submit(&self, call: ContractCall) -> Result<H256> {
        match self.take_failure(&[FakeFailure::SubmitTransient, FakeFailure::SubmitRevert]) {
            Some(FakeFailure::SubmitTransient) => {
                return Err(Error::Transient {
                    message: "fake broadcast dropped".to_string(),
                    outcome: SubmissionOutcome::Unknown,
                });
            }
            Some(_) => {
                return Err(Error::Revert {
                    message: "execution reverted".to_string(),
                    tx_hash: None,
                });
            }
            None => {}
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(call);
        if call == ContractCall::JoinGame {
            let mut table = self.table.lock().unwrap();
            if let Some(seat) = dice_poker_game::seat::open_seat(&table.players) {
                table.players[seat.index()] = Some(self.agent);
            }
            if table.players.iter().all(Option::is_some) {
                table.state = GameState::new(1)?;
            }
        }
        Ok(H256::from_low_u64_be(submitted.len() as u64))
    }

    async fn await_confirmation(&self, tx_hash: H256, timeout: Duration) -> Result<()> {
        match self.take_failure(&[FakeFailure::ConfirmRevert, FakeFailure::ConfirmTimeout]) {
            Some(FakeFailure::ConfirmRevert) => Err(Error::Revert {
                message: "status 0".to_string(),
                tx_hash: Some(tx_hash),
            }),
            Some(_) => Err(Error::Timeout {
                tx_hash,
                waited: timeout,
            }),
            None => Ok(()),
        }
    }

    async fn probe(&self) -> Result<Probe> {
        let state = self.read_state().await?;
        Ok(Probe {
            chain_id: 31337,
            block_number: self.write_count() as u64,
            contract_address: Address::repeat_byte(0xcc),
            contract_has_code: true,
            state: Some(state),
            state_error: None,
        })
    }
}

/// Replays a fixed answer and counts how often it was asked.
#[derive(Clone, Default)]
pub struct ScriptedAdvisor {
    advice: Arc<Mutex<Option<Advice>>>,
    requests: Arc<Mutex<Vec<AdviceRequest>>>,
}

impl ScriptedAdvisor {
    /// Every call fails like an unreachable provider.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn answering(advice: Advice) -> Self {
        let advisor = Self::default();
        *advisor.advice.lock().unwrap() = Some(advice);
        advisor
    }

    pub fn requests(&self) -> Vec<AdviceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Advisor for ScriptedAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<Advice> {
        self.requests.lock().unwrap().push(request.clone());
        self.advice
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Llm("advisor offline".to_string()))
    }
}
