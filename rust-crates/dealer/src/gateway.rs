use crate::{
    Error,
    Result,
};
use dice_poker_game::{
    Action,
    BetAmount,
    Dice,
    GameState,
    Seat,
};
use ethers::types::{
    Address,
    H256,
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

pub mod evm;

pub const DEFAULT_RPC_RETRIES: u32 = 3;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(45);
pub const MIN_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// A contract write, with the native value it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContractCall {
    JoinGame,
    PlaceBet(BetAmount),
    Call { value: u128 },
    Fold,
    RollDice,
}

impl ContractCall {
    pub fn for_action(action: Action, to_call: u128) -> Self {
        match action {
            Action::BetOrRaise(amount) => ContractCall::PlaceBet(amount),
            Action::Call => ContractCall::Call { value: to_call },
            Action::Fold => ContractCall::Fold,
            Action::Roll => ContractCall::RollDice,
        }
    }

    pub fn value(&self) -> u128 {
        match self {
            ContractCall::PlaceBet(amount) => amount.wei(),
            ContractCall::Call { value } => *value,
            ContractCall::JoinGame | ContractCall::Fold | ContractCall::RollDice => 0,
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::JoinGame => "joinGame",
            ContractCall::PlaceBet(_) => "placeBet",
            ContractCall::Call { .. } => "call",
            ContractCall::Fold => "fold",
            ContractCall::RollDice => "rollDice",
        }
    }
}

/// What a quick look at the deployment found.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probe {
    pub chain_id: u64,
    pub block_number: u64,
    pub contract_address: Address,
    pub contract_has_code: bool,
    pub state: Option<GameState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_error: Option<String>,
}

/// Everything the dealer needs from the chain.
///
/// Reads may be retried by implementations. `submit` must send at most one
/// transaction per call and is never retried.
pub trait ContractGateway {
    fn agent_address(&self) -> Address;

    fn read_state(&self) -> impl Future<Output = Result<GameState>> + Send;

    /// Seat addresses, `None` for an empty (zero address) seat.
    fn read_players(&self) -> impl Future<Output = Result<[Option<Address>; 2]>> + Send;

    fn read_bets(&self) -> impl Future<Output = Result<[u128; 2]>> + Send;

    fn read_dice(&self, seat: Seat) -> impl Future<Output = Result<Dice>> + Send;

    fn read_pot(&self) -> impl Future<Output = Result<u128>> + Send;

    fn read_current_bet(&self) -> impl Future<Output = Result<u128>> + Send;

    fn read_round_bet(&self, player: Address) -> impl Future<Output = Result<u128>> + Send;

    fn balance_of(&self, who: Address) -> impl Future<Output = Result<u128>> + Send;

    fn transaction_count(&self, who: Address) -> impl Future<Output = Result<u64>> + Send;

    fn submit(&self, call: ContractCall) -> impl Future<Output = Result<H256>> + Send;

    fn await_confirmation(
        &self,
        tx_hash: H256,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    fn probe(&self) -> impl Future<Output = Result<Probe>> + Send;
}

/// Bounded retries for idempotent reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_attempts(DEFAULT_RPC_RETRIES)
    }
}

impl RetryPolicy {
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or
    /// the attempts are used up.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.base_delay;
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    let delay = jittered_backoff(&mut rand::rng(), backoff);
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "read failed, retrying: {err}"
                    );
                    tokio::time::sleep(delay).await;
                    backoff = (backoff * 2).min(self.max_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Delay in `[backoff / 2, backoff]`.
pub fn jittered_backoff(rng: &mut impl Rng, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }
    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.random_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

pub fn validate_confirmation_timeout(timeout: Duration) -> Result<Duration> {
    if (MIN_CONFIRMATION_TIMEOUT..=MAX_CONFIRMATION_TIMEOUT).contains(&timeout) {
        Ok(timeout)
    } else {
        Err(Error::Configuration(format!(
            "confirmation timeout must be between {}s and {}s, got {}s",
            MIN_CONFIRMATION_TIMEOUT.as_secs(),
            MAX_CONFIRMATION_TIMEOUT.as_secs(),
            timeout.as_secs()
        )))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::SubmissionOutcome;
    use proptest::prelude::*;
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };
    use std::sync::atomic::{
        AtomicU32,
        Ordering,
    };

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn run__retries_transient_reads_until_success() {
        // given
        let calls = AtomicU32::new(0);

        // when
        let value = quick(3)
            .run("currentState", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::transient("connection reset"))
                } else {
                    Ok(7u8)
                }
            })
            .await
            .unwrap();

        // then
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn run__gives_up_after_the_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(2)
            .run("pot", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::transient("timeout"))
            })
            .await;
        assert!(matches!(
            result,
            Err(Error::Transient {
                outcome: SubmissionOutcome::NotSent,
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn run__does_not_retry_reverts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(5)
            .run("players", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Revert {
                    message: "bad index".to_string(),
                    tx_hash: None,
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn for_action__carries_call_value_and_bet_amount() {
        let bet = BetAmount::from_units(5).unwrap();
        assert_eq!(
            ContractCall::for_action(Action::BetOrRaise(bet), 0).value(),
            bet.wei()
        );
        assert_eq!(
            ContractCall::for_action(Action::Call, 42),
            ContractCall::Call { value: 42 }
        );
        assert_eq!(ContractCall::for_action(Action::Roll, 42).value(), 0);
        assert_eq!(ContractCall::for_action(Action::Fold, 0).method(), "fold");
    }

    #[test]
    fn validate_confirmation_timeout__accepts_30_to_60_seconds() {
        assert!(validate_confirmation_timeout(Duration::from_secs(30)).is_ok());
        assert!(validate_confirmation_timeout(Duration::from_secs(60)).is_ok());
        assert!(validate_confirmation_timeout(Duration::from_secs(29)).is_err());
        assert!(validate_confirmation_timeout(Duration::from_secs(61)).is_err());
    }

    proptest! {
        #[test]
        fn jittered_backoff__stays_within_half_and_full(ms in 2u64..100_000, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let backoff = Duration::from_millis(ms);
            let delay = jittered_backoff(&mut rng, backoff);
            prop_assert!(delay >= Duration::from_millis(ms / 2));
            prop_assert!(delay <= backoff);
        }
    }
}
