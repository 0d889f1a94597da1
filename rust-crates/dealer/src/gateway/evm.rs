//! The gateway backed by a JSON-RPC node and the generated contract bindings.

use crate::{
    Error,
    Result,
    SubmissionOutcome,
    gateway::{
        ContractCall,
        ContractGateway,
        Probe,
        RetryPolicy,
    },
};
use dice_poker_game::{
    Dice,
    GameState,
    Seat,
    dice::DICE_PER_PLAYER,
};
use ethers::{
    contract::ContractError,
    middleware::SignerMiddleware,
    providers::{
        Http,
        Middleware,
        Provider,
        ProviderError,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::{
        Address,
        H256,
        U64,
        U256,
    },
};
use generated_abi::{
    DicePoker,
    dice_poker_at,
};
use std::{
    fmt,
    sync::Arc,
    time::Duration,
};
use url::Url;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Connection details for [`EvmGateway::connect`].
#[derive(Clone)]
pub struct EvmSettings {
    pub rpc_url: Url,
    pub contract_address: Address,
    pub agent_private_key: String,
    /// Looked up from the node when not pinned.
    pub chain_id: Option<u64>,
    pub retry: RetryPolicy,
}

impl fmt::Debug for EvmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSettings")
            .field("rpc_url", &self.rpc_url.as_str())
            .field("contract_address", &self.contract_address)
            .field("agent_private_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .field("retry", &self.retry)
            .finish()
    }
}

pub struct EvmGateway {
    provider: Provider<Http>,
    contract: DicePoker<SignerClient>,
    contract_address: Address,
    agent: Address,
    retry: RetryPolicy,
}

impl EvmGateway {
    pub async fn connect(settings: EvmSettings) -> Result<Self> {
        let provider = Provider::<Http>::try_from(settings.rpc_url.as_str())
            .map_err(|e| Error::Configuration(format!("invalid RPC URL: {e}")))?;

        let wallet: LocalWallet = settings
            .agent_private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .map_err(|_| Error::Configuration("invalid AGENT_PRIVATE_KEY".to_string()))?;

        let chain_id = match settings.chain_id {
            Some(id) => id,
            None => settings
                .retry
                .run("eth_chainId", || async {
                    provider.get_chainid().await.map_err(classify_provider)
                })
                .await?
                .as_u64(),
        };
        let wallet = wallet.with_chain_id(chain_id);
        let agent = wallet.address();

        let client = SignerMiddleware::new(provider.clone(), wallet);
        let contract = dice_poker_at(settings.contract_address, Arc::new(client));
        tracing::info!(
            %agent,
            chain_id,
            contract = %settings.contract_address,
            "connected to table contract"
        );

        Ok(Self {
            provider,
            contract,
            contract_address: settings.contract_address,
            agent,
            retry: settings.retry,
        })
    }

    async fn read_player(&self, seat: Seat) -> Result<Option<Address>> {
        let index = U256::from(seat.index());
        let address = self
            .retry
            .run("players", || async {
                self.contract.players(index).call().await.map_err(classify_contract)
            })
            .await?;
        Ok((!address.is_zero()).then_some(address))
    }

    async fn read_bet(&self, seat: Seat) -> Result<u128> {
        let index = U256::from(seat.index());
        let bet = self
            .retry
            .run("bets", || async {
                self.contract.bets(index).call().await.map_err(classify_contract)
            })
            .await?;
        to_wei(bet, "bets")
    }

    async fn send(&self, call: ContractCall) -> Result<H256> {
        let value = U256::from(call.value());
        let tx = match call {
            ContractCall::JoinGame => self.contract.join_game(),
            ContractCall::PlaceBet(_) => self.contract.place_bet().value(value),
            ContractCall::Call { .. } => self.contract.call().value(value),
            ContractCall::Fold => self.contract.fold(),
            ContractCall::RollDice => self.contract.roll_dice(),
        };
        let pending = tx.send().await.map_err(classify_send)?;
        Ok(pending.tx_hash())
    }
}

impl ContractGateway for EvmGateway {
    fn agent_address(&self) -> Address {
        self.agent
    }

    async fn read_state(&self) -> Result<GameState> {
        let code = self
            .retry
            .run("currentState", || async {
                self.contract.current_state().call().await.map_err(classify_contract)
            })
            .await?;
        Ok(GameState::new(u64::from(code))?)
    }

    async fn read_players(&self) -> Result<[Option<Address>; 2]> {
        Ok([
            self.read_player(Seat::First).await?,
            self.read_player(Seat::Second).await?,
        ])
    }

    async fn read_bets(&self) -> Result<[u128; 2]> {
        Ok([
            self.read_bet(Seat::First).await?,
            self.read_bet(Seat::Second).await?,
        ])
    }

    async fn read_dice(&self, seat: Seat) -> Result<Dice> {
        let player = U256::from(seat.index());
        let mut values = [0u64; DICE_PER_PLAYER];
        for (slot, value) in values.iter_mut().enumerate() {
            let index = U256::from(slot);
            let face = self
                .retry
                .run("playerDice", || async {
                    self.contract
                        .player_dice(player, index)
                        .call()
                        .await
                        .map_err(classify_contract)
                })
                .await?;
            *value = u64::from(face);
        }
        Ok(Dice::from_raw(&values)?)
    }

    async fn read_pot(&self) -> Result<u128> {
        let pot = self
            .retry
            .run("pot", || async {
                self.contract.pot().call().await.map_err(classify_contract)
            })
            .await?;
        to_wei(pot, "pot")
    }

    async fn read_current_bet(&self) -> Result<u128> {
        let bet = self
            .retry
            .run("currentBet", || async {
                self.contract.current_bet().call().await.map_err(classify_contract)
            })
            .await?;
        to_wei(bet, "currentBet")
    }

    async fn read_round_bet(&self, player: Address) -> Result<u128> {
        let bet = self
            .retry
            .run("roundBet", || async {
                self.contract
                    .round_bet(player)
                    .call()
                    .await
                    .map_err(classify_contract)
            })
            .await?;
        to_wei(bet, "roundBet")
    }

    async fn balance_of(&self, who: Address) -> Result<u128> {
        let balance = self
            .retry
            .run("eth_getBalance", || async {
                self.provider
                    .get_balance(who, None)
                    .await
                    .map_err(classify_provider)
            })
            .await?;
        to_wei(balance, "balance")
    }

    async fn transaction_count(&self, who: Address) -> Result<u64> {
        let count = self
            .retry
            .run("eth_getTransactionCount", || async {
                self.provider
                    .get_transaction_count(who, None)
                    .await
                    .map_err(classify_provider)
            })
            .await?;
        if count > U256::from(u64::MAX) {
            return Err(Error::Validation(format!("transaction count {count} out of range")));
        }
        Ok(count.as_u64())
    }

    async fn submit(&self, call: ContractCall) -> Result<H256> {
        tracing::info!(method = call.method(), value = %call.value(), "submitting transaction");
        let tx_hash = self.send(call).await?;
        tracing::info!(method = call.method(), tx_hash = %format!("{tx_hash:#x}"), "transaction sent");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx_hash: H256, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                match self.provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        if receipt.status == Some(U64::zero()) {
                            tracing::warn!(tx_hash = %format!("{tx_hash:#x}"), "transaction reverted");
                            return Err(Error::Revert {
                                message: "transaction mined with failed status".to_string(),
                                tx_hash: Some(tx_hash),
                            });
                        }
                        tracing::info!(
                            tx_hash = %format!("{tx_hash:#x}"),
                            block = ?receipt.block_number,
                            "transaction confirmed"
                        );
                        return Ok(());
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(tx_hash = %format!("{tx_hash:#x}"), "receipt lookup failed: {err}");
                    }
                }
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                tx_hash,
                waited: timeout,
            }),
        }
    }

    async fn probe(&self) -> Result<Probe> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(classify_provider)?
            .as_u64();
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(classify_provider)?
            .as_u64();
        let code = self
            .provider
            .get_code(self.contract_address, None)
            .await
            .map_err(classify_provider)?;
        let (state, state_error) = match self.read_state().await {
            Ok(state) => (Some(state), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Ok(Probe {
            chain_id,
            block_number,
            contract_address: self.contract_address,
            contract_has_code: !code.as_ref().is_empty(),
            state,
            state_error,
        })
    }
}

fn to_wei(value: U256, what: &str) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(Error::Validation(format!("{what} value {value} out of range")));
    }
    Ok(value.as_u128())
}

fn looks_like_revert(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("revert") || lower.contains("execution reverted")
}

fn classify_provider(err: ProviderError) -> Error {
    let message = err.to_string();
    if looks_like_revert(&message) {
        Error::Revert {
            message,
            tx_hash: None,
        }
    } else {
        Error::transient(message)
    }
}

fn classify_contract(err: ContractError<SignerClient>) -> Error {
    match err {
        ContractError::Revert(data) => Error::Revert {
            message: format!("call reverted with data {data}"),
            tx_hash: None,
        },
        other => {
            let message = other.to_string();
            if looks_like_revert(&message) {
                Error::Revert {
                    message,
                    tx_hash: None,
                }
            } else {
                Error::transient(message)
            }
        }
    }
}

// Simulation and nonce failures happen before broadcast. Anything else may
// have reached the mempool.
fn classify_send(err: ContractError<SignerClient>) -> Error {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if matches!(err, ContractError::Revert(_)) || looks_like_revert(&message) {
        return Error::Revert {
            message,
            tx_hash: None,
        };
    }
    let outcome = if lower.contains("insufficient funds")
        || lower.contains("gas")
        || lower.contains("nonce")
    {
        SubmissionOutcome::NotSent
    } else {
        SubmissionOutcome::Unknown
    };
    Error::Transient { message, outcome }
}
