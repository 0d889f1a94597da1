use crate::{
    Error,
    Result,
    gateway::{
        DEFAULT_RPC_RETRIES,
        RetryPolicy,
        evm::EvmSettings,
        validate_confirmation_timeout,
    },
    llm::{
        DEFAULT_MODEL,
        LlmSettings,
    },
};
use clap::{
    ArgGroup,
    Parser,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    compute_abi_hash,
};
use ethers::types::Address;
use generated_abi::DICE_POKER_ABI;
use std::{
    fmt,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use url::Url;

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser, Clone, Debug, Default)]
#[command(
    name = "dealer",
    version,
    about = "Automated second seat for the dice poker table",
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["local", "test"])
            .required(true)
    )
)]
pub struct Args {
    /// Table contract; overrides the deployment record.
    #[arg(long, env = "CONTRACT_ADDRESS")]
    pub contract_address: Option<String>,

    /// JSON-RPC endpoint; overrides the deployment record.
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<Url>,

    #[arg(long, env = "CHAIN_ID")]
    pub chain_id: Option<u64>,

    #[arg(long, env = "AGENT_PRIVATE_KEY", hide_env_values = true)]
    pub agent_private_key: Option<String>,

    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: Option<Url>,

    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub llm_model: Option<String>,

    /// Testnet faucet used to top up the dealer wallet.
    #[arg(long, env = "FAUCET_URL")]
    pub faucet_url: Option<Url>,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: Option<String>,

    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long, default_value_t = 45)]
    pub confirmation_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_RPC_RETRIES)]
    pub rpc_retries: u32,

    /// Poll the table and move without waiting for `/ai-action`.
    #[arg(long, default_value = "false")]
    pub autoplay: bool,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[arg(long)]
    pub local: bool,

    #[arg(long)]
    pub test: bool,
}

impl Args {
    pub fn deployment_env(&self) -> DeploymentEnv {
        if self.local {
            DeploymentEnv::Local
        } else {
            DeploymentEnv::Test
        }
    }
}

/// Fully resolved settings; everything the process needs to start.
#[derive(Clone)]
pub struct DealerConfig {
    pub env: DeploymentEnv,
    pub evm: EvmSettings,
    pub llm: LlmSettings,
    pub faucet_url: Option<Url>,
    pub currency: String,
    pub host: String,
    pub port: u16,
    pub confirmation_timeout: Duration,
    pub autoplay: Option<Duration>,
}

impl fmt::Debug for DealerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DealerConfig")
            .field("env", &self.env)
            .field("evm", &self.evm)
            .field("llm", &self.llm)
            .field("faucet_url", &self.faucet_url.as_ref().map(Url::as_str))
            .field("currency", &self.currency)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .field("autoplay", &self.autoplay)
            .finish()
    }
}

impl DealerConfig {
    /// Merges CLI/env values over the deployment record. Any missing
    /// credential or endpoint is a configuration error.
    pub fn resolve(args: Args, record: Option<DeploymentRecord>) -> Result<Self> {
        let env = args.deployment_env();

        if let Some(record) = &record {
            let expected = compute_abi_hash(DICE_POKER_ABI);
            if !record.is_compatible_with_hash(&expected) {
                tracing::warn!(
                    recorded = %record.abi_hash,
                    current = %expected,
                    "deployment record was registered against a different ABI"
                );
            }
        }

        let raw_address = args
            .contract_address
            .or_else(|| record.as_ref().map(|r| r.contract_address.clone()))
            .ok_or_else(|| Error::missing("CONTRACT_ADDRESS"))?;
        let contract_address = parse_address(&raw_address)?;

        let rpc_url = match args.rpc_url {
            Some(url) => url,
            None => {
                let raw = record
                    .as_ref()
                    .map(|r| r.network_url.clone())
                    .ok_or_else(|| Error::missing("RPC_URL"))?;
                Url::parse(&raw)
                    .map_err(|e| Error::Configuration(format!("invalid RPC URL {raw}: {e}")))?
            }
        };
        let chain_id = args.chain_id.or(record.as_ref().map(|r| r.chain_id));

        let agent_private_key = non_empty(args.agent_private_key)
            .ok_or_else(|| Error::missing("AGENT_PRIVATE_KEY"))?;
        let api_key =
            non_empty(args.llm_api_key).ok_or_else(|| Error::missing("LLM_API_KEY"))?;
        let base_url = args.llm_base_url.ok_or_else(|| Error::missing("LLM_BASE_URL"))?;
        let model = non_empty(args.llm_model).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let confirmation_timeout =
            validate_confirmation_timeout(Duration::from_secs(args.confirmation_timeout_secs))?;
        let autoplay = args.autoplay.then(|| {
            Duration::from_millis(args.poll_interval_ms)
                .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
        });

        let currency = record
            .as_ref()
            .map(|r| r.currency_symbol.clone())
            .unwrap_or_else(|| env.currency_symbol().to_string());

        Ok(Self {
            env,
            evm: EvmSettings {
                rpc_url,
                contract_address,
                agent_private_key,
                chain_id,
                retry: RetryPolicy::with_attempts(args.rpc_retries),
            },
            llm: LlmSettings {
                base_url,
                api_key,
                model,
            },
            faucet_url: args.faucet_url,
            currency,
            host: args.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: args.port.unwrap_or(DEFAULT_PORT),
            confirmation_timeout,
            autoplay,
        })
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    Address::from_str(trimmed)
        .map_err(|_| Error::Configuration(format!("invalid contract address '{raw}'")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::ErrorCategory;

    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn args() -> Args {
        Args {
            contract_address: Some(CONTRACT.to_string()),
            rpc_url: Some(Url::parse("http://127.0.0.1:8545").unwrap()),
            agent_private_key: Some("0xabc".to_string()),
            llm_api_key: Some("sk-test".to_string()),
            llm_base_url: Some(Url::parse("https://api.openai.com/v1").unwrap()),
            confirmation_timeout_secs: 45,
            rpc_retries: 3,
            poll_interval_ms: 2500,
            local: true,
            ..Args::default()
        }
    }

    fn record() -> DeploymentRecord {
        DeploymentRecord {
            registered_at: "2026-01-01T00:00:00Z".to_string(),
            contract_address: "0x00000000000000000000000000000000000000aa".to_string(),
            network_url: "https://testnet.evm.nodes.onflow.org".to_string(),
            chain_id: 545,
            currency_symbol: "FLOW".to_string(),
            abi_hash: compute_abi_hash(DICE_POKER_ABI),
            deployment_block_height: Some(10),
        }
    }

    #[test]
    fn resolve__uses_cli_values_over_the_record() {
        // given
        let args = args();

        // when
        let config = DealerConfig::resolve(args, Some(record())).unwrap();

        // then
        assert_eq!(config.evm.contract_address, parse_address(CONTRACT).unwrap());
        assert_eq!(config.evm.rpc_url.as_str(), "http://127.0.0.1:8545/");
        assert_eq!(config.evm.chain_id, Some(545));
        assert_eq!(config.currency, "FLOW");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.autoplay, None);
    }

    #[test]
    fn resolve__falls_back_to_the_record() {
        let args = Args {
            contract_address: None,
            rpc_url: None,
            ..args()
        };

        let config = DealerConfig::resolve(args, Some(record())).unwrap();

        assert_eq!(
            config.evm.contract_address,
            Address::from_low_u64_be(0xaa)
        );
        assert_eq!(config.evm.rpc_url.host_str(), Some("testnet.evm.nodes.onflow.org"));
    }

    #[test]
    fn resolve__missing_values_are_configuration_errors() {
        let cases = [
            Args {
                contract_address: None,
                ..args()
            },
            Args {
                rpc_url: None,
                ..args()
            },
            Args {
                agent_private_key: Some("  ".to_string()),
                ..args()
            },
            Args {
                llm_api_key: None,
                ..args()
            },
        ];
        for args in cases {
            let err = DealerConfig::resolve(args, None).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Configuration, "{err}");
        }
    }

    #[test]
    fn resolve__rejects_timeouts_outside_range() {
        for secs in [29, 61] {
            let args = Args {
                confirmation_timeout_secs: secs,
                ..args()
            };
            assert!(DealerConfig::resolve(args, None).is_err(), "{secs}");
        }
        let args = Args {
            confirmation_timeout_secs: 30,
            ..args()
        };
        assert!(DealerConfig::resolve(args, None).is_ok());
    }

    #[test]
    fn resolve__clamps_the_poll_interval() {
        let args = Args {
            autoplay: true,
            poll_interval_ms: 500,
            ..args()
        };

        let config = DealerConfig::resolve(args, None).unwrap();

        assert_eq!(config.autoplay, Some(MIN_POLL_INTERVAL));
    }

    #[test]
    fn resolve__rejects_a_garbled_contract_address() {
        let args = Args {
            contract_address: Some("0xnot-an-address".to_string()),
            ..args()
        };
        let err = DealerConfig::resolve(args, None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn args__require_a_network() {
        let result = Args::try_parse_from(["dealer"]);
        assert!(result.is_err());
        let args = Args::try_parse_from(["dealer", "--test"]).unwrap();
        assert_eq!(args.deployment_env(), DeploymentEnv::Test);
    }
}
