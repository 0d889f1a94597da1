use anyhow::{
    Context,
    Result,
};
use clap::{
    ArgGroup,
    Parser,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    DeploymentStore,
    compute_abi_hash,
};
use dice_poker_game::{
    GameState,
    amount::format_units,
};
use ethers::{
    providers::{
        Http,
        Middleware,
        Provider,
    },
    signers::{
        LocalWallet,
        Signer,
    },
    types::{
        Address,
        U256,
    },
};
use generated_abi::{
    DICE_POKER_ABI,
    dice_poker_at,
};
use std::{
    str::FromStr,
    sync::Arc,
};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "table-cli",
    about = "Register, inspect and check balances for a dice poker table deployment",
    version,
    group(
        ArgGroup::new("network")
            .args(["test", "local"])
            .required(true)
    )
)]
struct Args {
    /// Flow EVM testnet
    #[arg(long)]
    test: bool,

    /// Local development chain
    #[arg(long)]
    local: bool,

    /// Override RPC URL
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<Url>,

    /// Table contract (required for register, otherwise read from the record)
    #[arg(long, env = "CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// Block the contract was deployed at (register only)
    #[arg(long)]
    deployment_block: Option<u64>,

    /// Account to report on (balance only, defaults to the dealer wallet)
    #[arg(long)]
    address: Option<String>,

    #[arg(long, env = "AGENT_PRIVATE_KEY", hide_env_values = true)]
    agent_private_key: Option<String>,

    /// Which action to perform (defaults to probe)
    #[arg(short, long, value_enum, default_value = "probe")]
    action: Action,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum Action {
    Register,
    Probe,
    Balance,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    deployments::ensure_structure().context("initializing deployment directories")?;

    let env = if args.test {
        DeploymentEnv::Test
    } else {
        DeploymentEnv::Local
    };
    let store = DeploymentStore::new(env).context("opening deployment store")?;
    let record = store.load().context("loading deployment record")?;

    let rpc_url = match (&args.rpc_url, &record) {
        (Some(url), _) => url.to_string(),
        (None, Some(record)) => record.network_url.clone(),
        (None, None) => env.default_network_url().to_string(),
    };
    let provider = Provider::<Http>::try_from(rpc_url.as_str())
        .with_context(|| format!("invalid RPC URL {rpc_url}"))?;

    match args.action {
        Action::Register => register(&args, env, &store, &provider, &rpc_url).await,
        Action::Probe => {
            let contract = contract_address(&args, record.as_ref())?;
            probe(&provider, contract).await
        }
        Action::Balance => {
            let contract = contract_address(&args, record.as_ref())?;
            balance(&args, env, &provider, contract).await
        }
    }
}

async fn register(
    args: &Args,
    env: DeploymentEnv,
    store: &DeploymentStore,
    provider: &Provider<Http>,
    rpc_url: &str,
) -> Result<()> {
    let raw = args
        .contract_address
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--contract-address is required to register"))?;
    let contract = parse_address(raw)?;
    let code = provider
        .get_code(contract, None)
        .await
        .context("fetching contract code")?;
    if code.as_ref().is_empty() {
        anyhow::bail!("no contract code at {contract:#x} on {rpc_url}");
    }
    let chain_id = provider
        .get_chainid()
        .await
        .context("fetching chain id")?
        .as_u64();
    if chain_id != env.default_chain_id() {
        println!(
            "Warning: chain id {chain_id} differs from the usual {} for {env}",
            env.default_chain_id()
        );
    }

    let record = deployments::record_deployment(
        store,
        env,
        format!("{contract:#x}"),
        rpc_url,
        chain_id,
        compute_abi_hash(DICE_POKER_ABI),
        args.deployment_block,
    )
    .context("recording deployment")?;
    print_record(&record);
    println!("Deployment metadata written to {}", store.path().display());
    Ok(())
}

async fn probe(provider: &Provider<Http>, contract: Address) -> Result<()> {
    let chain_id = provider.get_chainid().await.context("fetching chain id")?;
    let block = provider
        .get_block_number()
        .await
        .context("fetching block number")?;
    let code = provider
        .get_code(contract, None)
        .await
        .context("fetching contract code")?;

    println!("Chain id:        {chain_id}");
    println!("Latest block:    {block}");
    println!("Contract:        {contract:#x}");
    println!("Code present:    {}", !code.as_ref().is_empty());
    if code.as_ref().is_empty() {
        return Ok(());
    }

    let table = dice_poker_at(contract, Arc::new(provider.clone()));
    match table.current_state().call().await {
        Ok(code) => match GameState::new(u64::from(code)) {
            Ok(state) => println!("State:           {state} ({})", state.name()),
            Err(e) => println!("State:           {code} ({e})"),
        },
        Err(e) => println!("State:           unreadable ({e})"),
    }
    for seat in 0..2u64 {
        let player = table
            .players(U256::from(seat))
            .call()
            .await
            .context("reading players")?;
        let shown = if player.is_zero() {
            "open".to_string()
        } else {
            format!("{player:#x}")
        };
        println!("Seat {seat}:          {shown}");
    }
    Ok(())
}

async fn balance(
    args: &Args,
    env: DeploymentEnv,
    provider: &Provider<Http>,
    contract: Address,
) -> Result<()> {
    let account = match (&args.address, &args.agent_private_key) {
        (Some(raw), _) => parse_address(raw)?,
        (None, Some(key)) => {
            let wallet = LocalWallet::from_str(key.trim().trim_start_matches("0x"))
                .map_err(|_| anyhow::anyhow!("invalid AGENT_PRIVATE_KEY"))?;
            wallet.address()
        }
        (None, None) => {
            anyhow::bail!("pass --address or set AGENT_PRIVATE_KEY to pick an account")
        }
    };
    let symbol = env.currency_symbol();
    let balance = provider
        .get_balance(account, None)
        .await
        .context("fetching account balance")?;
    let table = dice_poker_at(contract, Arc::new(provider.clone()));
    let pot = table.pot().call().await.context("reading pot")?;
    let current_bet = table
        .current_bet()
        .call()
        .await
        .context("reading current bet")?;

    println!("Account {account:#x}");
    println!("  Balance:      {} {symbol}", units(balance)?);
    println!("  Table pot:    {} {symbol}", units(pot)?);
    println!("  Current bet:  {} {symbol}", units(current_bet)?);
    Ok(())
}

fn units(value: U256) -> Result<String> {
    if value > U256::from(u128::MAX) {
        anyhow::bail!("value {value} out of range");
    }
    Ok(format_units(value.as_u128()))
}

fn parse_address(raw: &str) -> Result<Address> {
    Address::from_str(raw.trim()).map_err(|_| anyhow::anyhow!("unable to parse address: {raw}"))
}

fn contract_address(args: &Args, record: Option<&DeploymentRecord>) -> Result<Address> {
    match (&args.contract_address, record) {
        (Some(raw), _) => parse_address(raw),
        (None, Some(record)) => parse_address(&record.contract_address)
            .context("parsing contract address from deployment record"),
        (None, None) => Err(anyhow::anyhow!(
            "no deployment found for this environment; pass --contract-address"
        )),
    }
}

fn print_record(record: &DeploymentRecord) {
    println!("Registered table contract {}", record.contract_address);
    println!("  network:  {} (chain {})", record.network_url, record.chain_id);
    println!("  currency: {}", record.currency_symbol);
    println!("  abi hash: {}", record.abi_hash);
    if let Some(height) = record.deployment_block_height {
        println!("  block:    {height}");
    }
}
