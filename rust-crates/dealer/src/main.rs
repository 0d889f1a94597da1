use anyhow::Context;
use clap::Parser;
use dealer::{
    app::{
        App,
        RunState,
        actix_dealer_api::ActixDealerApi,
    },
    config::{
        Args,
        DealerConfig,
    },
    dispatcher::{
        DispatchSettings,
        Dispatcher,
    },
    faucet::Faucet,
    gateway::evm::EvmGateway,
    init_tracing,
    llm::OpenAiAdvisor,
    tracker::InMemoryResponseTracker,
};
use deployments::DeploymentStore;
use std::sync::Arc;

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref()).context("installing tracing subscriber")?;

    let env = args.deployment_env();
    let store = DeploymentStore::new(env).context("opening deployments store")?;
    let record = store.load().context("loading deployment record")?;
    match &record {
        Some(record) => tracing::info!(
            contract = %record.contract_address,
            network = %record.network_url,
            registered_at = %record.registered_at,
            "using {env} deployment record"
        ),
        None => tracing::info!("no {env} deployment record; expecting CLI/env values"),
    }

    let config = DealerConfig::resolve(args, record).context("resolving configuration")?;
    tracing::debug!(?config, "resolved configuration");

    let gateway = EvmGateway::connect(config.evm.clone())
        .await
        .context("connecting to the table contract")?;
    let advisor = OpenAiAdvisor::new(config.llm.clone()).context("building LLM advisor")?;
    let faucet = config
        .faucet_url
        .clone()
        .map(|url| Faucet::new(url, env.dir_name()))
        .transpose()
        .context("building faucet client")?;
    let dispatcher = Dispatcher::new(
        gateway,
        advisor,
        Arc::new(InMemoryResponseTracker::default()),
        faucet,
        DispatchSettings {
            confirmation_timeout: config.confirmation_timeout,
            currency: config.currency.clone(),
        },
    );
    let api = ActixDealerApi::new(&config.host, Some(config.port))
        .await
        .context("starting dealer API")?;
    let mut app = App::new(dispatcher, api, config.autoplay);

    tracing::info!(autoplay = ?config.autoplay, "Starting dealer service");
    loop {
        let interrupt = handle_interupt();
        match app.run(interrupt).await? {
            RunState::Continue => continue,
            RunState::Exit => {
                tracing::info!("Exiting dealer service");
                return Ok(());
            }
        }
    }
}
