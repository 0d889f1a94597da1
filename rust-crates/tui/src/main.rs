use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use ethers::types::Address;
use std::{
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use table_tui::{
    dealer_client::DealerClient,
    init_file_tracing,
    screen::{
        Command,
        TableScreen,
    },
    ui::{
        self,
        Term,
        UserEvent,
    },
    worker::{
        WorkerCommand,
        WorkerEvent,
        poll_worker,
    },
};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "table-tui",
    about = "Watch a dice poker table and let the dealer take its turns",
    version
)]
struct Args {
    /// Dealer service base URL
    #[arg(long, env = "DEALER_URL", default_value = "http://127.0.0.1:3030")]
    dealer_url: String,

    /// Your wallet address; keys the dealer's chat throttle
    #[arg(long, env = "PLAYER_ADDRESS")]
    player: String,

    #[arg(long, default_value_t = 2500)]
    poll_interval_ms: u64,

    #[arg(long, default_value = ".logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    std::fs::create_dir_all(&args.log_dir).wrap_err("creating log directory")?;
    let _log_guard = init_file_tracing(&args.log_dir).wrap_err("installing tracing subscriber")?;

    let player = Address::from_str(args.player.trim())
        .map_err(|_| eyre!("--player must be an 0x address, got '{}'", args.player))?;
    let client = DealerClient::new(args.dealer_url)?;
    let poll_interval = Duration::from_millis(args.poll_interval_ms.clamp(2_000, 10_000));
    tracing::info!(dealer = %client.base_url(), ?poll_interval, "starting table view");

    let mut terminal = ui::terminal_enter()?;
    let res = run_loop(&mut terminal, client, player, poll_interval).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    terminal: &mut Term,
    client: DealerClient,
    player: Address,
    poll_interval: Duration,
) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(poll_worker(poll_interval, client, player, cmd_rx, event_tx));
    let mut input_events = ui::input_event_stream();
    let mut screen = TableScreen::default();
    let send = |command: Command| {
        let _ = cmd_tx.send(WorkerCommand::Run(command));
    };

    ui::draw(terminal, &screen)?;
    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    tracing::warn!("poll worker stopped");
                    break;
                };
                let follow_up = match event {
                    WorkerEvent::Table(view) => screen.on_table(view),
                    WorkerEvent::TableError(err) => {
                        screen.push_error(format!("Table poll failed: {err}"));
                        None
                    }
                    WorkerEvent::Turn(result) => Some(screen.on_turn(result)),
                    WorkerEvent::Chat(result) => {
                        screen.on_chat(result);
                        None
                    }
                    WorkerEvent::Joined(result) => Some(screen.on_joined(result)),
                };
                if let Some(command) = follow_up {
                    send(command);
                }
                ui::draw(terminal, &screen).wrap_err("draw after dealer update failed")?;
            }
            maybe_key = input_events.recv() => {
                let Some(key) = maybe_key else {
                    break;
                };
                let Some(event) = ui::interpret_key(&mut screen, key) else {
                    continue;
                };
                match event {
                    UserEvent::Quit => break,
                    UserEvent::Join => {
                        screen.status = "Asking the dealer to sit down...".to_string();
                        send(Command::Join);
                    }
                    UserEvent::Refresh => {
                        screen.errors.clear();
                        send(Command::Refresh);
                    }
                    UserEvent::StartChat => screen.begin_input(),
                    UserEvent::SendChat => {
                        if let Some(command) = screen.submit_input() {
                            send(command);
                        }
                    }
                    UserEvent::Redraw => {}
                }
                ui::draw(terminal, &screen).wrap_err("draw after key press failed")?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    if let Err(err) = worker.await {
        tracing::warn!(?err, "poll worker panicked");
    }
    Ok(())
}
