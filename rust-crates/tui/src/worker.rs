use crate::{
    dealer_client::DealerClient,
    screen::Command,
};
use dealer::{
    chat::ChatTurn,
    table::TableView,
};
use ethers::types::Address;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};
use tracing::warn;

pub enum WorkerEvent {
    Table(TableView),
    TableError(String),
    Turn(Result<(String, Vec<ChatTurn>), String>),
    Chat(Result<(String, Vec<ChatTurn>), String>),
    Joined(Result<String, String>),
}

pub enum WorkerCommand {
    Run(Command),
    Shutdown,
}

/// Polls `/table` and runs dealer requests one at a time, so a slow move
/// never overlaps the next poll.
pub async fn poll_worker(
    poll_interval: Duration,
    client: DealerClient,
    player: Address,
    mut cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        let event = tokio::select! {
            _ = ticker.tick() => fetch_table(&client).await,
            cmd = cmd_rx.recv() => match cmd {
                Some(WorkerCommand::Run(command)) => run(&client, player, command).await,
                Some(WorkerCommand::Shutdown) | None => break,
            },
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

async fn fetch_table(client: &DealerClient) -> WorkerEvent {
    match client.table().await {
        Ok(view) => WorkerEvent::Table(view),
        Err(err) => {
            warn!(?err, "table poll failed");
            WorkerEvent::TableError(err.to_string())
        }
    }
}

async fn run(client: &DealerClient, player: Address, command: Command) -> WorkerEvent {
    match command {
        Command::Refresh => fetch_table(client).await,
        Command::DealerTurn(history) => {
            let result = client
                .dealer_turn(player, &history)
                .await
                .map(|reply| (reply.message, reply.new_history))
                .map_err(|e| e.to_string());
            WorkerEvent::Turn(result)
        }
        Command::Chat { message, history } => {
            let result = client
                .chat(player, &message, &history)
                .await
                .map(|reply| (reply.message, reply.new_history))
                .map_err(|e| e.to_string());
            WorkerEvent::Chat(result)
        }
        Command::Join => {
            let result = client
                .join()
                .await
                .map(|reply| reply.message)
                .map_err(|e| e.to_string());
            WorkerEvent::Joined(result)
        }
    }
}
