use crate::{
    ErrorCategory,
    Result,
    app::dealer_api::{
        ActionRequest,
        ChatReply,
        ChatRequest,
        DealerApi,
        Failure,
        GameOverRequest,
        ReplyOutcome,
        Request,
        Responder,
        TurnReply,
    },
    banter,
    chat::{
        ChatTurn,
        extend_history,
    },
    dispatcher::{
        Dispatcher,
        TurnOutcome,
    },
    gateway::ContractGateway,
    llm::Advisor,
    table::read_table,
};
use dice_poker_game::GameState;
use std::time::{
    Duration,
    Instant,
};
use tokio::time::{
    Interval,
    MissedTickBehavior,
};

pub mod actix_dealer_api;
pub mod dealer_api;


const AUTOPLAY_KEY: &str = "autoplay";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Continue,
    Exit,
}

/// Serves API requests one at a time, optionally polling the table between
/// them.
pub struct App<G, A, Api> {
    dispatcher: Dispatcher<G, A>,
    api: Api,
    autoplay: Option<Interval>,
}

impl<G, A, Api> App<G, A, Api> {
    pub fn new(dispatcher: Dispatcher<G, A>, api: Api, autoplay: Option<Duration>) -> Self {
        let autoplay = autoplay.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self {
            dispatcher,
            api,
            autoplay,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn dispatcher(&self) -> &Dispatcher<G, A> {
        &self.dispatcher
    }
}

async fn next_tick(autoplay: &mut Option<Interval>) {
    match autoplay {
        Some(interval) => {
            interval.tick().await;
        }
        None => futures::future::pending::<()>().await,
    }
}

impl<G: ContractGateway, A: Advisor, Api: DealerApi> App<G, A, Api> {
    pub async fn run(&mut self, interrupt: impl Future<Output = ()>) -> Result<RunState> {
        tokio::select! {
            _ = interrupt => {
                Ok(RunState::Exit)
            }
            request = self.api.next_request() => {
                self.handle(request?).await;
                Ok(RunState::Continue)
            }
            _ = next_tick(&mut self.autoplay) => {
                self.autoplay_tick().await;
                Ok(RunState::Continue)
            }
        }
    }

    async fn handle(&self, request: Request) {
        match request {
            Request::Join(respond) => {
                tracing::info!("join requested");
                let result = self.dispatcher.join_table().await.map_err(Failure::from);
                reply(respond, result);
            }
            Request::Action(request) => self.handle_action(request).await,
            Request::Chat(request) => self.handle_chat(request),
            Request::GameOver(request) => self.handle_game_over(request),
            Request::Table(respond) => {
                let agent = self.dispatcher.gateway().agent_address();
                let result = match read_table(self.dispatcher.gateway()).await {
                    Ok(table) => table.view(agent).map_err(Failure::from),
                    Err(error) => Err(Failure::from(error)),
                };
                reply(respond, result);
            }
            Request::Health(respond) => {
                let result = self.dispatcher.gateway().probe().await.map_err(Failure::from);
                reply(respond, result);
            }
        }
    }

    async fn handle_action(&self, request: ActionRequest) {
        let ActionRequest {
            player,
            history,
            respond,
        } = request;
        let player = format!("{player:#x}");
        tracing::info!(%player, "turn requested");
        let report = self.dispatcher.take_turn(&player, &history).await;
        let result = match report.outcome {
            TurnOutcome::Confirmed {
                action, tx_hash, ..
            } => Ok(TurnReply {
                new_history: extend_history(&history, &report.message),
                message: report.message,
                action: Some(action),
                tx_hash: Some(tx_hash),
                outcome: ReplyOutcome::Confirmed,
            }),
            TurnOutcome::NoOp { .. } => Ok(TurnReply {
                message: report.message,
                new_history: history,
                action: None,
                tx_hash: None,
                outcome: ReplyOutcome::NoOp,
            }),
            TurnOutcome::Failed { action, error, .. } => Err(Failure {
                error,
                message: report.message,
                action,
            }),
        };
        reply(respond, result);
    }

    fn handle_chat(&self, request: ChatRequest) {
        let ChatRequest {
            player,
            message,
            history,
            respond,
        } = request;
        let player = format!("{player:#x}");
        let mut new_history = history;
        new_history.push(ChatTurn::human(message.clone()));

        let tracker = self.dispatcher.tracker();
        let answer = if tracker.try_acquire(&player, Instant::now()) {
            let line = banter::chat_reply(&message, new_history.len(), &mut rand::rng());
            new_history.push(ChatTurn::ai(line.clone()));
            line
        } else {
            tracing::debug!(%player, "chat throttled");
            String::new()
        };
        reply(
            respond,
            Ok(ChatReply {
                message: answer,
                new_history,
            }),
        );
    }

    fn handle_game_over(&self, request: GameOverRequest) {
        let GameOverRequest {
            player,
            player_won,
            final_pot,
            respond,
        } = request;
        let player = format!("{player:#x}");
        tracing::info!(%player, player_won, "game over");
        self.dispatcher.tracker().reset(&player);
        let line = banter::game_over_line(player_won, final_pot.as_deref(), &mut rand::rng());
        reply(respond, Ok(line));
    }

    async fn autoplay_tick(&self) {
        let report = self.dispatcher.take_turn(AUTOPLAY_KEY, &[]).await;
        match report.outcome {
            TurnOutcome::NoOp {
                state: GameState::JOINING,
                seat: None,
            } => self.autoplay_join().await,
            TurnOutcome::NoOp { .. } => {}
            TurnOutcome::Confirmed { action, .. } => {
                tracing::info!(%action, message = %report.message, "autoplay moved");
            }
            TurnOutcome::Failed { stage, .. } => {
                tracing::warn!(?stage, message = %report.message, "autoplay turn failed");
            }
        }
    }

    async fn autoplay_join(&self) {
        match self.dispatcher.join_table().await {
            Ok(receipt) => tracing::info!(seat = %receipt.seat, "autoplay joined"),
            Err(error) if error.category() == ErrorCategory::TurnLegality => {
                tracing::trace!("autoplay join skipped: {error}");
            }
            Err(error) => tracing::warn!("autoplay join failed: {error}"),
        }
    }
}

fn reply<T>(respond: Responder<T>, result: std::result::Result<T, Failure>) {
    if respond.send(result).is_err() {
        tracing::debug!("requester went away before the reply");
    }
}
