use crate::{
    Error,
    ErrorCategory,
    Result,
    SubmissionOutcome,
    app::dealer_api::{
        ActionRequest,
        ChatRequest,
        DealerApi,
        Failure,
        GameOverRequest,
        ReplyOutcome,
        Request,
        Responder,
    },
    chat::ChatTurn,
    gateway::Probe,
    table::TableView,
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    ResponseError,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use dice_poker_game::{
    Action,
    GameState,
    Seat,
};
use ethers::types::{
    Address,
    H256,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::TcpListener,
    str::FromStr,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

const REQUEST_QUEUE: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionBody {
    pub player_address: String,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub player_address: String,
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// The pot arrives either as a display string or as a bare number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PotValue {
    Text(String),
    Number(f64),
}

impl PotValue {
    fn display(&self) -> String {
        match self {
            PotValue::Text(text) => text.trim().to_string(),
            PotValue::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameOverBody {
    pub player_won: bool,
    pub player_address: String,
    #[serde(default)]
    pub final_pot: Option<PotValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub message: String,
    pub tx_hash: H256,
    pub ai_address: Address,
    pub ai_player_index: usize,
    pub ai_seat: Seat,
    pub game_state: GameState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    pub new_history: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<H256>,
    pub outcome: ReplyOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub success: bool,
    pub message: String,
    pub new_history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableResponse {
    pub success: bool,
    pub message: String,
    pub table: TableView,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub probe: Probe,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub error: String,
    pub category: ErrorCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SubmissionOutcome>,
}

impl ErrorCategory {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::TurnLegality | ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::Revert | ErrorCategory::Llm => StatusCode::BAD_GATEWAY,
            ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl Failure {
    pub fn to_body(&self) -> ErrorResponse {
        let details = match &self.error {
            Error::Timeout { tx_hash, .. }
            | Error::Revert {
                tx_hash: Some(tx_hash),
                ..
            } => Some(format!("transaction {tx_hash:#x}")),
            _ => None,
        };
        ErrorResponse {
            success: false,
            message: self.message.clone(),
            error: self.error.to_string(),
            category: self.category(),
            details,
            action: self.action,
            outcome: self.error.submission_outcome(),
        }
    }
}

impl ResponseError for Failure {
    fn status_code(&self) -> StatusCode {
        self.category().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_body())
    }
}

/// HTTP front end that turns each call into a [`Request`] for the app loop.
pub struct ActixDealerApi {
    receiver: mpsc::Receiver<Request>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixDealerApi {
    /// Binds `host:port`; port `0` (or `None`) picks a free one.
    pub async fn new(host: &str, port: Option<u16>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(REQUEST_QUEUE);

        let listener = TcpListener::bind((host, port.unwrap_or(0))).map_err(|e| {
            Error::Configuration(format!("failed to bind HTTP listener on {host}: {e}"))
        })?;
        let address = listener.local_addr().map_err(|e| {
            Error::Configuration(format!("failed to read listener address: {e}"))
        })?;
        let base_url = format!("http://{}", address);

        tracing::info!("dealer API listening on {}", base_url);

        let server = HttpServer::new(move || {
            let sender = sender.clone();
            let json_config = web::JsonConfig::default().error_handler(|err, _req| {
                let failure = Failure::from(Error::Validation(err.to_string()));
                actix_web::error::InternalError::from_response(err, failure.error_response())
                    .into()
            });
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(sender))
                .app_data(json_config)
                .route("/ai-join", web::post().to(handle_join))
                .route("/ai-action", web::post().to(handle_action))
                .route("/ai-chat", web::post().to(handle_chat))
                .route("/ai-game-over", web::post().to(handle_game_over))
                .route("/table", web::get().to(handle_table))
                .route("/health", web::get().to(handle_health))
        })
        .workers(2)
        .listen(listener)
        .map_err(|e| Error::Configuration(format!("failed to start Actix server: {e}")))?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            if let Err(err) = sys.block_on(server) {
                tracing::error!("dealer API server stopped: {err}");
            }
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl DealerApi for ActixDealerApi {
    async fn next_request(&mut self) -> Result<Request> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| Error::Configuration("dealer API server closed".to_string()))
    }
}

impl Drop for ActixDealerApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

fn parse_player(raw: &str) -> std::result::Result<Address, Failure> {
    Address::from_str(raw.trim()).map_err(|_| {
        Failure::from(Error::Validation(format!("invalid playerAddress '{raw}'")))
    })
}

async fn forward<T>(
    sender: &mpsc::Sender<Request>,
    request: impl FnOnce(Responder<T>) -> Request,
) -> std::result::Result<T, Failure> {
    let (respond, response) = oneshot::channel();
    sender
        .send(request(respond))
        .await
        .map_err(|_| Failure::from(Error::transient("dealer loop is not running")))?;
    response
        .await
        .map_err(|_| Failure::from(Error::transient("dealer loop dropped the request")))?
}

async fn handle_join(
    sender: web::Data<mpsc::Sender<Request>>,
) -> std::result::Result<web::Json<JoinResponse>, Failure> {
    tracing::info!("received join request");
    let receipt = forward(&sender, Request::Join).await?;
    Ok(web::Json(JoinResponse {
        success: true,
        message: receipt.message,
        tx_hash: receipt.tx_hash,
        ai_address: receipt.agent,
        ai_player_index: receipt.seat.index(),
        ai_seat: receipt.seat,
        game_state: receipt.state,
    }))
}

async fn handle_action(
    sender: web::Data<mpsc::Sender<Request>>,
    body: web::Json<ActionBody>,
) -> std::result::Result<web::Json<ActionResponse>, Failure> {
    let ActionBody {
        player_address,
        chat_history,
    } = body.into_inner();
    let player = parse_player(&player_address)?;
    let reply = forward(&sender, |respond| {
        Request::Action(ActionRequest {
            player,
            history: chat_history,
            respond,
        })
    })
    .await?;
    Ok(web::Json(ActionResponse {
        success: true,
        message: reply.message,
        new_history: reply.new_history,
        action: reply.action,
        tx_hash: reply.tx_hash,
        outcome: reply.outcome,
    }))
}

async fn handle_chat(
    sender: web::Data<mpsc::Sender<Request>>,
    body: web::Json<ChatBody>,
) -> std::result::Result<web::Json<ChatResponse>, Failure> {
    let ChatBody {
        player_address,
        message,
        chat_history,
    } = body.into_inner();
    let player = parse_player(&player_address)?;
    let reply = forward(&sender, |respond| {
        Request::Chat(ChatRequest {
            player,
            message,
            history: chat_history,
            respond,
        })
    })
    .await?;
    Ok(web::Json(ChatResponse {
        success: true,
        message: reply.message,
        new_history: reply.new_history,
    }))
}

async fn handle_game_over(
    sender: web::Data<mpsc::Sender<Request>>,
    body: web::Json<GameOverBody>,
) -> std::result::Result<web::Json<MessageResponse>, Failure> {
    let GameOverBody {
        player_won,
        player_address,
        final_pot,
    } = body.into_inner();
    let player = parse_player(&player_address)?;
    let message = forward(&sender, |respond| {
        Request::GameOver(GameOverRequest {
            player,
            player_won,
            final_pot: final_pot.as_ref().map(PotValue::display),
            respond,
        })
    })
    .await?;
    Ok(web::Json(MessageResponse {
        success: true,
        message,
    }))
}

async fn handle_table(
    sender: web::Data<mpsc::Sender<Request>>,
) -> std::result::Result<web::Json<TableResponse>, Failure> {
    let table = forward(&sender, Request::Table).await?;
    Ok(web::Json(TableResponse {
        success: true,
        message: table.state.to_string(),
        table,
    }))
}

async fn handle_health(
    sender: web::Data<mpsc::Sender<Request>>,
) -> std::result::Result<web::Json<HealthResponse>, Failure> {
    let probe = forward(&sender, Request::Health).await?;
    let message = if probe.contract_has_code {
        "Table contract reachable".to_string()
    } else {
        format!("No contract code at {:#x}", probe.contract_address)
    };
    Ok(web::Json(HealthResponse {
        success: probe.contract_has_code,
        message,
        probe,
    }))
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatcher::JoinReceipt,
        test_helpers::dealer_address,
    };
    use serde_json::{
        Value,
        json,
    };

    const PLAYER: &str = "0x1111111111111111111111111111111111111111";

    #[tokio::test]
    async fn next_request__forwards_join_and_returns_the_receipt() {
        // given
        let mut api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let url = format!("{}/ai-join", api.base_url());
        let client_task = tokio::spawn(async move {
            let response = reqwest::Client::new().post(url).send().await.unwrap();
            (response.status(), response.json::<JoinResponse>().await.unwrap())
        });

        // when
        let respond = match api.next_request().await.unwrap() {
            Request::Join(respond) => respond,
            other => panic!("expected join request, got {other:?}"),
        };
        respond
            .send(Ok(JoinReceipt {
                tx_hash: H256::repeat_byte(7),
                agent: dealer_address(),
                seat: Seat::Second,
                state: GameState::new(1).unwrap(),
                message: "Deal me in.".to_string(),
            }))
            .unwrap();

        // then
        let (status, body) = client_task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.ai_player_index, 1);
        assert_eq!(body.ai_address, dealer_address());
    }

    #[tokio::test]
    async fn next_request__failure_maps_category_to_status() {
        // given
        let mut api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let url = format!("{}/ai-join", api.base_url());
        let client_task = tokio::spawn(async move {
            let response = reqwest::Client::new().post(url).send().await.unwrap();
            (response.status(), response.json::<ErrorResponse>().await.unwrap())
        });

        // when
        let Request::Join(respond) = api.next_request().await.unwrap() else {
            panic!("expected join request");
        };
        respond
            .send(Err(Failure::from(Error::TurnLegality(
                "the table is full".to_string(),
            ))))
            .unwrap();

        // then
        let (status, body) = client_task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.category, ErrorCategory::TurnLegality);
        assert_eq!(body.error, "the table is full");
        assert_eq!(body.message, ErrorCategory::TurnLegality.public_message());
    }

    #[tokio::test]
    async fn handle_action__rejects_malformed_json_without_reaching_the_loop() {
        // given
        let api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let url = format!("{}/ai-action", api.base_url());

        // when
        let response = reqwest::Client::new()
            .post(url)
            .header("content-type", "application/json")
            .body("{\"chatHistory\": 12}")
            .send()
            .await
            .unwrap();

        // then
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["category"], json!("validation"));
    }

    #[tokio::test]
    async fn handle_chat__rejects_a_bad_player_address() {
        let api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let url = format!("{}/ai-chat", api.base_url());

        let response = reqwest::Client::new()
            .post(url)
            .json(&json!({"playerAddress": "bob", "message": "hi", "chatHistory": []}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.category, ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn handle_game_over__accepts_a_numeric_pot() {
        // given
        let mut api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let url = format!("{}/ai-game-over", api.base_url());
        let client_task = tokio::spawn(async move {
            reqwest::Client::new()
                .post(url)
                .json(&json!({"playerWon": true, "playerAddress": PLAYER, "finalPot": 12.5}))
                .send()
                .await
                .unwrap()
                .json::<MessageResponse>()
                .await
                .unwrap()
        });

        // when
        let Request::GameOver(request) = api.next_request().await.unwrap() else {
            panic!("expected game over request");
        };
        assert!(request.player_won);
        assert_eq!(request.final_pot.as_deref(), Some("12.5"));
        request.respond.send(Ok("Well played.".to_string())).unwrap();

        // then
        let body = client_task.await.unwrap();
        assert_eq!(body.message, "Well played.");
    }

    #[test]
    fn to_body__carries_outcome_and_tx_for_timeouts() {
        let failure = Failure::new(
            Error::Timeout {
                tx_hash: H256::repeat_byte(1),
                waited: std::time::Duration::from_secs(45),
            },
            Some(Action::Roll),
        );

        let body = failure.to_body();

        assert_eq!(body.outcome, Some(SubmissionOutcome::Unknown));
        assert_eq!(body.action, Some(Action::Roll));
        assert!(body.details.unwrap().starts_with("transaction 0x0101"));
        assert_eq!(failure.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }
}
