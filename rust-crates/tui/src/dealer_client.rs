use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use dealer::{
    app::actix_dealer_api::{
        ActionBody,
        ActionResponse,
        ChatBody,
        ChatResponse,
        ErrorResponse,
        JoinResponse,
        TableResponse,
    },
    chat::ChatTurn,
    table::TableView,
};
use ethers::types::Address;
use reqwest::StatusCode;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// HTTP client for the dealer service.
#[derive(Clone, Debug)]
pub struct DealerClient {
    base_url: String,
    http: reqwest::Client,
}

impl DealerClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .wrap_err("failed to build HTTP client for dealer")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn table(&self) -> Result<TableView> {
        let url = format!("{}/table", self.base_url);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("dealer request failed")?;
        let dto: TableResponse = decode(res, "table").await?;
        Ok(dto.table)
    }

    pub async fn join(&self) -> Result<JoinResponse> {
        let url = format!("{}/ai-join", self.base_url);
        let res = self
            .http
            .post(url)
            .send()
            .await
            .wrap_err("dealer request failed")?;
        decode(res, "join").await
    }

    pub async fn dealer_turn(
        &self,
        player: Address,
        history: &[ChatTurn],
    ) -> Result<ActionResponse> {
        let body = ActionBody {
            player_address: format!("{player:#x}"),
            chat_history: history.to_vec(),
        };
        self.post("ai-action", &body).await
    }

    pub async fn chat(
        &self,
        player: Address,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<ChatResponse> {
        let body = ChatBody {
            player_address: format!("{player:#x}"),
            message: message.to_string(),
            chat_history: history.to_vec(),
        };
        self.post("ai-chat", &body).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .wrap_err("dealer request failed")?;
        decode(res, path).await
    }
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response, what: &str) -> Result<T> {
    let status = res.status();
    let bytes = res
        .bytes()
        .await
        .wrap_err("failed to read dealer response body")?;
    if status.is_success() {
        return serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("invalid dealer {what} payload"));
    }
    match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(err) => Err(eyre!(
            "{} ({}, {status})",
            err.message,
            err.category
        )),
        Err(_) if status == StatusCode::NOT_FOUND => {
            Err(eyre!("dealer has no {what} endpoint; is the URL right?"))
        }
        Err(_) => {
            let body = String::from_utf8_lossy(&bytes);
            Err(eyre!("dealer responded with {status} for {what}: {body}"))
        }
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use dealer::{
        Error,
        app::{
            actix_dealer_api::ActixDealerApi,
            dealer_api::{
                DealerApi,
                Failure,
                Request,
            },
        },
        table::SeatView,
    };
    use dice_poker_game::{
        Dice,
        GameState,
        HandStrength,
        Seat,
    };

    fn view() -> TableView {
        TableView {
            state: GameState::new(2).unwrap(),
            phase: "Player1BetOrCall1".to_string(),
            round: Some(1),
            revealed_dice: 0,
            turn: Some(Seat::Second),
            dealer_seat: Some(Seat::Second),
            pot: "0".to_string(),
            current_bet: "0".to_string(),
            seats: vec![SeatView {
                seat: Seat::First,
                address: Some(Address::repeat_byte(1)),
                is_dealer: false,
                bet: "0".to_string(),
                dice: Dice::default(),
                hand: HandStrength::unknown(),
            }],
        }
    }

    #[tokio::test]
    async fn table__decodes_the_polled_view() {
        // given
        let mut api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let client = DealerClient::new(api.base_url()).unwrap();
        let client_task = tokio::spawn(async move { client.table().await.unwrap() });

        // when
        match api.next_request().await.unwrap() {
            Request::Table(respond) => respond.send(Ok(view())).unwrap(),
            other => panic!("expected table request, got {other:?}"),
        }

        // then
        let table = client_task.await.unwrap();
        assert_eq!(table, view());
    }

    #[tokio::test]
    async fn join__surfaces_the_dealer_message_on_failure() {
        // given
        let mut api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let client = DealerClient::new(format!("{}/", api.base_url())).unwrap();
        let client_task = tokio::spawn(async move { client.join().await });

        // when
        match api.next_request().await.unwrap() {
            Request::Join(respond) => respond
                .send(Err(Failure::from(Error::TurnLegality(
                    "the table is full".to_string(),
                ))))
                .unwrap(),
            other => panic!("expected join request, got {other:?}"),
        }

        // then
        let err = client_task.await.unwrap().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("turn_legality"), "{text}");
        assert!(text.contains("400"), "{text}");
    }
}
