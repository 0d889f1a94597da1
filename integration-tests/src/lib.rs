//! Drives a dealer app over real HTTP against an in-memory chain.

use dealer::{
    app::{
        App,
        actix_dealer_api::ActixDealerApi,
    },
    dispatcher::{
        DispatchSettings,
        Dispatcher,
    },
    tracker::InMemoryResponseTracker,
};
use futures::future::pending;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub use dealer::test_helpers::{
    FakeFailure,
    FakeGateway,
    ScriptedAdvisor,
    dealer_address,
    human_address,
};

pub const PLAYER: &str = "0x1111111111111111111111111111111111111111";

// `http` is declared first so its pooled connections close before the
// server shuts down.
pub struct TestContext {
    http: reqwest::Client,
    gateway: FakeGateway,
    advisor: ScriptedAdvisor,
    app: App<FakeGateway, ScriptedAdvisor, ActixDealerApi>,
    base_url: String,
}

impl TestContext {
    pub async fn new(gateway: FakeGateway) -> Self {
        Self::with_advisor(gateway, ScriptedAdvisor::offline()).await
    }

    pub async fn with_advisor(gateway: FakeGateway, advisor: ScriptedAdvisor) -> Self {
        let api = ActixDealerApi::new("127.0.0.1", None).await.unwrap();
        let base_url = api.base_url().to_string();
        let dispatcher = Dispatcher::new(
            gateway.clone(),
            advisor.clone(),
            Arc::new(InMemoryResponseTracker::default()),
            None,
            DispatchSettings::default(),
        );
        Self {
            http: reqwest::Client::new(),
            gateway,
            advisor,
            app: App::new(dispatcher, api, None),
            base_url,
        }
    }

    pub fn gateway(&self) -> &FakeGateway {
        &self.gateway
    }

    pub fn advisor(&self) -> &ScriptedAdvisor {
        &self.advisor
    }

    pub async fn post(&mut self, path: &str, body: &impl Serialize) -> (StatusCode, Value) {
        let request = self.http.post(self.url(path)).json(body);
        self.serve(request).await
    }

    /// Sends a body as-is, for payloads that should never decode.
    pub async fn post_raw(&mut self, path: &str, body: &str) -> (StatusCode, Value) {
        let request = self
            .http
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body.to_string());
        self.serve(request).await
    }

    pub async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        let request = self.http.get(self.url(path));
        self.serve(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Keeps the app loop turning until the HTTP call completes.
    async fn serve(&mut self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let mut call = tokio::spawn(async move {
            let response = request.send().await.unwrap();
            let status = response.status();
            (status, response.json::<Value>().await.unwrap())
        });
        loop {
            tokio::select! {
                done = &mut call => return done.unwrap(),
                state = self.app.run(pending()) => {
                    state.unwrap();
                }
            }
        }
    }
}
