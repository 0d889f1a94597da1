#![allow(non_snake_case)]

use dealer::{
    app::actix_dealer_api::{
        ChatBody,
        ChatResponse,
        MessageResponse,
    },
    chat::ChatTurn,
};
use dice_poker_game::GameState;
use integration_tests::*;
use reqwest::StatusCode;
use serde_json::json;

fn chat_body(message: &str, history: Vec<ChatTurn>) -> ChatBody {
    ChatBody {
        player_address: PLAYER.to_string(),
        message: message.to_string(),
        chat_history: history,
    }
}

async fn say(ctx: &mut TestContext, message: &str, history: Vec<ChatTurn>) -> ChatResponse {
    let (status, value) = ctx.post("/ai-chat", &chat_body(message, history)).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn ai_chat__goes_quiet_after_three_replies() {
    let mut ctx = TestContext::new(FakeGateway::seated(GameState::new(1).unwrap())).await;

    // given
    let mut history = vec![];
    for _ in 0..3 {
        let reply = say(&mut ctx, "nice bluff", history).await;
        assert!(!reply.message.is_empty());
        history = reply.new_history;
    }

    // when
    let quiet = say(&mut ctx, "still there?", history.clone()).await;

    // then
    assert!(quiet.message.is_empty());
    assert_eq!(quiet.new_history.len(), history.len() + 1);
    assert_eq!(quiet.new_history.last(), Some(&ChatTurn::human("still there?")));
    assert_eq!(ctx.gateway().write_count(), 0);
}

#[tokio::test]
async fn ai_game_over__resets_the_chat_throttle() {
    let mut ctx = TestContext::new(FakeGateway::seated(GameState::GAME_ENDED)).await;

    // given
    for _ in 0..3 {
        say(&mut ctx, "gg", vec![]).await;
    }
    assert!(say(&mut ctx, "gg", vec![]).await.message.is_empty());

    // when
    let (status, value) = ctx
        .post(
            "/ai-game-over",
            &json!({ "playerWon": true, "playerAddress": PLAYER, "finalPot": 12 }),
        )
        .await;

    // then
    assert_eq!(status, StatusCode::OK);
    let over: MessageResponse = serde_json::from_value(value).unwrap();
    assert!(over.success);
    assert!(over.message.contains("12"));
    assert!(!say(&mut ctx, "rematch?", vec![]).await.message.is_empty());
}
