#![allow(non_snake_case)]

use dealer::app::actix_dealer_api::{
    HealthResponse,
    TableResponse,
};
use dice_poker_game::{
    Dice,
    GameState,
    Seat,
};
use integration_tests::*;
use reqwest::StatusCode;

#[tokio::test]
async fn table__masks_dice_past_the_reveal_count() {
    // given
    let gateway = FakeGateway::seated(GameState::new(12).unwrap());
    gateway.update(|t| {
        t.dice = [
            Dice::new([6, 6, 5, 4, 3]).unwrap(),
            Dice::new([1, 2, 3, 4, 5]).unwrap(),
        ];
    });
    let mut ctx = TestContext::new(gateway).await;

    // when
    let (status, value) = ctx.get("/table").await;

    // then
    assert_eq!(status, StatusCode::OK);
    let response: TableResponse = serde_json::from_value(value).unwrap();
    let table = response.table;
    assert_eq!(table.revealed_dice, 2);
    assert_eq!(table.turn, Some(Seat::Second));
    assert_eq!(table.dealer_seat, Some(Seat::Second));
    assert_eq!(table.seats[0].dice.values(), [6, 6, 0, 0, 0]);
    assert_eq!(table.seats[1].dice.values(), [1, 2, 0, 0, 0]);
    assert!(table.seats[1].is_dealer);
    assert_eq!(ctx.gateway().write_count(), 0);
}

#[tokio::test]
async fn table__read_failure_is_service_unavailable() {
    // given
    let gateway = FakeGateway::seated(GameState::new(3).unwrap());
    gateway.fail_next(FakeFailure::ReadTransient);
    let mut ctx = TestContext::new(gateway).await;

    // when
    let (status, _) = ctx.get("/table").await;

    // then
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health__reports_the_contract_probe() {
    let mut ctx = TestContext::new(FakeGateway::seated(GameState::new(3).unwrap())).await;

    let (status, value) = ctx.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    let response: HealthResponse = serde_json::from_value(value).unwrap();
    assert!(response.success);
    assert_eq!(response.probe.state, GameState::new(3).ok());
}
