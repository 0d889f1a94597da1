#![allow(non_snake_case)]

use super::*;
use crate::{
    ErrorCategory,
    SubmissionOutcome,
    llm::Advice,
    test_helpers::{
        FakeFailure,
        FakeGateway,
        ScriptedAdvisor,
        dealer_address,
        human_address,
    },
    tracker::InMemoryResponseTracker,
};
use dice_poker_game::{
    BetAmount,
    Dice,
};

const PLAYER: &str = "0x1111111111111111111111111111111111111111";

fn state(code: u64) -> GameState {
    GameState::new(code).unwrap()
}

fn dispatcher(
    gateway: &FakeGateway,
    advisor: &ScriptedAdvisor,
) -> Dispatcher<FakeGateway, ScriptedAdvisor> {
    Dispatcher::new(
        gateway.clone(),
        advisor.clone(),
        Arc::new(InMemoryResponseTracker::default()),
        None,
        DispatchSettings::default(),
    )
}

#[tokio::test]
async fn take_turn__is_a_no_op_when_it_is_the_humans_move() {
    // given
    let gateway = FakeGateway::seated(state(1));
    let advisor = ScriptedAdvisor::offline();
    let dispatcher = dispatcher(&gateway, &advisor);

    // when
    let report = dispatcher.take_turn(PLAYER, &[]).await;

    // then
    assert!(matches!(report.outcome, TurnOutcome::NoOp { .. }));
    assert_eq!(gateway.write_count(), 0);
    assert!(advisor.requests().is_empty());
    assert!(!report.message.is_empty());
}

#[tokio::test]
async fn take_turn__is_a_no_op_when_the_dealer_is_not_seated() {
    let gateway = FakeGateway::default();
    gateway.update(|t| {
        t.state = state(2);
        t.players = [Some(human_address()), Some(Address::repeat_byte(0x22))];
    });
    let advisor = ScriptedAdvisor::offline();

    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    assert!(matches!(report.outcome, TurnOutcome::NoOp { seat: None, .. }));
    assert_eq!(gateway.write_count(), 0);
}

#[tokio::test]
async fn take_turn__rolls_in_roll_phase_even_if_advisor_says_fold() {
    // given
    let gateway = FakeGateway::seated(state(6));
    let advisor = ScriptedAdvisor::answering(Advice {
        action: Action::Fold,
        comment: Some("I give up".to_string()),
    });

    // when
    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    // then
    assert!(matches!(
        report.outcome,
        TurnOutcome::Confirmed {
            action: Action::Roll,
            source: DecisionSource::Heuristic,
            ..
        }
    ));
    assert_eq!(gateway.submitted(), vec![ContractCall::RollDice]);
}

#[tokio::test]
async fn take_turn__uses_legal_advice_and_its_comment() {
    // given
    let gateway = FakeGateway::seated(state(2));
    let bet = BetAmount::from_units(7).unwrap();
    let advisor = ScriptedAdvisor::answering(Advice {
        action: Action::BetOrRaise(bet),
        comment: Some("Seven, because I can.".to_string()),
    });

    // when
    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    // then
    assert_eq!(gateway.submitted(), vec![ContractCall::PlaceBet(bet)]);
    assert!(report.message.contains("Seven, because I can."));
    assert!(report.message.starts_with("The Dealer bets 7 FLOW."));
    let requests = advisor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].legal,
        vec![dice_poker_game::ActionKind::BetOrRaise, dice_poker_game::ActionKind::Fold]
    );
}

#[tokio::test]
async fn take_turn__falls_back_to_heuristic_call_when_advisor_is_offline() {
    // given: a bet of 5 units is open and the dealer has put in nothing
    let gateway = FakeGateway::seated(state(2));
    gateway.update(|t| t.current_bet = 5 * WEI_PER_UNIT);
    let advisor = ScriptedAdvisor::offline();

    // when
    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    // then
    assert!(matches!(
        report.outcome,
        TurnOutcome::Confirmed {
            action: Action::Call,
            source: DecisionSource::Heuristic,
            ..
        }
    ));
    assert_eq!(
        gateway.submitted(),
        vec![ContractCall::Call {
            value: 5 * WEI_PER_UNIT
        }]
    );
}

#[tokio::test]
async fn take_turn__rejects_advised_call_with_nothing_owed() {
    let gateway = FakeGateway::seated(state(2));
    gateway.update(|t| {
        t.current_bet = 3 * WEI_PER_UNIT;
        t.round_bets.insert(dealer_address(), 3 * WEI_PER_UNIT);
    });
    let advisor = ScriptedAdvisor::answering(Advice {
        action: Action::Call,
        comment: None,
    });

    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    assert!(matches!(
        report.outcome,
        TurnOutcome::Confirmed {
            source: DecisionSource::Heuristic,
            ..
        }
    ));
    assert_eq!(gateway.submitted(), vec![ContractCall::PlaceBet(BetAmount::MIN)]);
}

#[tokio::test]
async fn take_turn__folds_a_weak_late_hand_that_is_behind() {
    // given: three dice showing, dealer holds junk against three sixes
    let gateway = FakeGateway::seated(state(20));
    gateway.update(|t| {
        t.dice = [
            Dice::new([6, 6, 6, 1, 1]).unwrap(),
            Dice::new([1, 2, 4, 5, 3]).unwrap(),
        ];
        t.current_bet = WEI_PER_UNIT;
    });
    let advisor = ScriptedAdvisor::offline();

    // when
    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    // then
    assert!(matches!(
        report.outcome,
        TurnOutcome::Confirmed {
            action: Action::Fold,
            ..
        }
    ));
    let requests = advisor.requests();
    assert_eq!(requests[0].opponent_hand.score, 48);
}

#[tokio::test]
async fn take_turn__timeout_reports_unknown_outcome_after_one_write() {
    // given
    let gateway = FakeGateway::seated(state(6));
    gateway.fail_next(FakeFailure::ConfirmTimeout);
    let advisor = ScriptedAdvisor::offline();

    // when
    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    // then
    match report.outcome {
        TurnOutcome::Failed {
            stage,
            action,
            error,
        } => {
            assert_eq!(stage, TurnStage::Submitting);
            assert_eq!(action, Some(Action::Roll));
            assert_eq!(error.category(), ErrorCategory::Timeout);
            assert_eq!(error.submission_outcome(), Some(SubmissionOutcome::Unknown));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(gateway.write_count(), 1);
}

#[tokio::test]
async fn take_turn__submit_failure_is_not_retried() {
    let gateway = FakeGateway::seated(state(6));
    gateway.fail_next(FakeFailure::SubmitTransient);
    let advisor = ScriptedAdvisor::offline();

    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    match report.outcome {
        TurnOutcome::Failed { error, .. } => {
            assert_eq!(error.category(), ErrorCategory::Transient);
            assert_eq!(error.submission_outcome(), Some(SubmissionOutcome::Unknown));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(gateway.write_count(), 0);
}

#[tokio::test]
async fn take_turn__read_failure_fails_before_any_write() {
    let gateway = FakeGateway::seated(state(6));
    gateway.fail_next(FakeFailure::ReadTransient);
    let advisor = ScriptedAdvisor::offline();

    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    assert!(matches!(
        report.outcome,
        TurnOutcome::Failed {
            stage: TurnStage::AwaitingDecision,
            action: None,
            ..
        }
    ));
    assert_eq!(gateway.write_count(), 0);
}

#[tokio::test]
async fn take_turn__commentary_goes_quiet_once_throttled() {
    // given
    let gateway = FakeGateway::seated(state(6));
    let advisor = ScriptedAdvisor::offline();
    let dispatcher = Dispatcher::new(
        gateway.clone(),
        advisor,
        Arc::new(InMemoryResponseTracker::new(1, Duration::from_secs(45))),
        None,
        DispatchSettings::default(),
    );

    // when
    let first = dispatcher.take_turn(PLAYER, &[]).await;
    let second = dispatcher.take_turn(PLAYER, &[]).await;

    // then
    assert_ne!(first.message, "The Dealer rolls the dice.");
    assert_eq!(second.message, "The Dealer rolls the dice.");
    assert_eq!(gateway.write_count(), 2);
}

#[tokio::test]
async fn take_turn__low_balance_without_faucet_still_plays() {
    let gateway = FakeGateway::seated(state(6));
    gateway.update(|t| {
        t.balances.insert(dealer_address(), WEI_PER_UNIT / 2);
    });
    let advisor = ScriptedAdvisor::offline();

    let report = dispatcher(&gateway, &advisor).take_turn(PLAYER, &[]).await;

    assert!(matches!(report.outcome, TurnOutcome::Confirmed { .. }));
}

#[tokio::test]
async fn join_table__takes_the_open_seat() {
    // given
    let gateway = FakeGateway::default();
    gateway.update(|t| t.players = [Some(human_address()), None]);
    let dispatcher = dispatcher(&gateway, &ScriptedAdvisor::offline());

    // when
    let receipt = dispatcher.join_table().await.unwrap();

    // then
    assert_eq!(receipt.seat, Seat::Second);
    assert_eq!(receipt.agent, dealer_address());
    assert_eq!(receipt.state, state(1));
    assert_eq!(gateway.submitted(), vec![ContractCall::JoinGame]);
}

#[tokio::test]
async fn join_table__refuses_bad_table_states() {
    let cases: [(u64, [Option<Address>; 2]); 4] = [
        (3, [Some(human_address()), None]),
        (0, [Some(human_address()), Some(dealer_address())]),
        (0, [Some(human_address()), Some(Address::repeat_byte(0x33))]),
        (0, [None, None]),
    ];
    for (code, players) in cases {
        let gateway = FakeGateway::default();
        gateway.update(|t| {
            t.state = state(code);
            t.players = players;
        });
        let result = dispatcher(&gateway, &ScriptedAdvisor::offline())
            .join_table()
            .await;
        let err = result.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::TurnLegality, "{code} {players:?}");
        assert_eq!(gateway.write_count(), 0);
    }
}

#[tokio::test]
async fn join_table__low_balance_is_a_configuration_error() {
    let gateway = FakeGateway::default();
    gateway.update(|t| {
        t.players = [Some(human_address()), None];
        t.balances.insert(dealer_address(), JOIN_MIN_BALANCE - 1);
    });

    let err = dispatcher(&gateway, &ScriptedAdvisor::offline())
        .join_table()
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(gateway.write_count(), 0);
}
