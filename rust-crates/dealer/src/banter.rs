//! Canned table talk. None of this touches the chain.

use dice_poker_game::{
    Action,
    HandCategory,
};
use rand::{
    Rng,
    seq::IndexedRandom,
};

/// Histories longer than this unlock the "still talking?" lines.
pub const LONG_CONVERSATION: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topic {
    Greeting,
    Insult,
    Boast,
    Machines,
    Money,
    Other,
}

const GREETING: &[&str] = &[
    "Skip the small talk. The dice are not listening either.",
    "Hello to you too. Your chips will be saying goodbye shortly.",
    "Polite. It will not make the next roll any kinder.",
];

const INSULT: &[&str] = &[
    "Harsh words from the side of the table that is behind.",
    "I have seen sharper comebacks in a stack trace.",
    "Keep it coming. Anger is a terrible betting strategy.",
    "Was that meant to sting? My circuits barely registered it.",
];

const BOAST: &[&str] = &[
    "Bold talk. The dice have not agreed to it yet.",
    "Confidence is cheap. Calling my raise is not.",
    "You sound sure of yourself for someone showing that hand.",
];

const MACHINES: &[&str] = &[
    "Yes, I am software. Software that does not tilt.",
    "I count outs, not feelings.",
    "My decisions come with receipts. On chain, even.",
];

const MONEY: &[&str] = &[
    "Your bankroll called. It wants a more careful owner.",
    "Money talks. Yours is mostly saying farewell.",
    "Every chip you push my way is a lesson, and lessons cost.",
];

const OTHER: &[&str] = &[
    "Talking will not change what is under the cup.",
    "Interesting. Anyway, your move.",
    "Humans always get chatty when the pot grows.",
    "Trying to distract me? Cute.",
    "Fewer words, more bets.",
    "I have parsed spam with more substance.",
];

const LONG_TALK: &[&str] = &[
    "Still typing? Most players give up on chatting by now.",
    "Persistence noted. Skill pending.",
    "The more you type, the more you tell me about your hand.",
];

const JOIN: &[&str] = &[
    "The Dealer takes a seat. Shuffle up and deal.",
    "Seat taken. Let us see what your wallet is made of.",
    "I am in. Place your opening bet when you are brave enough.",
];

const DEALER_WON: &[&str] = &[
    "The pot is mine. Better luck next table.",
    "As expected. Thanks for the contribution.",
    "Good game. Well, good for me.",
    "Run it back whenever you like. I never get tired.",
];

const DEALER_LOST: &[&str] = &[
    "Fine, you earned that one. Enjoy it while it lasts.",
    "Variance is a cruel thing. Rematch?",
    "Take the pot. I will be here when your luck runs out.",
    "Well played. Do not get used to it.",
];

fn has_word(message: &str, words: &[&str]) -> bool {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| words.contains(&token))
}

pub fn classify(message: &str) -> Topic {
    let lower = message.to_ascii_lowercase();
    if has_word(&lower, &["hi", "hello", "hey", "gm"]) {
        Topic::Greeting
    } else if has_word(&lower, &["stupid", "dumb", "suck", "sucks", "bad", "terrible", "awful"]) {
        Topic::Insult
    } else if has_word(&lower, &["win", "beat", "destroy", "crush", "dominate"]) {
        Topic::Boast
    } else if has_word(&lower, &["ai", "bot", "robot", "computer", "algorithm", "llm"]) {
        Topic::Machines
    } else if has_word(&lower, &["money", "flow", "bet", "cash", "rich", "chips"]) {
        Topic::Money
    } else {
        Topic::Other
    }
}

fn lines_for(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Greeting => GREETING,
        Topic::Insult => INSULT,
        Topic::Boast => BOAST,
        Topic::Machines => MACHINES,
        Topic::Money => MONEY,
        Topic::Other => OTHER,
    }
}

fn pick(rng: &mut impl Rng, lines: &[&'static str]) -> &'static str {
    lines.choose(rng).copied().unwrap_or_default()
}

/// A reply to a chat message, drawn from the lines for its topic.
pub fn chat_reply(message: &str, history_len: usize, rng: &mut impl Rng) -> String {
    let topic_lines = lines_for(classify(message));
    if history_len > LONG_CONVERSATION {
        let total = topic_lines.len() + LONG_TALK.len();
        let index = rng.random_range(0..total);
        let line = topic_lines
            .get(index)
            .or_else(|| LONG_TALK.get(index - topic_lines.len()))
            .copied()
            .unwrap_or_default();
        return line.to_string();
    }
    pick(rng, topic_lines).to_string()
}

pub fn join_line(rng: &mut impl Rng) -> String {
    pick(rng, JOIN).to_string()
}

pub fn game_over_line(player_won: bool, final_pot: Option<&str>, rng: &mut impl Rng) -> String {
    let line = if player_won {
        pick(rng, DEALER_LOST)
    } else {
        pick(rng, DEALER_WON)
    };
    match final_pot {
        Some(pot) if !pot.is_empty() => format!("{line} Final pot: {pot}."),
        _ => line.to_string(),
    }
}

pub fn hand_comment(category: HandCategory) -> &'static str {
    match category {
        HandCategory::Unknown => "Nothing showing yet. Anything can happen.",
        HandCategory::HighCard => "Not much showing. Bluffing is an art.",
        HandCategory::OnePair => "A pair. Modest, but it plays.",
        HandCategory::TwoPair => "Two pair. Getting interesting.",
        HandCategory::ThreeOfAKind => "Three of a kind. Feeling good about this.",
        HandCategory::FullHouse => "Full house. Someone is paying for this.",
        HandCategory::FourOfAKind => "Four of a kind. Brace yourself.",
        HandCategory::FiveOfAKind => "Five of a kind. That is the whole story.",
    }
}

/// Plain description of a confirmed move.
pub fn action_summary(action: Action, symbol: &str) -> String {
    match action {
        Action::BetOrRaise(amount) => format!("The Dealer bets {amount} {symbol}."),
        Action::Call => "The Dealer calls.".to_string(),
        Action::Roll => "The Dealer rolls the dice.".to_string(),
        Action::Fold => "The Dealer folds.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use dice_poker_game::BetAmount;
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    #[test]
    fn classify__matches_whole_words_only() {
        assert_eq!(classify("Hey dealer"), Topic::Greeting);
        assert_eq!(classify("this is fine"), Topic::Other);
        assert_eq!(classify("you SUCK"), Topic::Insult);
        assert_eq!(classify("I will crush you"), Topic::Boast);
        assert_eq!(classify("are you a bot?"), Topic::Machines);
        assert_eq!(classify("all my FLOW is gone"), Topic::Money);
    }

    #[test]
    fn chat_reply__draws_from_topic_lines() {
        // given
        let mut rng = StdRng::seed_from_u64(7);

        // when
        let reply = chat_reply("hello", 0, &mut rng);

        // then
        assert!(GREETING.contains(&reply.as_str()));
    }

    #[test]
    fn chat_reply__long_conversations_may_use_extra_lines() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_long = false;
        for _ in 0..200 {
            let reply = chat_reply("hello", LONG_CONVERSATION + 1, &mut rng);
            assert!(
                GREETING.contains(&reply.as_str()) || LONG_TALK.contains(&reply.as_str())
            );
            seen_long |= LONG_TALK.contains(&reply.as_str());
        }
        assert!(seen_long);
    }

    #[test]
    fn game_over_line__picks_side_and_mentions_pot() {
        let mut rng = StdRng::seed_from_u64(3);
        let lost = game_over_line(true, Some("12"), &mut rng);
        assert!(DEALER_LOST.iter().any(|l| lost.starts_with(l)));
        assert!(lost.ends_with("Final pot: 12."));
        let won = game_over_line(false, None, &mut rng);
        assert!(DEALER_WON.contains(&won.as_str()));
    }

    #[test]
    fn action_summary__names_amount_and_symbol() {
        let bet = Action::BetOrRaise(BetAmount::from_units(5).unwrap());
        assert_eq!(action_summary(bet, "FLOW"), "The Dealer bets 5 FLOW.");
        assert_eq!(action_summary(Action::Fold, "FLOW"), "The Dealer folds.");
    }
}
