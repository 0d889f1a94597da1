//! Optional second opinion from an OpenAI-compatible chat model.
//!
//! The model only ever sees the actions that are already legal for this turn,
//! one function tool each, and must call exactly one of them. Anything it
//! returns outside that set is an [`Error::Llm`] and the caller keeps the
//! heuristic move.

use crate::{
    Error,
    Result,
    chat::{
        ChatRole,
        ChatTurn,
    },
    intel::OpponentIntel,
};
use dice_poker_game::{
    Action,
    ActionKind,
    BetAmount,
    GameState,
    HandStrength,
    amount::format_units,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::{
    Value,
    json,
};
use std::{
    fmt,
    time::Duration,
};
use url::Url;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const PERSONA: &str = "You are The Dealer, a sharp and slightly smug house player at a \
two-seat dice poker table on an EVM chain. Bets are between 1 and 100 native units. \
Pick exactly one of the offered tools for this turn and put one short line of table \
talk in its comment argument.";

/// What the advisor is told about the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdviceRequest {
    pub state: GameState,
    pub hand: HandStrength,
    pub opponent_hand: HandStrength,
    pub to_call: u128,
    pub currency: String,
    pub legal: Vec<ActionKind>,
    pub suggestion: Action,
    pub history: Vec<ChatTurn>,
    pub intel: Option<OpponentIntel>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advice {
    pub action: Action,
    pub comment: Option<String>,
}

pub trait Advisor {
    fn advise(&self, request: &AdviceRequest) -> impl Future<Output = Result<Advice>> + Send;
}

#[derive(Clone)]
pub struct LlmSettings {
    pub base_url: Url,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    tool_choice: &'static str,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Default, Deserialize)]
struct ToolArguments {
    #[serde(default)]
    amount: Option<BetAmount>,
    #[serde(default)]
    comment: Option<String>,
}

pub struct OpenAiAdvisor {
    settings: LlmSettings,
    endpoint: String,
    http: reqwest::Client,
}

impl OpenAiAdvisor {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        if settings.api_key.trim().is_empty() {
            return Err(Error::missing("LLM_API_KEY"));
        }
        let endpoint = format!(
            "{}/chat/completions",
            settings.base_url.as_str().trim_end_matches('/')
        );
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build LLM client: {e}")))?;
        Ok(Self {
            settings,
            endpoint,
            http,
        })
    }
}

impl Advisor for OpenAiAdvisor {
    async fn advise(&self, request: &AdviceRequest) -> Result<Advice> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: build_messages(request),
            tools: request.legal.iter().map(|kind| tool_for(*kind)).collect(),
            tool_choice: "required",
        };
        let res = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("provider returned {status}: {text}")));
        }
        let response: ChatResponse = res
            .json()
            .await
            .map_err(|e| Error::Llm(format!("unreadable completion: {e}")))?;
        parse_advice(response, &request.legal)
    }
}

fn build_messages(request: &AdviceRequest) -> Vec<Message> {
    let mut messages = vec![Message {
        role: "system",
        content: PERSONA.to_string(),
    }];
    messages.extend(request.history.iter().map(|turn| Message {
        role: match turn.role {
            ChatRole::Human => "user",
            ChatRole::Ai => "assistant",
        },
        content: turn.content.clone(),
    }));
    messages.push(Message {
        role: "user",
        content: describe_turn(request),
    });
    messages
}

fn describe_turn(request: &AdviceRequest) -> String {
    let legal: Vec<&str> = request.legal.iter().map(|kind| kind.name()).collect();
    let mut text = format!(
        "Phase: {}. Your hand: {} (score {}). Opponent shows: {} (score {}). \
         To call: {} {}. Legal moves: {}. The house heuristic suggests {}.",
        request.state,
        request.hand.category,
        request.hand.score,
        request.opponent_hand.category,
        request.opponent_hand.score,
        format_units(request.to_call),
        request.currency,
        legal.join(", "),
        request.suggestion,
    );
    if let Some(intel) = &request.intel {
        text.push_str(&format!(
            " Opponent wallet: {} {} over {} transactions.",
            intel.balance, request.currency, intel.transaction_count
        ));
        for point in &intel.talking_points {
            text.push(' ');
            text.push_str(point);
        }
    }
    text
}

fn comment_schema() -> Value {
    json!({"type": "string", "description": "One short line of table talk."})
}

fn tool_for(kind: ActionKind) -> Tool {
    let (description, parameters) = match kind {
        ActionKind::BetOrRaise => (
            "Bet or raise by an amount of native units.",
            json!({
                "type": "object",
                "properties": {
                    "amount": {"type": "number", "minimum": 1, "maximum": 100},
                    "comment": comment_schema(),
                },
                "required": ["amount"],
            }),
        ),
        ActionKind::Call => (
            "Match the current bet.",
            json!({"type": "object", "properties": {"comment": comment_schema()}}),
        ),
        ActionKind::Roll => (
            "Roll the dice.",
            json!({"type": "object", "properties": {"comment": comment_schema()}}),
        ),
        ActionKind::Fold => (
            "Give up the hand.",
            json!({"type": "object", "properties": {"comment": comment_schema()}}),
        ),
    };
    Tool {
        kind: "function",
        function: FunctionSpec {
            name: kind.name(),
            description,
            parameters,
        },
    }
}

fn parse_advice(response: ChatResponse, legal: &[ActionKind]) -> Result<Advice> {
    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Llm("completion has no choices".to_string()))?
        .message;
    let call = message
        .tool_calls
        .into_iter()
        .next()
        .ok_or_else(|| Error::Llm("completion has no tool call".to_string()))?
        .function;
    let kind = ActionKind::from_name(&call.name)
        .ok_or_else(|| Error::Llm(format!("unknown tool '{}'", call.name)))?;
    if !legal.contains(&kind) {
        return Err(Error::Llm(format!("'{kind}' is not legal this turn")));
    }
    let arguments: ToolArguments = if call.arguments.trim().is_empty() {
        ToolArguments::default()
    } else {
        serde_json::from_str(&call.arguments)
            .map_err(|e| Error::Llm(format!("bad arguments for '{kind}': {e}")))?
    };
    let action = match kind {
        ActionKind::BetOrRaise => {
            let amount = arguments
                .amount
                .ok_or_else(|| Error::Llm("bet without an amount".to_string()))?;
            Action::BetOrRaise(amount)
        }
        ActionKind::Call => Action::Call,
        ActionKind::Roll => Action::Roll,
        ActionKind::Fold => Action::Fold,
    };
    let comment = arguments
        .comment
        .or(message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    Ok(Advice { action, comment })
}
