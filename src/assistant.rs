//! Conversation about an analysis.
//!
//! The text generation itself is an injected [`Explainer`]; this module owns the
//! transcript, the context handed to the explainer and the prompt texts a provider
//! implementation sends along with it.

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::engine::{Direction, RiskLevel};
use crate::errors::Result;
use crate::utils::random_id;

const EXPLAINER_ERROR: &str = "Error connecting to AI Analyst. Please check your API Key configuration.";
const EMPTY_ANSWER: &str = "I couldn't generate an analysis at this time.";

/// What the explainer knows about the current analysis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChatContext {
    pub ticker: String,
    pub current_price: f64,
    pub direction: Direction,
    pub confidence: u8,
    pub risk_level: RiskLevel,
}

/// Author of a chat message.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One message of the transcript.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    id: u32,
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl From<(Role, String)> for ChatMessage {
    fn from((role, text): (Role, String)) -> Self {
        Self {
            id: random_id(),
            role,
            text,
            timestamp: Utc::now(),
        }
    }
}

impl ChatMessage {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Text-completion capability answering questions about an analysis.
///
/// `history` is the whole transcript; its last message is the question to answer.
pub trait Explainer {
    /// Produces the answer to the last message of `history`.
    fn respond(&self, history: &[ChatMessage], context: &ChatContext) -> Result<String>;
}

impl<F> Explainer for F
where
    F: Fn(&[ChatMessage], &ChatContext) -> Result<String>,
{
    fn respond(&self, history: &[ChatMessage], context: &ChatContext) -> Result<String> {
        self(history, context)
    }
}

/// A conversation about one analysis.
#[derive(Debug, Clone)]
pub struct ChatSession {
    context: ChatContext,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Starts a session with the assistant's greeting.
    pub fn new(context: ChatContext) -> Self {
        let greeting = format!(
            "Hello! I'm your Quant Assistant. I've analyzed the technicals for {}. \
             Ask me about the trend, risk factors, or the model's logic.",
            context.ticker
        );
        Self {
            context,
            messages: vec![ChatMessage::from((Role::Model, greeting))],
        }
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    /// The transcript, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Records `question`, asks `explainer` and records its answer.
    ///
    /// ### Returns
    /// The answer, or `None` when `question` is blank (nothing is recorded then).
    /// Explainer failures are logged and answered with a fixed apology instead.
    pub fn ask<E: Explainer + ?Sized>(&mut self, explainer: &E, question: &str) -> Option<&ChatMessage> {
        if question.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::from((Role::User, question.to_string())));

        let answer = match explainer.respond(&self.messages, &self.context) {
            Ok(answer) if answer.trim().is_empty() => {
                warn!(ticker = %self.context.ticker, "explainer returned an empty answer");
                EMPTY_ANSWER.to_string()
            }
            Ok(answer) => answer,
            Err(err) => {
                error!(ticker = %self.context.ticker, %err, "explainer failed");
                EXPLAINER_ERROR.to_string()
            }
        };
        self.messages.push(ChatMessage::from((Role::Model, answer)));
        self.messages.last()
    }
}

/// Persona and analysis facts sent to the provider as system instruction.
pub fn system_instruction(context: &ChatContext) -> String {
    format!(
        "You are a Senior Quantitative Analyst at a top Wall Street firm.\n\
         You are analyzing the stock {ticker}.\n\
         Current Price: ${price:.2}.\n\
         Model Recommendation: {direction} (Confidence: {confidence}%).\n\
         Risk Level: {risk}.\n\
         \n\
         Your goal is to explain financial concepts, interpret the data, and provide reasoned arguments.\n\
         Be professional, concise, and data-driven. Do not give financial advice as a certainty, but as analysis.\n\
         If asked about future price, mention that markets are probabilistic.\n\
         Use markdown for formatting.",
        ticker = context.ticker,
        price = context.current_price,
        direction = context.direction,
        confidence = context.confidence,
        risk = context.risk_level,
    )
}

/// Image prompt illustrating the market mood of the recommendation.
pub fn mood_prompt(context: &ChatContext) -> String {
    let sentiment = match context.direction {
        Direction::Buy => "Bullish, optimistic, growing, green and gold colors, upward momentum",
        Direction::Sell => "Bearish, cautious, stormy, red and grey colors, downward pressure",
        Direction::Hold => "Neutral, balanced, steady, blue and white colors, horizon",
    };
    format!(
        "An abstract, cinematic, 3D render representing the financial sentiment of {} stock.\n\
         Mood: {sentiment}.\n\
         Style: High-tech financial data visualization merged with abstract art.\n\
         Professional, clean, high quality.",
        context.ticker
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    fn context(direction: Direction) -> ChatContext {
        ChatContext {
            ticker: "AAPL".to_string(),
            current_price: 187.456,
            direction,
            confidence: 75,
            risk_level: RiskLevel::Low,
        }
    }

    struct Canned(&'static str);

    impl Explainer for Canned {
        fn respond(&self, _: &[ChatMessage], _: &ChatContext) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Offline;

    impl Explainer for Offline {
        fn respond(&self, _: &[ChatMessage], _: &ChatContext) -> Result<String> {
            Err(Error::Explainer("connection refused".to_string()))
        }
    }

    #[test]
    fn session_starts_with_greeting() {
        let session = ChatSession::new(context(Direction::Buy));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role(), Role::Model);
        assert!(session.messages()[0].text().contains("technicals for AAPL"));
    }

    #[test]
    fn ask_records_question_and_answer() {
        let mut session = ChatSession::new(context(Direction::Buy));
        let answer = session.ask(&Canned("The trend is up."), "Why buy?").unwrap();
        assert_eq!(answer.role(), Role::Model);
        assert_eq!(answer.text(), "The trend is up.");

        let roles = session.messages().iter().map(ChatMessage::role).collect::<Vec<_>>();
        assert_eq!(roles, [Role::Model, Role::User, Role::Model]);
        assert_eq!(session.messages()[1].text(), "Why buy?");
    }

    #[test]
    fn explainer_sees_full_history_and_context() {
        let mut session = ChatSession::new(context(Direction::Sell));
        let explainer = |history: &[ChatMessage], context: &ChatContext| -> Result<String> {
            Ok(format!("{} messages, {}", history.len(), context.direction))
        };
        session.ask(&explainer, "first");
        let answer = session.ask(&explainer, "second").unwrap();
        assert_eq!(answer.text(), "4 messages, SELL");
    }

    #[test]
    fn blank_question_is_ignored() {
        let mut session = ChatSession::new(context(Direction::Hold));
        assert!(session.ask(&Canned("unused"), "   ").is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn failures_become_fixed_answers() {
        let mut session = ChatSession::new(context(Direction::Hold));
        assert_eq!(session.ask(&Offline, "hello").unwrap().text(), EXPLAINER_ERROR);
        assert_eq!(session.ask(&Canned(" "), "hello again").unwrap().text(), EMPTY_ANSWER);
        assert_eq!(session.messages().len(), 5);
    }

    #[test]
    fn system_instruction_carries_context() {
        let instruction = system_instruction(&context(Direction::Buy));
        assert!(instruction.contains("analyzing the stock AAPL"));
        assert!(instruction.contains("Current Price: $187.46."));
        assert!(instruction.contains("Model Recommendation: BUY (Confidence: 75%)."));
        assert!(instruction.contains("Risk Level: LOW."));
    }

    #[test]
    fn mood_follows_direction() {
        assert!(mood_prompt(&context(Direction::Buy)).contains("Bullish"));
        assert!(mood_prompt(&context(Direction::Sell)).contains("Bearish"));
        assert!(mood_prompt(&context(Direction::Hold)).contains("Neutral"));
        assert!(mood_prompt(&context(Direction::Hold)).contains("AAPL stock"));
    }
}
