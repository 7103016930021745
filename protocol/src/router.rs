//! Agent Router (C7): classify a user request by keyword-match density and
//! pick which specialist agent should handle it.
//!
//! Scoring mirrors the original Python router exactly: for each category,
//! `score = (keyword matches in the message) / (whitespace-token count of
//! the message)`. The highest-scoring category wins, ties broken by
//! enumeration order (data analysis, then code development, then research,
//! then planning). If the winning score is below the confidence floor, or
//! no keyword matched at all, routing falls back to general chat with
//! confidence pinned to `1.0` — a low score is not "unsure between
//! specialists", it is "not a specialist request".

use serde::{Deserialize, Serialize};

/// The confidence floor below which routing falls back to general chat.
pub const CONFIDENCE_FLOOR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentType {
    /// The router itself, used only as the `from` side of an
    /// `AGENT_TRANSFER` event — it never handles a request directly.
    Router,
    DataAnalysis,
    CodeDevelopment,
    Research,
    Planning,
    GeneralChat,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Router => "router",
            AgentType::DataAnalysis => "data_analysis",
            AgentType::CodeDevelopment => "code_development",
            AgentType::Research => "research",
            AgentType::Planning => "planning",
            AgentType::GeneralChat => "general_chat",
        }
    }
}

const DATA_ANALYSIS_KEYWORDS: &[&str] = &[
    "data", "analyze", "analysis", "chart", "dataset", "statistics", "visualize", "dashboard", "metric", "trend",
];
const CODE_DEVELOPMENT_KEYWORDS: &[&str] = &[
    "code", "function", "bug", "implement", "refactor", "api", "debug", "compile", "script", "repository",
];
const RESEARCH_KEYWORDS: &[&str] = &[
    "research", "investigate", "compare", "literature", "study", "survey", "sources", "evidence", "benchmark",
];
const PLANNING_KEYWORDS: &[&str] = &[
    "plan", "schedule", "roadmap", "timeline", "organize", "strategy", "milestone", "coordinate",
];

const CATEGORIES: [(AgentType, &[&str]); 4] = [
    (AgentType::DataAnalysis, DATA_ANALYSIS_KEYWORDS),
    (AgentType::CodeDevelopment, CODE_DEVELOPMENT_KEYWORDS),
    (AgentType::Research, RESEARCH_KEYWORDS),
    (AgentType::Planning, PLANNING_KEYWORDS),
];

/// Outcome of [`analyze_request_intent`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub agent: AgentType,
    pub confidence: f64,
}

/// Score `message` against every specialist's keyword list and pick a
/// winner, falling back to [`AgentType::GeneralChat`] when no category
/// clears the confidence floor.
pub fn analyze_request_intent(message: &str) -> IntentScore {
    let token_count = (message.split_whitespace().count().max(1)) as f64;
    let lower = message.to_lowercase();

    let mut best_agent = AgentType::GeneralChat;
    let mut best_score = 0.0f64;

    for (agent, keywords) in CATEGORIES {
        let matches = keywords.iter().filter(|kw| lower.contains(*kw)).count() as f64;
        let score = matches / token_count;
        if score > best_score {
            best_score = score;
            best_agent = agent;
        }
    }

    if best_score < CONFIDENCE_FLOOR || best_score == 0.0 {
        IntentScore {
            agent: AgentType::GeneralChat,
            confidence: 1.0,
        }
    } else {
        IntentScore {
            agent: best_agent,
            confidence: best_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_data_request_to_data_analysis() {
        let result = analyze_request_intent("Please analyze this dataset and chart the trend");
        assert_eq!(result.agent, AgentType::DataAnalysis);
        assert!(result.confidence >= CONFIDENCE_FLOOR);
    }

    #[test]
    fn routes_code_request_to_code_development() {
        let result = analyze_request_intent("Can you debug this function and refactor the api");
        assert_eq!(result.agent, AgentType::CodeDevelopment);
    }

    #[test]
    fn falls_back_to_general_chat_below_confidence_floor() {
        let result = analyze_request_intent("Hello there, how is your day going so far friend");
        assert_eq!(result.agent, AgentType::GeneralChat);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn ties_break_by_enumeration_order() {
        // one keyword each from data-analysis and code-development, equal
        // score: data-analysis must win since it is listed first.
        let result = analyze_request_intent("chart code");
        assert_eq!(result.agent, AgentType::DataAnalysis);
    }

    #[test]
    fn empty_message_does_not_divide_by_zero() {
        let result = analyze_request_intent("");
        assert_eq!(result.agent, AgentType::GeneralChat);
    }
}
