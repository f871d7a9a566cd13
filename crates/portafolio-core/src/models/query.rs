use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Answer shown when the search returns no snippets.
pub const NO_ANSWER: &str = "No relevant answer found.";

/// One retrieved document fragment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub data: Vec<Snippet>,
}

impl QueryResponse {
    /// Snippet texts joined by newlines.
    pub fn answer(&self) -> String {
        if self.data.is_empty() {
            return NO_ANSWER.to_string();
        }
        self.data
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Retrieval precision reported for the best snippet.
    pub fn precision(&self) -> Option<f64> {
        self.data.first().map(|s| s.score.unwrap_or(0.0))
    }
}

/// A question with its answer, as kept in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub failed: bool,
    pub asked_at: DateTime<Utc>,
}

impl QueryEntry {
    pub fn answered(question: &str, response: &QueryResponse) -> Self {
        Self {
            question: question.to_string(),
            answer: response.answer(),
            precision: response.precision(),
            failed: false,
            asked_at: Utc::now(),
        }
    }

    pub fn failed(question: &str, error: &str) -> Self {
        Self {
            question: question.to_string(),
            answer: format!("Query failed: {}", error),
            precision: None,
            failed: true,
            asked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_joins_snippets() {
        let response: QueryResponse = serde_json::from_str(
            r#"{"data": [{"text": "Semana 1: límites", "score": 87.5}, {"text": "Semana 2: derivadas", "score": 60}]}"#,
        )
        .unwrap();

        assert_eq!(response.answer(), "Semana 1: límites\nSemana 2: derivadas");
        assert_eq!(response.precision(), Some(87.5));
    }

    #[test]
    fn test_empty_result_has_fallback_answer() {
        let response: QueryResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(response.answer(), NO_ANSWER);
        assert_eq!(response.precision(), None);

        let missing: QueryResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.answer(), NO_ANSWER);
    }

    #[test]
    fn test_missing_score_is_zero() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"data": [{"text": "x"}]}"#).unwrap();
        assert_eq!(response.precision(), Some(0.0));
    }

    #[test]
    fn test_entries() {
        let response = QueryResponse {
            data: vec![Snippet { text: "ok".to_string(), score: Some(10.0) }],
        };
        let entry = QueryEntry::answered("¿Qué es un límite?", &response);
        assert!(!entry.failed);
        assert_eq!(entry.answer, "ok");

        let failed = QueryEntry::failed("¿?", "Server error: boom");
        assert!(failed.failed);
        assert_eq!(failed.answer, "Query failed: Server error: boom");
    }
}
