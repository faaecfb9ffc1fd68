use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::chat::HistoryEntry;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
}

/// Chat failures never surface as HTTP errors: the orchestrator folds
/// provider and tool problems into the reply text.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<Value> {
    let response = state
        .chat
        .respond(&state.db, &request.message, &request.conversation_history)
        .await;
    Json(json!({ "response": response }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_defaults_to_empty() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "hello"}"#).unwrap();
        assert_eq!(request.message, "hello");
        assert!(request.conversation_history.is_empty());
    }

    #[test]
    fn history_entries_tolerate_missing_fields() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "conversationHistory": [{"role": "user", "content": "a"}, {"content": "no role"}]}"#,
        )
        .unwrap();
        assert_eq!(request.conversation_history.len(), 2);
        assert_eq!(request.conversation_history[1].role, "");
    }
}
