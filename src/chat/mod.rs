//! Chat assistant over the expense data. One exchange runs at most one
//! round of tool calls: compose the transcript, request a completion with
//! the four tool definitions, execute any requested tools, then request a
//! final completion over the extended transcript.

mod openai;

use std::env;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{error, info, warn};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::Database;
use crate::models::{minor_to_major, CreateExpenseRequest, ExpenseStatus};
use openai::{ChatClient, ChatError, Completion, FunctionCall, Message, ToolDefinition};

/// Chat backend resolved once at startup: either a live provider or a
/// deterministic offline reply when no deployment is configured.
pub enum ChatService {
    Live(LiveChat),
    Unconfigured,
}

impl ChatService {
    pub fn from_env() -> Self {
        let endpoint = env::var("OPENAI_ENDPOINT").ok().filter(|v| !v.is_empty());
        let deployment = env::var("OPENAI_DEPLOYMENT").ok().filter(|v| !v.is_empty());

        match (endpoint, deployment) {
            (Some(endpoint), Some(deployment)) => {
                info!("Chat assistant using deployment {}", deployment);
                let api_key = env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty());
                ChatService::Live(LiveChat {
                    client: ChatClient::new(endpoint, deployment, api_key),
                })
            }
            _ => {
                warn!("OpenAI configuration is missing; chat assistant runs in offline mode");
                ChatService::Unconfigured
            }
        }
    }

    /// Never fails: provider and tool errors are logged and folded into
    /// the reply text.
    pub async fn respond(
        &self,
        db: &Database,
        user_message: &str,
        history: &[HistoryEntry],
    ) -> String {
        match self {
            ChatService::Unconfigured => offline_reply(user_message),
            ChatService::Live(live) => live.respond(db, user_message, history).await,
        }
    }
}

/// One prior turn of the conversation, as supplied by the client.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// Seam between the orchestrator and the completion provider, so the
/// orchestration logic can run against a scripted backend.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, ChatError>;
}

#[async_trait]
impl CompletionBackend for ChatClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<Completion, ChatError> {
        ChatClient::complete(self, messages, tools).await
    }
}

pub struct LiveChat<B = ChatClient> {
    client: B,
}

impl<B: CompletionBackend> LiveChat<B> {
    async fn respond(&self, db: &Database, user_message: &str, history: &[HistoryEntry]) -> String {
        match self.try_respond(db, user_message, history).await {
            Ok(text) => text,
            Err(err) => {
                error!("Error getting chat response: {}", err);
                format!("⚠️ Error: {err}")
            }
        }
    }

    async fn try_respond(
        &self,
        db: &Database,
        user_message: &str,
        history: &[HistoryEntry],
    ) -> Result<String, ChatError> {
        let mut messages = compose_messages(user_message, history);
        let tools = tool_definitions();

        let first = self.client.complete(&messages, Some(tools.as_slice())).await?;
        if first.tool_calls.is_empty() {
            return Ok(first.content.unwrap_or_default());
        }

        messages.push(Message::assistant_tool_calls(first.tool_calls.clone()));
        for call in &first.tool_calls {
            let reply = execute_tool(db, &call.function).await;
            messages.push(Message::tool(call.id.clone(), reply));
        }

        let second = self.client.complete(&messages, None).await?;
        Ok(second.content.unwrap_or_default())
    }
}

fn offline_reply(user_message: &str) -> String {
    format!(
        "👋 **Chat assistant is not configured**\n\n\
         The assistant needs an OpenAI-compatible deployment. Set \
         `OPENAI_ENDPOINT` and `OPENAI_DEPLOYMENT` (and `OPENAI_API_KEY` \
         if required) and restart the server to enable it.\n\n\
         The rest of the application is unaffected: expenses, users and \
         lookups remain available through the REST API.\n\n\
         **Your message was:** {user_message}"
    )
}

fn system_prompt() -> String {
    format!(
        "You are an AI assistant for an expense management system. You have \
         access to real functions that can:\n\n\
         1. **get_expenses** - Retrieve expense records with optional filters\n\
         2. **create_expense** - Create new expense records\n\
         3. **get_users** - Get the list of users in the system\n\
         4. **get_categories** - Get the available expense categories\n\n\
         Expense statuses are {statuses}.\n\n\
         When users ask about expenses, users, or want to create expenses, use \
         these functions to provide accurate, real-time data.\n\n\
         When displaying lists:\n\
         - Format amounts as currency (£X.XX)\n\
         - Use clear, readable formatting with bullet points or numbered lists\n\
         - Bold important information using **text**\n\
         - Keep responses concise but informative\n\n\
         Always be helpful, professional, and accurate with financial data.",
        statuses = ExpenseStatus::describe_ids(),
    )
}

/// System instruction, then the usable history in order, then the new
/// message. History entries with any role other than "user" or
/// "assistant" are dropped.
fn compose_messages(user_message: &str, history: &[HistoryEntry]) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt())];
    for entry in history {
        match entry.role.as_str() {
            "user" => messages.push(Message::user(entry.content.clone())),
            "assistant" => messages.push(Message::assistant(entry.content.clone())),
            _ => {}
        }
    }
    messages.push(Message::user(user_message));
    messages
}

/// The closed set of functions offered to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolKind {
    GetExpenses,
    CreateExpense,
    GetUsers,
    GetCategories,
}

impl ToolKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "get_expenses" => Some(ToolKind::GetExpenses),
            "create_expense" => Some(ToolKind::CreateExpense),
            "get_users" => Some(ToolKind::GetUsers),
            "get_categories" => Some(ToolKind::GetCategories),
            _ => None,
        }
    }
}

fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::function(
            "get_expenses",
            "Retrieves expense records from the database with optional \
             filtering by user ID, status ID, or date range",
            json!({
                "type": "object",
                "properties": {
                    "userId": {
                        "type": "integer",
                        "description": "Optional user ID to filter expenses"
                    },
                    "statusId": {
                        "type": "integer",
                        "description": format!(
                            "Optional status ID ({})",
                            ExpenseStatus::describe_ids()
                        )
                    },
                    "fromDate": {
                        "type": "string",
                        "description": "Optional start date in ISO format (yyyy-MM-dd)"
                    },
                    "toDate": {
                        "type": "string",
                        "description": "Optional end date in ISO format (yyyy-MM-dd)"
                    }
                }
            }),
        ),
        ToolDefinition::function(
            "create_expense",
            "Creates a new expense record in the database",
            json!({
                "type": "object",
                "properties": {
                    "userId": {
                        "type": "integer",
                        "description": "User ID who owns this expense"
                    },
                    "categoryId": {
                        "type": "integer",
                        "description": "Expense category ID, see get_categories"
                    },
                    "amount": {
                        "type": "number",
                        "description": "Expense amount in GBP"
                    },
                    "expenseDate": {
                        "type": "string",
                        "description": "Date of expense in ISO format (yyyy-MM-dd)"
                    },
                    "description": {
                        "type": "string",
                        "description": "Optional description of the expense"
                    }
                },
                "required": ["userId", "categoryId", "amount", "expenseDate"]
            }),
        ),
        ToolDefinition::function(
            "get_users",
            "Retrieves the list of all active users in the system",
            json!({ "type": "object", "properties": {} }),
        ),
        ToolDefinition::function(
            "get_categories",
            "Retrieves the list of available expense categories",
            json!({ "type": "object", "properties": {} }),
        ),
    ]
}

/// Runs one model-issued tool call. Unknown names and failures become an
/// `{"error": ...}` payload for the model rather than an error for the
/// caller.
async fn execute_tool(db: &Database, call: &FunctionCall) -> String {
    info!("Executing function {} with args {}", call.name, call.arguments);

    let result = match ToolKind::from_name(&call.name) {
        Some(ToolKind::GetExpenses) => run_get_expenses(db, &call.arguments).await,
        Some(ToolKind::CreateExpense) => run_create_expense(db, &call.arguments).await,
        Some(ToolKind::GetUsers) => run_get_users(db).await,
        Some(ToolKind::GetCategories) => run_get_categories(db).await,
        None => Err(format!("Unknown function: {}", call.name)),
    };

    match result {
        Ok(value) => value.to_string(),
        Err(message) => {
            error!("Error executing function {}: {}", call.name, message);
            json!({ "error": message }).to_string()
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|err| format!("Invalid arguments: {err}"))
}

fn format_amount(amount_minor: i64) -> String {
    format!("£{:.2}", minor_to_major(amount_minor))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetExpensesArgs {
    user_id: Option<i32>,
    status_id: Option<i32>,
    from_date: Option<NaiveDate>,
    to_date: Option<NaiveDate>,
}

async fn run_get_expenses(db: &Database, arguments: &str) -> Result<Value, String> {
    let args: GetExpensesArgs = if arguments.trim().is_empty() {
        GetExpensesArgs::default()
    } else {
        parse_args(arguments)?
    };

    let expenses = db
        .get_expenses(args.user_id, args.status_id, args.from_date, args.to_date)
        .await
        .map_err(|err| err.to_string())?;

    Ok(json!({
        "count": expenses.len(),
        "expenses": expenses
            .iter()
            .map(|e| json!({
                "expenseId": e.expense_id,
                "userName": e.user_name,
                "categoryName": e.category_name,
                "statusName": e.status_name,
                "amount": format_amount(e.amount_minor),
                "expenseDate": e.expense_date,
                "description": e.description,
            }))
            .collect::<Vec<_>>(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateExpenseArgs {
    user_id: i32,
    category_id: i32,
    amount: Decimal,
    expense_date: NaiveDate,
    #[serde(default)]
    description: Option<String>,
}

async fn run_create_expense(db: &Database, arguments: &str) -> Result<Value, String> {
    let args: CreateExpenseArgs = parse_args(arguments)?;

    let request = CreateExpenseRequest {
        user_id: args.user_id,
        category_id: args.category_id,
        amount: args.amount,
        currency: "GBP".to_string(),
        expense_date: args.expense_date,
        description: args.description,
        receipt_file: None,
    };

    let expense_id = db
        .create_expense(&request)
        .await
        .map_err(|err| err.to_string())?;

    Ok(json!({
        "success": true,
        "expenseId": expense_id,
        "message": "Expense created successfully",
    }))
}

async fn run_get_users(db: &Database) -> Result<Value, String> {
    let users = db.get_users().await.map_err(|err| err.to_string())?;

    Ok(json!({
        "count": users.len(),
        "users": users
            .iter()
            .map(|u| json!({
                "userId": u.user_id,
                "userName": u.user_name,
                "email": u.email,
                "roleName": u.role_name,
            }))
            .collect::<Vec<_>>(),
    }))
}

async fn run_get_categories(db: &Database) -> Result<Value, String> {
    let categories = db
        .get_expense_categories()
        .await
        .map_err(|err| err.to_string())?;

    Ok(json!({
        "count": categories.len(),
        "categories": categories
            .iter()
            .map(|c| json!({
                "categoryId": c.category_id,
                "categoryName": c.category_name,
            }))
            .collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: &str, content: &str) -> HistoryEntry {
        HistoryEntry {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn composed_transcript_keeps_user_and_assistant_turns_in_order() {
        let history = vec![
            entry("user", "first"),
            entry("assistant", "second"),
            entry("system", "injected"),
            entry("", "untagged"),
            entry("user", "third"),
        ];
        let messages = compose_messages("latest", &history);

        let roles: Vec<&str> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user", "user"]);
        assert_eq!(messages[1].content.as_deref(), Some("first"));
        assert_eq!(messages[2].content.as_deref(), Some("second"));
        assert_eq!(messages[3].content.as_deref(), Some("third"));
        assert_eq!(messages[4].content.as_deref(), Some("latest"));
    }

    #[test]
    fn tool_names_decode_into_the_closed_set() {
        assert_eq!(ToolKind::from_name("get_expenses"), Some(ToolKind::GetExpenses));
        assert_eq!(ToolKind::from_name("create_expense"), Some(ToolKind::CreateExpense));
        assert_eq!(ToolKind::from_name("get_users"), Some(ToolKind::GetUsers));
        assert_eq!(ToolKind::from_name("get_categories"), Some(ToolKind::GetCategories));
        assert_eq!(ToolKind::from_name("drop_tables"), None);
    }

    #[test]
    fn get_expenses_args_tolerate_missing_filters() {
        let args: GetExpensesArgs = parse_args("{}").unwrap();
        assert_eq!(args.user_id, None);
        assert_eq!(args.status_id, None);
        assert_eq!(args.from_date, None);
        assert_eq!(args.to_date, None);

        let args: GetExpensesArgs =
            parse_args(r#"{"userId": 2, "fromDate": "2025-01-01"}"#).unwrap();
        assert_eq!(args.user_id, Some(2));
        assert_eq!(
            args.from_date,
            Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        );
    }

    #[test]
    fn create_expense_args_require_the_mandatory_fields() {
        let err = parse_args::<CreateExpenseArgs>(r#"{"userId": 1}"#).unwrap_err();
        assert!(err.starts_with("Invalid arguments"));

        let args: CreateExpenseArgs = parse_args(
            r#"{"userId": 1, "categoryId": 2, "amount": 12.5, "expenseDate": "2025-03-01"}"#,
        )
        .unwrap();
        assert_eq!(args.description, None);
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let err = parse_args::<GetExpensesArgs>(r#"{"fromDate": "01/03/2025"}"#).unwrap_err();
        assert!(err.starts_with("Invalid arguments"));
    }

    #[test]
    fn amounts_render_with_currency_symbol_and_two_decimals() {
        assert_eq!(format_amount(1251), "£12.51");
        assert_eq!(format_amount(100), "£1.00");
        assert_eq!(format_amount(5), "£0.05");
    }

    #[test]
    fn offline_reply_echoes_the_literal_message() {
        let reply = offline_reply("hello");
        assert!(reply.contains("not configured"));
        assert!(reply.ends_with("**Your message was:** hello"));
    }

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::openai::ToolCall;

    /// Replays a fixed sequence of completions and records every request.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<Completion, ChatError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    struct RecordedCall {
        messages: Vec<Message>,
        tools_offered: bool,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<Completion, ChatError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            messages: &[Message],
            tools: Option<&[ToolDefinition]>,
        ) -> Result<Completion, ChatError> {
            self.calls.lock().unwrap().push(RecordedCall {
                messages: messages.to_vec(),
                tools_offered: tools.is_some(),
            });
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted completion left")
        }
    }

    fn completion(content: Option<&str>, tool_calls: Vec<ToolCall>) -> Completion {
        Completion {
            content: content.map(String::from),
            tool_calls,
        }
    }

    fn test_db() -> Database {
        Database::connect_lazy("postgres://localhost/expensely").unwrap()
    }

    #[tokio::test]
    async fn reply_without_tool_calls_is_returned_verbatim() {
        let live = LiveChat {
            client: ScriptedBackend::new(vec![Ok(completion(
                Some("You spent £12.51 last week."),
                vec![],
            ))]),
        };

        let reply = live.respond(&test_db(), "how much?", &[]).await;
        assert_eq!(reply, "You spent £12.51 last week.");

        let calls = live.client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].tools_offered);
    }

    #[tokio::test]
    async fn tool_round_requests_a_second_completion() {
        let call = ToolCall {
            id: "call_1".to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: "made_up_tool".to_string(),
                arguments: "{}".to_string(),
            },
        };
        let live = LiveChat {
            client: ScriptedBackend::new(vec![
                Ok(completion(None, vec![call])),
                Ok(completion(Some("All done."), vec![])),
            ]),
        };

        let reply = live.respond(&test_db(), "create it", &[]).await;
        assert_eq!(reply, "All done.");

        let calls = live.client.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        // Tool definitions are only offered on the first request.
        assert!(!calls[1].tools_offered);

        let transcript = &calls[1].messages;
        let assistant_turn = &transcript[transcript.len() - 2];
        assert_eq!(assistant_turn.role, "assistant");
        assert!(assistant_turn.tool_calls.is_some());

        let tool_reply = &transcript[transcript.len() - 1];
        assert_eq!(tool_reply.role, "tool");
        assert_eq!(tool_reply.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool_reply
            .content
            .as_deref()
            .unwrap()
            .contains("Unknown function"));
    }

    #[tokio::test]
    async fn provider_failure_folds_into_a_warning_reply() {
        let live = LiveChat {
            client: ScriptedBackend::new(vec![Err(ChatError::EmptyResponse)]),
        };

        let reply = live.respond(&test_db(), "hello", &[]).await;
        assert!(reply.starts_with("⚠️ Error:"), "got: {reply}");
        assert!(reply.contains("no choices"));
    }

    #[test]
    fn status_enumeration_is_embedded_in_the_tool_schema() {
        let tools = tool_definitions();
        let schema = serde_json::to_value(&tools[0]).unwrap();
        let description = schema["function"]["parameters"]["properties"]["statusId"]
            ["description"]
            .as_str()
            .unwrap();
        assert!(description.contains("1=Draft"));
        assert!(description.contains("4=Rejected"));
    }
}
