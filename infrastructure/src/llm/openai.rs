//! OpenAI-compatible chat completion role.
//!
//! [`OpenAiChatRole`] implements [`CompletionRole`] against any endpoint that
//! speaks `POST {base_url}/chat/completions`. Each thread keeps its own
//! history: the user message and the final assistant text of every turn.
//!
//! A role bound to a [`ToolCatalogPort`] advertises every tool as a function
//! and loops until the model answers with plain text:
//!
//! ```text
//!   messages ──▶ model ──tool_calls──▶ catalogue.invoke ──▶ tool messages ─┐
//!                  ▲                                                       │
//!                  └───────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use conductor_application::{CompletionRole, FragmentStream, RoleError, ToolCatalogPort};
use conductor_domain::{Message, Role, ThreadId, ToolCall, ToolError, ToolResult, truncate};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::prompts::{advisory_system_prompt, execution_system_prompt};
use crate::tools::JsonSchemaToolConverter;

/// Fragments buffered between the tool loop and a streaming caller
const FRAGMENT_BUFFER: usize = 32;

/// Connection and sampling settings for one role
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiRoleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    /// Upper bound on model ↔ tool exchanges per message
    pub max_tool_rounds: usize,
}

impl Default for OpenAiRoleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            request_timeout: Duration::from_secs(120),
            max_tool_rounds: 8,
        }
    }
}

impl OpenAiRoleConfig {
    /// `{base_url}/chat/completions`
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

// ==================== Wire types ====================

/// One message in a chat-completions request or reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Plain assistant text reply
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::from(&Message::assistant(content))
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: Some(message.content.clone()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: WireFunction,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

impl WireToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: &Value) -> Self {
        Self {
            id: id.into(),
            kind: function_type(),
            function: WireFunction {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }

    /// Decode into a domain [`ToolCall`]; empty arguments mean `{}`.
    fn to_tool_call(&self) -> Result<ToolCall, ToolError> {
        let raw = self.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).map_err(|e| {
                ToolError::invalid_argument(format!("Arguments are not valid JSON: {}", e))
            })?
        };
        Ok(ToolCall::new(&self.function.name)
            .with_id(&self.id)
            .with_arguments(arguments))
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    #[serde(skip_serializing_if = "no_tools")]
    pub tools: &'a [Value],
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// ==================== Backend ====================

/// One chat-completions round trip.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatMessage, RoleError>;
}

/// [`ChatBackend`] over HTTP (reqwest)
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpChatBackend {
    pub fn new(config: &OpenAiRoleConfig) -> Result<Self, RoleError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RoleError::NotConfigured(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
        })
    }
}

fn request_error(e: reqwest::Error) -> RoleError {
    if e.is_timeout() {
        RoleError::Timeout
    } else {
        RoleError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatMessage, RoleError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RoleError::RequestFailed(format!(
                "HTTP {}: {}",
                status,
                truncate(&text, 500)
            )));
        }

        let text = response.text().await.map_err(request_error)?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| RoleError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| RoleError::InvalidResponse("Missing choices".to_string()))
    }
}

// ==================== Role ====================

struct RoleInner {
    name: String,
    backend: Arc<dyn ChatBackend>,
    model: String,
    temperature: f32,
    max_tool_rounds: usize,
    system_prompt: String,
    tools: Option<Arc<dyn ToolCatalogPort>>,
    threads: StdMutex<HashMap<ThreadId, Vec<Message>>>,
}

/// Chat-completions role with per-thread history.
#[derive(Clone)]
pub struct OpenAiChatRole {
    inner: Arc<RoleInner>,
}

impl OpenAiChatRole {
    /// Role over HTTP with an explicit system prompt and no tools.
    pub fn new(
        name: impl Into<String>,
        config: &OpenAiRoleConfig,
        system_prompt: impl Into<String>,
    ) -> Result<Self, RoleError> {
        let backend = Arc::new(HttpChatBackend::new(config)?);
        Ok(Self::with_backend(name, backend, config, system_prompt, None))
    }

    /// Role over any backend.
    pub fn with_backend(
        name: impl Into<String>,
        backend: Arc<dyn ChatBackend>,
        config: &OpenAiRoleConfig,
        system_prompt: impl Into<String>,
        tools: Option<Arc<dyn ToolCatalogPort>>,
    ) -> Self {
        Self {
            inner: Arc::new(RoleInner {
                name: name.into(),
                backend,
                model: config.model.clone(),
                temperature: config.temperature,
                max_tool_rounds: config.max_tool_rounds,
                system_prompt: system_prompt.into(),
                tools,
                threads: StdMutex::new(HashMap::new()),
            }),
        }
    }

    /// The advisory role: knows the catalogue, never calls tools.
    pub fn advisor(
        config: &OpenAiRoleConfig,
        catalog: &dyn ToolCatalogPort,
    ) -> Result<Self, RoleError> {
        let prompt = advisory_system_prompt(&catalog.catalogue_summary());
        Self::new("advisor", config, prompt)
    }

    /// The execution role: every catalogue tool is callable.
    pub fn executor(
        config: &OpenAiRoleConfig,
        catalog: Arc<dyn ToolCatalogPort>,
    ) -> Result<Self, RoleError> {
        let prompt = execution_system_prompt(&catalog.descriptors());
        let backend = Arc::new(HttpChatBackend::new(config)?);
        Ok(Self::with_backend(
            "executor",
            backend,
            config,
            prompt,
            Some(catalog),
        ))
    }

    /// Snapshot of one thread's history.
    pub fn history(&self, thread: &ThreadId) -> Vec<Message> {
        self.inner.history(thread)
    }
}

impl RoleInner {
    fn lock_threads(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadId, Vec<Message>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn history(&self, thread: &ThreadId) -> Vec<Message> {
        self.lock_threads().get(thread).cloned().unwrap_or_default()
    }

    fn remember(&self, thread: &ThreadId, user: &str, reply: &str) {
        let mut threads = self.lock_threads();
        let history = threads.entry(thread.clone()).or_default();
        history.push(Message::user(user));
        history.push(Message::assistant(reply));
    }

    fn tool_schemas(&self) -> Vec<Value> {
        match &self.tools {
            Some(catalog) => JsonSchemaToolConverter.all_tools_schema(&catalog.descriptors()),
            None => Vec::new(),
        }
    }

    /// Run one message to a final answer, reporting tool traffic to `events`.
    async fn run(
        &self,
        thread: &ThreadId,
        message: &str,
        events: Option<&mpsc::Sender<Result<String, RoleError>>>,
    ) -> Result<String, RoleError> {
        let mut messages = vec![ChatMessage::from(&Message::system(&self.system_prompt))];
        messages.extend(self.history(thread).iter().map(ChatMessage::from));
        messages.push(ChatMessage::from(&Message::user(message)));

        let tools = self.tool_schemas();

        for round in 0..=self.max_tool_rounds {
            let request = ChatRequest {
                model: &self.model,
                messages: &messages,
                temperature: self.temperature,
                tools: &tools,
            };
            debug!(role = %self.name, thread = %thread, round, "Sending chat request");
            let reply = self.backend.complete(&request).await?;

            let catalog = match &self.tools {
                Some(catalog) if !reply.tool_calls.is_empty() => catalog,
                _ => {
                    let text = reply.content.unwrap_or_default();
                    self.remember(thread, message, &text);
                    return Ok(text);
                }
            };

            if round == self.max_tool_rounds {
                break;
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for wire in calls {
                let result = match wire.to_tool_call() {
                    Ok(call) => {
                        emit(events, format!("🔧 Running: {}\n", call.tool_name)).await?;
                        info!(role = %self.name, tool = %call.tool_name, "Invoking tool");
                        catalog.invoke(&call.tool_name, call.arguments).await
                    }
                    Err(error) => {
                        warn!(role = %self.name, tool = %wire.function.name, error = %error, "Malformed tool call");
                        ToolResult::failure(&wire.function.name, error)
                    }
                };

                let text = result.as_text();
                emit(events, format!("📊 Result: {}\n", text)).await?;
                messages.push(ChatMessage::tool_result(wire.id, text));
            }
        }

        Err(RoleError::InvalidResponse(format!(
            "No final answer after {} tool rounds",
            self.max_tool_rounds
        )))
    }
}

async fn emit(
    events: Option<&mpsc::Sender<Result<String, RoleError>>>,
    fragment: String,
) -> Result<(), RoleError> {
    match events {
        Some(tx) => tx.send(Ok(fragment)).await.map_err(|_| RoleError::Cancelled),
        None => Ok(()),
    }
}

#[async_trait]
impl CompletionRole for OpenAiChatRole {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn send(&self, thread: &ThreadId, message: &str) -> Result<String, RoleError> {
        self.inner.run(thread, message, None).await
    }

    async fn stream(&self, thread: &ThreadId, message: &str) -> Result<FragmentStream, RoleError> {
        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        let inner = Arc::clone(&self.inner);
        let thread = thread.clone();
        let message = message.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => {
                    debug!(role = %inner.name, "Fragment stream dropped, abandoning request");
                }
                result = inner.run(&thread, &message, Some(&tx)) => {
                    // The receiver may already be gone.
                    let _ = tx.send(result).await;
                }
            }
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_application::collect_fragments;
    use conductor_domain::{ToolDescriptor, ToolParameter};
    use serde_json::json;
    use std::collections::{BTreeMap, VecDeque};

    /// Replays canned replies and records every request body.
    #[derive(Default)]
    struct ScriptedBackend {
        replies: StdMutex<VecDeque<ChatMessage>>,
        requests: StdMutex<Vec<Value>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                requests: StdMutex::new(Vec::new()),
            })
        }

        fn request(&self, n: usize) -> Value {
            self.requests.lock().unwrap()[n].clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatMessage, RoleError> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RoleError::RequestFailed("script exhausted".into()))
        }
    }

    #[derive(Default)]
    struct MockCatalog {
        calls: StdMutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ToolCatalogPort for MockCatalog {
        fn descriptors(&self) -> Vec<ToolDescriptor> {
            vec![
                ToolDescriptor::new("list_dir", "list files")
                    .with_parameter(ToolParameter::new("path", "Directory", true)),
            ]
        }

        fn catalogue_summary(&self) -> BTreeMap<String, Vec<String>> {
            BTreeMap::from([("fs".to_string(), vec!["list_dir: list files".to_string()])])
        }

        async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            ToolResult::success(name, "a.txt\nb.txt")
        }

        async fn close(&self) {}
    }

    fn tool_call_reply(calls: Vec<WireToolCall>) -> ChatMessage {
        ChatMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    fn executor(backend: Arc<ScriptedBackend>, catalog: Arc<MockCatalog>) -> OpenAiChatRole {
        let config = OpenAiRoleConfig {
            max_tool_rounds: 2,
            ..Default::default()
        };
        OpenAiChatRole::with_backend(
            "executor",
            backend,
            &config,
            execution_system_prompt(&catalog.descriptors()),
            Some(catalog as Arc<dyn ToolCatalogPort>),
        )
    }

    #[test]
    fn test_endpoint() {
        let config = OpenAiRoleConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_request_omits_empty_tools() {
        let messages = vec![ChatMessage::from(&Message::user("hi"))];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            tools: &[],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["messages"][0], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_reply_with_tool_calls_parses() {
        let reply: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "list_dir", "arguments": "{\"path\":\"/tmp\"}"}
                }]
            }}]
        }))
        .unwrap();
        let message = &reply.choices[0].message;
        assert!(message.content.is_none());

        let call = message.tool_calls[0].to_tool_call().unwrap();
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(call.tool_name, "list_dir");
        assert_eq!(call.arguments, json!({"path": "/tmp"}));
    }

    #[tokio::test]
    async fn test_send_keeps_thread_history() {
        let backend = ScriptedBackend::new(vec![
            ChatMessage::assistant("first answer"),
            ChatMessage::assistant("second answer"),
        ]);
        let role = OpenAiChatRole::with_backend(
            "advisor",
            backend.clone(),
            &OpenAiRoleConfig::default(),
            "system",
            None,
        );
        let thread = ThreadId::new("advisory_s1");

        assert_eq!(role.send(&thread, "one").await.unwrap(), "first answer");
        assert_eq!(role.send(&thread, "two").await.unwrap(), "second answer");

        let second = backend.request(1);
        let messages = second["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "one");
        assert_eq!(messages[2]["content"], "first answer");
        assert_eq!(messages[3]["content"], "two");
        assert!(second.get("tools").is_none());

        assert!(role.history(&ThreadId::new("other")).is_empty());
    }

    #[tokio::test]
    async fn test_tool_loop_routes_calls_to_catalog() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply(vec![WireToolCall::new(
                "call_1",
                "list_dir",
                &json!({"path": "/tmp"}),
            )]),
            ChatMessage::assistant("Found a.txt and b.txt"),
        ]);
        let catalog = Arc::new(MockCatalog::default());
        let role = executor(backend.clone(), catalog.clone());
        let thread = ThreadId::new("execution_s1");

        let reply = role.send(&thread, "Execute this task").await.unwrap();
        assert_eq!(reply, "Found a.txt and b.txt");

        let calls = catalog.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("list_dir".to_string(), json!({"path": "/tmp"}))]);

        let first = backend.request(0);
        assert_eq!(first["tools"][0]["function"]["name"], "list_dir");

        let second = backend.request(1);
        let messages = second["messages"].as_array().unwrap();
        let tool_message = messages.last().unwrap();
        assert_eq!(tool_message["role"], "tool");
        assert_eq!(tool_message["tool_call_id"], "call_1");
        assert_eq!(tool_message["content"], "a.txt\nb.txt");

        // Only the user message and final text are remembered.
        assert_eq!(role.history(&thread).len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_reported_to_model() {
        let mut bad = WireToolCall::new("call_1", "list_dir", &json!({}));
        bad.function.arguments = "{not json".to_string();
        let backend = ScriptedBackend::new(vec![
            tool_call_reply(vec![bad]),
            ChatMessage::assistant("Sorry"),
        ]);
        let catalog = Arc::new(MockCatalog::default());
        let role = executor(backend.clone(), catalog.clone());

        let reply = role.send(&ThreadId::new("t"), "go").await.unwrap();
        assert_eq!(reply, "Sorry");
        assert!(catalog.calls.lock().unwrap().is_empty());

        let second = backend.request(1);
        let content = second["messages"].as_array().unwrap().last().unwrap()["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(content.starts_with("Error:"));
        assert!(content.contains("INVALID_ARGUMENT"));
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let call = || tool_call_reply(vec![WireToolCall::new("c", "list_dir", &json!({"path": "/"}))]);
        let backend = ScriptedBackend::new(vec![call(), call(), call(), call()]);
        let catalog = Arc::new(MockCatalog::default());
        let role = executor(backend, catalog.clone());

        let err = role.send(&ThreadId::new("t"), "loop").await.unwrap_err();
        assert!(matches!(err, RoleError::InvalidResponse(_)));
        assert_eq!(catalog.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_reports_tool_traffic_then_answer() {
        let backend = ScriptedBackend::new(vec![
            tool_call_reply(vec![WireToolCall::new(
                "call_1",
                "list_dir",
                &json!({"path": "/tmp"}),
            )]),
            ChatMessage::assistant("Done."),
        ]);
        let role = executor(backend, Arc::new(MockCatalog::default()));

        let fragments: Vec<String> = role
            .stream(&ThreadId::new("t"), "go")
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments.len(), 3);
        assert!(fragments[0].contains("Running: list_dir"));
        assert!(fragments[1].contains("Result: a.txt"));
        assert_eq!(fragments[2], "Done.");
    }

    #[tokio::test]
    async fn test_stream_surfaces_backend_error() {
        let backend = ScriptedBackend::new(Vec::new());
        let role = executor(backend, Arc::new(MockCatalog::default()));

        let stream = role.stream(&ThreadId::new("t"), "go").await.unwrap();
        let err = collect_fragments(stream).await.unwrap_err();
        assert!(matches!(err, RoleError::RequestFailed(_)));
    }

    #[test]
    fn test_advisor_prompt_uses_catalogue() {
        let role = OpenAiChatRole::advisor(&OpenAiRoleConfig::default(), &MockCatalog::default())
            .unwrap();
        assert_eq!(role.name(), "advisor");
        assert!(role.inner.system_prompt.contains("list_dir: list files"));
        assert!(role.inner.tools.is_none());
    }
}
