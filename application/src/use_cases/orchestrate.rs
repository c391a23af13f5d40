//! Orchestrate use case
//!
//! Drives one user request through the advise → plan-check → execute
//! pipeline:
//!
//! ```text
//! user text ──▶ advisor ──▶ extract_task_plan ──┬─▶ (no plan) advisory text
//!                                               ├─▶ (deferred) advisory text + notice
//!                                               └─▶ executor ──▶ merged response
//! ```
//!
//! Faults never escape: they become a diagnostic string and leave the
//! conversation store as it was after the last completed mutation.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use conductor_domain::{
    ConversationContext, ConversationSummary, DomainError, EngineState, ExecutionRecord, SessionId,
    TaskPlan, extract_task_plan,
};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conversation::ConversationStore;
use crate::ports::completion_role::{CompletionRole, FragmentStream, RoleError};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::tool_catalog::ToolCatalogPort;

pub const ERROR_PREFIX: &str = "Error processing request:";
pub const ANALYZING_MARKER: &str = "🤔 Analyzing request...\n";
pub const DEFERRED_NOTICE: &str =
    "💡 **Execution plan prepared but not run automatically.** Execute the current plan to run it.";
pub const NO_PLAN_MESSAGE: &str = "No execution plan available in this session.";

/// Errors that abort a single request
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{role} role failed: {source}")]
    Role {
        role: String,
        #[source]
        source: RoleError,
    },
}

impl OrchestrationError {
    fn role(role: &dyn CompletionRole, source: RoleError) -> Self {
        OrchestrationError::Role {
            role: role.name().to_string(),
            source,
        }
    }
}

/// Input for one request
#[derive(Debug, Clone)]
pub struct ProcessRequestInput {
    pub user_input: String,
    /// Existing session, or `None` to start a fresh one
    pub session_id: Option<SessionId>,
    /// Run an extracted plan right away instead of storing it
    pub auto_execute: bool,
}

impl ProcessRequestInput {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            session_id: None,
            auto_execute: true,
        }
    }

    pub fn in_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }
}

/// What a processed request produced
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    /// Session the request ran in (or was addressed to)
    pub session_id: SessionId,
    /// Text for the user
    pub response: String,
    /// Plan found in the advisory text, if any
    pub plan: Option<TaskPlan>,
    /// Whether the plan was run
    pub executed: bool,
}

impl RequestOutcome {
    fn text(session_id: SessionId, response: impl Into<String>) -> Self {
        Self {
            session_id,
            response: response.into(),
            plan: None,
            executed: false,
        }
    }
}

/// Incremental response of a streamed request.
///
/// Work only advances while the stream is polled, one fragment at a time.
/// Dropping it abandons the request.
pub struct ResponseStream {
    session_id: SessionId,
    fragments: BoxStream<'static, String>,
}

impl ResponseStream {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Drain every fragment into one string.
    pub async fn collect_text(self) -> String {
        self.collect::<Vec<_>>().await.concat()
    }
}

impl Stream for ResponseStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.fragments.poll_next_unpin(cx)
    }
}

fn merge_responses(advisory: &str, execution: &str) -> String {
    format!(
        "**Analysis of the request:**\n{}\n\n**Execution result:**\n{}",
        advisory, execution
    )
}

/// Session-aware request processor.
///
/// Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct OrchestrationEngine {
    catalog: Arc<dyn ToolCatalogPort>,
    advisor: Arc<dyn CompletionRole>,
    executor: Arc<dyn CompletionRole>,
    store: Arc<ConversationStore>,
    progress: Arc<dyn ProgressNotifier>,
    logger: Arc<dyn ConversationLogger>,
}

impl OrchestrationEngine {
    pub fn new(
        catalog: Arc<dyn ToolCatalogPort>,
        advisor: Arc<dyn CompletionRole>,
        executor: Arc<dyn CompletionRole>,
    ) -> Self {
        Self {
            catalog,
            advisor,
            executor,
            store: Arc::new(ConversationStore::new()),
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    // ==================== Session API ====================

    pub fn create_session(&self) -> SessionId {
        self.store.create()
    }

    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.store.list()
    }

    pub fn session(&self, session_id: &SessionId) -> Option<ConversationContext> {
        self.store.get(session_id)
    }

    pub fn summarize(&self, session_id: &SessionId) -> Option<ConversationSummary> {
        self.store.summarize(session_id)
    }

    pub fn catalogue_summary(&self) -> BTreeMap<String, Vec<String>> {
        self.catalog.catalogue_summary()
    }

    /// Close every provider and drop all conversations.
    pub async fn close(&self) {
        info!("Closing orchestration engine");
        self.catalog.close().await;
        self.store.clear();
    }

    /// `Ok(id)` for a usable session (creating one for `None`), `Err(id)` for
    /// an unknown one.
    fn resolve_session(&self, session_id: Option<SessionId>) -> Result<SessionId, SessionId> {
        match session_id {
            None => Ok(self.store.create()),
            Some(id) if self.store.contains(&id) => Ok(id),
            Some(id) => Err(id),
        }
    }

    // ==================== Request processing ====================

    /// Process one request to completion.
    pub async fn process(&self, input: ProcessRequestInput) -> RequestOutcome {
        let session_id = match self.resolve_session(input.session_id) {
            Ok(id) => id,
            Err(id) => {
                warn!(session = %id, "Request for unknown session");
                let message = DomainError::SessionNotFound(id.clone()).to_string();
                return RequestOutcome::text(id, message);
            }
        };

        match self
            .run_request(&session_id, &input.user_input, input.auto_execute)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = self.report_failure(&session_id, &e);
                RequestOutcome::text(session_id, message)
            }
        }
    }

    async fn run_request(
        &self,
        session_id: &SessionId,
        user_input: &str,
        auto_execute: bool,
    ) -> Result<RequestOutcome, OrchestrationError> {
        let context = self
            .store
            .get(session_id)
            .ok_or_else(|| DomainError::SessionNotFound(session_id.clone()))?;

        let advisory = self.advise(&context, user_input).await?;

        self.progress.on_state(session_id, EngineState::PlanCheck);
        let Some(plan) = extract_task_plan(&advisory) else {
            debug!(session = %session_id, "No plan in advisory response");
            self.progress.on_state(session_id, EngineState::Done);
            return Ok(RequestOutcome::text(session_id.clone(), advisory));
        };
        self.record_plan(session_id, &plan)?;

        if !auto_execute {
            info!(session = %session_id, "Plan stored, execution deferred");
            self.progress.on_state(session_id, EngineState::Done);
            return Ok(RequestOutcome {
                session_id: session_id.clone(),
                response: format!("{}\n\n{}", advisory, DEFERRED_NOTICE),
                plan: Some(plan),
                executed: false,
            });
        }

        self.progress.on_state(session_id, EngineState::Executing);
        let result = self
            .executor
            .send(&context.execution_thread_id, &plan.execution_prompt())
            .await
            .map_err(|e| OrchestrationError::role(self.executor.as_ref(), e))?;

        self.finish_execution(
            session_id,
            ExecutionRecord::new(user_input, advisory.clone(), Some(plan.clone()), result.clone()),
        )?;

        Ok(RequestOutcome {
            session_id: session_id.clone(),
            response: merge_responses(&advisory, &result),
            plan: Some(plan),
            executed: true,
        })
    }

    /// Run the plan stored by a deferred request.
    pub async fn execute_current_plan(&self, session_id: &SessionId) -> String {
        let Some(context) = self.store.get(session_id) else {
            return DomainError::SessionNotFound(session_id.clone()).to_string();
        };
        let Some(plan) = context.current_plan.clone() else {
            return NO_PLAN_MESSAGE.to_string();
        };

        match self.run_plan(&context, plan).await {
            Ok(result) => format!("✅ **Plan executed:**\n\n{}", result),
            Err(e) => self.report_failure(session_id, &e),
        }
    }

    async fn run_plan(
        &self,
        context: &ConversationContext,
        plan: TaskPlan,
    ) -> Result<String, OrchestrationError> {
        let session_id = &context.session_id;
        info!(session = %session_id, task = %plan.task_description, "Executing stored plan");

        self.progress.on_state(session_id, EngineState::Executing);
        let result = self
            .executor
            .send(&context.execution_thread_id, &plan.execution_prompt())
            .await
            .map_err(|e| OrchestrationError::role(self.executor.as_ref(), e))?;

        let record = ExecutionRecord::new(
            plan.task_description.clone(),
            String::new(),
            Some(plan),
            result.clone(),
        );
        self.finish_execution(session_id, record)?;
        self.store.take_plan(session_id)?;
        Ok(result)
    }

    /// Process one request, yielding the response as it is produced.
    ///
    /// Fragments arrive in order: the analyzing marker, the advisory text,
    /// and, when the advisory text carries a plan, a running-plan marker
    /// followed by every fragment of the executor's stream. The execution
    /// record is written once the consumer reaches the end of the stream;
    /// a stream dropped before that writes nothing.
    pub fn stream(
        &self,
        user_input: impl Into<String>,
        session_id: Option<SessionId>,
    ) -> ResponseStream {
        let (session_id, phase) = match self.resolve_session(session_id) {
            Ok(id) => (id, StreamPhase::Start),
            Err(id) => {
                warn!(session = %id, "Stream for unknown session");
                let message = DomainError::SessionNotFound(id.clone()).to_string();
                (id, StreamPhase::Notice(message))
            }
        };

        let pipeline = StreamPipeline {
            engine: self.clone(),
            session_id: session_id.clone(),
            user_input: user_input.into(),
            finished: matches!(phase, StreamPhase::Notice(_)),
            phase,
        };

        let fragments = stream::unfold(pipeline, |mut pipeline| async move {
            let fragment = pipeline.next_fragment().await?;
            Some((fragment, pipeline))
        })
        .boxed();

        ResponseStream {
            session_id,
            fragments,
        }
    }

    // ==================== Shared steps ====================

    async fn advise(
        &self,
        context: &ConversationContext,
        user_input: &str,
    ) -> Result<String, OrchestrationError> {
        let session_id = &context.session_id;
        self.progress.on_state(session_id, EngineState::Advising);

        let advisory = self
            .advisor
            .send(&context.advisory_thread_id, user_input)
            .await
            .map_err(|e| OrchestrationError::role(self.advisor.as_ref(), e))?;

        self.logger.log(ConversationEvent::new(
            "advisory_response",
            json!({
                "session_id": session_id,
                "user_input": user_input,
                "response": advisory,
            }),
        ));
        Ok(advisory)
    }

    fn record_plan(&self, session_id: &SessionId, plan: &TaskPlan) -> Result<(), OrchestrationError> {
        info!(
            session = %session_id,
            task = %plan.task_description,
            tools = ?plan.required_tools,
            "Plan extracted"
        );
        self.store.set_plan(session_id, Some(plan.clone()))?;
        self.logger.log(ConversationEvent::new(
            "plan_extracted",
            json!({
                "session_id": session_id,
                "plan": plan,
            }),
        ));
        Ok(())
    }

    fn finish_execution(
        &self,
        session_id: &SessionId,
        record: ExecutionRecord,
    ) -> Result<(), OrchestrationError> {
        let event = ConversationEvent::new(
            "execution_complete",
            json!({
                "session_id": session_id,
                "task": record.plan.as_ref().map(|p| p.task_description.as_str()),
                "result": record.execution_result,
            }),
        );
        self.store.append_execution(session_id, record)?;
        self.logger.log(event);
        self.progress.on_state(session_id, EngineState::Done);
        Ok(())
    }

    fn report_failure(&self, session_id: &SessionId, error: &OrchestrationError) -> String {
        warn!(session = %session_id, "Request failed: {}", error);
        self.logger.log(ConversationEvent::new(
            "request_failed",
            json!({
                "session_id": session_id,
                "error": error.to_string(),
            }),
        ));
        self.progress.on_state(session_id, EngineState::Done);
        format!("{} {}", ERROR_PREFIX, error)
    }
}

enum StreamPhase {
    Start,
    Notice(String),
    Advise(ConversationContext),
    PlanCheck {
        context: ConversationContext,
        advisory: String,
    },
    StartExecution {
        context: ConversationContext,
        advisory: String,
        plan: TaskPlan,
    },
    Executing {
        advisory: String,
        plan: TaskPlan,
        fragments: FragmentStream,
        result: String,
    },
    Finished,
}

/// State of one streamed request, advanced by the consumer's polls.
struct StreamPipeline {
    engine: OrchestrationEngine,
    session_id: SessionId,
    user_input: String,
    phase: StreamPhase,
    /// Set once the request has completed or failed
    finished: bool,
}

impl StreamPipeline {
    async fn next_fragment(&mut self) -> Option<String> {
        loop {
            match std::mem::replace(&mut self.phase, StreamPhase::Finished) {
                StreamPhase::Finished => return None,
                StreamPhase::Notice(message) => return Some(message),
                StreamPhase::Start => {
                    let Some(context) = self.engine.store.get(&self.session_id) else {
                        let e = DomainError::SessionNotFound(self.session_id.clone());
                        return self.fail(e.into());
                    };
                    self.phase = StreamPhase::Advise(context);
                    return Some(ANALYZING_MARKER.to_string());
                }
                StreamPhase::Advise(context) => {
                    match self.engine.advise(&context, &self.user_input).await {
                        Ok(advisory) => {
                            let fragment = format!("**Analysis:**\n{}\n\n", advisory);
                            self.phase = StreamPhase::PlanCheck { context, advisory };
                            return Some(fragment);
                        }
                        Err(e) => return self.fail(e),
                    }
                }
                StreamPhase::PlanCheck { context, advisory } => {
                    let engine = &self.engine;
                    engine.progress.on_state(&self.session_id, EngineState::PlanCheck);
                    let Some(plan) = extract_task_plan(&advisory) else {
                        engine.progress.on_state(&self.session_id, EngineState::Done);
                        self.finished = true;
                        return None;
                    };
                    if let Err(e) = engine.record_plan(&self.session_id, &plan) {
                        return self.fail(e);
                    }

                    let fragment = format!("📋 **Running plan:** {}\n\n", plan.task_description);
                    self.phase = StreamPhase::StartExecution {
                        context,
                        advisory,
                        plan,
                    };
                    return Some(fragment);
                }
                StreamPhase::StartExecution {
                    context,
                    advisory,
                    plan,
                } => {
                    let executor = &self.engine.executor;
                    self.engine
                        .progress
                        .on_state(&self.session_id, EngineState::Executing);
                    match executor
                        .stream(&context.execution_thread_id, &plan.execution_prompt())
                        .await
                    {
                        Ok(fragments) => {
                            self.phase = StreamPhase::Executing {
                                advisory,
                                plan,
                                fragments,
                                result: String::new(),
                            };
                        }
                        Err(e) => {
                            let error = OrchestrationError::role(executor.as_ref(), e);
                            return self.fail(error);
                        }
                    }
                }
                StreamPhase::Executing {
                    advisory,
                    plan,
                    mut fragments,
                    mut result,
                } => match fragments.next().await {
                    Some(Ok(fragment)) => {
                        result.push_str(&fragment);
                        self.phase = StreamPhase::Executing {
                            advisory,
                            plan,
                            fragments,
                            result,
                        };
                        return Some(fragment);
                    }
                    Some(Err(e)) => {
                        let error = OrchestrationError::role(self.engine.executor.as_ref(), e);
                        return self.fail(error);
                    }
                    None => {
                        let record = ExecutionRecord::new(
                            self.user_input.as_str(),
                            advisory,
                            Some(plan),
                            result,
                        );
                        if let Err(e) = self.engine.finish_execution(&self.session_id, record) {
                            return self.fail(e);
                        }
                        self.finished = true;
                        return None;
                    }
                },
            }
        }
    }

    fn fail(&mut self, error: OrchestrationError) -> Option<String> {
        self.finished = true;
        let message = self.engine.report_failure(&self.session_id, &error);
        Some(format!("\n{}", message))
    }
}

impl Drop for StreamPipeline {
    fn drop(&mut self) {
        if !self.finished {
            debug!(session = %self.session_id, "Streamed request abandoned");
            self.engine
                .progress
                .on_state(&self.session_id, EngineState::Done);
        }
    }
}
