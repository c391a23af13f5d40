//! REPL (Read-Eval-Print Loop) for interactive chat

use std::io::{self, Write};
use std::sync::Arc;

use colored::Colorize;
use conductor_application::{OrchestrationEngine, ProcessRequestInput};
use conductor_domain::SessionId;
use futures::StreamExt;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use tracing::warn;

use super::command::ReplCommand;
use crate::ConsoleFormatter;
use crate::ProgressReporter;

const HISTORY_CAPACITY: usize = 1000;

/// Interactive chat REPL bound to one engine
pub struct ChatRepl {
    engine: OrchestrationEngine,
    session: SessionId,
    stream: bool,
    auto_execute: bool,
    progress: Option<Arc<ProgressReporter>>,
}

impl ChatRepl {
    /// Create a new ChatRepl with a fresh session
    pub fn new(engine: OrchestrationEngine) -> Self {
        let session = engine.create_session();
        Self {
            engine,
            session,
            stream: false,
            auto_execute: true,
            progress: None,
        }
    }

    /// Start with streaming output on or off
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Run extracted plans right away, or keep them for `/execute`
    pub fn with_auto_execute(mut self, auto_execute: bool) -> Self {
        self.auto_execute = auto_execute;
        self
    }

    /// Spinner to hide while writing output
    pub fn with_progress(mut self, progress: Arc<ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> io::Result<()> {
        let mut line_editor = Reedline::create();

        let history_path = dirs::data_dir().map(|p| p.join("mcp-conductor").join("history.txt"));
        if let Some(path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_CAPACITY, path) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => warn!("History disabled: {}", e),
            }
        }

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("conductor".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        loop {
            match line_editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if let Some(command) = ReplCommand::parse(line) {
                        match self.handle_command(command).await {
                            Some(output) => println!("{}", output),
                            None => {
                                println!("Bye!");
                                break;
                            }
                        }
                        continue;
                    }

                    self.respond(line).await;
                }
                Signal::CtrlC => {
                    println!("^C");
                }
                Signal::CtrlD => {
                    println!("Bye!");
                    break;
                }
            }
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│             mcp-conductor - Chat            │");
        println!("╰─────────────────────────────────────────────╯");
        println!();

        let catalogue = self.engine.catalogue_summary();
        let tool_count: usize = catalogue.values().map(Vec::len).sum();
        println!(
            "Providers: {}  Tools: {}",
            catalogue.len().to_string().cyan(),
            tool_count.to_string().cyan()
        );
        println!("Session: {}", self.session.as_str().dimmed());
        println!();
        println!("{}", ReplCommand::help());
        println!();
    }

    /// Run a slash command. Returns the text to show, or `None` to exit.
    pub async fn handle_command(&mut self, command: ReplCommand) -> Option<String> {
        let output = match command {
            ReplCommand::Quit => return None,
            ReplCommand::Help => ReplCommand::help().to_string(),
            ReplCommand::Tools => ConsoleFormatter::format_catalogue(&self.engine.catalogue_summary()),
            ReplCommand::New => {
                self.session = self.engine.create_session();
                format!("Started session {}", self.session)
            }
            ReplCommand::Sessions => {
                ConsoleFormatter::format_sessions(&self.engine.list_sessions(), &self.session)
            }
            ReplCommand::Summary => match self.engine.summarize(&self.session) {
                Some(summary) => ConsoleFormatter::format_summary(&summary),
                None => ConsoleFormatter::error(&format!("Session not found: {}", self.session)),
            },
            ReplCommand::Execute => {
                let result = self.engine.execute_current_plan(&self.session).await;
                self.clear_progress();
                result
            }
            ReplCommand::Stream => {
                self.stream = !self.stream;
                format!(
                    "Streaming {}",
                    if self.stream { "enabled" } else { "disabled" }
                )
            }
            ReplCommand::Unknown(name) => {
                format!("Unknown command: {}\nType /help for available commands", name)
            }
        };
        Some(output)
    }

    /// Process one request in the current session and print the answer.
    pub async fn respond(&self, input: &str) {
        println!();

        if self.stream {
            let mut response = self.engine.stream(input, Some(self.session.clone()));
            while let Some(fragment) = response.next().await {
                self.write_out(|| {
                    print!("{}", fragment);
                    let _ = io::stdout().flush();
                });
            }
            self.clear_progress();
            println!();
        } else {
            let request = ProcessRequestInput::new(input)
                .in_session(self.session.clone())
                .with_auto_execute(self.auto_execute);
            let outcome = self.engine.process(request).await;
            self.clear_progress();
            println!("{}", ConsoleFormatter::format_outcome(&outcome));
        }
    }

    fn write_out<F: FnOnce()>(&self, f: F) {
        match &self.progress {
            Some(progress) => progress.suspend(f),
            None => f(),
        }
    }

    fn clear_progress(&self) {
        if let Some(progress) = &self.progress {
            progress.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conductor_application::{CompletionRole, EmptyCatalog, RoleError};
    use conductor_domain::ThreadId;

    const PLAN_REPLY: &str = r#"I will list the files.

```json
{"task_description": "List files", "required_tools": ["list_dir"], "execution_steps": [{"step": 1, "action": "list_dir", "parameters": {"path": "."}}]}
```"#;

    struct FixedRole {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl CompletionRole for FixedRole {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _thread: &ThreadId, _message: &str) -> Result<String, RoleError> {
            Ok(self.reply.to_string())
        }
    }

    fn repl() -> ChatRepl {
        let engine = OrchestrationEngine::new(
            Arc::new(EmptyCatalog),
            Arc::new(FixedRole {
                name: "advisor",
                reply: PLAN_REPLY,
            }),
            Arc::new(FixedRole {
                name: "executor",
                reply: "a.txt",
            }),
        );
        ChatRepl::new(engine)
    }

    #[tokio::test]
    async fn test_new_session_switches_current() {
        let mut repl = repl();
        let first = repl.session_id().clone();

        let output = repl.handle_command(ReplCommand::New).await.unwrap();
        assert_ne!(repl.session_id(), &first);
        assert!(output.contains(repl.session_id().as_str()));
        assert_eq!(repl.engine.list_sessions().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_without_plan() {
        let mut repl = repl();
        let output = repl.handle_command(ReplCommand::Execute).await.unwrap();
        assert!(output.contains("No execution plan"));
    }

    #[tokio::test]
    async fn test_execute_runs_deferred_plan() {
        let mut repl = repl();
        let request = ProcessRequestInput::new("list files")
            .in_session(repl.session_id().clone())
            .with_auto_execute(false);
        let outcome = repl.engine.process(request).await;
        assert!(!outcome.executed);

        let output = repl.handle_command(ReplCommand::Execute).await.unwrap();
        assert!(output.contains("a.txt"));

        let summary = repl.engine.summarize(repl.session_id()).unwrap();
        assert_eq!(summary.execution_count, 1);
        assert!(!summary.has_plan);
    }

    #[tokio::test]
    async fn test_stream_toggle_and_quit() {
        let mut repl = repl();
        assert!(!repl.is_streaming());

        repl.handle_command(ReplCommand::Stream).await.unwrap();
        assert!(repl.is_streaming());

        assert!(repl.handle_command(ReplCommand::Quit).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_points_to_help() {
        let mut repl = repl();
        let output = repl
            .handle_command(ReplCommand::Unknown("/nope".into()))
            .await
            .unwrap();
        assert!(output.contains("/help"));
    }
}
