use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};
use std::sync::Arc;
use subset_core::config::AppConfig;
use subset_core::session::QUESTION_PROMPT;
use subset_core::{
    AgentError, AgentLoop, Console, OpenAiChatModel, RemoteQueryClient, SessionLoop, ToolRegistry,
};
use subset_tools::LinkReporter;
use url::Url;

const BANNER: &str = r#"
  subset-agent: ask questions about your data in plain language.
  Press Ctrl-D to quit.
"#;

/// Console backed by rustyline. Only questions go into history.
struct RustylineConsole {
    editor: DefaultEditor,
}

impl Console for RustylineConsole {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, AgentError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if prompt == QUESTION_PROMPT && !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(AgentError::Input(e.to_string())),
        }
    }

    fn write_line(&mut self, line: &str) {
        println!("{}", line);
    }
}

fn format_link(link: &Url) -> String {
    format!("query url: {}", link)
}

/// Prints every result link as it is derived.
fn stdout_reporter() -> LinkReporter {
    Arc::new(|link: &Url| println!("{}", format_link(link)))
}

fn build_session(config: &AppConfig) -> Result<SessionLoop> {
    let mut registry = ToolRegistry::new();
    subset_tools::register_all(&mut registry, config, stdout_reporter())?;
    tracing::info!(
        "Tools: {}, model: {}, analytics host: {}",
        registry.list_names().join(", "),
        config.provider.model,
        config.analytics.host_or_default(),
    );
    if config.analytics.accept_invalid_certs {
        tracing::debug!("TLS certificate verification is disabled for the analytics host");
    }

    let model = Arc::new(OpenAiChatModel::new(&config.provider));
    let agent = AgentLoop::new(model, Arc::new(registry), &config.agent);
    let vocabulary = Arc::new(RemoteQueryClient::from_config(&config.analytics)?);
    Ok(SessionLoop::new(agent, vocabulary))
}

/// Run the interactive question loop.
pub async fn run(config: &AppConfig) -> Result<()> {
    let session = build_session(config)?;

    println!("{}", BANNER);
    let rl_config = RlConfig::builder().auto_add_history(false).build();
    let history_path = AppConfig::data_dir().join("repl_history.txt");
    let mut editor = DefaultEditor::with_config(rl_config)?;
    let _ = editor.load_history(&history_path);

    let mut console = RustylineConsole { editor };
    let turns = session.run(&mut console).await?;
    tracing::debug!("Answered {} question(s)", turns);

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = console.editor.save_history(&history_path);

    Ok(())
}

/// Answer one question and exit.
pub async fn ask(config: &AppConfig, question: &str) -> Result<()> {
    let session = build_session(config)?;
    let mut console = RustylineConsole {
        editor: DefaultEditor::new()?,
    };
    session.ask(question, &mut console).await?;
    Ok(())
}
