//! research-agent - CLI entry point
//!
//! Runs one task against live providers and prints the status stream.
//!
//! ```text
//! research-agent <objective> <task description> [text_completion|web_search]
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use research_agent::completion::CompletionInvoker;
use research_agent::config::Config;
use research_agent::events::{ChannelSink, EventStyle, StatusEmitter, StatusEvent, TASK_EXECUTE};
use research_agent::llm::{OpenRouterClient, RetryConfig};
use research_agent::research::WebResearch;
use research_agent::skills::{SkillContext, SkillRegistry, SkillRunner};
use research_agent::task::{SkillKind, Task, TaskId};
use research_agent::web::{search_provider, HttpFetcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: research-agent <objective> <task description> [text_completion|web_search]";

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(objective), Some(description)) = (args.next(), args.next()) else {
        anyhow::bail!(USAGE);
    };
    let skill = match args.next() {
        Some(name) => name.parse::<SkillKind>()?,
        None => SkillKind::WebSearch,
    };
    let task = Task::new(TaskId::new(1), description, skill)?;

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, language={}",
        config.research.completion.model, config.research.language
    );

    let cancel = CancellationToken::new();
    let llm = Arc::new(OpenRouterClient::with_endpoint(
        config.api_key.clone(),
        config.base_url.clone(),
        RetryConfig::default(),
    ));
    let invoker = CompletionInvoker::with_cancellation(llm, cancel.clone());
    let research = WebResearch::new(
        invoker,
        search_provider(config.tavily_api_key.as_deref())?,
        Arc::new(HttpFetcher::new()?),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));
    let ctx = SkillContext::from_config(&config, StatusEmitter::new(Arc::new(ChannelSink(tx))));
    let runner = SkillRunner::new(SkillRegistry::with_defaults(research), ctx);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, aborting model calls");
            cancel.cancel();
        }
    });

    let output = runner.run_task(&task, &objective, &HashMap::new()).await;
    drop(runner);
    let _ = printer.await;

    println!("\n{}", output);
    Ok(())
}

/// Print log lines as they arrive; token updates are shown as a growing line.
async fn print_events(mut rx: mpsc::UnboundedReceiver<StatusEvent>) {
    let mut streamed = 0;
    while let Some(event) = rx.recv().await {
        if event.event_type == TASK_EXECUTE {
            let fresh = event.content.get(streamed..).unwrap_or("");
            eprint!("{}", fresh);
            streamed = event.content.len();
        } else {
            if streamed > 0 {
                eprintln!();
                streamed = 0;
            }
            if event.style == EventStyle::Log {
                eprint!("{}", event.content);
            }
        }
        let _ = std::io::stderr().flush();
    }
}
