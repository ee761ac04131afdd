//! Test doubles for the model, search, fetch and event seams.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::events::{StatusEmitter, StatusEvent};
use crate::llm::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenStream};
use crate::task::{SkillKind, Task, TaskId};
use crate::web::{PageFetcher, RawSearchResult, SearchProvider};

pub fn task(id: u64, description: &str) -> Task {
    Task::new(TaskId::new(id), description, SkillKind::WebSearch).unwrap()
}

pub fn completion_task(id: u64, description: &str) -> Task {
    Task::new(TaskId::new(id), description, SkillKind::TextCompletion).unwrap()
}

/// Records every emitted event, optionally running a hook on each one.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<StatusEvent>>>,
    hook: Option<Arc<dyn Fn(&StatusEvent) + Send + Sync>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: impl Fn(&StatusEvent) + Send + Sync + 'static) -> Self {
        Self {
            events: Arc::default(),
            hook: Some(Arc::new(hook)),
        }
    }

    pub fn emitter(&self) -> StatusEmitter {
        let events = Arc::clone(&self.events);
        let hook = self.hook.clone();
        StatusEmitter::new(Arc::new(move |event: StatusEvent| {
            if let Some(hook) = &hook {
                hook(&event);
            }
            events.lock().unwrap().push(event);
        }))
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Contents of events of the given type, in emission order.
    pub fn contents_of(&self, event_type: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .map(|e| e.content)
            .collect()
    }
}

/// One scripted model answer.
#[derive(Debug, Clone)]
pub enum Script {
    Text(String),
    Tokens(Vec<String>),
    TokensThenHang(Vec<String>),
    TokensThenFail(Vec<String>, String),
    Fail(String),
}

fn owned(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

impl Script {
    pub fn text(text: &str) -> Self {
        Script::Text(text.to_string())
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        Script::Tokens(owned(tokens))
    }

    pub fn tokens_then_hang(tokens: &[&str]) -> Self {
        Script::TokensThenHang(owned(tokens))
    }

    pub fn tokens_then_fail(tokens: &[&str], error: &str) -> Self {
        Script::TokensThenFail(owned(tokens), error.to_string())
    }

    pub fn fail(error: &str) -> Self {
        Script::Fail(error.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
    pub options: ChatOptions,
    pub streamed: bool,
}

type Responder = Box<dyn Fn(&str) -> Script + Send + Sync>;

/// Model double: answers from a queue of scripts, then from an optional
/// prompt-based responder.
pub struct ScriptedLlm {
    scripts: Mutex<VecDeque<Script>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn responding(responder: impl Fn(&str) -> Script + Send + Sync + 'static) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.prompt).collect()
    }

    fn next_script(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        streamed: bool,
    ) -> Script {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            prompt: prompt.clone(),
            options: options.clone(),
            streamed,
        });

        if let Some(script) = self.scripts.lock().unwrap().pop_front() {
            return script;
        }
        match &self.responder {
            Some(responder) => responder(&prompt),
            None => Script::fail("no scripted response left"),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let content = match self.next_script(model, messages, options, false) {
            Script::Text(text) => text,
            Script::Tokens(tokens) => tokens.concat(),
            Script::TokensThenHang(_) => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            Script::TokensThenFail(_, error) | Script::Fail(error) => anyhow::bail!(error),
        };
        Ok(ChatResponse {
            content: Some(content),
            finish_reason: Some("stop".to_string()),
            usage: None,
            model: Some(model.to_string()),
        })
    }

    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> anyhow::Result<TokenStream> {
        let stream: TokenStream = match self.next_script(model, messages, options, true) {
            Script::Text(text) => stream::once(async move { Ok(text) }).boxed(),
            Script::Tokens(tokens) => stream::iter(tokens.into_iter().map(Ok)).boxed(),
            Script::TokensThenHang(tokens) => stream::iter(tokens.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
            Script::TokensThenFail(tokens, error) => stream::iter(tokens.into_iter().map(Ok))
                .chain(stream::once(async move { Err(anyhow::anyhow!(error)) }))
                .boxed(),
            Script::Fail(error) => anyhow::bail!(error),
        };
        Ok(stream)
    }
}

/// Search double returning a fixed answer and recording queries.
pub struct StaticSearch {
    answer: Result<Vec<RawSearchResult>, String>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn links(links: &[&str]) -> Self {
        let results = links
            .iter()
            .enumerate()
            .map(|(i, link)| RawSearchResult {
                title: format!("Result {}", i + 1),
                url: link.to_string(),
                snippet: String::new(),
                score: None,
            })
            .collect();
        Self {
            answer: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            answer: Err(error.to_string()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<RawSearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answer.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

/// Fetch double: pages by URL, unknown URLs fail.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, Result<String, String>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(text.to_string()));
        self
    }

    pub fn failure(mut self, url: &str, error: &str) -> Self {
        self.pages.insert(url.to_string(), Err(error.to_string()));
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(error)) => Err(anyhow::anyhow!(error.clone())),
            None => Err(anyhow::anyhow!("connection refused: {}", url)),
        }
    }
}
