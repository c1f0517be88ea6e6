// Terminal rendition of the chat widget: the same send/display/teach flow the
// browser page runs, driven from stdin/stdout against a running server.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::{debug, instrument, warn};

use crate::api::{BotResponse, ChatRequest, LearnRequest};
use crate::constants::{ANSWER_PROMPT, SKIP_WORD};
use crate::error::{ClientError, ClientResult};
use crate::responder::is_teach_request;

/// Who a displayed message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
    System,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "you",
            Sender::Bot => "bot",
            Sender::System => "!!",
        }
    }
}

/// The two calls a chat session makes.
#[async_trait]
pub trait ChatBackend {
    async fn send_message(&self, message: &str) -> ClientResult<String>;
    async fn learn(&self, question: &str, answer: &str) -> ClientResult<String>;
}

/// Where a session renders messages and asks for input.
pub trait ChatView {
    fn display(&mut self, message: &str, sender: Sender);
    /// Asks for a teaching answer; `None` when the user gave nothing.
    fn prompt_answer(&mut self, prompt: &str) -> Option<String>;
    /// Next line typed by the user; `None` at end of input.
    fn next_input(&mut self) -> Option<String>;
}

/// HTTP client for the chat server.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ClientResult<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Request { url: url.clone(), source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            warn!(%status, %body, "Chat server request failed");
            return Err(ClientError::Status { status: status.as_u16(), body });
        }

        let reply = response
            .json::<BotResponse>()
            .await
            .map_err(|source| ClientError::MalformedResponse { url, source })?;
        debug!(response = ?reply.response, "Received bot response");
        Ok(reply.response)
    }
}

#[async_trait]
impl ChatBackend for ChatClient {
    #[instrument(skip(self))]
    async fn send_message(&self, message: &str) -> ClientResult<String> {
        self.post("/chat", &ChatRequest { message: message.to_string() }).await
    }

    #[instrument(skip(self))]
    async fn learn(&self, question: &str, answer: &str) -> ClientResult<String> {
        let request = LearnRequest {
            question: question.to_string(),
            answer: answer.to_string(),
        };
        self.post("/learn", &request).await
    }
}

/// What one call to [`ChatSession::send_message`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, nothing was sent.
    Ignored,
    Answered,
    Taught,
    TeachingSkipped,
}

pub struct ChatSession<B, V> {
    backend: B,
    view: V,
}

impl<B: ChatBackend, V: ChatView> ChatSession<B, V> {
    pub fn new(backend: B, view: V) -> Self {
        Self { backend, view }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn into_parts(self) -> (B, V) {
        (self.backend, self.view)
    }

    /// Sends one line typed by the user and shows the reply, offering to
    /// teach the bot when it did not know the answer.
    pub async fn send_message(&mut self, input: &str) -> ClientResult<SendOutcome> {
        if input.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        self.view.display(input, Sender::User);
        let response = self.backend.send_message(input).await?;
        self.view.display(&response, Sender::Bot);

        if !is_teach_request(&response) {
            return Ok(SendOutcome::Answered);
        }

        match self.view.prompt_answer(ANSWER_PROMPT) {
            Some(answer) if !answer.is_empty() && !answer.eq_ignore_ascii_case(SKIP_WORD) => {
                let learned = self.backend.learn(input, &answer).await?;
                self.view.display(&learned, Sender::Bot);
                Ok(SendOutcome::Taught)
            }
            _ => Ok(SendOutcome::TeachingSkipped),
        }
    }

    /// Reads lines until end of input or `/quit`. Failed requests are shown
    /// to the user and the session carries on.
    pub async fn run(&mut self) {
        while let Some(line) = self.view.next_input() {
            if line.trim() == "/quit" {
                break;
            }
            if let Err(e) = self.send_message(&line).await {
                warn!("Chat request failed: {}", e);
                self.view.display(&e.to_string(), Sender::System);
            }
        }
    }
}

/// A [`ChatView`] over any line reader and writer, normally stdin/stdout.
pub struct TerminalView<R, W> {
    input: R,
    output: W,
}

impl TerminalView<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalView<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
            Err(e) => {
                warn!("Failed to read input: {}", e);
                None
            }
        }
    }

    fn write_line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.output, "{}", text).and_then(|_| self.output.flush()) {
            warn!("Failed to write output: {}", e);
        }
    }
}

impl<R: BufRead, W: Write> ChatView for TerminalView<R, W> {
    fn display(&mut self, message: &str, sender: Sender) {
        self.write_line(&format!("{}: {}", sender.as_str(), message));
    }

    fn prompt_answer(&mut self, prompt: &str) -> Option<String> {
        self.write_line(prompt);
        self.read_line()
            .map(|answer| answer.trim().to_string())
            .filter(|answer| !answer.is_empty())
    }

    fn next_input(&mut self) -> Option<String> {
        self.read_line()
    }
}

/// Runs an interactive session on the terminal until EOF or `/quit`.
pub async fn run_terminal_chat(base_url: &str) {
    let client = ChatClient::new(base_url);
    println!("Chatting with {} (type /quit to leave)", client.base_url());
    let mut session = ChatSession::new(client, TerminalView::stdio());
    session.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{LEARNED_RESPONSE, TEACH_PROMPT};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Chat(String),
        Learn(String, String),
    }

    /// Records calls and answers chat with a fixed reply.
    struct FakeBackend {
        reply: String,
        calls: Mutex<Vec<Call>>,
        // Shared with a FakeView to see what was on screen at call time.
        displayed: Arc<AtomicUsize>,
        displayed_at_chat: Mutex<Vec<usize>>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
                displayed: Arc::default(),
                displayed_at_chat: Mutex::new(Vec::new()),
            }
        }

        fn watching(mut self, view: &FakeView) -> Self {
            self.displayed = view.displayed.clone();
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn send_message(&self, message: &str) -> ClientResult<String> {
            self.calls.lock().unwrap().push(Call::Chat(message.to_string()));
            self.displayed_at_chat
                .lock()
                .unwrap()
                .push(self.displayed.load(Ordering::SeqCst));
            Ok(self.reply.clone())
        }

        async fn learn(&self, question: &str, answer: &str) -> ClientResult<String> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Learn(question.to_string(), answer.to_string()));
            Ok(LEARNED_RESPONSE.to_string())
        }
    }

    #[derive(Default)]
    struct FakeView {
        shown: Vec<(String, Sender)>,
        answers: VecDeque<Option<String>>,
        inputs: VecDeque<String>,
        prompts: usize,
        displayed: Arc<AtomicUsize>,
    }

    impl ChatView for FakeView {
        fn display(&mut self, message: &str, sender: Sender) {
            self.shown.push((message.to_string(), sender));
            self.displayed.fetch_add(1, Ordering::SeqCst);
        }

        fn prompt_answer(&mut self, _prompt: &str) -> Option<String> {
            self.prompts += 1;
            self.answers.pop_front().flatten()
        }

        fn next_input(&mut self) -> Option<String> {
            self.inputs.pop_front()
        }
    }

    fn view_answering(answer: Option<&str>) -> FakeView {
        FakeView {
            answers: VecDeque::from(vec![answer.map(str::to_string)]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_call() {
        let mut session = ChatSession::new(FakeBackend::replying("hi"), FakeView::default());
        for input in ["", "   ", "\t\n"] {
            assert_eq!(session.send_message(input).await.unwrap(), SendOutcome::Ignored);
        }
        let (backend, view) = session.into_parts();
        assert!(backend.calls().is_empty());
        assert!(view.shown.is_empty());
    }

    #[tokio::test]
    async fn test_user_message_shown_before_reply() {
        let view = FakeView::default();
        let backend = FakeBackend::replying("Hello!").watching(&view);
        let mut session = ChatSession::new(backend, view);
        let outcome = session.send_message("hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Answered);
        assert_eq!(
            session.view().shown,
            vec![("hi".to_string(), Sender::User), ("Hello!".to_string(), Sender::Bot)]
        );
        assert_eq!(session.view().prompts, 0);

        // Only the user's line was on screen when the request went out.
        let (backend, _) = session.into_parts();
        assert_eq!(*backend.displayed_at_chat.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_teach_prompt_posts_answer() {
        let view = view_answering(Some("Forty-two"));
        let mut session = ChatSession::new(FakeBackend::replying(TEACH_PROMPT), view);
        let outcome = session.send_message("meaning of life").await.unwrap();
        assert_eq!(outcome, SendOutcome::Taught);

        let (backend, view) = session.into_parts();
        assert_eq!(
            backend.calls(),
            vec![
                Call::Chat("meaning of life".to_string()),
                Call::Learn("meaning of life".to_string(), "Forty-two".to_string()),
            ]
        );
        assert_eq!(view.shown.last().unwrap().0, LEARNED_RESPONSE);
    }

    #[tokio::test]
    async fn test_skip_in_any_case_suppresses_learn() {
        for answer in ["skip", "SKIP", "Skip"] {
            let mut session =
                ChatSession::new(FakeBackend::replying(TEACH_PROMPT), view_answering(Some(answer)));
            let outcome = session.send_message("unknown thing").await.unwrap();
            assert_eq!(outcome, SendOutcome::TeachingSkipped);
            let (backend, _) = session.into_parts();
            assert_eq!(backend.calls(), vec![Call::Chat("unknown thing".to_string())]);
        }
    }

    #[tokio::test]
    async fn test_no_answer_suppresses_learn() {
        let mut session = ChatSession::new(FakeBackend::replying(TEACH_PROMPT), view_answering(None));
        assert_eq!(
            session.send_message("unknown thing").await.unwrap(),
            SendOutcome::TeachingSkipped
        );
        let (backend, view) = session.into_parts();
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(view.prompts, 1);
    }

    #[tokio::test]
    async fn test_run_stops_at_quit() {
        let view = FakeView {
            inputs: VecDeque::from(vec!["hello".to_string(), "/quit".to_string(), "after".to_string()]),
            ..Default::default()
        };
        let mut session = ChatSession::new(FakeBackend::replying("Hi!"), view);
        session.run().await;
        let (backend, _) = session.into_parts();
        assert_eq!(backend.calls(), vec![Call::Chat("hello".to_string())]);
    }

    #[test]
    fn test_terminal_view_formats_and_reads() {
        let input = std::io::Cursor::new("first line\r\n  skip  \n");
        let mut view = TerminalView::new(input, Vec::new());
        view.display("hello", Sender::User);
        view.display("hi there", Sender::Bot);
        assert_eq!(view.next_input().as_deref(), Some("first line"));
        assert_eq!(view.prompt_answer(ANSWER_PROMPT).as_deref(), Some("skip"));
        assert_eq!(view.next_input(), None);

        let written = String::from_utf8(view.output().clone()).unwrap();
        assert_eq!(
            written,
            format!("you: hello\nbot: hi there\n{}\n", ANSWER_PROMPT)
        );
    }
}
