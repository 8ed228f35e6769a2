//! Chat controller: owns the view model and turns submissions into requests.
//!
//! All view state lives here and is only touched from the task that owns the
//! controller. Network calls run on spawned tasks and report back through a
//! channel drained by [`ChatController::next_event`], so any number of
//! questions can be in flight while the UI keeps accepting input.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::api::{AskRequest, FilterOptions, QaBackend};
use crate::chat::{ChatLog, ChatRole, MessageId, MessageTag};
use crate::error::ApiError;
use crate::filters::FilterPanel;

pub const PLACEHOLDER_TEXT: &str = "...";
pub const FILTERS_UNAVAILABLE: &str = "Could not load filters from the server.";

/// Text shown in a placeholder whose request failed.
pub fn error_text(err: &ApiError) -> String {
    format!("Sorry, an error occurred: {}", err)
}

/// Completion of a background request, delivered back to the owning task.
#[derive(Debug)]
pub enum ChatEvent {
    FiltersLoaded(Result<FilterOptions, ApiError>),
    Answered {
        placeholder: MessageId,
        result: Result<String, ApiError>,
    },
}

pub struct ChatController<B: QaBackend> {
    backend: Arc<B>,
    log: ChatLog,
    filters: FilterPanel,
    input: String,
    pending: usize,
    tx: mpsc::UnboundedSender<ChatEvent>,
    rx: mpsc::UnboundedReceiver<ChatEvent>,
}

impl<B: QaBackend> ChatController<B> {
    pub fn new(backend: B) -> Self {
        Self::with_shared(Arc::new(backend))
    }

    pub fn with_shared(backend: Arc<B>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            log: ChatLog::new(),
            filters: FilterPanel::new(),
            input: String::new(),
            pending: 0,
            tx,
            rx,
        }
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ChatLog {
        &mut self.log
    }

    pub fn filters(&self) -> &FilterPanel {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterPanel {
        &mut self.filters
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Requests that have been sent and not yet come back.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Fetch filter options in the background. Meant to run once at startup.
    pub fn load_filters(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.spawn_request(
            async move { backend.get_filters().await },
            ChatEvent::FiltersLoaded,
        );
    }

    /// Submit the current input as a question.
    ///
    /// Returns the placeholder handle, or `None` when the trimmed input is
    /// empty and nothing was done.
    pub fn submit(&mut self) -> Option<MessageId> {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return None;
        }

        self.log.append(question.clone(), ChatRole::User, &[]);
        self.input.clear();

        let placeholder = self
            .log
            .append(PLACEHOLDER_TEXT, ChatRole::Assistant, &[MessageTag::Thinking]);

        let request = AskRequest {
            question,
            filters: self.filters.selection(),
        };
        info!(
            question = %request.question,
            country = %request.filters.country,
            category = %request.filters.category,
            "sending question"
        );

        let backend = Arc::clone(&self.backend);
        self.spawn_request(
            async move { backend.ask(&request).await },
            move |result| ChatEvent::Answered { placeholder, result },
        );

        Some(placeholder)
    }

    /// Run `request` on its own task and report its outcome as an event.
    ///
    /// Every spawned request produces exactly one event, even if the task
    /// panics, so `pending` always comes back down and placeholders never
    /// stay stuck on `...`.
    fn spawn_request<T, F, E>(&mut self, request: F, into_event: E)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
        E: FnOnce(Result<T, ApiError>) -> ChatEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        self.pending += 1;

        let task = tokio::spawn(request);
        tokio::spawn(async move {
            let result = match task.await {
                Ok(result) => result,
                Err(err) => {
                    error!(error = %err, "request task failed");
                    Err(ApiError::Transport(format!("request task failed: {}", err)))
                }
            };
            let _ = tx.send(into_event(result));
        });
    }

    /// Wait for the next background request to finish.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`next_event`](Self::next_event).
    pub fn try_next_event(&mut self) -> Option<ChatEvent> {
        self.rx.try_recv().ok()
    }

    /// Apply a finished request to the view model.
    pub fn handle_event(&mut self, event: ChatEvent) {
        self.pending = self.pending.saturating_sub(1);

        match event {
            ChatEvent::FiltersLoaded(Ok(options)) => {
                info!(
                    countries = options.countries.as_ref().map_or(0, Vec::len),
                    categories = options.categories.as_ref().map_or(0, Vec::len),
                    "filters loaded"
                );
                self.filters.populate(options);
            }
            ChatEvent::FiltersLoaded(Err(err)) => {
                error!(error = %err, "error fetching filters");
                self.log.append(FILTERS_UNAVAILABLE, ChatRole::Assistant, &[]);
            }
            ChatEvent::Answered { placeholder, result } => {
                let text = match result {
                    Ok(answer) => answer,
                    Err(err) => {
                        error!(error = %err, status = ?err.status_code(), "error during ask");
                        error_text(&err)
                    }
                };
                if let Err(err) = self.log.resolve(placeholder, text) {
                    warn!(error = %err, "dropping answer for placeholder");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FilterSelection;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    type AskResult = Result<String, ApiError>;

    /// Backend whose answers are released by the test, one question at a time.
    #[derive(Default)]
    struct FakeBackend {
        filters: Mutex<Option<Result<FilterOptions, ApiError>>>,
        answers: Mutex<HashMap<String, oneshot::Receiver<AskResult>>>,
        requests: Mutex<Vec<AskRequest>>,
        panic_on_filters: bool,
    }

    impl FakeBackend {
        fn with_filters(result: Result<FilterOptions, ApiError>) -> Self {
            let backend = Self::default();
            *backend.filters.lock().unwrap() = Some(result);
            backend
        }

        fn expect(&self, question: &str) -> oneshot::Sender<AskResult> {
            let (tx, rx) = oneshot::channel();
            self.answers.lock().unwrap().insert(question.to_string(), rx);
            tx
        }

        fn requests(&self) -> Vec<AskRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QaBackend for FakeBackend {
        async fn get_filters(&self) -> Result<FilterOptions, ApiError> {
            let result = self.filters.lock().unwrap().take();
            match result {
                Some(result) => result,
                None if self.panic_on_filters => panic!("filters handler blew up"),
                None => Ok(FilterOptions::default()),
            }
        }

        async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            if request.question == "boom" {
                panic!("ask handler blew up");
            }
            let rx = self.answers.lock().unwrap().remove(&request.question);
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ApiError::Transport("dropped".to_string()))),
                None => Err(ApiError::Transport("unexpected question".to_string())),
            }
        }
    }

    async fn drain_one<B: QaBackend>(controller: &mut ChatController<B>) {
        let event = controller.next_event().await.expect("channel open");
        controller.handle_event(event);
    }

    #[tokio::test]
    async fn test_submit_appends_user_and_placeholder_before_response() {
        let backend = Arc::new(FakeBackend::default());
        let release = backend.expect("What is Petra?");
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("  What is Petra?  ");
        let placeholder = controller.submit().expect("non-empty input");

        let messages = controller.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "What is Petra?");
        assert_eq!(messages[1].id, placeholder);
        assert_eq!(messages[1].content, PLACEHOLDER_TEXT);
        assert!(messages[1].is_thinking());
        assert_eq!(controller.input(), "");
        assert_eq!(controller.pending(), 1);

        release.send(Ok("A city in Jordan".to_string())).unwrap();
        drain_one(&mut controller).await;
        assert_eq!(controller.pending(), 0);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let backend = Arc::new(FakeBackend::default());
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("   \t ");
        assert!(controller.submit().is_none());
        controller.set_input("");
        assert!(controller.submit().is_none());

        tokio::task::yield_now().await;
        assert!(controller.log().is_empty());
        assert!(backend.requests().is_empty());
        assert_eq!(controller.pending(), 0);
    }

    #[tokio::test]
    async fn test_successful_answer_replaces_placeholder() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .expect("Capital of France?")
            .send(Ok("Paris".to_string()))
            .unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("Capital of France?");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        let msg = controller.log().get(placeholder).unwrap();
        assert_eq!(msg.content, "Paris");
        assert!(!msg.is_thinking());
    }

    #[tokio::test]
    async fn test_server_error_message_is_shown() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .expect("q")
            .send(Err(ApiError::status(500, Some("db down".to_string()))))
            .unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("q");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        let msg = controller.log().get(placeholder).unwrap();
        assert_eq!(msg.content, "Sorry, an error occurred: db down");
        assert!(!msg.is_thinking());
    }

    #[tokio::test]
    async fn test_server_error_without_body_names_status() {
        let backend = Arc::new(FakeBackend::default());
        backend.expect("q").send(Err(ApiError::status(500, None))).unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("q");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        assert!(controller.log().get(placeholder).unwrap().content.contains("500"));
    }

    #[tokio::test]
    async fn test_transport_error_resolves_placeholder() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .expect("q")
            .send(Err(ApiError::Transport("connection refused".to_string())))
            .unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("q");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        let msg = controller.log().get(placeholder).unwrap();
        assert_eq!(msg.content, "Sorry, an error occurred: connection refused");
        assert!(!controller.log().has_thinking());
    }

    #[tokio::test]
    async fn test_out_of_order_answers_reach_their_own_placeholders() {
        let backend = Arc::new(FakeBackend::default());
        let first_tx = backend.expect("first");
        let second_tx = backend.expect("second");
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("first");
        let first = controller.submit().unwrap();
        controller.set_input("second");
        let second = controller.submit().unwrap();
        assert_eq!(controller.pending(), 2);

        second_tx.send(Ok("answer two".to_string())).unwrap();
        drain_one(&mut controller).await;
        assert_eq!(controller.log().get(second).unwrap().content, "answer two");
        assert!(controller.log().get(first).unwrap().is_thinking());

        first_tx.send(Ok("answer one".to_string())).unwrap();
        drain_one(&mut controller).await;
        assert_eq!(controller.log().get(first).unwrap().content, "answer one");
        assert_eq!(controller.log().len(), 4);
    }

    #[tokio::test]
    async fn test_request_carries_current_filters() {
        let backend = Arc::new(FakeBackend::with_filters(Ok(FilterOptions {
            countries: Some(vec!["Italy".to_string()]),
            categories: Some(vec!["Cultural".to_string()]),
        })));
        backend.expect("Rome?").send(Ok("yes".to_string())).unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.load_filters();
        drain_one(&mut controller).await;
        controller.filters_mut().country.select_value("Italy");

        controller.set_input("Rome?");
        controller.submit().unwrap();
        drain_one(&mut controller).await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].filters.country, "Italy");
        assert_eq!(requests[0].filters.category, "");
    }

    #[tokio::test]
    async fn test_loaded_filters_populate_controls() {
        let backend = FakeBackend::with_filters(Ok(FilterOptions {
            countries: Some(vec!["US".to_string(), "FR".to_string()]),
            categories: None,
        }));
        let mut controller = ChatController::new(backend);

        controller.load_filters();
        drain_one(&mut controller).await;

        assert_eq!(controller.filters().country.options(), ["US", "FR"]);
        assert!(controller.filters().category.options().is_empty());
        assert!(controller.log().is_empty());
    }

    #[tokio::test]
    async fn test_filter_failure_reports_once_and_chat_still_works() {
        let backend = Arc::new(FakeBackend::with_filters(Err(ApiError::Transport(
            "network unreachable".to_string(),
        ))));
        backend.expect("still there?").send(Ok("yes".to_string())).unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.load_filters();
        drain_one(&mut controller).await;

        let messages = controller.log().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[0].content, FILTERS_UNAVAILABLE);

        controller.set_input("still there?");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        assert_eq!(controller.log().get(placeholder).unwrap().content, "yes");
        assert_eq!(backend.requests()[0].filters, FilterSelection::default());
    }

    #[tokio::test]
    async fn test_panicking_request_still_resolves_placeholder() {
        let backend = Arc::new(FakeBackend::default());
        backend.expect("after").send(Ok("fine".to_string())).unwrap();
        let mut controller = ChatController::with_shared(Arc::clone(&backend));

        controller.set_input("boom");
        let placeholder = controller.submit().unwrap();
        drain_one(&mut controller).await;

        let msg = controller.log().get(placeholder).unwrap();
        assert!(
            msg.content.starts_with("Sorry, an error occurred:"),
            "{}",
            msg.content
        );
        assert!(!msg.is_thinking());
        assert_eq!(controller.pending(), 0);

        controller.set_input("after");
        let next = controller.submit().unwrap();
        drain_one(&mut controller).await;
        assert_eq!(controller.log().get(next).unwrap().content, "fine");
    }

    #[tokio::test]
    async fn test_panicking_filter_load_reports_unavailable() {
        let backend = FakeBackend {
            panic_on_filters: true,
            ..FakeBackend::default()
        };
        let mut controller = ChatController::new(backend);

        controller.load_filters();
        drain_one(&mut controller).await;

        assert_eq!(controller.pending(), 0);
        assert_eq!(controller.log().len(), 1);
        assert_eq!(controller.log().messages()[0].content, FILTERS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_duplicate_completion_is_ignored() {
        let mut controller = ChatController::new(FakeBackend::default());
        let placeholder = controller
            .log_mut()
            .append(PLACEHOLDER_TEXT, ChatRole::Assistant, &[MessageTag::Thinking]);

        controller.handle_event(ChatEvent::Answered {
            placeholder,
            result: Ok("first".to_string()),
        });
        controller.handle_event(ChatEvent::Answered {
            placeholder,
            result: Ok("second".to_string()),
        });

        assert_eq!(controller.log().get(placeholder).unwrap().content, "first");
    }
}
