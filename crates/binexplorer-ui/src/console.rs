//! Command console: classifies typed input, issues remote queries, and
//! applies their settlements to the transcript and the view.
//!
//! Input whose first token is a local keyword is handled here and only
//! reaches the server to fetch display data. Everything else is forwarded
//! verbatim. Each remote request runs as its own tokio task that reports a
//! [`QuerySettlement`] over a bounded channel; the UI loop drains that
//! channel, so settlements apply in completion order on the UI thread.

use std::collections::HashMap;
use std::sync::Arc;

use binexplorer_core::{
    payload_display_text, payload_is_empty, CoreError, QueryDescriptor, QueryResponse,
    RemoteQueryClient, RequestId, Transcript,
};
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::coordinator::ViewCoordinator;

const QUERY_SETTLEMENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKeyword {
    Show,
}

impl LocalKeyword {
    pub const ALL: [Self; 1] = [Self::Show];

    pub fn token(self) -> &'static str {
        match self {
            Self::Show => "show",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Local(LocalKeyword),
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolePhase {
    Idle,
    LocalDispatch,
    RemoteDispatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDispatch {
    PassThrough,
    ShowFunction { function: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub request_id: RequestId,
    pub command: String,
    pub dispatch: PendingDispatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettlement {
    pub request_id: RequestId,
    pub command: String,
    pub outcome: Result<QueryResponse, CoreError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input; recorded without a request.
    Empty,
    /// Settled locally without a request.
    Settled,
    Dispatched(RequestId),
}

pub fn unknown_function_message(function: &str) -> String {
    format!("[*] Unknown function: '{function}'")
}

pub struct CommandConsole {
    client: Arc<dyn RemoteQueryClient>,
    keywords: Vec<LocalKeyword>,
    transcript: Transcript,
    input: String,
    next_request_id: u64,
    pending: HashMap<RequestId, PendingQuery>,
    settlement_sender: mpsc::Sender<QuerySettlement>,
    settlement_receiver: mpsc::Receiver<QuerySettlement>,
    shown_functions: Vec<String>,
    scroll_to_end: bool,
}

impl std::fmt::Debug for CommandConsole {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandConsole")
            .field("keywords", &self.keywords)
            .field("transcript_len", &self.transcript.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl CommandConsole {
    pub fn new(client: Arc<dyn RemoteQueryClient>) -> Self {
        Self::with_keywords(client, &LocalKeyword::ALL)
    }

    /// Console whose local keyword set is fixed to `keywords`.
    pub fn with_keywords(client: Arc<dyn RemoteQueryClient>, keywords: &[LocalKeyword]) -> Self {
        let (settlement_sender, settlement_receiver) =
            mpsc::channel(QUERY_SETTLEMENT_CHANNEL_CAPACITY);
        Self {
            client,
            keywords: keywords.to_vec(),
            transcript: Transcript::default(),
            input: String::new(),
            next_request_id: 0,
            pending: HashMap::new(),
            settlement_sender,
            settlement_receiver,
            shown_functions: Vec::new(),
            scroll_to_end: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn push_input_char(&mut self, ch: char) {
        self.input.push(ch);
    }

    pub fn pop_input_char(&mut self) -> Option<char> {
        self.input.pop()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingQuery> {
        self.pending.values()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Dispatch kind of the most recently issued request still in flight.
    pub fn phase(&self) -> ConsolePhase {
        match self
            .pending
            .values()
            .max_by_key(|pending| pending.request_id)
            .map(|pending| &pending.dispatch)
        {
            None => ConsolePhase::Idle,
            Some(PendingDispatch::PassThrough) => ConsolePhase::RemoteDispatch,
            Some(PendingDispatch::ShowFunction { .. }) => ConsolePhase::LocalDispatch,
        }
    }

    /// Returns whether the transcript view should jump to its end, once.
    pub fn take_scroll_to_end(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_end)
    }

    pub fn classify(&self, command: &str) -> Dispatch {
        let keyword = command.split_whitespace().next().unwrap_or_default();
        self.keywords
            .iter()
            .copied()
            .find(|candidate| candidate.token() == keyword)
            .map(Dispatch::Local)
            .unwrap_or(Dispatch::Remote)
    }

    /// Submits the current input box contents.
    pub fn submit(&mut self) -> SubmitOutcome {
        let command = self.input.clone();
        self.submit_command(&command)
    }

    pub fn submit_command(&mut self, raw: &str) -> SubmitOutcome {
        let command = raw.trim().to_owned();
        if command.is_empty() {
            self.transcript.append("", "");
            self.finish_outcome();
            return SubmitOutcome::Empty;
        }

        let dispatch = self.classify(&command);
        tracing::debug!(command = %command, ?dispatch, "console command classified");
        match dispatch {
            Dispatch::Local(LocalKeyword::Show) => {
                let function = command
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_owned();
                if function.is_empty() {
                    self.transcript
                        .append(command.as_str(), unknown_function_message(""));
                    self.finish_outcome();
                    return SubmitOutcome::Settled;
                }
                SubmitOutcome::Dispatched(self.issue_show(command, function))
            }
            Dispatch::Remote => {
                let descriptor = QueryDescriptor::run_command(command.as_str());
                SubmitOutcome::Dispatched(self.issue(
                    command,
                    PendingDispatch::PassThrough,
                    descriptor,
                ))
            }
        }
    }

    /// Shows `function` by its full name, spaces included. Typed `show`
    /// commands and list activations settle through the same path.
    pub fn show_function(&mut self, function: &str) -> SubmitOutcome {
        if function.is_empty() {
            return self.submit_command(LocalKeyword::Show.token());
        }
        let command = format!("{} {function}", LocalKeyword::Show.token());
        SubmitOutcome::Dispatched(self.issue_show(command, function.to_owned()))
    }

    /// Functions shown successfully since the last call, oldest first.
    pub fn take_shown_functions(&mut self) -> Vec<String> {
        std::mem::take(&mut self.shown_functions)
    }

    fn issue_show(&mut self, command: String, function: String) -> RequestId {
        let descriptor = QueryDescriptor::fetch_function_view(function.as_str());
        self.issue(command, PendingDispatch::ShowFunction { function }, descriptor)
    }

    fn issue(
        &mut self,
        command: String,
        dispatch: PendingDispatch,
        descriptor: QueryDescriptor,
    ) -> RequestId {
        self.next_request_id = self
            .next_request_id
            .checked_add(1)
            .expect("console request id space exhausted");
        let request_id = RequestId::new(self.next_request_id);
        self.pending.insert(
            request_id,
            PendingQuery {
                request_id,
                command: command.clone(),
                dispatch,
            },
        );

        let sender = self.settlement_sender.clone();
        match TokioHandle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(&self.client);
                handle.spawn(async move {
                    run_remote_query_task(client, request_id, command, descriptor, sender).await;
                });
            }
            Err(_) => {
                let settlement = QuerySettlement {
                    request_id,
                    command,
                    outcome: Err(CoreError::DependencyUnavailable(
                        "tokio runtime unavailable; cannot reach analysis server".to_owned(),
                    )),
                };
                if let Err(error) = sender.try_send(settlement) {
                    tracing::warn!(%request_id, "settlement channel full; settling in place");
                    let settlement = error.into_inner();
                    if let Some(pending) = self.pending.remove(&request_id) {
                        self.settle_failure(pending, settlement.command);
                    }
                }
            }
        }
        request_id
    }

    /// Applies every settlement that has arrived. Returns whether any did.
    pub fn drain_settlements(&mut self, coordinator: &mut dyn ViewCoordinator) -> bool {
        let mut settlements = Vec::new();
        loop {
            match self.settlement_receiver.try_recv() {
                Ok(settlement) => settlements.push(settlement),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("console settlement channel closed unexpectedly");
                    break;
                }
            }
        }

        let had_settlements = !settlements.is_empty();
        for settlement in settlements {
            self.apply_settlement(settlement, coordinator);
        }
        had_settlements
    }

    /// Waits for the next settlement and applies it.
    pub async fn settle_next(
        &mut self,
        coordinator: &mut dyn ViewCoordinator,
    ) -> Option<RequestId> {
        if self.pending.is_empty() {
            return None;
        }
        let settlement = self.settlement_receiver.recv().await?;
        let request_id = settlement.request_id;
        self.apply_settlement(settlement, coordinator);
        Some(request_id)
    }

    pub fn apply_settlement(
        &mut self,
        settlement: QuerySettlement,
        coordinator: &mut dyn ViewCoordinator,
    ) {
        let Some(pending) = self.pending.remove(&settlement.request_id) else {
            tracing::warn!(
                request_id = %settlement.request_id,
                "ignoring settlement for unknown request"
            );
            return;
        };
        let command = settlement.command;

        match pending.dispatch {
            PendingDispatch::PassThrough => match settlement.outcome {
                Ok(response) if !payload_is_empty(&response.payload) => {
                    tracing::debug!(command = %command, status = %response.status, "command settled");
                    self.transcript
                        .append(command, payload_display_text(&response.payload));
                }
                Ok(response) => {
                    tracing::debug!(command = %command, status = %response.status, "command returned nothing");
                }
                Err(error) => {
                    tracing::warn!(command = %command, %error, "pass-through command failed");
                }
            },
            PendingDispatch::ShowFunction { function } => match settlement.outcome {
                Ok(response)
                    if response.status.is_success() && !payload_is_empty(&response.payload) =>
                {
                    tracing::debug!(function = %function, "function view settled");
                    coordinator.create_or_focus_tab(&function);
                    coordinator.render_diagram(&function, &response.payload);
                    coordinator.reenable_interaction();
                    coordinator.populate_completions(&response.payload);
                    coordinator.set_active_function_context(&function);
                    self.transcript.append(command, "");
                    self.shown_functions.push(function);
                }
                Ok(response) => {
                    tracing::debug!(function = %function, status = %response.status, "function view unavailable");
                    self.transcript
                        .append(command, unknown_function_message(&function));
                }
                Err(error) => {
                    tracing::debug!(function = %function, %error, "function view failed");
                    self.transcript
                        .append(command, unknown_function_message(&function));
                }
            },
        }
        self.finish_outcome();
    }

    /// Settles a request that never reached the server.
    fn settle_failure(&mut self, pending: PendingQuery, command: String) {
        if let PendingDispatch::ShowFunction { function } = &pending.dispatch {
            self.transcript
                .append(command, unknown_function_message(function));
        }
        self.finish_outcome();
    }

    fn finish_outcome(&mut self) {
        self.input.clear();
        self.scroll_to_end = true;
    }
}

async fn run_remote_query_task(
    client: Arc<dyn RemoteQueryClient>,
    request_id: RequestId,
    command: String,
    descriptor: QueryDescriptor,
    sender: mpsc::Sender<QuerySettlement>,
) {
    let outcome = client.query(descriptor).await;
    let _ = sender
        .send(QuerySettlement {
            request_id,
            command,
            outcome,
        })
        .await;
}
