use std::sync::Arc;
use std::time::Instant;

use binexplorer_config::{SelectorRuntimeConfig, UiViewConfig};
use binexplorer_core::{CoreError, FunctionId, QueryDescriptor, RemoteQueryClient};
use ratatui::layout::Rect;
use serde_json::Value;
use tokio::runtime::Handle as TokioHandle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::actions::{
    CommentDraft, ContextMenuAction, ContextMenuEffect, SideMenu, SideMenuAction, SidebarTab,
    WindowRequest,
};
use crate::console::CommandConsole;
use crate::coordinator::AnalysisWorkspace;
use crate::function_selector::{FunctionActivationHandler, FunctionSelector};

const FUNCTION_LIST_EVENT_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    #[default]
    Normal,
    Console,
    Filter,
    Comment,
}

impl UiMode {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Console => "Console",
            Self::Filter => "Filter",
            Self::Comment => "Comment",
        }
    }
}

#[derive(Debug)]
pub(crate) enum FunctionListEvent {
    Loaded { functions: Vec<(FunctionId, String)> },
    LoadFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ActivationRequest {
    Focus { id: FunctionId, name: String },
    Show { name: String },
}

/// Single activation focuses, double activation shows.
#[derive(Debug, Default)]
struct ActivationQueue {
    requests: Vec<ActivationRequest>,
}

impl FunctionActivationHandler for ActivationQueue {
    fn on_single(&mut self, id: &FunctionId, name: &str) {
        self.requests.push(ActivationRequest::Focus {
            id: id.clone(),
            name: name.to_owned(),
        });
    }

    fn on_double(&mut self, _id: &FunctionId, name: &str) {
        self.requests.push(ActivationRequest::Show {
            name: name.to_owned(),
        });
    }
}

/// Where the function rows were last drawn, for mouse hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FunctionListViewport {
    pub(crate) area: Rect,
    pub(crate) first_visible: usize,
}

pub(crate) struct UiShellState {
    pub(crate) mode: UiMode,
    pub(crate) console: CommandConsole,
    pub(crate) selector: FunctionSelector,
    pub(crate) workspace: AnalysisWorkspace,
    pub(crate) sidebar_tab: SidebarTab,
    pub(crate) side_menu: SideMenu,
    pub(crate) windows: Vec<WindowRequest>,
    pub(crate) comment_draft: Option<CommentDraft>,
    pub(crate) yank_register: Option<String>,
    pub(crate) toast: Option<String>,
    pub(crate) status: String,
    pub(crate) status_warning: Option<String>,
    pub(crate) view: UiViewConfig,
    pub(crate) function_list_viewport: Option<FunctionListViewport>,
    client: Arc<dyn RemoteQueryClient>,
    function_list_sender: mpsc::Sender<FunctionListEvent>,
    function_list_receiver: mpsc::Receiver<FunctionListEvent>,
}

impl UiShellState {
    pub(crate) fn new(
        client: Arc<dyn RemoteQueryClient>,
        selector: SelectorRuntimeConfig,
        view: UiViewConfig,
    ) -> Self {
        let (function_list_sender, function_list_receiver) =
            mpsc::channel(FUNCTION_LIST_EVENT_CHANNEL_CAPACITY);
        Self {
            mode: UiMode::Normal,
            console: CommandConsole::new(Arc::clone(&client)),
            selector: FunctionSelector::new(selector.dbl_click_wait_time),
            workspace: AnalysisWorkspace::default(),
            sidebar_tab: SidebarTab::default(),
            side_menu: SideMenu::default(),
            windows: Vec::new(),
            comment_draft: None,
            yank_register: None,
            toast: None,
            status: "ready".to_owned(),
            status_warning: None,
            view,
            function_list_viewport: None,
            client,
            function_list_sender,
            function_list_receiver,
        }
    }

    pub(crate) fn spawn_function_list_load(&mut self) {
        let client = Arc::clone(&self.client);
        let sender = self.function_list_sender.clone();
        match TokioHandle::try_current() {
            Ok(handle) => {
                self.status = "loading functions".to_owned();
                handle.spawn(async move {
                    run_function_list_load_task(client, sender).await;
                });
            }
            Err(_) => {
                self.status_warning =
                    Some("tokio runtime unavailable; cannot load functions".to_owned());
            }
        }
    }

    pub(crate) fn tick_and_report(&mut self, now: Instant) -> bool {
        let mut changed = self.tick_activations_and_report(now);
        changed |= self.tick_console_and_report();
        changed |= self.tick_function_list_and_report();
        changed
    }

    fn tick_activations_and_report(&mut self, now: Instant) -> bool {
        let mut queue = ActivationQueue::default();
        if !self.selector.tick(now, &mut queue) {
            return false;
        }
        self.apply_activation_requests(queue.requests);
        true
    }

    fn tick_console_and_report(&mut self) -> bool {
        if !self.console.drain_settlements(&mut self.workspace) {
            return false;
        }
        for function in self.console.take_shown_functions() {
            self.selector.focus_by_name(&function);
        }
        true
    }

    fn tick_function_list_and_report(&mut self) -> bool {
        let mut events = Vec::new();
        loop {
            match self.function_list_receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.status_warning =
                        Some("function list channel closed unexpectedly".to_owned());
                    break;
                }
            }
        }

        let had_events = !events.is_empty();
        for event in events {
            self.apply_function_list_event(event);
        }
        had_events
    }

    pub(crate) fn apply_function_list_event(&mut self, event: FunctionListEvent) {
        match event {
            FunctionListEvent::Loaded { functions } => {
                let count = functions.len();
                for (id, name) in functions {
                    self.selector.add_entry(id, name);
                }
                self.status = format!("{count} functions");
                tracing::info!(count, "function list loaded");
            }
            FunctionListEvent::LoadFailed { message } => {
                tracing::warn!(%message, "function list failed to load");
                self.status_warning = Some(format!("function list unavailable: {message}"));
            }
        }
    }

    pub(crate) fn activate_cursor(&mut self, now: Instant) {
        let mut queue = ActivationQueue::default();
        self.selector.activate_cursor(now, &mut queue);
        self.apply_activation_requests(queue.requests);
    }

    /// Selects and activates the function row drawn at terminal cell `(column, row)`.
    pub(crate) fn click_function_row(&mut self, column: u16, row: u16, now: Instant) -> bool {
        if self.sidebar_tab != SidebarTab::Functions {
            return false;
        }
        let Some(viewport) = self.function_list_viewport else {
            return false;
        };
        let area = viewport.area;
        let inside = column >= area.x
            && column < area.x.saturating_add(area.width)
            && row >= area.y
            && row < area.y.saturating_add(area.height);
        if !inside {
            return false;
        }
        let index = viewport.first_visible + usize::from(row - area.y);
        if !self.selector.select_visible(index) {
            return false;
        }
        self.activate_cursor(now);
        true
    }

    fn apply_activation_requests(&mut self, requests: Vec<ActivationRequest>) {
        for request in requests {
            match request {
                ActivationRequest::Focus { id, name } => {
                    self.selector.focus(&id);
                    self.status = format!("function: {name}");
                }
                ActivationRequest::Show { name } => {
                    self.console.show_function(&name);
                }
            }
        }
    }

    pub(crate) fn toggle_pin_at_cursor(&mut self) {
        let Some(id) = self.selector.cursor_entry().map(|entry| entry.id.clone()) else {
            return;
        };
        if let Some(pinned) = self.selector.toggle_pin(&id) {
            self.status = format!("{} {id}", if pinned { "pinned" } else { "unpinned" });
        }
    }

    pub(crate) fn open_side_menu(&mut self, action: SideMenuAction) {
        let request = self.side_menu.open(action);
        self.status = format!("opened {}", request.title);
        self.windows.push(request);
    }

    pub(crate) fn run_context_menu(&mut self, action: ContextMenuAction) {
        let Some(effect) = self.workspace.context_menu(action) else {
            self.status_warning = Some(format!("{}: no statement selected", action.label()));
            return;
        };
        match effect {
            ContextMenuEffect::OpenCommentDraft(draft) => {
                self.comment_draft = Some(draft);
                self.mode = UiMode::Comment;
            }
            ContextMenuEffect::Copy { text, toast } => {
                self.yank_register = Some(text);
                self.toast = Some(toast.to_owned());
            }
        }
    }

    pub(crate) fn submit_comment_draft(&mut self) {
        if let Some(draft) = self.comment_draft.take() {
            self.workspace.submit_comment(&draft);
            self.status = format!("comment set at {}", draft.address);
        }
        self.mode = UiMode::Normal;
    }

    pub(crate) fn cancel_comment_draft(&mut self) {
        self.comment_draft = None;
        self.mode = UiMode::Normal;
    }

    pub(crate) fn toggle_active_comment_section(&mut self) {
        let comments = self.workspace.comments();
        let Some(function) = self
            .workspace
            .active_function()
            .filter(|function| comments.section(function).is_some())
            .or_else(|| comments.sections().first().map(|section| section.function.as_str()))
            .map(ToOwned::to_owned)
        else {
            return;
        };
        self.workspace.comments_mut().toggle_section(&function);
    }

    pub(crate) fn enter_mode(&mut self, mode: UiMode) {
        self.mode = mode;
        self.toast = None;
        self.status_warning = None;
    }
}

async fn run_function_list_load_task(
    client: Arc<dyn RemoteQueryClient>,
    sender: mpsc::Sender<FunctionListEvent>,
) {
    let event = match client.query(QueryDescriptor::FetchFunctions).await {
        Ok(response) if !response.status.is_success() => FunctionListEvent::LoadFailed {
            message: format!("server returned {}", response.status),
        },
        Ok(response) => match parse_function_list(&response.payload) {
            Ok(functions) => FunctionListEvent::Loaded { functions },
            Err(error) => FunctionListEvent::LoadFailed {
                message: error.to_string(),
            },
        },
        Err(error) => FunctionListEvent::LoadFailed {
            message: error.to_string(),
        },
    };
    let _ = sender.send(event).await;
}

/// Reads `[{"id", "name"}]` or `["name"]` function listings.
pub(crate) fn parse_function_list(payload: &Value) -> Result<Vec<(FunctionId, String)>, CoreError> {
    let Some(items) = payload.as_array() else {
        return Err(CoreError::InvalidPayload(
            "function list must be a JSON array".to_owned(),
        ));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok((FunctionId::new(name.as_str()), name.clone())),
            Value::Object(fields) => {
                let name = fields
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        CoreError::InvalidPayload("function entry is missing a name".to_owned())
                    })?;
                let id = match fields.get("id") {
                    Some(Value::String(id)) => id.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    _ => name.to_owned(),
                };
                Ok((FunctionId::new(id), name.to_owned()))
            }
            other => Err(CoreError::InvalidPayload(format!(
                "unexpected function entry: {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use binexplorer_core::test_support::ScriptedQueryClient;
    use binexplorer_core::QueryResponse;
    use serde_json::json;

    use super::*;

    fn shell_with(client: ScriptedQueryClient) -> UiShellState {
        UiShellState::new(
            Arc::new(client),
            SelectorRuntimeConfig {
                dbl_click_wait_time: Duration::from_millis(250),
            },
            UiViewConfig {
                theme: "default".to_owned(),
                transcript_line_limit: 100,
            },
        )
    }

    fn loaded(shell: &mut UiShellState, names: &[&str]) {
        shell.apply_function_list_event(FunctionListEvent::Loaded {
            functions: names
                .iter()
                .map(|name| (FunctionId::new(*name), (*name).to_owned()))
                .collect(),
        });
    }

    #[test]
    fn parse_function_list_accepts_objects_and_strings() {
        let parsed = parse_function_list(&json!([
            { "id": 4198400, "name": "main" },
            { "id": "f1", "name": "init" },
            { "name": "helper" },
            "plain"
        ]))
        .expect("parse list");

        assert_eq!(
            parsed,
            vec![
                (FunctionId::new("4198400"), "main".to_owned()),
                (FunctionId::new("f1"), "init".to_owned()),
                (FunctionId::new("helper"), "helper".to_owned()),
                (FunctionId::new("plain"), "plain".to_owned()),
            ]
        );
        assert!(parse_function_list(&json!({ "main": 1 })).is_err());
        assert!(parse_function_list(&json!([{ "id": 1 }])).is_err());
    }

    #[test]
    fn single_activation_focuses_after_the_window() {
        let start = Instant::now();
        let mut shell = shell_with(ScriptedQueryClient::new());
        loaded(&mut shell, &["main", "init"]);

        shell.activate_cursor(start);
        assert!(shell.selector.focused().is_none());

        assert!(shell.tick_and_report(start + Duration::from_millis(300)));
        assert_eq!(
            shell.selector.focused().map(|entry| entry.name.as_str()),
            Some("main")
        );
        assert_eq!(shell.status, "function: main");
        assert!(shell.console.transcript().is_empty());
    }

    #[test]
    fn double_activation_submits_show_through_the_console() {
        let start = Instant::now();
        let mut shell = shell_with(ScriptedQueryClient::new());
        loaded(&mut shell, &["main"]);

        shell.activate_cursor(start);
        shell.activate_cursor(start + Duration::from_millis(100));
        shell.tick_and_report(start + Duration::from_millis(150));

        assert!(shell.selector.focused().is_none());
        assert_eq!(
            shell.console.transcript().last().map(|entry| entry.command.as_str()),
            Some("show main")
        );
    }

    #[test]
    fn mouse_clicks_hit_the_drawn_rows() {
        let start = Instant::now();
        let mut shell = shell_with(ScriptedQueryClient::new());
        loaded(&mut shell, &["a", "b", "c"]);
        shell.function_list_viewport = Some(FunctionListViewport {
            area: Rect::new(1, 4, 20, 10),
            first_visible: 0,
        });

        assert!(shell.click_function_row(3, 6, start));
        assert_eq!(
            shell.selector.cursor_entry().map(|entry| entry.name.as_str()),
            Some("c")
        );
        assert!(!shell.click_function_row(3, 20, start));
        assert!(!shell.click_function_row(30, 5, start));
    }

    #[test]
    fn copy_actions_fill_the_yank_register() {
        let mut shell = shell_with(ScriptedQueryClient::new());
        shell.run_context_menu(ContextMenuAction::Copy);
        assert!(shell.status_warning.is_some());
        assert!(shell.yank_register.is_none());
    }

    fn function_view() -> Value {
        json!({
            "Nodes": [{ "Terms": [[["00401000: ", "address"], ["ret", "mnemonic"]]] }]
        })
    }

    async fn settle_console(shell: &mut UiShellState) -> bool {
        for _ in 0..100 {
            tokio::task::yield_now().await;
            if shell.tick_and_report(Instant::now()) {
                return true;
            }
        }
        false
    }

    #[tokio::test]
    async fn successful_show_moves_selector_focus_to_the_shown_function() {
        let client = ScriptedQueryClient::new().respond(
            QueryDescriptor::fetch_function_view("init"),
            Ok(QueryResponse::ok(function_view())),
        );
        let mut shell = shell_with(client);
        loaded(&mut shell, &["main", "init"]);

        shell.console.submit_command("show init");

        assert!(settle_console(&mut shell).await);
        assert_eq!(shell.workspace.active_function(), Some("init"));
        assert_eq!(
            shell.selector.focused().map(|entry| entry.name.as_str()),
            Some("init")
        );
    }

    #[tokio::test]
    async fn reshowing_the_active_function_takes_focus_back() {
        let client = ScriptedQueryClient::new()
            .respond(
                QueryDescriptor::fetch_function_view("main"),
                Ok(QueryResponse::ok(function_view())),
            )
            .respond(
                QueryDescriptor::fetch_function_view("main"),
                Ok(QueryResponse::ok(function_view())),
            );
        let mut shell = shell_with(client);
        loaded(&mut shell, &["main", "init"]);

        shell.console.submit_command("show main");
        assert!(settle_console(&mut shell).await);
        shell.selector.focus(&FunctionId::new("init"));

        shell.console.submit_command("show main");
        assert!(settle_console(&mut shell).await);

        assert_eq!(
            shell.console.transcript().last().map(|entry| entry.command.as_str()),
            Some("show main")
        );
        assert_eq!(
            shell.selector.focused().map(|entry| entry.name.as_str()),
            Some("main")
        );
    }

    #[tokio::test]
    async fn double_activation_shows_names_containing_spaces() {
        let name = "operator new(unsigned long)";
        let client = Arc::new(ScriptedQueryClient::new().respond(
            QueryDescriptor::fetch_function_view(name),
            Ok(QueryResponse::ok(function_view())),
        ));
        let mut shell = UiShellState::new(
            client.clone(),
            SelectorRuntimeConfig {
                dbl_click_wait_time: Duration::from_millis(250),
            },
            UiViewConfig {
                theme: "default".to_owned(),
                transcript_line_limit: 100,
            },
        );
        loaded(&mut shell, &[name]);
        let start = Instant::now();

        shell.activate_cursor(start);
        shell.activate_cursor(start + Duration::from_millis(100));
        assert!(settle_console(&mut shell).await);

        assert_eq!(
            client.issued(),
            vec![QueryDescriptor::fetch_function_view(name)]
        );
        assert_eq!(shell.workspace.active_function(), Some(name));
    }

    #[tokio::test]
    async fn startup_load_populates_the_selector() {
        let client = ScriptedQueryClient::new().respond(
            QueryDescriptor::FetchFunctions,
            Ok(QueryResponse::ok(json!(["main", "init"]))),
        );
        let mut shell = shell_with(client);

        shell.spawn_function_list_load();
        let event = shell
            .function_list_receiver
            .recv()
            .await
            .expect("function list event");
        shell.apply_function_list_event(event);

        assert_eq!(shell.selector.len(), 2);
        assert_eq!(shell.status, "2 functions");
    }

    #[tokio::test]
    async fn failed_startup_load_is_reported_on_the_status_line() {
        let mut shell = shell_with(ScriptedQueryClient::new());

        shell.spawn_function_list_load();
        let event = shell
            .function_list_receiver
            .recv()
            .await
            .expect("function list event");
        shell.apply_function_list_event(event);

        assert!(shell.selector.is_empty());
        assert!(shell
            .status_warning
            .as_deref()
            .is_some_and(|warning| warning.contains("404")));
    }
}
