use binexplorer_core::{
    diagram_nodes, statement_addresses, statement_comments, DiagramNode, DiagramStatement,
};
use serde_json::Value;

use crate::actions::{apply_context_menu_action, CommentDraft, ContextMenuAction, ContextMenuEffect};
use crate::comments::CommentPanel;

/// View surfaces updated together once a function view is fetched.
///
/// The console calls these in declaration order for every successful
/// `show`, so implementations may rely on the tab existing by the time the
/// diagram is rendered.
pub trait ViewCoordinator {
    fn create_or_focus_tab(&mut self, function: &str);
    fn render_diagram(&mut self, function: &str, payload: &Value);
    fn reenable_interaction(&mut self);
    fn populate_completions(&mut self, payload: &Value);
    fn set_active_function_context(&mut self, function: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementCursor {
    pub node: usize,
    pub statement: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTab {
    pub function: String,
    pub nodes: Vec<DiagramNode>,
    pub selection: Option<StatementCursor>,
}

impl AnalysisTab {
    fn new(function: &str) -> Self {
        Self {
            function: function.to_owned(),
            nodes: Vec::new(),
            selection: None,
        }
    }

    pub fn selected_statement(&self) -> Option<&DiagramStatement> {
        let cursor = self.selection?;
        self.nodes.get(cursor.node)?.statements.get(cursor.statement)
    }

    fn statement_cursors(&self) -> Vec<StatementCursor> {
        self.nodes
            .iter()
            .enumerate()
            .flat_map(|(node, block)| {
                (0..block.statements.len()).map(move |statement| StatementCursor { node, statement })
            })
            .collect()
    }
}

/// Tabs, comment sidebar, completions and header state of the analysis view.
#[derive(Debug, Clone, Default)]
pub struct AnalysisWorkspace {
    tabs: Vec<AnalysisTab>,
    active_tab: Option<usize>,
    comments: CommentPanel,
    completions: Vec<String>,
    interaction_enabled: bool,
    active_function: Option<String>,
}

impl AnalysisWorkspace {
    pub fn tabs(&self) -> &[AnalysisTab] {
        &self.tabs
    }

    pub fn active_tab_index(&self) -> Option<usize> {
        self.active_tab
    }

    pub fn active_tab(&self) -> Option<&AnalysisTab> {
        self.active_tab.and_then(|index| self.tabs.get(index))
    }

    fn active_tab_mut(&mut self) -> Option<&mut AnalysisTab> {
        self.active_tab.and_then(|index| self.tabs.get_mut(index))
    }

    pub fn comments(&self) -> &CommentPanel {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut CommentPanel {
        &mut self.comments
    }

    pub fn completions(&self) -> &[String] {
        &self.completions
    }

    pub fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    pub fn active_function(&self) -> Option<&str> {
        self.active_function.as_deref()
    }

    pub fn cycle_tab(&mut self, forward: bool) -> bool {
        let count = self.tabs.len();
        let Some(current) = self.active_tab else {
            return false;
        };
        if count < 2 {
            return false;
        }
        self.active_tab = Some(if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        });
        true
    }

    pub fn close_active_tab(&mut self) -> Option<AnalysisTab> {
        let index = self.active_tab?;
        let closed = self.tabs.remove(index);
        self.active_tab = if self.tabs.is_empty() {
            None
        } else {
            Some(index.min(self.tabs.len() - 1))
        };
        Some(closed)
    }

    /// Moves the statement selection of the active tab across all blocks.
    pub fn move_statement_selection(&mut self, delta: isize) -> bool {
        let Some(tab) = self.active_tab_mut() else {
            return false;
        };
        let cursors = tab.statement_cursors();
        if cursors.is_empty() {
            return false;
        }
        let current = tab
            .selection
            .and_then(|selection| cursors.iter().position(|cursor| *cursor == selection))
            .unwrap_or(0);
        let next = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current
                .saturating_add(delta.unsigned_abs())
                .min(cursors.len() - 1)
        };
        tab.selection = Some(cursors[next]);
        next != current
    }

    /// Runs a context menu action on the selected statement of the active tab.
    pub fn context_menu(&self, action: ContextMenuAction) -> Option<ContextMenuEffect> {
        if !self.interaction_enabled {
            return None;
        }
        let tab = self.active_tab()?;
        let cursor = tab.selection?;
        let block = tab.nodes.get(cursor.node)?;
        apply_context_menu_action(action, &tab.function, block, cursor.statement)
    }

    /// Records a submitted comment in the sidebar and on the drawn statement.
    pub fn submit_comment(&mut self, draft: &CommentDraft) -> bool {
        let listed = self
            .comments
            .add_comment(&draft.function, &draft.address, &draft.text);

        if let Some(tab) = self
            .tabs
            .iter_mut()
            .find(|tab| tab.function == draft.function)
        {
            for statement in tab
                .nodes
                .iter_mut()
                .flat_map(|node| node.statements.iter_mut())
                .filter(|statement| statement.address == draft.address)
            {
                statement.comment = draft.text.clone();
            }
        }
        listed
    }
}

impl ViewCoordinator for AnalysisWorkspace {
    fn create_or_focus_tab(&mut self, function: &str) {
        let index = match self.tabs.iter().position(|tab| tab.function == function) {
            Some(index) => index,
            None => {
                self.tabs.push(AnalysisTab::new(function));
                self.tabs.len() - 1
            }
        };
        self.active_tab = Some(index);
    }

    fn render_diagram(&mut self, function: &str, payload: &Value) {
        if let Some(tab) = self.tabs.iter_mut().find(|tab| tab.function == function) {
            tab.nodes = diagram_nodes(payload);
            tab.selection = tab.statement_cursors().first().copied();
        }
        self.comments
            .set_comments(function, statement_comments(payload));
    }

    fn reenable_interaction(&mut self) {
        self.interaction_enabled = true;
    }

    fn populate_completions(&mut self, payload: &Value) {
        self.completions = statement_addresses(payload);
    }

    fn set_active_function_context(&mut self, function: &str) {
        self.active_function = Some(function.to_owned());
    }
}
