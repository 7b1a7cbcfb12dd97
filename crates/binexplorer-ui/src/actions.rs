use binexplorer_core::{DiagramNode, DiagramStatement};

/// Width of the address column at the start of a statement line.
pub const STATEMENT_ADDRESS_COLUMN_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextMenuAction {
    Comment,
    Copy,
    CopyAddress,
    CopyBlock,
}

impl ContextMenuAction {
    pub const ALL: [Self; 4] = [Self::Comment, Self::Copy, Self::CopyAddress, Self::CopyBlock];

    pub fn label(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Copy => "copy",
            Self::CopyAddress => "copy address",
            Self::CopyBlock => "copy block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub function: String,
    pub address: String,
    /// Statement text without its comment, split at the address column.
    pub title: (String, String),
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextMenuEffect {
    OpenCommentDraft(CommentDraft),
    Copy { text: String, toast: &'static str },
}

/// Resolves `action` against statement `statement_index` of `block`.
pub fn apply_context_menu_action(
    action: ContextMenuAction,
    function: &str,
    block: &DiagramNode,
    statement_index: usize,
) -> Option<ContextMenuEffect> {
    let statement = block.statements.get(statement_index)?;
    let line = statement.display_text();

    let effect = match action {
        ContextMenuAction::Comment => ContextMenuEffect::OpenCommentDraft(CommentDraft {
            function: function.to_owned(),
            address: statement.address.clone(),
            title: split_statement_address(line.split('#').next().unwrap_or_default()),
            text: statement.comment.clone(),
        }),
        ContextMenuAction::Copy => ContextMenuEffect::Copy {
            text: line,
            toast: "Copy statement",
        },
        ContextMenuAction::CopyAddress => ContextMenuEffect::Copy {
            text: statement_address_text(&line).to_owned(),
            toast: "Copy address",
        },
        ContextMenuAction::CopyBlock => ContextMenuEffect::Copy {
            text: block_text(&block.statements),
            toast: "Copy block",
        },
    };
    Some(effect)
}

/// Splits a statement line into its address column and the rest.
pub fn split_statement_address(line: &str) -> (String, String) {
    let split = line
        .char_indices()
        .nth(STATEMENT_ADDRESS_COLUMN_WIDTH)
        .map(|(index, _)| index)
        .unwrap_or(line.len());
    (line[..split].to_owned(), line[split..].to_owned())
}

fn statement_address_text(line: &str) -> &str {
    line.split(": ").next().unwrap_or(line)
}

fn block_text(statements: &[DiagramStatement]) -> String {
    statements
        .iter()
        .map(|statement| format!("{}\n", statement.display_text()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidebarTab {
    #[default]
    Functions,
    Comments,
}

impl SidebarTab {
    pub fn title(self) -> &'static str {
        match self {
            Self::Functions => "Functions",
            Self::Comments => "Comments",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Functions => Self::Comments,
            Self::Comments => Self::Functions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideMenuAction {
    CallGraph,
    Hexview,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    CallGraph,
    Hexview,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRequest {
    pub title: String,
    pub kind: WindowKind,
}

#[derive(Debug, Clone, Default)]
pub struct SideMenu {
    terminals_opened: usize,
}

impl SideMenu {
    pub fn open(&mut self, action: SideMenuAction) -> WindowRequest {
        match action {
            SideMenuAction::CallGraph => WindowRequest {
                title: "[-] call graph".to_owned(),
                kind: WindowKind::CallGraph,
            },
            SideMenuAction::Hexview => WindowRequest {
                title: "[-] hexview".to_owned(),
                kind: WindowKind::Hexview,
            },
            SideMenuAction::Terminal => {
                let request = WindowRequest {
                    title: format!("[-] Terminal {}", self.terminals_opened),
                    kind: WindowKind::Terminal,
                };
                self.terminals_opened += 1;
                request
            }
        }
    }
}
