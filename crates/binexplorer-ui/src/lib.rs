//! Terminal front end for BinExplorer: the command console, the function
//! selector with its click disambiguation, and the analysis views kept in
//! sync after every `show`.
//!
//! Remote access goes through [`binexplorer_core::RemoteQueryClient`]; this
//! crate never names a concrete transport.

pub mod actions;
pub mod click;
pub mod comments;
pub mod console;
pub mod coordinator;
pub mod function_selector;
pub mod scheduler;
mod ui;

pub use actions::{
    CommentDraft, ContextMenuAction, ContextMenuEffect, SideMenu, SideMenuAction, SidebarTab,
    WindowKind, WindowRequest,
};
pub use click::{ClickDisambiguator, Gesture};
pub use comments::{CommentPanel, CommentSection};
pub use console::{CommandConsole, ConsolePhase, Dispatch, LocalKeyword, SubmitOutcome};
pub use coordinator::{AnalysisTab, AnalysisWorkspace, StatementCursor, ViewCoordinator};
pub use function_selector::{FunctionActivationHandler, FunctionEntry, FunctionSelector};
pub use scheduler::DeferredScheduler;
pub use ui::Ui;
