use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use super::shell_state::{UiMode, UiShellState};
use crate::actions::{ContextMenuAction, SideMenuAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UiCommand {
    EnterNormalMode,
    EnterConsoleMode,
    EnterFilterMode,
    MoveCursorDown,
    MoveCursorUp,
    ActivateCursor,
    TogglePin,
    ToggleSidebarTab,
    ToggleCommentSection,
    NextTab,
    PreviousTab,
    CloseTab,
    MoveStatementDown,
    MoveStatementUp,
    ContextMenu(ContextMenuAction),
    OpenSideMenu(SideMenuAction),
    SubmitConsole,
    SubmitCommentDraft,
    CancelCommentDraft,
    QuitShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextEdit {
    Insert(char),
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoutedInput {
    Command(UiCommand),
    Edit(TextEdit),
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BottomBarHintGroup {
    label: &'static str,
    hints: &'static [&'static str],
}

fn bottom_bar_hint_groups(mode: UiMode) -> &'static [BottomBarHintGroup] {
    match mode {
        UiMode::Normal => &[
            BottomBarHintGroup {
                label: "Functions:",
                hints: &["j/k", "Enter", "p", "/"],
            },
            BottomBarHintGroup {
                label: "View:",
                hints: &["Tab", "[ ]", "x", "J/K", "z"],
            },
            BottomBarHintGroup {
                label: "Statement:",
                hints: &["c", "y", "a", "b"],
            },
            BottomBarHintGroup {
                label: "Windows:",
                hints: &["g", "h", "t"],
            },
            BottomBarHintGroup {
                label: "Shell:",
                hints: &[":", "q"],
            },
        ],
        UiMode::Console => &[BottomBarHintGroup {
            label: "Console:",
            hints: &["Enter run", "Esc back"],
        }],
        UiMode::Filter => &[BottomBarHintGroup {
            label: "Filter:",
            hints: &["type to filter", "Enter/Esc back"],
        }],
        UiMode::Comment => &[BottomBarHintGroup {
            label: "Comment:",
            hints: &["Enter save", "Esc cancel"],
        }],
    }
}

pub(crate) fn mode_help(mode: UiMode) -> String {
    bottom_bar_hint_groups(mode)
        .iter()
        .map(|group| format!("{} {}", group.label, group.hints.join(", ")))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub(crate) fn route_key_press(mode: UiMode, key: KeyEvent) -> RoutedInput {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return RoutedInput::Command(UiCommand::QuitShell);
    }
    match mode {
        UiMode::Normal => route_normal_key(key),
        UiMode::Console => route_text_key(key, UiCommand::SubmitConsole, UiCommand::EnterNormalMode),
        UiMode::Filter => route_text_key(key, UiCommand::EnterNormalMode, UiCommand::EnterNormalMode),
        UiMode::Comment => route_text_key(
            key,
            UiCommand::SubmitCommentDraft,
            UiCommand::CancelCommentDraft,
        ),
    }
}

fn route_normal_key(key: KeyEvent) -> RoutedInput {
    let command = match key.code {
        KeyCode::Char(':') => UiCommand::EnterConsoleMode,
        KeyCode::Char('/') => UiCommand::EnterFilterMode,
        KeyCode::Char('j') | KeyCode::Down => UiCommand::MoveCursorDown,
        KeyCode::Char('k') | KeyCode::Up => UiCommand::MoveCursorUp,
        KeyCode::Enter => UiCommand::ActivateCursor,
        KeyCode::Char('p') => UiCommand::TogglePin,
        KeyCode::Tab => UiCommand::ToggleSidebarTab,
        KeyCode::Char('z') => UiCommand::ToggleCommentSection,
        KeyCode::Char(']') => UiCommand::NextTab,
        KeyCode::Char('[') => UiCommand::PreviousTab,
        KeyCode::Char('x') => UiCommand::CloseTab,
        KeyCode::Char('J') => UiCommand::MoveStatementDown,
        KeyCode::Char('K') => UiCommand::MoveStatementUp,
        KeyCode::Char('c') => UiCommand::ContextMenu(ContextMenuAction::Comment),
        KeyCode::Char('y') => UiCommand::ContextMenu(ContextMenuAction::Copy),
        KeyCode::Char('a') => UiCommand::ContextMenu(ContextMenuAction::CopyAddress),
        KeyCode::Char('b') => UiCommand::ContextMenu(ContextMenuAction::CopyBlock),
        KeyCode::Char('g') => UiCommand::OpenSideMenu(SideMenuAction::CallGraph),
        KeyCode::Char('h') => UiCommand::OpenSideMenu(SideMenuAction::Hexview),
        KeyCode::Char('t') => UiCommand::OpenSideMenu(SideMenuAction::Terminal),
        KeyCode::Char('q') => UiCommand::QuitShell,
        _ => return RoutedInput::Ignore,
    };
    RoutedInput::Command(command)
}

fn route_text_key(key: KeyEvent, on_enter: UiCommand, on_escape: UiCommand) -> RoutedInput {
    match key.code {
        KeyCode::Enter => RoutedInput::Command(on_enter),
        KeyCode::Esc => RoutedInput::Command(on_escape),
        KeyCode::Backspace => RoutedInput::Edit(TextEdit::Backspace),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            RoutedInput::Edit(TextEdit::Insert(ch))
        }
        _ => RoutedInput::Ignore,
    }
}

/// Handles one key press. Returns `true` when the shell should exit.
pub(crate) fn handle_key_press(shell_state: &mut UiShellState, key: KeyEvent, now: Instant) -> bool {
    match route_key_press(shell_state.mode, key) {
        RoutedInput::Command(command) => dispatch_command(shell_state, command, now),
        RoutedInput::Edit(edit) => {
            apply_text_edit(shell_state, edit);
            false
        }
        RoutedInput::Ignore => false,
    }
}

pub(crate) fn handle_mouse_event(shell_state: &mut UiShellState, mouse: MouseEvent, now: Instant) {
    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
        shell_state.click_function_row(mouse.column, mouse.row, now);
    }
}

fn apply_text_edit(shell_state: &mut UiShellState, edit: TextEdit) {
    match shell_state.mode {
        UiMode::Console => match edit {
            TextEdit::Insert(ch) => shell_state.console.push_input_char(ch),
            TextEdit::Backspace => {
                shell_state.console.pop_input_char();
            }
        },
        UiMode::Filter => {
            let mut filter = shell_state.selector.filter().to_owned();
            match edit {
                TextEdit::Insert(ch) => filter.push(ch),
                TextEdit::Backspace => {
                    filter.pop();
                }
            }
            shell_state.selector.set_filter(filter);
        }
        UiMode::Comment => {
            if let Some(draft) = shell_state.comment_draft.as_mut() {
                match edit {
                    TextEdit::Insert(ch) => draft.text.push(ch),
                    TextEdit::Backspace => {
                        draft.text.pop();
                    }
                }
            }
        }
        UiMode::Normal => {}
    }
}

fn dispatch_command(shell_state: &mut UiShellState, command: UiCommand, now: Instant) -> bool {
    match command {
        UiCommand::EnterNormalMode => shell_state.enter_mode(UiMode::Normal),
        UiCommand::EnterConsoleMode => shell_state.enter_mode(UiMode::Console),
        UiCommand::EnterFilterMode => shell_state.enter_mode(UiMode::Filter),
        UiCommand::MoveCursorDown => shell_state.selector.move_cursor(1),
        UiCommand::MoveCursorUp => shell_state.selector.move_cursor(-1),
        UiCommand::ActivateCursor => shell_state.activate_cursor(now),
        UiCommand::TogglePin => shell_state.toggle_pin_at_cursor(),
        UiCommand::ToggleSidebarTab => {
            shell_state.sidebar_tab = shell_state.sidebar_tab.toggled();
        }
        UiCommand::ToggleCommentSection => shell_state.toggle_active_comment_section(),
        UiCommand::NextTab => {
            shell_state.workspace.cycle_tab(true);
        }
        UiCommand::PreviousTab => {
            shell_state.workspace.cycle_tab(false);
        }
        UiCommand::CloseTab => {
            shell_state.workspace.close_active_tab();
        }
        UiCommand::MoveStatementDown => {
            shell_state.workspace.move_statement_selection(1);
        }
        UiCommand::MoveStatementUp => {
            shell_state.workspace.move_statement_selection(-1);
        }
        UiCommand::ContextMenu(action) => shell_state.run_context_menu(action),
        UiCommand::OpenSideMenu(action) => shell_state.open_side_menu(action),
        UiCommand::SubmitConsole => {
            shell_state.console.submit();
        }
        UiCommand::SubmitCommentDraft => shell_state.submit_comment_draft(),
        UiCommand::CancelCommentDraft => shell_state.cancel_comment_draft(),
        UiCommand::QuitShell => return true,
    }
    false
}
