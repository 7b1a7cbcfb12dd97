use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use binexplorer_core::TRANSCRIPT_PROMPT;

use super::input::mode_help;
use super::shell_state::{FunctionListViewport, UiMode, UiShellState};
use crate::actions::{CommentDraft, SidebarTab, WindowRequest};
use crate::comments::CommentPanel;
use crate::console::CommandConsole;
use crate::coordinator::{AnalysisTab, AnalysisWorkspace};
use crate::function_selector::{split_highlight, FunctionSelector};

fn accent(theme: &str) -> Style {
    match theme {
        "mono" => Style::default().add_modifier(Modifier::BOLD),
        _ => Style::default().fg(Color::Cyan),
    }
}

fn focused_border(theme: &str, focused: bool) -> Style {
    if focused {
        accent(theme)
    } else {
        Style::default()
    }
}

/// Rows for the visible functions, scrolled so the cursor stays in view.
pub(crate) fn render_function_rows(
    selector: &FunctionSelector,
    height: usize,
    theme: &str,
) -> (Vec<Line<'static>>, usize) {
    let visible = selector.visible_entries();
    let height = height.max(1);
    let first_visible = selector.cursor().saturating_sub(height - 1);

    let lines = visible
        .iter()
        .enumerate()
        .skip(first_visible)
        .take(height)
        .map(|(index, visible)| {
            let entry = visible.entry;
            let mut spans = vec![Span::raw(if entry.pinned { "* " } else { "  " })];
            match visible.highlight {
                Some(span) => {
                    let (before, matched, after) = split_highlight(&entry.name, span);
                    spans.push(Span::raw(before));
                    spans.push(Span::styled(
                        matched,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                    spans.push(Span::raw(after));
                }
                None => spans.push(Span::raw(entry.name.clone())),
            }

            let mut style = Style::default();
            if entry.focused {
                style = style.patch(accent(theme));
            }
            if index == selector.cursor() {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(spans).style(style)
        })
        .collect();
    (lines, first_visible)
}

pub(crate) fn render_comment_lines(panel: &CommentPanel) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for section in panel.sections() {
        let caret = if section.expanded { "v" } else { ">" };
        lines.push(Line::from(format!("{caret} {}", section.function)));
        if !section.expanded {
            continue;
        }
        for comment in &section.comments {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}", comment.address),
                    Style::default().add_modifier(Modifier::DIM),
                ),
                Span::raw(format!(" # {}", comment.text)),
            ]));
        }
    }
    if lines.is_empty() {
        lines.push(Line::from("no comments"));
    }
    lines
}

pub(crate) fn render_tab_strip(
    workspace: &AnalysisWorkspace,
    windows: &[WindowRequest],
    theme: &str,
) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, tab) in workspace.tabs().iter().enumerate() {
        let label = format!(" {} ", tab.function);
        if workspace.active_tab_index() == Some(index) {
            spans.push(Span::styled(label, accent(theme).add_modifier(Modifier::REVERSED)));
        } else {
            spans.push(Span::raw(label));
        }
    }
    for window in windows {
        spans.push(Span::styled(
            format!(" {} ", window.title),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    if spans.is_empty() {
        spans.push(Span::raw("no function shown; try :show <name> or double-activate a function"));
    }
    Line::from(spans)
}

pub(crate) fn render_diagram_lines(tab: &AnalysisTab, theme: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (node_index, node) in tab.nodes.iter().enumerate() {
        lines.push(Line::styled(
            format!("[block {node_index}]"),
            Style::default().add_modifier(Modifier::DIM),
        ));
        for (statement_index, statement) in node.statements.iter().enumerate() {
            let selected = tab.selection.is_some_and(|cursor| {
                cursor.node == node_index && cursor.statement == statement_index
            });
            let mut spans = vec![Span::raw(statement.text.clone())];
            if !statement.comment.is_empty() {
                spans.push(Span::styled(
                    format!(" # {}", statement.comment),
                    accent(theme),
                ));
            }
            let line = Line::from(spans);
            lines.push(if selected {
                line.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                line
            });
        }
    }
    lines
}

pub(crate) fn render_console_lines(console: &CommandConsole, line_limit: usize) -> Vec<Line<'static>> {
    let mut lines = console
        .transcript()
        .render_lines(line_limit)
        .into_iter()
        .map(Line::from)
        .collect::<Vec<_>>();
    if console.pending_count() > 0 {
        lines.push(Line::styled(
            format!("... {} pending", console.pending_count()),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }
    lines
}

pub(crate) fn render_comment_draft(draft: &CommentDraft, theme: &str) -> Text<'static> {
    Text::from(vec![
        Line::from(vec![
            Span::styled(draft.title.0.clone(), accent(theme)),
            Span::raw(draft.title.1.clone()),
        ]),
        Line::from(format!("# {}", draft.text)),
    ])
}

pub(crate) fn footer_text(shell_state: &UiShellState) -> String {
    let mut parts = vec![format!("status: {}", shell_state.status)];
    if let Some(function) = shell_state.workspace.active_function() {
        parts.push(format!("function: {function}"));
    }
    if let Some(toast) = shell_state.toast.as_deref() {
        parts.push(toast.to_owned());
    }
    if let Some(warning) = shell_state.status_warning.as_deref() {
        parts.push(format!("warning: {warning}"));
    }
    parts.push(format!("mode: {}", shell_state.mode.label()));
    parts.push(mode_help(shell_state.mode));
    parts.join(" | ")
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub(crate) fn draw_shell(frame: &mut Frame<'_>, shell_state: &mut UiShellState) {
    let theme = shell_state.view.theme.clone();
    let area = frame.area();
    let [main, footer] = Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(area);
    let [sidebar_area, right_area] =
        Layout::horizontal([Constraint::Percentage(28), Constraint::Percentage(72)]).areas(main);
    let [center_area, console_area] =
        Layout::vertical([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(right_area);

    let [filter_area, list_area] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(sidebar_area);
    frame.render_widget(
        Paragraph::new(shell_state.selector.filter().to_owned()).block(
            Block::default()
                .title("filter")
                .borders(Borders::ALL)
                .border_style(focused_border(&theme, shell_state.mode == UiMode::Filter)),
        ),
        filter_area,
    );

    let list_title = match shell_state.sidebar_tab {
        SidebarTab::Functions => "[Functions] Comments",
        SidebarTab::Comments => "Functions [Comments]",
    };
    let list_block = Block::default().title(list_title).borders(Borders::ALL);
    let list_inner = list_block.inner(list_area);
    match shell_state.sidebar_tab {
        SidebarTab::Functions => {
            let (rows, first_visible) = render_function_rows(
                &shell_state.selector,
                usize::from(list_inner.height),
                &theme,
            );
            shell_state.function_list_viewport = Some(FunctionListViewport {
                area: list_inner,
                first_visible,
            });
            frame.render_widget(Paragraph::new(rows).block(list_block), list_area);
        }
        SidebarTab::Comments => {
            shell_state.function_list_viewport = None;
            frame.render_widget(
                Paragraph::new(render_comment_lines(shell_state.workspace.comments()))
                    .block(list_block),
                list_area,
            );
        }
    }

    let [tab_strip_area, diagram_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(center_area);
    frame.render_widget(
        Paragraph::new(render_tab_strip(
            &shell_state.workspace,
            &shell_state.windows,
            &theme,
        )),
        tab_strip_area,
    );
    let diagram_lines = shell_state
        .workspace
        .active_tab()
        .map(|tab| render_diagram_lines(tab, &theme))
        .unwrap_or_default();
    let diagram_scroll = shell_state
        .workspace
        .active_tab()
        .and_then(|tab| tab.selection.map(|cursor| (tab, cursor)))
        .map(|(tab, cursor)| {
            let row = tab.nodes[..cursor.node]
                .iter()
                .map(|node| node.statements.len() + 1)
                .sum::<usize>()
                + cursor.statement
                + 1;
            let viewport = usize::from(diagram_area.height.saturating_sub(2)).max(1);
            u16::try_from(row.saturating_sub(viewport - 1)).unwrap_or(u16::MAX)
        })
        .unwrap_or(0);
    frame.render_widget(
        Paragraph::new(diagram_lines)
            .scroll((diagram_scroll, 0))
            .block(Block::default().title("diagram").borders(Borders::ALL)),
        diagram_area,
    );

    let [transcript_area, input_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(3)]).areas(console_area);
    let transcript_lines =
        render_console_lines(&shell_state.console, shell_state.view.transcript_line_limit);
    let viewport = usize::from(transcript_area.height.saturating_sub(2));
    let transcript_scroll =
        u16::try_from(transcript_lines.len().saturating_sub(viewport)).unwrap_or(u16::MAX);
    frame.render_widget(
        Paragraph::new(transcript_lines)
            .wrap(Wrap { trim: false })
            .scroll((transcript_scroll, 0))
            .block(Block::default().title("console").borders(Borders::ALL)),
        transcript_area,
    );
    frame.render_widget(
        Paragraph::new(format!("{TRANSCRIPT_PROMPT}{}", shell_state.console.input())).block(
            Block::default()
                .title("command")
                .borders(Borders::ALL)
                .border_style(focused_border(&theme, shell_state.mode == UiMode::Console)),
        ),
        input_area,
    );

    frame.render_widget(
        Paragraph::new(footer_text(shell_state))
            .block(Block::default().title("shell").borders(Borders::ALL)),
        footer,
    );

    if let Some(draft) = shell_state.comment_draft.as_ref() {
        let popup = centered_rect(main, 72, 5);
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(render_comment_draft(draft, &theme)).block(
                Block::default()
                    .title("comment")
                    .borders(Borders::ALL)
                    .border_style(accent(&theme)),
            ),
            popup,
        );
    }
}
