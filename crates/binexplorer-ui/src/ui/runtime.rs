use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use binexplorer_config::{SelectorRuntimeConfig, UiViewConfig};
use binexplorer_core::RemoteQueryClient;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use super::input::{handle_key_press, handle_mouse_event};
use super::rendering::draw_shell;
use super::shell_state::UiShellState;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

pub struct Ui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Ui {
    pub fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Runs the shell until the user quits. Must be called inside a tokio
    /// runtime so console queries and the function list load can be spawned.
    pub fn run(
        &mut self,
        client: Arc<dyn RemoteQueryClient>,
        selector: SelectorRuntimeConfig,
        view: UiViewConfig,
    ) -> io::Result<()> {
        let mut shell_state = UiShellState::new(client, selector, view);
        shell_state.spawn_function_list_load();

        let mut force_draw = true;
        loop {
            let now = Instant::now();
            let mut changed = shell_state.tick_and_report(now);
            changed |= shell_state.console.take_scroll_to_end();

            if force_draw || changed {
                self.terminal
                    .draw(|frame| draw_shell(frame, &mut shell_state))?;
            }

            force_draw = false;
            if event::poll(poll_timeout(&shell_state, Instant::now()))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if handle_key_press(&mut shell_state, key, Instant::now()) {
                            break;
                        }
                        force_draw = true;
                    }
                    Event::Mouse(mouse) => {
                        handle_mouse_event(&mut shell_state, mouse, Instant::now());
                        force_draw = true;
                    }
                    Event::Resize(_, _) => force_draw = true,
                    _ => {}
                }
            }
        }

        tracing::info!("shell exited");
        Ok(())
    }
}

/// Wakes up in time for a pending double-click window to expire.
fn poll_timeout(shell_state: &UiShellState, now: Instant) -> Duration {
    match shell_state.selector.next_deadline() {
        Some(deadline) => deadline
            .saturating_duration_since(now)
            .clamp(MIN_POLL_INTERVAL, IDLE_POLL_INTERVAL),
        None => IDLE_POLL_INTERVAL,
    }
}

impl Drop for Ui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(DisableMouseCapture);
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}
