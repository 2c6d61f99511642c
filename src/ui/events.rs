// Event handling and main UI loop

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::collections::HashMap;
use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{Config, WidgetId};
use crate::state::DashboardState;
use crate::ui::chart::SparklineGroup;
use crate::ui::dashboard::Dashboard;

/// Events drained by the UI loop, which owns all drawing state. Poll
/// workers only ever send `DataChanged`; they never draw.
pub enum UiEvent {
    /// Keyboard, resize, or other terminal events
    Input(Event),
    /// Periodic repaint trigger
    Tick,
    /// A widget's datasets were replaced
    DataChanged(WidgetId),
}

/// Spawn a dedicated thread for input polling and periodic ticks.
pub fn spawn_event_thread(tx: Sender<UiEvent>) {
    let tick_rate = Duration::from_millis(250);

    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            // Wait for input at most until the next tick is due
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::from_secs(0));

            if event::poll(timeout).unwrap_or(false) {
                if let Ok(evt) = event::read() {
                    if tx.send(UiEvent::Input(evt)).is_err() {
                        break; // UI loop dropped the receiver
                    }
                }
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(UiEvent::Tick).is_err() {
                    break;
                }
                last_tick = Instant::now();
            }
        }
    });
}

/// Set up the terminal, run the UI loop until quit, and restore the
/// terminal whatever the loop returned.
pub fn run_ui(
    config: &Config,
    state: &DashboardState,
    event_rx: Receiver<UiEvent>,
) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, config, state, event_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    state: &DashboardState,
    event_rx: Receiver<UiEvent>,
) -> io::Result<()> {
    let mut charts: HashMap<WidgetId, SparklineGroup> = config
        .widgets()
        .map(|widget| (widget.id, SparklineGroup::new()))
        .collect();

    loop {
        let mut pending_inputs: Vec<Event> = Vec::new();
        let mut changed: Vec<WidgetId> = Vec::new();

        // Always block for at least one event, then drain the queue so
        // a burst of ticks coalesces into one redraw
        match event_rx.recv() {
            Ok(evt) => match evt {
                UiEvent::Input(ev) => pending_inputs.push(ev),
                UiEvent::Tick => {}
                UiEvent::DataChanged(id) => changed.push(id),
            },
            Err(_) => {
                // Channel closed, exit
                return Ok(());
            }
        }

        while let Ok(evt) = event_rx.try_recv() {
            match evt {
                UiEvent::Input(ev) => pending_inputs.push(ev),
                UiEvent::Tick => {}
                UiEvent::DataChanged(id) => changed.push(id),
            }
        }

        // Input first so a quit is never stuck behind a tick backlog
        for input in pending_inputs {
            if let Event::Key(key) = input {
                if should_quit(&key) {
                    return Ok(());
                }
            }
            // Resize and the rest fall through to the redraw below
        }

        for id in changed {
            reconcile_widget(config, state, &mut charts, id);
        }

        terminal.draw(|frame| Dashboard::render(frame, config, &charts))?;
    }
}

/// Pull the widget's current datasets out of shared state and fold them
/// into its chart. Widgets that have never completed a cycle keep their
/// previous (initially empty) lines.
fn reconcile_widget(
    config: &Config,
    state: &DashboardState,
    charts: &mut HashMap<WidgetId, SparklineGroup>,
    id: WidgetId,
) {
    let Some(widget) = config.widgets().find(|w| w.id == id) else {
        return;
    };
    let Some(datasets) = state.get(id) else {
        return;
    };
    if let Some(chart) = charts.get_mut(&id) {
        chart.reconcile(widget, &datasets);
    }
}

fn should_quit(key: &KeyEvent) -> bool {
    // Quit on 'q' or Ctrl+C
    matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quits_on_q_and_ctrl_c() {
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        let upper_q = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);

        assert!(should_quit(&q));
        assert!(should_quit(&upper_q));
        assert!(should_quit(&ctrl_c));
        assert!(!should_quit(&plain_c));
    }
}
