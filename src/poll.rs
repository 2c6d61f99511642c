// Per-widget polling workers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::{Config, Widget};
use crate::dataset::Dataset;
use crate::flux::{QueryRequest, QueryService};
use crate::state::DashboardState;
use crate::template::{TemplateError, TemplateParams};
use crate::ui::UiEvent;

/// Handle over the whole group of per-widget workers, so teardown can
/// stop and join them together.
pub struct Poller {
    stop_txs: Vec<Sender<()>>,
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

/// Start one repeating worker per widget. Ticks for different widgets
/// are fully independent; workers never touch drawing state and only
/// publish [`UiEvent::DataChanged`] notifications.
pub fn spawn_pollers(
    config: &Config,
    service: Arc<dyn QueryService>,
    state: Arc<DashboardState>,
    events: Sender<UiEvent>,
    interval: Duration,
) -> Poller {
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut stop_txs = Vec::new();
    let mut handles = Vec::new();

    for widget in config.widgets() {
        let widget = widget.clone();
        let service = Arc::clone(&service);
        let state = Arc::clone(&state);
        let events = events.clone();
        let shutdown = Arc::clone(&shutdown);
        let (stop_tx, stop_rx) = mpsc::channel();

        stop_txs.push(stop_tx);
        handles.push(thread::spawn(move || {
            run_widget_timer(widget, service, state, events, shutdown, stop_rx, interval);
        }));
    }

    Poller {
        stop_txs,
        handles,
        shutdown,
    }
}

impl Poller {
    /// Stop every worker and wait for the group to exit. A worker that
    /// is mid-query cancels its cursor and exits without committing.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        drop(self.stop_txs);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

/// One widget's timer loop. The update runs inline on this thread, so a
/// widget never has two cycles in flight: a tick that would fire while
/// an update is still running is skipped, and the next wait starts when
/// the update ends.
fn run_widget_timer(
    widget: Widget,
    service: Arc<dyn QueryService>,
    state: Arc<DashboardState>,
    events: Sender<UiEvent>,
    shutdown: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
    interval: Duration,
) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
        run_cycle(&widget, service.as_ref(), &state, &events, &shutdown);
    }
}

/// One full update cycle for one widget: render the query, execute it,
/// extract datasets, and commit them as a complete replacement. Any
/// failure is logged and leaves the widget's previously stored datasets
/// untouched; the next tick retries from scratch.
pub fn run_cycle(
    widget: &Widget,
    service: &dyn QueryService,
    state: &DashboardState,
    events: &Sender<UiEvent>,
    shutdown: &AtomicBool,
) {
    let query = match query_text(widget) {
        Ok(query) => query,
        Err(err) => {
            tracing::warn!(widget = %widget.title, error = %err, "template render failed");
            return;
        }
    };

    let mut cursor = match service.query(&QueryRequest::new(query)) {
        Ok(cursor) => cursor,
        Err(err) => {
            tracing::warn!(widget = %widget.title, error = %err, "query failed");
            return;
        }
    };

    let mut datasets = Vec::new();
    while let Some(result) = cursor.next() {
        if shutdown.load(Ordering::Relaxed) {
            cursor.cancel();
            continue;
        }
        for table in &result.tables {
            datasets.push(Dataset::from_table(table, &widget.column));
        }
    }

    if let Err(err) = cursor.finish() {
        tracing::warn!(widget = %widget.title, error = %err, "query failed");
        return;
    }

    tracing::debug!(widget = %widget.title, datasets = datasets.len(), "datasets updated");
    state.replace(widget.id, datasets);
    let _ = events.send(UiEvent::DataChanged(widget.id));
}

/// The literal query text for one cycle: the compiled template rendered
/// with the fixed sliding-window record, or the widget's literal query.
pub fn query_text(widget: &Widget) -> Result<String, TemplateError> {
    match &widget.template {
        Some(template) => template.render(&TemplateParams::sliding_window()),
        None => Ok(widget.query.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::QueryTemplate;

    #[test]
    fn literal_query_is_passed_through() {
        let widget = Widget {
            query: "from(bucket: \"b\")".to_string(),
            ..Widget::default()
        };
        assert_eq!(query_text(&widget).unwrap(), "from(bucket: \"b\")");
    }

    #[test]
    fn template_renders_with_the_fixed_record() {
        let widget = Widget {
            query: "@cpu.flux".to_string(),
            template: Some(
                QueryTemplate::compile("range(start: {{range_start}}, stop: {{range_stop}})")
                    .unwrap(),
            ),
            ..Widget::default()
        };
        assert_eq!(
            query_text(&widget).unwrap(),
            "range(start: -40s, stop: -10s)"
        );
    }

    #[test]
    fn template_render_failure_surfaces() {
        let widget = Widget {
            query: "@cpu.flux".to_string(),
            template: Some(QueryTemplate::compile("{{not_a_param}}").unwrap()),
            ..Widget::default()
        };
        assert!(query_text(&widget).is_err());
    }
}
