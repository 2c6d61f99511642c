// Shared dataset state

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::WidgetId;
use crate::dataset::Dataset;

/// The one object mutated from multiple poll workers: the current
/// dataset list per widget, behind a single lock. A cycle either
/// replaces a widget's whole list or leaves it untouched, so readers
/// never observe a partially written list. Constructed once at startup
/// and shared by `Arc`; there is no ambient global.
#[derive(Debug, Default)]
pub struct DashboardState {
    datasets: Mutex<HashMap<WidgetId, Vec<Dataset>>>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The widget's current dataset list, or `None` if no cycle has
    /// completed for it yet.
    pub fn get(&self, id: WidgetId) -> Option<Vec<Dataset>> {
        self.datasets.lock().unwrap().get(&id).cloned()
    }

    /// Substitute the widget's whole dataset list under the lock. No
    /// merging with the previous list ever happens.
    pub fn replace(&self, id: WidgetId, datasets: Vec<Dataset>) {
        self.datasets.lock().unwrap().insert(id, datasets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn dataset(title: &str, values: Vec<i64>) -> Dataset {
        Dataset {
            title: title.to_string(),
            values,
        }
    }

    #[test]
    fn get_returns_none_before_first_replace() {
        let state = DashboardState::new();
        assert!(state.get(WidgetId::new()).is_none());
    }

    #[test]
    fn replace_substitutes_the_whole_list() {
        let state = DashboardState::new();
        let id = WidgetId::new();

        state.replace(
            id,
            vec![dataset("a\n", vec![1]), dataset("b\n", vec![2])],
        );
        state.replace(id, vec![dataset("c\n", vec![3])]);

        let current = state.get(id).unwrap();
        assert_eq!(current, vec![dataset("c\n", vec![3])]);
    }

    #[test]
    fn widgets_do_not_share_lists() {
        let state = DashboardState::new();
        let (a, b) = (WidgetId::new(), WidgetId::new());

        state.replace(a, vec![dataset("a\n", vec![1])]);
        assert!(state.get(b).is_none());
        assert_eq!(state.get(a).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_replaces_never_expose_a_spliced_list() {
        let state = Arc::new(DashboardState::new());
        let id = WidgetId::new();

        // Writers each publish a complete list whose datasets all carry
        // the writer's marker; any mix of markers in a read means a
        // torn write leaked out.
        let writers: Vec<_> = (0..4)
            .map(|marker: i64| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let list = (0..8)
                            .map(|_| dataset(&format!("{marker}\n"), vec![marker]))
                            .collect();
                        state.replace(id, list);
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..400 {
                        if let Some(list) = state.get(id) {
                            let first = list[0].title.clone();
                            assert!(list.iter().all(|d| d.title == first));
                            assert_eq!(list.len(), 8);
                        }
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }
    }
}
