use std::collections::HashMap;
use std::time::{Duration, Instant};

use binexplorer_core::FunctionId;

use crate::click::{ClickDisambiguator, Gesture};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub id: FunctionId,
    pub name: String,
    pub focused: bool,
    pub pinned: bool,
}

/// Matched part of a name, in chars: `start..start + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleEntry<'a> {
    pub entry: &'a FunctionEntry,
    pub highlight: Option<HighlightSpan>,
}

/// Receives resolved activations. The selector gives neither one a meaning.
pub trait FunctionActivationHandler {
    fn on_single(&mut self, id: &FunctionId, name: &str);
    fn on_double(&mut self, id: &FunctionId, name: &str);
}

#[derive(Debug)]
pub struct FunctionSelector {
    entries: Vec<FunctionEntry>,
    positions: HashMap<FunctionId, usize>,
    filter: String,
    cursor: usize,
    clicks: ClickDisambiguator<FunctionId>,
}

impl FunctionSelector {
    pub fn new(dbl_click_wait_time: Duration) -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
            filter: String::new(),
            cursor: 0,
            clicks: ClickDisambiguator::new(dbl_click_wait_time),
        }
    }

    /// Adds an entry, or renames it in place when the id is already listed.
    /// Returns whether a new entry was created.
    pub fn add_entry(&mut self, id: FunctionId, name: impl Into<String>) -> bool {
        let name = name.into();
        if let Some(position) = self.positions.get(&id) {
            self.entries[*position].name = name;
            return false;
        }

        self.positions.insert(id.clone(), self.entries.len());
        self.entries.push(FunctionEntry {
            id,
            name,
            focused: false,
            pinned: false,
        });
        true
    }

    pub fn entries(&self) -> &[FunctionEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &FunctionId) -> Option<&FunctionEntry> {
        self.positions
            .get(id)
            .and_then(|position| self.entries.get(*position))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn focused(&self) -> Option<&FunctionEntry> {
        self.entries.iter().find(|entry| entry.focused)
    }

    /// Clears every focus flag, then focuses `id` if it is listed.
    pub fn focus(&mut self, id: &FunctionId) -> bool {
        for entry in &mut self.entries {
            entry.focused = false;
        }
        match self.positions.get(id) {
            Some(position) => {
                self.entries[*position].focused = true;
                true
            }
            None => false,
        }
    }

    pub fn focus_by_name(&mut self, name: &str) -> bool {
        let id = self
            .entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id.clone())
            .unwrap_or_else(|| FunctionId::new(name));
        self.focus(&id)
    }

    pub fn pin(&mut self, id: &FunctionId) {
        self.set_pinned(id, true);
    }

    pub fn unpin(&mut self, id: &FunctionId) {
        self.set_pinned(id, false);
    }

    pub fn toggle_pin(&mut self, id: &FunctionId) -> Option<bool> {
        let position = *self.positions.get(id)?;
        let entry = &mut self.entries[position];
        entry.pinned = !entry.pinned;
        Some(entry.pinned)
    }

    fn set_pinned(&mut self, id: &FunctionId, pinned: bool) {
        if let Some(position) = self.positions.get(id) {
            self.entries[*position].pinned = pinned;
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, query: impl Into<String>) {
        self.filter = query.into();
        self.clamp_cursor();
    }

    /// Entries whose lowercase name contains the lowercase filter, in list order.
    pub fn visible_entries(&self) -> Vec<VisibleEntry<'_>> {
        let query = self.filter.to_lowercase();
        self.entries
            .iter()
            .filter_map(|entry| {
                if query.is_empty() {
                    return Some(VisibleEntry {
                        entry,
                        highlight: None,
                    });
                }
                if !entry.name.to_lowercase().contains(query.as_str()) {
                    return None;
                }
                Some(VisibleEntry {
                    entry,
                    highlight: highlight_span(&entry.name, &query),
                })
            })
            .collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let visible = self.visible_entries().len();
        if visible == 0 {
            self.cursor = 0;
            return;
        }
        let max = visible - 1;
        self.cursor = if delta.is_negative() {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta.unsigned_abs()).min(max)
        };
    }

    pub fn select_visible(&mut self, index: usize) -> bool {
        if index < self.visible_entries().len() {
            self.cursor = index;
            return true;
        }
        false
    }

    pub fn cursor_entry(&self) -> Option<&FunctionEntry> {
        self.visible_entries()
            .get(self.cursor)
            .map(|visible| visible.entry)
    }

    fn clamp_cursor(&mut self) {
        let visible = self.visible_entries().len();
        self.cursor = self.cursor.min(visible.saturating_sub(1));
    }

    /// Feeds one raw activation of `id` through the click disambiguator.
    pub fn activate(
        &mut self,
        id: &FunctionId,
        now: Instant,
        handler: &mut dyn FunctionActivationHandler,
    ) -> bool {
        if !self.positions.contains_key(id) {
            return false;
        }
        let gestures = self.clicks.observe(id.clone(), now);
        self.dispatch(gestures, handler)
    }

    pub fn activate_cursor(
        &mut self,
        now: Instant,
        handler: &mut dyn FunctionActivationHandler,
    ) -> bool {
        let Some(id) = self.cursor_entry().map(|entry| entry.id.clone()) else {
            return false;
        };
        self.activate(&id, now, handler)
    }

    /// Resolves single activations whose window elapsed.
    pub fn tick(&mut self, now: Instant, handler: &mut dyn FunctionActivationHandler) -> bool {
        let gestures = self.clicks.poll_expired(now);
        self.dispatch(gestures, handler)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clicks.next_deadline()
    }

    fn dispatch(
        &self,
        gestures: Vec<Gesture<FunctionId>>,
        handler: &mut dyn FunctionActivationHandler,
    ) -> bool {
        let mut dispatched = false;
        for gesture in gestures {
            let (id, double) = match gesture {
                Gesture::Single(id) => (id, false),
                Gesture::Double(id) => (id, true),
            };
            let Some(entry) = self.entry(&id) else {
                continue;
            };
            if double {
                handler.on_double(&entry.id, &entry.name);
            } else {
                handler.on_single(&entry.id, &entry.name);
            }
            dispatched = true;
        }
        dispatched
    }
}

/// First run of chars in `name` whose lowercase form equals `query`, measured
/// in chars of `name` itself so case folding that changes length stays aligned.
fn highlight_span(name: &str, query: &str) -> Option<HighlightSpan> {
    let chars = name.chars().collect::<Vec<_>>();
    for start in 0..chars.len() {
        let mut folded = String::new();
        for (offset, ch) in chars[start..].iter().enumerate() {
            folded.extend(ch.to_lowercase());
            if folded.len() >= query.len() {
                if folded == query {
                    return Some(HighlightSpan {
                        start,
                        len: offset + 1,
                    });
                }
                break;
            }
        }
    }
    None
}

/// Splits `name` around `span` into `(before, matched, after)`, clamped to the name.
pub fn split_highlight(name: &str, span: HighlightSpan) -> (String, String, String) {
    let chars = name.chars().collect::<Vec<_>>();
    let start = span.start.min(chars.len());
    let end = span.start.saturating_add(span.len).min(chars.len());
    (
        chars[..start].iter().collect(),
        chars[start..end].iter().collect(),
        chars[end..].iter().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(250);

    #[derive(Default)]
    struct RecordingHandler {
        calls: Vec<String>,
    }

    impl FunctionActivationHandler for RecordingHandler {
        fn on_single(&mut self, id: &FunctionId, name: &str) {
            self.calls.push(format!("single:{id}:{name}"));
        }

        fn on_double(&mut self, id: &FunctionId, name: &str) {
            self.calls.push(format!("double:{id}:{name}"));
        }
    }

    fn selector_with(names: &[&str]) -> FunctionSelector {
        let mut selector = FunctionSelector::new(WINDOW);
        for name in names {
            selector.add_entry(FunctionId::new(*name), *name);
        }
        selector
    }

    fn focused_count(selector: &FunctionSelector) -> usize {
        selector
            .entries()
            .iter()
            .filter(|entry| entry.focused)
            .count()
    }

    #[test]
    fn focus_keeps_at_most_one_entry_focused() {
        let mut selector = selector_with(&["main", "init", "helper"]);

        assert!(selector.focus(&FunctionId::new("main")));
        assert!(selector.focus(&FunctionId::new("helper")));
        assert_eq!(focused_count(&selector), 1);
        assert_eq!(
            selector.focused().map(|entry| entry.name.as_str()),
            Some("helper")
        );

        assert!(!selector.focus(&FunctionId::new("missing")));
        assert_eq!(focused_count(&selector), 0);

        assert!(selector.focus_by_name("init"));
        assert_eq!(focused_count(&selector), 1);
    }

    #[test]
    fn add_entry_on_existing_id_renames_in_place() {
        let mut selector = selector_with(&["a", "b"]);
        selector.focus(&FunctionId::new("a"));
        selector.pin(&FunctionId::new("a"));

        assert!(!selector.add_entry(FunctionId::new("a"), "a_renamed"));

        assert_eq!(selector.len(), 2);
        let entry = &selector.entries()[0];
        assert_eq!(entry.name, "a_renamed");
        assert!(entry.focused);
        assert!(entry.pinned);
    }

    #[test]
    fn pin_and_unpin_ignore_unknown_ids() {
        let mut selector = selector_with(&["main"]);
        let main = FunctionId::new("main");

        selector.pin(&main);
        selector.pin(&FunctionId::new("missing"));
        assert!(selector.entry(&main).is_some_and(|entry| entry.pinned));

        selector.unpin(&main);
        selector.unpin(&FunctionId::new("missing"));
        assert!(selector.entries().iter().all(|entry| !entry.pinned));
        assert_eq!(selector.toggle_pin(&main), Some(true));
        assert_eq!(selector.toggle_pin(&FunctionId::new("missing")), None);
    }

    #[test]
    fn filter_is_case_insensitive_and_highlights_first_match() {
        let mut selector = selector_with(&["ParseHeader", "main", "parse_args"]);
        selector.set_filter("PARSE");

        let visible = selector.visible_entries();
        let names = visible
            .iter()
            .map(|visible| visible.entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["ParseHeader", "parse_args"]);
        assert_eq!(
            visible[0].highlight,
            Some(HighlightSpan { start: 0, len: 5 })
        );

        selector.set_filter("head");
        assert_eq!(
            selector.visible_entries()[0].highlight,
            Some(HighlightSpan { start: 5, len: 4 })
        );
        assert_eq!(
            split_highlight("ParseHeader", HighlightSpan { start: 5, len: 4 }),
            ("Parse".to_owned(), "Head".to_owned(), "er".to_owned())
        );
    }

    #[test]
    fn highlight_tracks_original_chars_when_lowercasing_changes_length() {
        let mut selector = FunctionSelector::new(WINDOW);
        selector.add_entry(FunctionId::new("f"), "\u{130}sX");
        selector.set_filter("x");

        let visible = selector.visible_entries();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].highlight, Some(HighlightSpan { start: 2, len: 1 }));
        assert_eq!(
            split_highlight("\u{130}sX", HighlightSpan { start: 2, len: 1 }),
            ("\u{130}s".to_owned(), "X".to_owned(), String::new())
        );
    }

    #[test]
    fn empty_filter_shows_everything_without_highlight() {
        let mut selector = selector_with(&["a", "b"]);
        selector.set_filter("zzz");
        assert!(selector.visible_entries().is_empty());

        selector.set_filter("");
        let visible = selector.visible_entries();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|visible| visible.highlight.is_none()));
    }

    #[test]
    fn cursor_moves_within_visible_entries() {
        let mut selector = selector_with(&["alpha", "beta", "gamma"]);
        selector.move_cursor(5);
        assert_eq!(selector.cursor_entry().map(|e| e.name.as_str()), Some("gamma"));

        selector.set_filter("a");
        selector.move_cursor(-1);
        assert_eq!(selector.cursor_entry().map(|e| e.name.as_str()), Some("beta"));

        selector.set_filter("gam");
        assert_eq!(selector.cursor(), 0);
        assert!(!selector.select_visible(3));
    }

    #[test]
    fn activations_route_through_handler_once_per_gesture() {
        let start = Instant::now();
        let mut selector = selector_with(&["main", "init"]);
        let mut handler = RecordingHandler::default();
        let main = FunctionId::new("main");

        selector.activate(&main, start, &mut handler);
        selector.activate(&main, start + Duration::from_millis(100), &mut handler);
        selector.activate(&FunctionId::new("init"), start, &mut handler);
        selector.tick(start + Duration::from_secs(1), &mut handler);

        assert_eq!(
            handler.calls,
            vec!["double:main:main".to_owned(), "single:init:init".to_owned()]
        );
        assert!(!selector.activate(&FunctionId::new("missing"), start, &mut handler));
    }
}
