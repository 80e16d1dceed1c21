//! Multi-select chapter selection over an ordered chapter list.
//!
//! Gestures:
//! - double-click (same chapter twice within the window): select every chapter up to it
//! - shift-click with an anchor: add the inclusive index range between anchor and target
//! - ctrl/cmd-click: toggle the target
//! - plain click: select only the target
//!
//! The model never prunes ids on its own. Whoever supplies a new chapter
//! list must call [`SelectionModel::clear`] first.

use brief_api::{Chapter, ChapterRef};
use log::debug;
use std::collections::HashSet;

/// Two clicks on the same chapter closer than this count as a double-click.
pub const DOUBLE_CLICK_WINDOW_MS: i64 = 300;

/// Keyboard modifiers held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub shift: bool,
    pub ctrl_or_meta: bool,
}

impl ClickModifiers {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn shift() -> Self {
        Self {
            shift: true,
            ctrl_or_meta: false,
        }
    }

    pub fn ctrl() -> Self {
        Self {
            shift: false,
            ctrl_or_meta: true,
        }
    }
}

/// Snapshot of the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: HashSet<String>,
    /// Anchor for range selection; `None` until a click establishes one
    pub last_selected_index: Option<usize>,
    pub last_clicked_id: Option<String>,
    pub last_click_time_ms: i64,
}

#[derive(Debug, Clone)]
pub struct SelectionModel {
    state: SelectionState,
    double_click_window_ms: i64,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::with_double_click_window(DOUBLE_CLICK_WINDOW_MS)
    }

    pub fn with_double_click_window(window_ms: i64) -> Self {
        Self {
            state: SelectionState::default(),
            double_click_window_ms: window_ms,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.state.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.state.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.selected.is_empty()
    }

    /// Apply one click on `target` and return the new selection.
    pub fn click(
        &mut self,
        chapters: &[Chapter],
        target: &Chapter,
        modifiers: ClickModifiers,
        now_ms: i64,
    ) -> &SelectionState {
        let is_double_click = now_ms - self.state.last_click_time_ms < self.double_click_window_ms
            && self.state.last_clicked_id.as_deref() == Some(target.id.as_str());

        if is_double_click {
            debug!("double-click on {}: selecting 0..={}", target.id, target.index);
            self.state.selected.clear();
            self.add_index_range(chapters, 0, target.index);
        } else if let (true, Some(anchor)) = (modifiers.shift, self.state.last_selected_index) {
            debug!("range select {}..={}", anchor, target.index);
            self.add_index_range(
                chapters,
                anchor.min(target.index),
                anchor.max(target.index),
            );
        } else if modifiers.ctrl_or_meta {
            if !self.state.selected.remove(&target.id) {
                self.state.selected.insert(target.id.clone());
            }
        } else {
            self.state.selected.clear();
            self.state.selected.insert(target.id.clone());
        }

        self.state.last_selected_index = Some(target.index);
        self.state.last_click_time_ms = now_ms;
        self.state.last_clicked_id = Some(target.id.clone());

        &self.state
    }

    /// Drop the selection and the range anchor. The last click is kept, so
    /// a quick click on the same chapter still registers as a double-click.
    pub fn clear(&mut self) {
        self.state.selected.clear();
        self.state.last_selected_index = None;
    }

    /// Selected chapters in document order (by `number`), whatever the click order.
    pub fn selected_ordered(&self, chapters: &[Chapter]) -> Vec<Chapter> {
        let mut selected: Vec<Chapter> = chapters
            .iter()
            .filter(|c| self.state.selected.contains(&c.id))
            .cloned()
            .collect();
        selected.sort_by_key(|c| c.number);
        selected
    }

    /// Same as [`selected_ordered`](Self::selected_ordered), as request snapshots.
    pub fn selected_refs(&self, chapters: &[Chapter]) -> Vec<ChapterRef> {
        self.selected_ordered(chapters)
            .iter()
            .map(ChapterRef::from)
            .collect()
    }

    fn add_index_range(&mut self, chapters: &[Chapter], start: usize, end: usize) {
        for chapter in chapters
            .iter()
            .filter(|c| c.index >= start && c.index <= end)
        {
            self.state.selected.insert(chapter.id.clone());
        }
    }
}
