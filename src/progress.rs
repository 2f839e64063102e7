use log::trace;
use std::collections::VecDeque;

/// What a chapter surface showed on its last repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub height: usize,
    pub total_lines: usize,
}

/// Position label under a chapter, e.g. `"Prologue" (12.50%) - lines 1-40/312`.
///
/// Recomputing the label is driven by repaints, and updating it triggers
/// another repaint. The last viewport seen is memoized so the second pass
/// short-circuits instead of feeding back into itself.
#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    prefix: String,
    label: String,
    last_seen: Option<Viewport>,
}

impl ProgressIndicator {
    pub fn new(name: &str, index: usize, chapter_count: usize) -> Self {
        let percent = if chapter_count == 0 {
            0.0
        } else {
            100.0 * index as f64 / chapter_count as f64
        };
        let prefix = format!("{name:?} ({percent:.2}%)");
        Self {
            label: prefix.clone(),
            prefix,
            last_seen: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns true when the label changed and the surface needs a redraw.
    pub fn refresh(&mut self, viewport: Viewport) -> bool {
        if self.last_seen == Some(viewport) {
            return false;
        }
        self.last_seen = Some(viewport);

        let first = if viewport.total_lines == 0 {
            0
        } else {
            viewport.offset + 1
        };
        let last = (viewport.offset + viewport.height).min(viewport.total_lines);
        let label = format!(
            "{} - lines {}-{}/{}",
            self.prefix, first, last, viewport.total_lines
        );
        trace!("progress label: {label}");
        if label == self.label {
            return false;
        }
        self.label = label;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Update {
    /// Recompute the position label of a chapter after it was painted.
    Progress { chapter: usize },
}

/// Single-consumer queue of work deferred from the render pass. Only the
/// event loop drains it, between draws, so nothing here runs re-entrantly.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    pending: VecDeque<Update>,
}

impl UpdateQueue {
    pub fn defer(&mut self, update: Update) {
        if !self.pending.contains(&update) {
            self.pending.push_back(update);
        }
    }

    pub fn pop(&mut self) -> Option<Update> {
        self.pending.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(offset: usize) -> Viewport {
        Viewport {
            offset,
            height: 20,
            total_lines: 100,
        }
    }

    #[test]
    fn test_prefix_quotes_name_and_percentage() {
        let progress = ProgressIndicator::new("Prologue", 1, 8);

        assert_eq!(progress.label(), "\"Prologue\" (12.50%)");
    }

    #[test]
    fn test_refresh_formats_line_range() {
        let mut progress = ProgressIndicator::new("One", 0, 2);

        assert!(progress.refresh(viewport(10)));
        assert_eq!(progress.label(), "\"One\" (0.00%) - lines 11-30/100");
    }

    #[test]
    fn test_refresh_clamps_to_last_line() {
        let mut progress = ProgressIndicator::new("One", 0, 2);

        progress.refresh(viewport(90));

        assert_eq!(progress.label(), "\"One\" (0.00%) - lines 91-100/100");
    }

    #[test]
    fn test_same_viewport_short_circuits() {
        let mut progress = ProgressIndicator::new("One", 0, 2);

        assert!(progress.refresh(viewport(5)));
        assert!(!progress.refresh(viewport(5)));
        assert!(progress.refresh(viewport(6)));
    }

    #[test]
    fn test_queue_coalesces_duplicates() {
        let mut queue = UpdateQueue::default();

        queue.defer(Update::Progress { chapter: 1 });
        queue.defer(Update::Progress { chapter: 1 });
        queue.defer(Update::Progress { chapter: 2 });

        assert_eq!(queue.pop(), Some(Update::Progress { chapter: 1 }));
        assert_eq!(queue.pop(), Some(Update::Progress { chapter: 2 }));
        assert!(queue.is_empty());
    }
}
