use crate::document::TocEntry;
use crate::progress::{ProgressIndicator, Viewport};
use ratatui::widgets::ListState;

/// Index of the table of contents page. Sorts before every chapter.
pub const TOC_INDEX: isize = -1;

/// Registry key of the table of contents page.
pub const TOC_URL: &str = "TOC";

struct WrappedText {
    wrap_width: u16,
    lines: Vec<String>,
}

/// An ordinary content page.
///
/// The scroll offset is a line index into the text wrapped at the width the
/// chapter was last laid out with.
pub struct Chapter {
    index: usize,
    url: String,
    text: String,
    offset: usize,
    width: u16,
    wrapped: Option<WrappedText>,
    viewport_height: Option<usize>,
    progress: ProgressIndicator,
}

impl Chapter {
    pub fn new(index: usize, entry: &TocEntry, text: String, chapter_count: usize) -> Self {
        Self {
            index,
            url: entry.url.clone(),
            text,
            offset: 0,
            width: 0,
            wrapped: None,
            viewport_height: None,
            progress: ProgressIndicator::new(&entry.name, index, chapter_count),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// The text wrapped to `wrap_width` columns. Rewraps only when the width
    /// differs from the previous layout.
    pub fn lines(&mut self, wrap_width: u16) -> &[String] {
        let wrap_width = wrap_width.max(1);
        let stale = self
            .wrapped
            .as_ref()
            .is_none_or(|wrapped| wrapped.wrap_width != wrap_width);
        if stale {
            let lines = textwrap::wrap(&self.text, usize::from(wrap_width))
                .into_iter()
                .map(|line| line.into_owned())
                .collect();
            self.wrapped = Some(WrappedText { wrap_width, lines });
        }
        match &self.wrapped {
            Some(wrapped) => &wrapped.lines,
            None => &[],
        }
    }

    /// Number of wrapped lines from the last layout, if laid out yet.
    pub fn line_count(&self) -> Option<usize> {
        self.wrapped.as_ref().map(|wrapped| wrapped.lines.len())
    }

    pub fn viewport_height(&self) -> Option<usize> {
        self.viewport_height
    }

    /// Records the height the chapter is being painted with and pulls the
    /// offset back so the last page of text stays filled.
    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = Some(height);
        if let Some(max) = self.max_offset() {
            if self.offset > max {
                self.offset = max;
            }
        }
    }

    pub fn max_offset(&self) -> Option<usize> {
        let total = self.line_count()?;
        let height = self.viewport_height?;
        Some(total.saturating_sub(height))
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let target = self.offset.saturating_add(lines);
        self.offset = match self.max_offset() {
            Some(max) => target.min(max.max(self.offset)),
            None => target,
        };
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_to_end(&mut self) {
        if let Some(max) = self.max_offset() {
            self.offset = max;
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            offset: self.offset,
            height: self.viewport_height?,
            total_lines: self.line_count()?,
        })
    }

    pub fn progress_label(&self) -> &str {
        self.progress.label()
    }

    /// Returns true when the position label changed.
    pub fn refresh_progress(&mut self) -> bool {
        match self.viewport() {
            Some(viewport) => self.progress.refresh(viewport),
            None => false,
        }
    }
}

/// The chapter menu.
pub struct TableOfContents {
    entries: Vec<String>,
    width: u16,
    list_state: ListState,
}

impl Default for TableOfContents {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl TableOfContents {
    pub fn new(entries: &[TocEntry]) -> Self {
        let mut list_state = ListState::default();
        if !entries.is_empty() {
            list_state.select(Some(0));
        }
        Self {
            entries: entries.iter().map(|entry| entry.name.clone()).collect(),
            width: 0,
            list_state,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn item_count(&self) -> usize {
        self.entries.len()
    }

    pub fn selected(&self) -> usize {
        self.list_state.selected().unwrap_or(0)
    }

    /// Highlights entry `idx`, clamped to the last entry.
    pub fn set_selected(&mut self, idx: usize) {
        if self.entries.is_empty() {
            self.list_state.select(None);
            return;
        }
        self.list_state.select(Some(idx.min(self.entries.len() - 1)));
    }

    pub fn list_state_mut(&mut self) -> &mut ListState {
        &mut self.list_state
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn set_width(&mut self, width: u16) {
        self.width = width;
    }
}

/// A displayable surface, borrowed from the book that owns it.
#[derive(Clone, Copy)]
pub enum Page<'a> {
    Chapter(&'a Chapter),
    TableOfContents(&'a TableOfContents),
}

impl Page<'_> {
    pub fn index(&self) -> isize {
        match self {
            Page::Chapter(chapter) => chapter.index() as isize,
            Page::TableOfContents(_) => TOC_INDEX,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Page::Chapter(chapter) => chapter.url(),
            Page::TableOfContents(_) => TOC_URL,
        }
    }

    pub fn width(&self) -> u16 {
        match self {
            Page::Chapter(chapter) => chapter.width(),
            Page::TableOfContents(toc) => toc.width(),
        }
    }
}

pub enum PageMut<'a> {
    Chapter(&'a mut Chapter),
    TableOfContents(&'a mut TableOfContents),
}

impl PageMut<'_> {
    pub fn set_width(&mut self, width: u16) {
        match self {
            PageMut::Chapter(chapter) => chapter.set_width(width),
            PageMut::TableOfContents(toc) => toc.set_width(width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(text: &str) -> Chapter {
        Chapter::new(0, &TocEntry::new("One", "one.xhtml"), text.to_string(), 1)
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count)
            .map(|i| format!("Line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_toc_sorts_before_chapters() {
        let toc = TableOfContents::default();
        let ch = chapter("text");

        assert!(Page::TableOfContents(&toc).index() < Page::Chapter(&ch).index());
        assert_eq!(Page::TableOfContents(&toc).url(), TOC_URL);
        assert_eq!(Page::Chapter(&ch).url(), "one.xhtml");
    }

    #[test]
    fn test_lines_wrap_at_requested_width() {
        let mut ch = chapter("one two three four");

        assert_eq!(ch.lines(9), ["one two", "three", "four"]);
        assert_eq!(ch.lines(80), ["one two three four"]);
        assert_eq!(ch.line_count(), Some(1));
    }

    #[test]
    fn test_viewport_clamps_offset_past_end() {
        let mut ch = chapter(&numbered_lines(20));
        ch.lines(80);
        ch.set_offset(80);

        ch.set_viewport_height(5);

        assert_eq!(ch.offset(), 15);
    }

    #[test]
    fn test_offset_is_kept_before_layout() {
        let mut ch = chapter(&numbered_lines(20));

        ch.set_offset(80);
        ch.scroll_down(3);

        assert_eq!(ch.offset(), 83);
        assert_eq!(ch.viewport(), None);
    }

    #[test]
    fn test_scroll_down_stops_at_max_offset() {
        let mut ch = chapter(&numbered_lines(20));
        ch.lines(80);
        ch.set_viewport_height(5);

        for _ in 0..25 {
            ch.scroll_down(1);
        }

        assert_eq!(ch.offset(), 15);
        ch.scroll_up(100);
        assert_eq!(ch.offset(), 0);
    }

    #[test]
    fn test_width_change_keeps_offset() {
        let mut ch = chapter(&numbered_lines(20));
        ch.set_offset(7);

        ch.set_width(60);

        assert_eq!(ch.offset(), 7);
        assert_eq!(ch.width(), 60);
    }

    #[test]
    fn test_toc_selection_clamps_to_last_entry() {
        let entries = [TocEntry::new("a", "a"), TocEntry::new("b", "b")];
        let mut toc = TableOfContents::new(&entries);

        toc.set_selected(5);

        assert_eq!(toc.selected(), 1);
    }
}
