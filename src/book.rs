use crate::document::{DocumentError, DocumentSource};
use crate::keymap::Action;
use crate::page::{Chapter, Page, PageMut, TOC_INDEX, TOC_URL, TableOfContents};
use crate::session::SessionState;
use crate::settings::Settings;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use log::{debug, info, warn};
use std::collections::HashMap;
use thiserror::Error;

/// Narrowest text column `-` will shrink to.
pub const MIN_WIDTH: u16 = 10;

#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("page {0:?} not found")]
    PageNotFound(String),

    #[error("page {0:?} was added twice")]
    DuplicateUrl(String),

    #[error("chapter {got} added out of order, expected {expected}")]
    OutOfOrder { expected: usize, got: usize },
}

/// A saved (chapter, offset) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub chapter: usize,
    pub line: usize,
}

/// Navigation state of one open book.
///
/// Pages are addressed by index: `TOC_INDEX` for the table of contents and
/// `0..chapters.len()` for chapters. Pages are only ever appended.
pub struct Book {
    title: String,
    toc: TableOfContents,
    chapters: Vec<Chapter>,
    registry: HashMap<String, isize>,
    current: isize,
    visible: isize,
    mark: Option<Mark>,
    menu_context: isize,
    width: u16,
    default_width: u16,
    width_step: u16,
    scroll_stride: usize,
}

impl Book {
    pub fn new(title: impl Into<String>, settings: &Settings) -> Self {
        let mut registry = HashMap::new();
        registry.insert(TOC_URL.to_string(), TOC_INDEX);
        let width = settings.default_width.max(MIN_WIDTH);
        let mut toc = TableOfContents::default();
        toc.set_width(width);
        Self {
            title: title.into(),
            toc,
            chapters: Vec::new(),
            registry,
            current: TOC_INDEX,
            visible: TOC_INDEX,
            mark: None,
            menu_context: TOC_INDEX,
            width,
            default_width: width,
            width_step: settings.width_step,
            scroll_stride: settings.scroll_stride,
        }
    }

    /// Builds the book from a document: the table of contents first, then
    /// one chapter per entry in order. Offsets from `session` are applied as
    /// each chapter is created so the first paint already uses them.
    pub fn from_document<D: DocumentSource + ?Sized>(
        doc: &mut D,
        title: impl Into<String>,
        settings: &Settings,
        session: Option<&SessionState>,
    ) -> Result<Self, BookError> {
        let mut book = Self::new(title, settings);
        let entries = doc.table_of_contents()?;
        info!("Building {} chapters for {:?}", entries.len(), book.title);

        book.set_toc(TableOfContents::new(&entries));
        for (index, entry) in entries.iter().enumerate() {
            let text = doc.chapter_content(&entry.url)?;
            let mut chapter = Chapter::new(index, entry, text, entries.len());
            if let Some(state) = session {
                let offset = state.offset(index);
                if offset > 0 {
                    chapter.set_offset(offset);
                }
            }
            book.add_chapter(chapter)?;
        }
        book.set_width(book.width);

        match session {
            Some(state) => book.restore(state),
            None => book.start(),
        }
        Ok(book)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter_mut(&mut self, index: usize) -> Option<&mut Chapter> {
        self.chapters.get_mut(index)
    }

    pub fn current(&self) -> isize {
        self.current
    }

    pub fn menu_context(&self) -> isize {
        self.menu_context
    }

    pub fn mark(&self) -> Option<Mark> {
        self.mark
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn is_on_toc(&self) -> bool {
        self.current == TOC_INDEX
    }

    pub fn set_toc(&mut self, toc: TableOfContents) {
        self.toc = toc;
        self.toc.set_width(self.width);
    }

    pub fn add_chapter(&mut self, mut chapter: Chapter) -> Result<(), BookError> {
        if chapter.index() != self.chapters.len() {
            return Err(BookError::OutOfOrder {
                expected: self.chapters.len(),
                got: chapter.index(),
            });
        }
        if self.registry.contains_key(chapter.url()) {
            return Err(BookError::DuplicateUrl(chapter.url().to_string()));
        }
        chapter.set_width(self.width);
        self.registry
            .insert(chapter.url().to_string(), chapter.index() as isize);
        self.chapters.push(chapter);
        Ok(())
    }

    pub fn page(&self, url: &str) -> Result<Page<'_>, BookError> {
        let index = *self
            .registry
            .get(url)
            .ok_or_else(|| BookError::PageNotFound(url.to_string()))?;
        self.page_at(index)
            .ok_or_else(|| BookError::PageNotFound(url.to_string()))
    }

    fn page_at(&self, index: isize) -> Option<Page<'_>> {
        if index == TOC_INDEX {
            return Some(Page::TableOfContents(&self.toc));
        }
        let index = usize::try_from(index).ok()?;
        self.chapters.get(index).map(Page::Chapter)
    }

    fn index_to_url(&self, index: isize) -> Option<&str> {
        self.page_at(index).map(|page| match page {
            Page::Chapter(chapter) => chapter.url(),
            Page::TableOfContents(_) => TOC_URL,
        })
    }

    /// The surface currently on screen.
    pub fn visible_page(&self) -> Page<'_> {
        self.page_at(self.visible)
            .unwrap_or(Page::TableOfContents(&self.toc))
    }

    pub fn visible_page_mut(&mut self) -> PageMut<'_> {
        match usize::try_from(self.visible) {
            Ok(index) if index < self.chapters.len() => PageMut::Chapter(&mut self.chapters[index]),
            _ => PageMut::TableOfContents(&mut self.toc),
        }
    }

    /// Every page, the table of contents first.
    fn pages_mut(&mut self) -> impl Iterator<Item = PageMut<'_>> {
        std::iter::once(PageMut::TableOfContents(&mut self.toc))
            .chain(self.chapters.iter_mut().map(PageMut::Chapter))
    }

    fn current_chapter_mut(&mut self) -> Option<&mut Chapter> {
        let index = usize::try_from(self.current).ok()?;
        self.chapters.get_mut(index)
    }

    /// The only way the visible surface changes.
    pub fn go_to_page(&mut self, index: isize) {
        let Some(url) = self.index_to_url(index).map(str::to_string) else {
            warn!("Ignoring navigation to missing page {index}");
            return;
        };
        self.current = index;
        if index != TOC_INDEX {
            self.toc.set_selected(index as usize);
        }
        match self.registry.get(&url) {
            Some(&page) => self.visible = page,
            None => warn!("Page {url:?} is not registered"),
        }
        debug!("Now showing page {index} ({url})");
    }

    /// Shows the first chapter, or the menu for a book without chapters.
    pub fn start(&mut self) {
        if self.chapters.is_empty() {
            self.go_to_page(TOC_INDEX);
            return;
        }
        self.menu_context = 0;
        self.go_to_page(0);
    }

    pub fn next_chapter(&mut self) {
        if self.current + 1 >= self.chapters.len() as isize {
            return;
        }
        self.go_to_page(self.current + 1);
    }

    pub fn previous_chapter(&mut self) {
        if self.current - 1 < TOC_INDEX {
            return;
        }
        self.go_to_page(self.current - 1);
    }

    pub fn toggle_menu(&mut self) {
        if self.is_on_toc() {
            self.go_to_page(self.menu_context);
            return;
        }
        self.menu_context = self.current;
        self.go_to_page(TOC_INDEX);
    }

    pub fn menu_down(&mut self) {
        if !self.is_on_toc() {
            return;
        }
        let selected = self.toc.selected();
        if selected + 1 >= self.toc.item_count() {
            return;
        }
        self.toc.set_selected(selected + 1);
    }

    pub fn menu_up(&mut self) {
        if !self.is_on_toc() {
            return;
        }
        let selected = self.toc.selected();
        if selected == 0 {
            return;
        }
        self.toc.set_selected(selected - 1);
    }

    /// Opens the chapter highlighted in the menu.
    pub fn select_menu_entry(&mut self) {
        if !self.is_on_toc() || self.toc.item_count() == 0 {
            return;
        }
        self.go_to_page(self.toc.selected() as isize);
    }

    pub fn set_mark(&mut self) {
        let Some(chapter) = self.current_chapter_mut() else {
            return;
        };
        let mark = Mark {
            chapter: chapter.index(),
            line: chapter.offset(),
        };
        debug!("Mark set at chapter {} line {}", mark.chapter, mark.line);
        self.mark = Some(mark);
    }

    pub fn jump_to_mark(&mut self) {
        let Some(mark) = self.mark else {
            return;
        };
        let Some(chapter) = self.chapters.get_mut(mark.chapter) else {
            return;
        };
        if chapter.offset() != mark.line {
            chapter.set_offset(mark.line);
        }
        if self.current != mark.chapter as isize {
            self.go_to_page(mark.chapter as isize);
        }
    }

    /// Coarse page down by the configured stride.
    pub fn jump_scroll(&mut self) {
        let stride = self.scroll_stride;
        if let Some(chapter) = self.current_chapter_mut() {
            let offset = chapter.offset();
            chapter.set_offset(offset.saturating_add(stride));
        }
    }

    pub fn set_width(&mut self, width: u16) {
        let width = width.max(MIN_WIDTH);
        self.width = width;
        for mut page in self.pages_mut() {
            page.set_width(width);
        }
    }

    pub fn perform(&mut self, action: Action) {
        debug!("Action: {}", action.description());
        match action {
            Action::Quit => {}
            Action::NextChapter => self.next_chapter(),
            Action::PreviousChapter => self.previous_chapter(),
            Action::ToggleMenu => self.toggle_menu(),
            Action::MenuDown => self.menu_down(),
            Action::MenuUp => self.menu_up(),
            Action::SetMark => self.set_mark(),
            Action::JumpToMark => self.jump_to_mark(),
            Action::JumpScroll => self.jump_scroll(),
            Action::WidenText => self.set_width(self.width.saturating_add(self.width_step)),
            Action::NarrowText => self.set_width(self.width.saturating_sub(self.width_step)),
            Action::ResetWidth => self.set_width(self.default_width),
        }
    }

    /// Default handling of keys by the visible surface: line scrolling on a
    /// chapter, selection on the menu.
    pub fn handle_surface_key(&mut self, key: &KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let PageMut::Chapter(chapter) = self.visible_page_mut() {
            let page = chapter.viewport_height().unwrap_or(1).max(1);
            match key.code {
                KeyCode::Down | KeyCode::Char('j') => chapter.scroll_down(1),
                KeyCode::Up | KeyCode::Char('k') => chapter.scroll_up(1),
                KeyCode::PageDown => chapter.scroll_down(page),
                KeyCode::PageUp => chapter.scroll_up(page),
                KeyCode::Home => chapter.set_offset(0),
                KeyCode::End => chapter.scroll_to_end(),
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Down => self.menu_down(),
            KeyCode::Up => self.menu_up(),
            KeyCode::Enter => self.select_menu_entry(),
            _ => {}
        }
    }

    /// Captures what is worth persisting. The menu is never saved as the
    /// current page, the chapter it was opened from is.
    pub fn snapshot(&self) -> SessionState {
        let page = if self.is_on_toc() {
            self.menu_context
        } else {
            self.current
        };
        let offsets = self
            .chapters
            .iter()
            .filter(|chapter| chapter.offset() > 0)
            .map(|chapter| (chapter.index(), chapter.offset()))
            .collect();
        SessionState {
            page,
            offsets,
            width: self.width,
        }
    }

    /// Applies a persisted session. Chapter offsets are expected to have
    /// been set while the chapters were built.
    pub fn restore(&mut self, state: &SessionState) {
        let mut page = state.page;
        if page < TOC_INDEX || page >= self.chapters.len() as isize {
            warn!(
                "Saved page {page} is outside the book ({} chapters), starting at the beginning",
                self.chapters.len()
            );
            page = if self.chapters.is_empty() { TOC_INDEX } else { 0 };
        }
        self.current = page;
        self.menu_context = page;
        self.set_width(state.width);
        self.go_to_page(page);
    }
}
