use crate::book::Book;
use crate::event_source::{Event, EventSource};
use crate::keymap::{self, Action, BINDINGS};
use crate::page::{Chapter, PageMut, TableOfContents};
use crate::progress::{Update, UpdateQueue};
use crate::theme::{LECTERN, Palette};
use anyhow::Result;
use crossterm::event::KeyEventKind;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::{debug, info};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Layout, Rect},
    text::Line,
    widgets::{Block, List, ListItem, Paragraph},
};
use std::io::{Stdout, stdout};
use std::time::Duration;

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

/// Draws the book: title on top, the visible page in a centered column.
pub fn render(frame: &mut Frame, book: &mut Book, updates: &mut UpdateQueue) {
    let palette = &LECTERN;
    let area = frame.area();
    frame.render_widget(Block::default().style(palette.base()), area);

    let [header, body] = Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]).areas(area);
    let title = Paragraph::new(book.title().to_string())
        .alignment(Alignment::Center)
        .style(palette.title_style());
    frame.render_widget(title, header);

    let [_, column, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(book.visible_page().width()),
        Constraint::Fill(1),
    ])
    .areas(body);

    match book.visible_page_mut() {
        PageMut::Chapter(chapter) => render_chapter(frame, column, chapter, updates, palette),
        PageMut::TableOfContents(toc) => render_toc(frame, column, toc, palette),
    }
}

fn render_chapter(
    frame: &mut Frame,
    area: Rect,
    chapter: &mut Chapter,
    updates: &mut UpdateQueue,
    palette: &Palette,
) {
    let [text_area, _, status_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let height = usize::from(text_area.height);
    let offset = chapter.offset();
    let lines: Vec<Line> = {
        let wrapped = chapter.lines(text_area.width);
        let total = wrapped.len();
        let start = chapter_start(offset, height, total);
        wrapped[start..(start + height).min(total)]
            .iter()
            .map(|line| Line::from(line.clone()))
            .collect()
    };
    chapter.set_viewport_height(height);

    frame.render_widget(Paragraph::new(lines).style(palette.base()), text_area);

    // The label is recomputed after this paint, from the event loop.
    updates.defer(Update::Progress {
        chapter: chapter.index(),
    });
    let status = Paragraph::new(chapter.progress_label().to_string())
        .alignment(Alignment::Center)
        .style(palette.status_style());
    frame.render_widget(status, status_area);
}

fn chapter_start(offset: usize, height: usize, total: usize) -> usize {
    offset.min(total.saturating_sub(height))
}

fn render_toc(frame: &mut Frame, area: Rect, toc: &mut TableOfContents, palette: &Palette) {
    let [list_area, _, help_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let items: Vec<ListItem> = toc
        .entries()
        .iter()
        .map(|name| ListItem::new(name.clone()))
        .collect();
    let list = List::new(items)
        .style(palette.base())
        .highlight_style(palette.selection_style())
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, toc.list_state_mut());

    let help = Paragraph::new(key_help())
        .alignment(Alignment::Center)
        .style(palette.status_style());
    frame.render_widget(help, help_area);
}

fn key_help() -> String {
    const SHOWN: &[Action] = &[Action::MenuDown, Action::MenuUp, Action::ToggleMenu, Action::Quit];
    let mut parts: Vec<String> = BINDINGS
        .iter()
        .filter(|(_, action)| SHOWN.contains(action))
        .map(|(key, action)| format!("{key} {}", action.description()))
        .collect();
    parts.insert(0, "enter open".to_string());
    parts.join("  ")
}

/// Runs deferred render work. Returns true if anything visible changed.
pub fn drain_updates(updates: &mut UpdateQueue, book: &mut Book) -> bool {
    let mut changed = false;
    while let Some(update) = updates.pop() {
        match update {
            Update::Progress { chapter } => {
                if let Some(chapter) = book.chapter_mut(chapter) {
                    changed |= chapter.refresh_progress();
                }
            }
        }
    }
    changed
}

/// The reader loop: paint, run deferred updates, dispatch one input event.
///
/// Every mutation of the book happens on this thread, either here or in the
/// deferred updates drained between paints.
pub fn run_reader<B: Backend>(
    terminal: &mut Terminal<B>,
    book: &mut Book,
    events: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let mut updates = UpdateQueue::default();
    let mut needs_redraw = true;
    info!("Reader loop started on page {}", book.current());

    loop {
        if needs_redraw {
            terminal.draw(|f| render(f, book, &mut updates))?;
            if drain_updates(&mut updates, book) {
                terminal.draw(|f| render(f, book, &mut updates))?;
                // Same viewport as the paint above, so this only clears the queue.
                drain_updates(&mut updates, book);
            }
            needs_redraw = false;
        }

        if !events.poll(POLL_TIMEOUT)? {
            continue;
        }
        match events.read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                match keymap::action_for(&key) {
                    Some(Action::Quit) => {
                        info!("Quit requested");
                        return Ok(());
                    }
                    Some(action) => book.perform(action),
                    None => {}
                }
                book.handle_surface_key(&key);
                needs_redraw = true;
            }
            Event::Resize(width, height) => {
                debug!("Terminal resized to {width}x{height}");
                needs_redraw = true;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::{capture_terminal_state, create_test_terminal, sample_book};

    #[test]
    fn test_chapter_start_clamps() {
        assert_eq!(chapter_start(0, 10, 100), 0);
        assert_eq!(chapter_start(95, 10, 100), 90);
        assert_eq!(chapter_start(5, 10, 3), 0);
    }

    #[test]
    fn test_render_chapter_shows_text_and_queues_progress() {
        let mut terminal = create_test_terminal(100, 20);
        let mut book = sample_book(2);
        let mut updates = UpdateQueue::default();

        terminal
            .draw(|f| render(f, &mut book, &mut updates))
            .unwrap();

        let screen = capture_terminal_state(&terminal);
        assert!(screen.contains("Sample Book"));
        assert!(screen.contains("Chapter 1 line 1"));
        assert!(!updates.is_empty());
    }

    #[test]
    fn test_progress_settles_after_one_extra_paint() {
        let mut terminal = create_test_terminal(100, 20);
        let mut book = sample_book(2);
        let mut updates = UpdateQueue::default();

        terminal
            .draw(|f| render(f, &mut book, &mut updates))
            .unwrap();
        assert!(drain_updates(&mut updates, &mut book));

        terminal
            .draw(|f| render(f, &mut book, &mut updates))
            .unwrap();
        assert!(!drain_updates(&mut updates, &mut book));

        // 20 rows: 2 title, 16 text, 1 gap, 1 status
        let screen = capture_terminal_state(&terminal);
        assert!(screen.contains("\"Chapter 1\" (0.00%) - lines 1-16/200"));
    }

    #[test]
    fn test_column_takes_width_of_visible_page() {
        let mut terminal = create_test_terminal(100, 20);
        let mut book = sample_book(2);
        book.visible_page_mut().set_width(30);
        let mut updates = UpdateQueue::default();

        terminal
            .draw(|f| render(f, &mut book, &mut updates))
            .unwrap();

        // 100 columns, 30 for text: 35 on each side.
        let screen = capture_terminal_state(&terminal);
        let expected = format!("{}Chapter 1 line 1", " ".repeat(35));
        assert!(screen.lines().any(|line| line == expected));
        assert_eq!(book.width(), 80);
    }

    #[test]
    fn test_render_toc_highlights_selection() {
        let mut terminal = create_test_terminal(100, 20);
        let mut book = sample_book(3);
        book.go_to_page(1);
        book.toggle_menu();
        let mut updates = UpdateQueue::default();

        terminal
            .draw(|f| render(f, &mut book, &mut updates))
            .unwrap();

        let screen = capture_terminal_state(&terminal);
        assert!(screen.contains("> Chapter 2"));
        assert!(screen.contains("Chapter 3"));
        assert!(updates.is_empty());
    }
}
