pub mod test_helpers {
    use crate::book::Book;
    use crate::document::{DocumentError, DocumentSource, SpineCursor, TocEntry, read_chapter};
    use crate::event_source::{Event, KeyCode, KeyEvent, KeyModifiers, SimulatedEventSource};
    use crate::html_to_text::HtmlToText;
    use crate::settings::Settings;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    /// In-memory spine with a step counter, for exercising the locator.
    pub struct MemoryCursor {
        entries: Vec<(String, String)>,
        position: usize,
        steps: usize,
    }

    impl MemoryCursor {
        pub fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(url, markup)| (url.to_string(), markup.to_string()))
                    .collect(),
                position: 0,
                steps: 0,
            }
        }

        pub fn park_at(&mut self, position: usize) {
            self.position = position;
        }

        /// Single steps taken since creation.
        pub fn steps(&self) -> usize {
            self.steps
        }
    }

    impl SpineCursor for MemoryCursor {
        fn current_url(&self) -> String {
            self.entries
                .get(self.position)
                .map(|(url, _)| url.clone())
                .unwrap_or_default()
        }

        fn next(&mut self) -> Result<(), DocumentError> {
            if self.is_last() {
                return Err(DocumentError::Navigation {
                    direction: "forward",
                    url: self.current_url(),
                });
            }
            self.position += 1;
            self.steps += 1;
            Ok(())
        }

        fn previous(&mut self) -> Result<(), DocumentError> {
            if self.is_first() {
                return Err(DocumentError::Navigation {
                    direction: "backward",
                    url: self.current_url(),
                });
            }
            self.position -= 1;
            self.steps += 1;
            Ok(())
        }

        fn is_first(&self) -> bool {
            self.position == 0
        }

        fn is_last(&self) -> bool {
            self.position + 1 >= self.entries.len()
        }

        fn read_current(&mut self) -> Result<String, DocumentError> {
            self.entries
                .get(self.position)
                .map(|(_, markup)| markup.clone())
                .ok_or_else(|| DocumentError::Unreadable {
                    url: self.current_url(),
                })
        }
    }

    /// A document held in memory: chapter `i` lives at `chapter-i.xhtml`.
    pub struct MemoryDocument {
        title: Option<String>,
        toc: Vec<TocEntry>,
        cursor: MemoryCursor,
        converter: HtmlToText,
    }

    impl MemoryDocument {
        pub fn new(title: Option<&str>, chapters: &[(&str, &str)]) -> Self {
            let spine: Vec<(String, String)> = chapters
                .iter()
                .enumerate()
                .map(|(i, (_, body))| (format!("chapter-{i}.xhtml"), body.to_string()))
                .collect();
            let toc = chapters
                .iter()
                .enumerate()
                .map(|(i, (name, _))| TocEntry::new(*name, format!("chapter-{i}.xhtml")))
                .collect();
            let spine_refs: Vec<(&str, &str)> = spine
                .iter()
                .map(|(url, body)| (url.as_str(), body.as_str()))
                .collect();
            Self {
                title: title.map(str::to_string),
                toc,
                cursor: MemoryCursor::new(&spine_refs),
                converter: HtmlToText::new(),
            }
        }

        /// `count` chapters of 200 numbered lines each.
        pub fn with_chapters(count: usize) -> Self {
            let names: Vec<String> = (0..count).map(|i| format!("Chapter {}", i + 1)).collect();
            let bodies: Vec<String> = (0..count).map(|i| chapter_body(i, 200)).collect();
            let chapters: Vec<(&str, &str)> = names
                .iter()
                .zip(&bodies)
                .map(|(name, body)| (name.as_str(), body.as_str()))
                .collect();
            Self::new(Some("Sample Book"), &chapters)
        }

        /// Appends a table of contents entry. `url` may point into an existing
        /// chapter with a `#fragment`, or nowhere at all.
        pub fn add_entry(&mut self, name: &str, url: &str) {
            self.toc.push(TocEntry::new(name, url));
        }
    }

    impl DocumentSource for MemoryDocument {
        fn title(&self) -> Option<String> {
            self.title.clone()
        }

        fn table_of_contents(&self) -> Result<Vec<TocEntry>, DocumentError> {
            if self.toc.is_empty() {
                return Err(DocumentError::EmptyToc);
            }
            Ok(self.toc.clone())
        }

        fn chapter_content(&mut self, url: &str) -> Result<String, DocumentError> {
            read_chapter(&mut self.cursor, &self.converter, url)
        }
    }

    /// XHTML body whose lines read `Chapter <n> line <m>`.
    pub fn chapter_body(index: usize, lines: usize) -> String {
        let mut body = String::from("<html><body>");
        for line in 1..=lines {
            body.push_str(&format!("<div>Chapter {} line {line}</div>", index + 1));
        }
        body.push_str("</body></html>");
        body
    }

    pub fn sample_book(chapters: usize) -> Book {
        let mut doc = MemoryDocument::with_chapters(chapters);
        Book::from_document(&mut doc, "Sample Book", &Settings::default(), None)
            .expect("in-memory document always resolves")
    }

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events.push(Event::Key(KeyEvent::new(code, KeyModifiers::empty())));
            self
        }

        pub fn next_chapter(self) -> Self {
            self.press_char('l')
        }

        pub fn prev_chapter(self) -> Self {
            self.press_char('h')
        }

        pub fn toggle_menu(self) -> Self {
            self.press_char('/')
        }

        pub fn menu_down(self, times: usize) -> Self {
            (0..times).fold(self, |builder, _| builder.press_char('j'))
        }

        pub fn set_mark(self) -> Self {
            self.press_char('m')
        }

        pub fn jump_to_mark(self) -> Self {
            self.press_char('\'')
        }

        pub fn page_scroll(self) -> Self {
            self.press_char(' ')
        }

        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }

        pub fn events(&self) -> &[Event] {
            &self.events
        }
    }

    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).expect("test backend never fails")
    }

    /// The terminal buffer as text, trailing blanks trimmed.
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            lines.push(line.trim_end().to_string());
        }

        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }
}
