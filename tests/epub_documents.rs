use lectern::book::{Book, BookError};
use lectern::document::{DocumentError, DocumentSource, EpubDocument, TocEntry};
use lectern::run_reader;
use lectern::settings::Settings;
use lectern::test_utils::test_helpers::*;
use std::path::Path;

fn open(name: &str) -> EpubDocument {
    EpubDocument::open(&Path::new("tests/testdata").join(name)).unwrap()
}

fn build(doc: &mut EpubDocument) -> Book {
    let title = doc.title().unwrap_or_default();
    Book::from_document(doc, title, &Settings::default(), None).unwrap()
}

fn chapter_lines(book: &mut Book, index: usize) -> Vec<String> {
    book.chapter_mut(index).unwrap().lines(80).to_vec()
}

#[test]
fn test_flat_ncx_book_opens() {
    let mut doc = open("flat_ncx.epub");

    assert_eq!(doc.title().as_deref(), Some("Flat Fixture"));
    assert_eq!(
        doc.table_of_contents().unwrap(),
        vec![
            TocEntry::new("Arrival", "OEBPS/ch1.xhtml"),
            TocEntry::new("Departure", "OEBPS/ch2.xhtml"),
            TocEntry::new("Return", "OEBPS/ch3.xhtml"),
        ]
    );

    let mut book = build(&mut doc);

    assert_eq!(book.title(), "Flat Fixture");
    assert_eq!(book.chapters().len(), 3);
    assert_eq!(book.current(), 0);
    let lines = chapter_lines(&mut book, 2);
    assert_eq!(lines[0], "Return");
    assert!(lines.contains(&"Return paragraph 3.".to_string()));
}

#[test]
fn test_epub_spine_is_walked_both_ways() {
    let mut doc = open("flat_ncx.epub");

    let last = doc.chapter_content("OEBPS/ch3.xhtml").unwrap();
    let first = doc.chapter_content("OEBPS/ch1.xhtml").unwrap();

    assert!(last.starts_with("Return"));
    assert!(first.starts_with("Arrival"));
}

#[test]
fn test_epub_missing_url_leaves_spine_usable() {
    let mut doc = open("flat_ncx.epub");
    doc.chapter_content("OEBPS/ch2.xhtml").unwrap();

    let err = doc.chapter_content("OEBPS/missing.xhtml").unwrap_err();

    assert!(matches!(err, DocumentError::UrlNotFound { .. }));
    assert!(
        doc.chapter_content("OEBPS/ch2.xhtml")
            .unwrap()
            .starts_with("Departure")
    );
}

#[test]
fn test_nested_ncx_sections_become_pages() {
    let mut doc = open("nested_ncx.epub");

    let urls: Vec<String> = doc
        .table_of_contents()
        .unwrap()
        .into_iter()
        .map(|entry| entry.url)
        .collect();
    assert_eq!(
        urls,
        [
            "OEBPS/ch1.xhtml",
            "OEBPS/ch1.xhtml#s1",
            "OEBPS/ch1.xhtml#s2",
            "OEBPS/ch2.xhtml",
            "OEBPS/ch3.xhtml",
        ]
    );

    let mut book = build(&mut doc);

    assert_eq!(book.chapters().len(), 5);
    assert_eq!(book.page("OEBPS/ch1.xhtml#s1").unwrap().index(), 1);
    assert_eq!(book.page("OEBPS/ch1.xhtml#s2").unwrap().index(), 2);
    assert!(chapter_lines(&mut book, 1).contains(&"First section text.".to_string()));
    assert!(chapter_lines(&mut book, 4).contains(&"Epilogue text.".to_string()));
}

#[test]
fn test_nested_section_is_shown_with_its_own_label() {
    let mut doc = open("nested_ncx.epub");
    let mut book = build(&mut doc);
    let mut terminal = create_test_terminal(100, 30);
    let mut events = TestScenarioBuilder::new().next_chapter().quit().build();

    run_reader(&mut terminal, &mut book, &mut events).unwrap();

    let screen = capture_terminal_state(&terminal);
    assert_eq!(book.current(), 1);
    assert!(screen.contains("Second section text."));
    assert!(screen.contains("\"Section 1.1\" (20.00%) - lines"));
}

#[test]
fn test_nested_session_restores_section_page() {
    let mut doc = open("nested_ncx.epub");
    let mut book = build(&mut doc);
    book.go_to_page(2);
    book.chapter_mut(2).unwrap().set_offset(3);
    let state = book.snapshot();

    let mut reopened = open("nested_ncx.epub");
    let restored =
        Book::from_document(&mut reopened, "Nested", &Settings::default(), Some(&state)).unwrap();

    assert_eq!(restored.current(), 2);
    assert_eq!(restored.chapters()[2].url(), "OEBPS/ch1.xhtml#s2");
    assert_eq!(restored.chapters()[2].offset(), 3);
}

#[test]
fn test_nav_document_book_opens() {
    let mut doc = open("nav_only.epub");

    assert_eq!(doc.title().as_deref(), Some("Nav Fixture"));
    assert_eq!(
        doc.table_of_contents().unwrap(),
        vec![
            TocEntry::new("Opening", "OEBPS/text/opening.xhtml"),
            TocEntry::new("Inner Scene", "OEBPS/text/opening.xhtml#inner"),
            TocEntry::new("Closing", "OEBPS/text/closing.xhtml"),
        ]
    );

    let mut book = build(&mut doc);

    assert_eq!(book.chapters().len(), 3);
    assert!(chapter_lines(&mut book, 1).contains(&"An inner scene.".to_string()));
    assert!(chapter_lines(&mut book, 2).contains(&"The closing scene.".to_string()));
}

#[test]
fn test_book_without_toc_is_rejected() {
    let mut doc = open("no_toc.epub");

    let result = Book::from_document(&mut doc, "Bare", &Settings::default(), None);

    assert!(matches!(
        result,
        Err(BookError::Document(DocumentError::EmptyToc))
    ));
}
