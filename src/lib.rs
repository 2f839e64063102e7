pub mod app;
pub mod book;
pub mod document;
pub mod event_source;
pub mod html_to_text;
pub mod keymap;
pub mod page;
pub mod panic_handler;
pub mod progress;
pub mod session;
pub mod settings;
pub mod theme;
pub mod toc_parser;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use app::run_reader;
pub use book::Book;
