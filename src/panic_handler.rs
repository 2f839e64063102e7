use crossterm::{
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;

/// Installs a panic hook that gives the terminal back before the report is
/// printed. Debug builds get a `better-panic` backtrace, release builds a
/// `human-panic` report file.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();
    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let report_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        log::error!("panic: {panic_info}");
        report_hook(panic_info);
        std::process::exit(1);
    }));
}

/// Leaves raw mode and the alternate screen and shows the cursor again.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = execute!(io::stderr(), crossterm::cursor::Show);
    let _ = writeln!(io::stderr());
}
