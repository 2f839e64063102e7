use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextChapter,
    PreviousChapter,
    ToggleMenu,
    MenuDown,
    MenuUp,
    SetMark,
    JumpToMark,
    JumpScroll,
    WidenText,
    NarrowText,
    ResetWidth,
}

impl Action {
    pub fn description(&self) -> &'static str {
        match self {
            Action::Quit => "quit",
            Action::NextChapter => "next chapter",
            Action::PreviousChapter => "previous chapter",
            Action::ToggleMenu => "toggle contents",
            Action::MenuDown => "contents down",
            Action::MenuUp => "contents up",
            Action::SetMark => "set mark",
            Action::JumpToMark => "jump to mark",
            Action::JumpScroll => "page down",
            Action::WidenText => "wider",
            Action::NarrowText => "narrower",
            Action::ResetWidth => "reset width",
        }
    }
}

pub const BINDINGS: &[(char, Action)] = &[
    ('q', Action::Quit),
    ('l', Action::NextChapter),
    ('h', Action::PreviousChapter),
    ('/', Action::ToggleMenu),
    ('j', Action::MenuDown),
    ('k', Action::MenuUp),
    ('m', Action::SetMark),
    ('\'', Action::JumpToMark),
    (' ', Action::JumpScroll),
    ('+', Action::WidenText),
    ('-', Action::NarrowText),
    ('=', Action::ResetWidth),
];

/// Looks up the action bound to a key press. Anything else, including keys
/// held with Ctrl or Alt, is left for the focused surface.
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    let KeyCode::Char(c) = key.code else {
        return None;
    };
    BINDINGS
        .iter()
        .find(|(bound, _)| *bound == c)
        .map(|(_, action)| *action)
}
