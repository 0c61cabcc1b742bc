use crate::input::KeyCode;
use crate::input::KeyEvent;
use crate::input::KeyModifiers;
use crate::viewport::ViewportState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollAction {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
}

#[derive(Clone, Debug)]
pub struct ScrollBindings {
    pub line_step: i32,
    /// Rows moved per mouse wheel notch.
    pub wheel_step: i32,
    pub up: Vec<KeyEvent>,
    pub down: Vec<KeyEvent>,
    pub page_up: Vec<KeyEvent>,
    pub page_down: Vec<KeyEvent>,
    pub top: Vec<KeyEvent>,
    pub bottom: Vec<KeyEvent>,
}

fn char_key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c))
}

fn ctrl_key(c: char) -> KeyEvent {
    char_key(c).with_modifiers(KeyModifiers {
        shift: false,
        ctrl: true,
        alt: false,
    })
}

/// Terminals report capitals with shift held.
fn shifted_key(c: char) -> KeyEvent {
    char_key(c).with_modifiers(KeyModifiers {
        shift: true,
        ctrl: false,
        alt: false,
    })
}

impl Default for ScrollBindings {
    fn default() -> Self {
        Self {
            line_step: 1,
            wheel_step: 3,
            up: vec![KeyEvent::new(KeyCode::Up), char_key('k')],
            down: vec![KeyEvent::new(KeyCode::Down), char_key('j')],
            page_up: vec![KeyEvent::new(KeyCode::PageUp), ctrl_key('u')],
            page_down: vec![KeyEvent::new(KeyCode::PageDown), ctrl_key('d')],
            top: vec![KeyEvent::new(KeyCode::Home), char_key('g')],
            bottom: vec![
                KeyEvent::new(KeyCode::End),
                char_key('G'),
                shifted_key('G'),
            ],
        }
    }
}

impl ScrollBindings {
    pub fn action_for(&self, key: &KeyEvent) -> Option<ScrollAction> {
        // Bindings match on code and exact modifiers.
        let hit = |keys: &[KeyEvent]| keys.contains(key);
        if hit(&self.up) {
            return Some(ScrollAction::Up);
        }
        if hit(&self.down) {
            return Some(ScrollAction::Down);
        }
        if hit(&self.page_up) {
            return Some(ScrollAction::PageUp);
        }
        if hit(&self.page_down) {
            return Some(ScrollAction::PageDown);
        }
        if hit(&self.top) {
            return Some(ScrollAction::Top);
        }
        if hit(&self.bottom) {
            return Some(ScrollAction::Bottom);
        }
        None
    }

    pub fn apply(&self, state: &mut ViewportState, action: ScrollAction) {
        match action {
            ScrollAction::Up => state.scroll_y_by(-self.line_step),
            ScrollAction::Down => state.scroll_y_by(self.line_step),
            ScrollAction::PageUp => state.page_up(),
            ScrollAction::PageDown => state.page_down(),
            ScrollAction::Top => state.to_top(),
            ScrollAction::Bottom => state.to_bottom(),
        }
    }
}
