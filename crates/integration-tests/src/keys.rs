//! Key names used by scenario fixtures.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Parse a key description such as `menu`, `back` or `ctrl+a`.
///
/// # Errors
/// Returns error if a modifier or key name is not recognized
pub fn parse_key(key: &str) -> Result<KeyEvent, String> {
    let mut modifiers = KeyModifiers::NONE;
    let mut parts: Vec<&str> = key.split('+').map(str::trim).collect();
    let Some(name) = parts.pop() else {
        return Err("Empty key name".to_owned());
    };

    for modifier in parts {
        match modifier.to_lowercase().as_str() {
            "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
            "alt" => modifiers |= KeyModifiers::ALT,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            _ => return Err(format!("Unknown modifier: {modifier}")),
        }
    }

    let code = match name.to_lowercase().as_str() {
        "menu" => KeyCode::Menu,
        "back" | "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" | "dpad_center" => KeyCode::Enter,
        "up" | "dpad_up" => KeyCode::Up,
        "down" | "dpad_down" => KeyCode::Down,
        "left" | "dpad_left" => KeyCode::Left,
        "right" | "dpad_right" => KeyCode::Right,
        "del" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        single if single.chars().count() == 1 => match name.chars().next() {
            Some(character) => KeyCode::Char(character),
            None => return Err("Empty key name".to_owned()),
        },
        unknown => return Err(format!("Unknown key: {unknown}")),
    };

    Ok(KeyEvent::new(code, modifiers))
}
