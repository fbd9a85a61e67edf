/// Keys the player reacts to, decoupled from any UI toolkit's key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    Char(char),
    Other,
}

impl Key {
    /// Parse a DOM-style key name (`" "`, `"ArrowLeft"`, `"k"`, ...)
    pub fn from_name(name: &str) -> Self {
        match name {
            " " | "Space" | "Spacebar" => Key::Space,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    /// A text field owns the keyboard; the player must stay out of the way
    pub text_input_focused: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            text_input_focused: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    TogglePlay,
    SeekBackward,
    SeekForward,
    ToggleFullscreen,
    ToggleMute,
    ToggleComments,
}

/// Fixed shortcut table. Not configurable.
pub fn map_key(event: &KeyEvent) -> Option<KeyCommand> {
    if event.text_input_focused {
        return None;
    }

    match event.key {
        Key::Space => Some(KeyCommand::TogglePlay),
        Key::ArrowLeft => Some(KeyCommand::SeekBackward),
        Key::ArrowRight => Some(KeyCommand::SeekForward),
        Key::Char(c) => match c.to_ascii_lowercase() {
            'k' => Some(KeyCommand::TogglePlay),
            'f' => Some(KeyCommand::ToggleFullscreen),
            'm' => Some(KeyCommand::ToggleMute),
            'd' => Some(KeyCommand::ToggleComments),
            _ => None,
        },
        Key::Other => None,
    }
}
