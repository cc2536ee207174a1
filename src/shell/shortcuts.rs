use super::{ShellCommand, ShellMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Left,
    Right,
    Escape,
    Char(char),
}

impl Key {
    /// Parse a terminal-style key name ("space", "left", "m", ...).
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "space" => Some(Self::Space),
            "left" | "arrowleft" => Some(Self::Left),
            "right" | "arrowright" => Some(Self::Right),
            "esc" | "escape" => Some(Self::Escape),
            _ => {
                let mut chars = lowered.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

pub struct Shortcut {
    pub keys: &'static str,
    pub description: &'static str,
}

pub const SHORTCUTS: &[Shortcut] = &[
    Shortcut {
        keys: "Space",
        description: "Play / pause",
    },
    Shortcut {
        keys: "\u{2190} / \u{2192}",
        description: "Skip back / forward 10 words",
    },
    Shortcut {
        keys: "+ / -",
        description: "Faster / slower",
    },
    Shortcut {
        keys: "M",
        description: "Switch to mini player",
    },
    Shortcut {
        keys: "F",
        description: "Switch to focus mode",
    },
    Shortcut {
        keys: "?",
        description: "Show shortcuts",
    },
    Shortcut {
        keys: "Esc",
        description: "Close",
    },
];

pub fn command_for_key(key: Key) -> Option<ShellCommand> {
    let command = match key {
        Key::Space => ShellCommand::TogglePlay,
        Key::Left => ShellCommand::SkipBackward,
        Key::Right => ShellCommand::SkipForward,
        Key::Escape => ShellCommand::Close,
        Key::Char(c) => match c.to_ascii_lowercase() {
            ' ' => ShellCommand::TogglePlay,
            'm' => ShellCommand::SwitchMode(ShellMode::MiniPlayer),
            'f' => ShellCommand::SwitchMode(ShellMode::Focus),
            '+' | '=' => ShellCommand::SpeedUp,
            '-' | '_' => ShellCommand::SpeedDown,
            '?' => ShellCommand::ToggleShortcuts,
            's' => ShellCommand::ToggleSettings,
            'n' => ShellCommand::ToggleMinimized,
            _ => return None,
        },
    };
    Some(command)
}
