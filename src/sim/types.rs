use serde::{Deserialize, Serialize};

/// What a jump presses. The default suits browser runner games, which jump on space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Button {
    #[default]
    Space,
    ArrowUp,
    KeyW,
    Enter,
    MouseLeft,
}

pub const BUTTONS: [Button; 5] = [
    Button::Space,
    Button::ArrowUp,
    Button::KeyW,
    Button::Enter,
    Button::MouseLeft,
];

impl Button {
    pub fn rdev_key(&self) -> Option<rdev::Key> {
        match self {
            Button::Space => Some(rdev::Key::Space),
            Button::ArrowUp => Some(rdev::Key::UpArrow),
            Button::KeyW => Some(rdev::Key::KeyW),
            Button::Enter => Some(rdev::Key::Return),
            Button::MouseLeft => None,
        }
    }

    pub fn rdev_mouse_button(&self) -> Option<rdev::Button> {
        match self {
            Button::MouseLeft => Some(rdev::Button::Left),
            _ => None,
        }
    }
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Button::Space => "Space",
            Button::ArrowUp => "Arrow up",
            Button::KeyW => "W",
            Button::Enter => "Enter",
            Button::MouseLeft => "Left mouse button",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone)]
pub enum InputSimCommand {
    Tap(Button),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_button_maps_to_one_rdev_input() {
        for button in BUTTONS {
            assert!(button.rdev_key().is_some() != button.rdev_mouse_button().is_some(), "{}", button);
        }
    }
}
