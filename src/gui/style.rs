use iced::{Border, Color, Shadow, Theme};
use iced::widget::button::{StyleSheet, Appearance};

use crate::ui::document::ElementState;

pub const CONNECTED_COLOR: Color = Color { r: 0.13, g: 0.55, b: 0.13, a: 1.0 };
pub const DISCONNECTED_COLOR: Color = Color { r: 0.75, g: 0.15, b: 0.15, a: 1.0 };
pub const JUMPING_COLOR: Color = Color { r: 0.9, g: 0.45, b: 0.0, a: 1.0 };

/// A button that looks like plain text, used for the panel handle and the overlay.
pub struct TextButtonStyleSheet;

impl StyleSheet for TextButtonStyleSheet {
    type Style = Theme;

    fn active(&self, _style: &Self::Style) -> Appearance {
        Appearance {
            shadow_offset: Default::default(),
            background: None,
            text_color: Color::from_rgb(0.4, 0.4, 0.4),
            border: Border {
                color: Color::TRANSPARENT,
                width: 0.0,
                radius: 0.0.into(),
            },
            shadow: Shadow::default(),
        }
    }
}

/// Text color for an element carrying one of the status classes.
pub fn status_color(element: &ElementState) -> Option<Color> {
    if element.has_class("jumping") {
        Some(JUMPING_COLOR)
    }
    else if element.has_class("connected") {
        Some(CONNECTED_COLOR)
    }
    else if element.has_class("disconnected") {
        Some(DISCONNECTED_COLOR)
    }
    else {
        None
    }
}
