use log::error;

use crate::error::ControlError;
use crate::ui::document::{Document, ElementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    fn class(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.class())
    }
}

pub const NO_VALUE: &str = "--";

// Every reflector degrades to a logged no-op when one of its required elements is absent.
fn reflect(what: &str, result: Result<(), ControlError>) {
    if let Err(err) = result {
        error!("Can not update {}: {}", what, err);
    }
}

pub fn format_weight(weight: Option<f32>) -> String {
    match weight {
        Some(weight) => format!("{:.1}", weight),
        None => NO_VALUE.to_string(),
    }
}

pub fn update_mini_status(document: &mut Document, status: ConnectionStatus, weight: &str) {
    reflect("mini status", try_update_mini_status(document, status, weight));
}

fn try_update_mini_status(document: &mut Document, status: ConnectionStatus, weight: &str) -> Result<(), ControlError> {
    // all three must exist before anything is touched
    document.element(ElementId::MiniStatus)?;
    document.element(ElementId::MiniWeight)?;
    document.element(ElementId::ControlMini)?;

    document.element(ElementId::MiniStatus)?.text = status.to_string().to_uppercase();
    document.element(ElementId::MiniWeight)?.text = format!("{}kg", weight);

    let control_mini = document.element(ElementId::ControlMini)?;
    control_mini.set_class_name("control-mini");
    match status {
        ConnectionStatus::Connected | ConnectionStatus::Connecting => control_mini.add_class(status.class()),
        ConnectionStatus::Disconnected => {},
    }

    Ok(())
}

fn set_disabled(document: &mut Document, id: ElementId, disabled: bool) {
    // buttons are optional, a missing one is skipped silently
    if let Ok(button) = document.element(id) {
        button.disabled = disabled;
    }
}

/// Reflects the session state into the status text, the three buttons and the mini bar.
/// `weight` is only shown for [`ConnectionStatus::Connected`].
pub fn update_connection_status(document: &mut Document, status: ConnectionStatus, weight: f32) {
    reflect("connection status", try_update_connection_status(document, status, weight));
}

fn try_update_connection_status(document: &mut Document, status: ConnectionStatus, weight: f32) -> Result<(), ControlError> {
    let status_element = document.element(ElementId::ConnectionStatus)?;

    match status {
        ConnectionStatus::Connected => {
            status_element.text = "Connected".to_string();
            status_element.set_class_name("status-value connected");
            set_disabled(document, ElementId::ConnectButton, true);
            set_disabled(document, ElementId::TareButton, false);
            set_disabled(document, ElementId::DisconnectButton, false);
            update_mini_status(document, status, &format_weight(Some(weight)));
        },
        ConnectionStatus::Connecting => {
            status_element.text = "Connecting...".to_string();
            status_element.set_class_name("status-value");
            set_disabled(document, ElementId::ConnectButton, true);
            update_mini_status(document, status, NO_VALUE);
        },
        ConnectionStatus::Disconnected => {
            status_element.text = "Disconnected".to_string();
            status_element.set_class_name("status-value disconnected");
            set_disabled(document, ElementId::ConnectButton, false);
            set_disabled(document, ElementId::TareButton, true);
            set_disabled(document, ElementId::DisconnectButton, true);
            update_mini_status(document, status, NO_VALUE);
        },
    }

    Ok(())
}

/// Shows `weight` (or a placeholder) and marks the display as `jumping` when it reaches
/// `threshold`.
pub fn update_weight_display(document: &mut Document, weight: Option<f32>, connected: bool, threshold: f32) {
    reflect("weight display", try_update_weight_display(document, weight, connected, threshold));
}

fn try_update_weight_display(document: &mut Document, weight: Option<f32>, connected: bool, threshold: f32) -> Result<(), ControlError> {
    let weight_text = format_weight(weight);
    let weight_display = document.element(ElementId::WeightDisplay)?;

    weight_display.text = format!("{} kg", weight_text);

    match weight {
        Some(weight) if weight >= threshold => weight_display.add_class("jumping"),
        _ => weight_display.remove_class("jumping"),
    }

    let status = if connected { ConnectionStatus::Connected } else { ConnectionStatus::Disconnected };
    update_mini_status(document, status, &weight_text);

    Ok(())
}

pub fn update_battery_display(document: &mut Document, text: &str) {
    reflect("battery display", document.element(ElementId::BatteryLevel).map(|battery| {
        battery.text = text.to_string();
    }));
}

pub fn set_threshold_text(document: &mut Document, text: &str) {
    reflect("threshold input", document.element(ElementId::ThresholdInput).map(|input| {
        input.text = text.to_string();
    }));
}

/// Flips the panel between expanded and collapsed. `expanded` only changes when both the
/// panel and the overlay exist.
pub fn toggle_panel(document: &mut Document, expanded: &mut bool) {
    reflect("panel", try_toggle_panel(document, expanded));
}

fn try_toggle_panel(document: &mut Document, expanded: &mut bool) -> Result<(), ControlError> {
    document.element(ElementId::ControlPanel)?;
    document.element(ElementId::Overlay)?;

    *expanded = !*expanded;

    let panel = document.element(ElementId::ControlPanel)?;
    if *expanded {
        panel.add_class("expanded");
    }
    else {
        panel.remove_class("expanded");
    }

    let overlay = document.element(ElementId::Overlay)?;
    if *expanded {
        overlay.add_class("active");
    }
    else {
        overlay.remove_class("active");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_enables_tare_and_disconnect() {
        let mut document = Document::with_all_elements();
        update_connection_status(&mut document, ConnectionStatus::Connected, 2.345);

        assert_eq!(document.text(ElementId::ConnectionStatus), Some("Connected"));
        assert!(document.has_class(ElementId::ConnectionStatus, "connected"));
        assert_eq!(document.is_disabled(ElementId::ConnectButton), Some(true));
        assert_eq!(document.is_disabled(ElementId::TareButton), Some(false));
        assert_eq!(document.is_disabled(ElementId::DisconnectButton), Some(false));
        assert_eq!(document.text(ElementId::MiniStatus), Some("CONNECTED"));
        assert_eq!(document.text(ElementId::MiniWeight), Some("2.3kg"));
        assert!(document.has_class(ElementId::ControlMini, "connected"));
    }

    #[test]
    fn connecting_only_disables_connect() {
        let mut document = Document::with_all_elements();
        update_connection_status(&mut document, ConnectionStatus::Disconnected, 0.0);
        update_connection_status(&mut document, ConnectionStatus::Connecting, 0.0);

        assert_eq!(document.text(ElementId::ConnectionStatus), Some("Connecting..."));
        assert_eq!(document.is_disabled(ElementId::ConnectButton), Some(true));
        assert_eq!(document.is_disabled(ElementId::TareButton), Some(true));
        assert_eq!(document.is_disabled(ElementId::DisconnectButton), Some(true));
        assert_eq!(document.text(ElementId::MiniWeight), Some("--kg"));
        assert!(document.has_class(ElementId::ControlMini, "connecting"));
        assert!(!document.has_class(ElementId::ConnectionStatus, "disconnected"));
    }

    #[test]
    fn disconnected_resets_mini_classes() {
        let mut document = Document::with_all_elements();
        update_connection_status(&mut document, ConnectionStatus::Connected, 0.0);
        update_connection_status(&mut document, ConnectionStatus::Disconnected, 0.0);

        assert_eq!(document.text(ElementId::MiniStatus), Some("DISCONNECTED"));
        assert!(document.has_class(ElementId::ControlMini, "control-mini"));
        assert!(!document.has_class(ElementId::ControlMini, "connected"));
        assert_eq!(document.is_disabled(ElementId::ConnectButton), Some(false));
    }

    #[test]
    fn weight_display_marks_jumping_at_threshold() {
        let mut document = Document::with_all_elements();

        update_weight_display(&mut document, Some(5.0), true, 5.0);
        assert_eq!(document.text(ElementId::WeightDisplay), Some("5.0 kg"));
        assert!(document.has_class(ElementId::WeightDisplay, "jumping"));
        assert_eq!(document.text(ElementId::MiniWeight), Some("5.0kg"));

        update_weight_display(&mut document, Some(4.9), true, 5.0);
        assert!(!document.has_class(ElementId::WeightDisplay, "jumping"));

        update_weight_display(&mut document, None, false, 5.0);
        assert_eq!(document.text(ElementId::WeightDisplay), Some("-- kg"));
        assert_eq!(document.text(ElementId::MiniStatus), Some("DISCONNECTED"));
    }

    #[test]
    fn missing_weight_display_is_a_no_op() {
        let mut document = Document::with_all_elements();
        document.remove(ElementId::WeightDisplay);
        let before = document.clone();

        update_weight_display(&mut document, Some(12.0), true, 5.0);

        assert_eq!(document, before);
    }

    #[test]
    fn missing_mini_element_leaves_others_untouched() {
        let mut document = Document::with_all_elements();
        document.remove(ElementId::ControlMini);

        update_mini_status(&mut document, ConnectionStatus::Connected, "1.0");
        assert_eq!(document.text(ElementId::MiniStatus), Some(""));

        // the main status still updates
        update_connection_status(&mut document, ConnectionStatus::Connected, 1.0);
        assert_eq!(document.text(ElementId::ConnectionStatus), Some("Connected"));
    }

    #[test]
    fn missing_buttons_are_skipped() {
        let mut document = Document::with_all_elements();
        document.remove(ElementId::TareButton);
        document.remove(ElementId::ConnectButton);

        update_connection_status(&mut document, ConnectionStatus::Connected, 0.0);

        assert_eq!(document.text(ElementId::ConnectionStatus), Some("Connected"));
        assert_eq!(document.is_disabled(ElementId::DisconnectButton), Some(false));
    }

    #[test]
    fn panel_toggles_both_elements() {
        let mut document = Document::with_all_elements();
        let mut expanded = false;

        toggle_panel(&mut document, &mut expanded);
        assert!(expanded);
        assert!(document.has_class(ElementId::ControlPanel, "expanded"));
        assert!(document.has_class(ElementId::Overlay, "active"));

        toggle_panel(&mut document, &mut expanded);
        assert!(!expanded);
        assert!(!document.has_class(ElementId::ControlPanel, "expanded"));
        assert!(!document.has_class(ElementId::Overlay, "active"));
    }

    #[test]
    fn panel_without_overlay_stays_collapsed() {
        let mut document = Document::with_all_elements();
        document.remove(ElementId::Overlay);
        let mut expanded = false;

        toggle_panel(&mut document, &mut expanded);

        assert!(!expanded);
        assert!(!document.has_class(ElementId::ControlPanel, "expanded"));
    }
}
