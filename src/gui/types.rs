use iced::Event;

use crate::config::types::Config;
use crate::controller::task::ControllerEvent;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)),
    Controller(ControllerEvent),
    NoticeConfirmed,

    // bound to the elements of the control surface
    ControlMiniPress,
    PanelHandlePress,
    OverlayPress,
    ConnectPress,
    TarePress,
    DisconnectPress,
    ThresholdInput(String),
}
