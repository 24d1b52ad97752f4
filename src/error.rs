use std::io;
use thiserror::Error;
use msgbox::IconType;
use std::fmt::Display;
use std::str::Utf8Error;
use btleplug;
use iced;
use serde_json;

use crate::ui::document::ElementId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },
}

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("A required bluetooth characteristic is not available")]
    MissingCharacteristic,

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("No Progressor was found within {seconds} seconds")]
    NotFound { seconds: u64 },

    #[error("The device did not answer within {millis} milliseconds")]
    ResponseTimeout { millis: u64 },

    #[error("Malformed frame received from device: {reason}")]
    MalformedFrame { reason: &'static str },

    #[error("The device is not connected")]
    NotConnected,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Connection failed: {source}")]
    Connection { #[from] source: DeviceError },

    #[error("Tare failed: {source}")]
    Tare { source: DeviceError },

    #[error("No scale is connected")]
    NotConnected,

    #[error("UI element {0} not found")]
    ElementMissing(ElementId),
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    eprintln!("{}", &message);
    if let Err(err) = msgbox::create(concat!("Progressor Jump ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        eprintln!("Failed to create msgbox: {:?}", err);
    }
}
