use futures::channel::mpsc::Sender;
use iced::{Alignment, Application, Command, Element, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::theme::{self, Theme};
use iced::widget::{Column, button, column, container, horizontal_rule, row, text, text_input};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::config::types::{Config, ConfigOverrides};
use crate::controller::task::{controller_subscription, ControlCommand, ControllerEvent};
use crate::error::AppRunError;
use crate::gui::style::{status_color, TextButtonStyleSheet};
use crate::gui::types::Message;
use crate::ui::document::{Document, ElementId};

pub struct ApplicationFlags {
    config_io: ConfigIO,
    overrides: ConfigOverrides,
}

pub struct MyApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    // messages that the user must click away
    notices: Vec<String>,

    config_io: ConfigIO,
    overrides: ConfigOverrides,
    // the scale controller is started once the config has been loaded
    config: Option<Config>,

    controller_sender: Option<Sender<ControlCommand>>,

    // latest snapshot published by the scale controller
    document: Document,
    threshold_text: String,
}

impl MyApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
    }

    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();

        let fut = async move {
            match config_io.read().await {
                Ok(config) => (config, None),
                Err(err) => {
                    error!("Failed to load config: {:?}", &err);
                    (Config::default(), Some(format!("Failed to load config, using defaults: {}", &err)))
                }
            }
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn send_command(&mut self, command: ControlCommand) -> Command<Message> {
        match self.controller_sender.as_mut() {
            None => warn!("Scale controller is not running yet, ignoring {:?}", command),
            Some(sender) => {
                // try_send keeps the commands in the order the user gave them
                if let Err(err) = sender.try_send(command) {
                    error!("Failed to send command to scale controller: {}", err);
                }
            },
        }

        Command::none()
    }

    fn element_text(&self, id: ElementId) -> Option<Element<Message>> {
        let element = self.document.get(id)?;
        let mut label = text(&element.text);

        if let Some(color) = status_color(element) {
            label = label.style(color);
        }

        Some(label.into())
    }

    fn control_button(&self, id: ElementId, label: &'static str, on_press: Message) -> Option<Element<Message>> {
        let element = self.document.get(id)?;
        let mut control = button(text(label)).width(100);

        if !element.disabled {
            control = control.on_press(on_press);
        }

        Some(control.into())
    }

    fn view_mini(&self) -> Option<Element<Message>> {
        let control_mini = self.document.get(ElementId::ControlMini)?;

        let style = if control_mini.has_class("connected") {
            theme::Button::Positive
        }
        else if control_mini.has_class("connecting") {
            theme::Button::Primary
        }
        else {
            theme::Button::Secondary
        };

        let content = row![]
            .push_maybe(self.document.text(ElementId::MiniStatus).map(|value| text(value)))
            .push_maybe(self.document.text(ElementId::MiniWeight).map(|value| text(value)))
            .spacing(20);

        Some(
            button(content)
                .style(style)
                .on_press(Message::ControlMiniPress)
                .into()
        )
    }

    fn view_panel(&self) -> Option<Element<Message>> {
        if !self.document.has_class(ElementId::ControlPanel, "expanded") {
            return None;
        }

        let labelled = |label: &'static str, id: ElementId| -> Option<Element<Message>> {
            self.element_text(id).map(|value| {
                row![text(label).width(100), value]
                    .align_items(Alignment::Center)
                    .into()
            })
        };

        let weight = self.document.get(ElementId::WeightDisplay).map(|element| {
            let mut weight = text(&element.text).size(48);
            if let Some(color) = status_color(element) {
                weight = weight.style(color);
            }
            weight
        });

        let threshold = self.document.get(ElementId::ThresholdInput).map(|_| {
            row![
                text("Threshold").width(100),
                text_input("5", &self.threshold_text)
                    .width(80)
                    .on_input(Message::ThresholdInput),
                text("kg"),
            ]
            .align_items(Alignment::Center)
            .spacing(5)
        });

        let buttons = row![]
            .push_maybe(self.control_button(ElementId::ConnectButton, "Connect", Message::ConnectPress))
            .push_maybe(self.control_button(ElementId::TareButton, "Tare", Message::TarePress))
            .push_maybe(self.control_button(ElementId::DisconnectButton, "Disconnect", Message::DisconnectPress))
            .spacing(10);

        let handle = self.document.get(ElementId::PanelHandle).map(|_| {
            button(text("▾ Hide"))
                .style(theme::Button::Custom(Box::new(TextButtonStyleSheet)))
                .on_press(Message::PanelHandlePress)
        });

        let panel = Column::new()
            .push_maybe(handle)
            .push_maybe(labelled("Status", ElementId::ConnectionStatus))
            .push_maybe(labelled("Battery", ElementId::BatteryLevel))
            .push(horizontal_rule(10))
            .push_maybe(weight)
            .push_maybe(threshold)
            .push(buttons)
            .spacing(15)
            .align_items(Alignment::Center);

        Some(panel.into())
    }

    fn view_overlay(&self) -> Option<Element<Message>> {
        if !self.document.has_class(ElementId::Overlay, "active") {
            return None;
        }

        Some(
            button(text("Close panel").size(14))
                .style(theme::Button::Custom(Box::new(TextButtonStyleSheet)))
                .on_press(Message::OverlayPress)
                .into()
        )
    }
}

impl Application for MyApplication {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (MyApplication, Command<Self::Message>) {
        let app = MyApplication {
            app_cancel: CancellationToken::new(),
            notices: Vec::new(),
            config_io: flags.config_io,
            overrides: flags.overrides,
            config: None,
            controller_sender: None,
            document: Document::empty(),
            threshold_text: String::new(),
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        String::from(concat!("Progressor Jump ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((mut config, error_message)) => {
                info!("Config load complete");
                config.apply(&self.overrides);
                self.threshold_text = config.threshold.to_string();
                self.config = Some(config);
                if let Some(error_message) = error_message {
                    self.notices.push(error_message);
                }
            },
            Message::Controller(ControllerEvent::Ready(sender)) => {
                info!("Scale controller ready");
                self.controller_sender = Some(sender);
            },
            Message::Controller(ControllerEvent::Document(document)) => {
                self.document = document;
            },
            Message::Controller(ControllerEvent::Alert(message)) => {
                self.notices.push(message);
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();
                return window::close(id);
            },
            Message::EventOccurred(_) => {},

            Message::ControlMiniPress => {
                info!("Control mini clicked");
                return self.send_command(ControlCommand::TogglePanel);
            },
            Message::PanelHandlePress => {
                info!("Panel handle clicked");
                return self.send_command(ControlCommand::TogglePanel);
            },
            Message::OverlayPress => {
                info!("Overlay clicked");
                return self.send_command(ControlCommand::ClosePanel);
            },
            Message::ConnectPress => {
                info!("Connect button clicked");
                return self.send_command(ControlCommand::Connect);
            },
            Message::TarePress => {
                info!("Tare button clicked");
                return self.send_command(ControlCommand::Tare);
            },
            Message::DisconnectPress => {
                info!("Disconnect button clicked");
                return self.send_command(ControlCommand::Disconnect);
            },
            Message::ThresholdInput(value) => {
                self.threshold_text = value.clone();
                return self.send_command(ControlCommand::ThresholdInput(value));
            },
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen().map(Message::EventOccurred)];

        if let Some(config) = &self.config {
            subscriptions.push(
                controller_subscription(self.app_cancel.clone(), config.clone()).map(Message::Controller)
            );
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<Message> {
        // a notice blocks the rest of the window until it is confirmed
        if let Some(notice) = self.notices.first() {
            return container(
                column![
                    text(notice),

                    button(text("Okay"))
                        .on_press(Message::NoticeConfirmed),

                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let content = Column::new()
            .push_maybe(self.view_mini())
            .push_maybe(self.view_panel())
            .push_maybe(self.view_overlay())
            .spacing(20)
            .width(Length::Fill)
            .align_items(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .padding(20)
            .into()
    }
}

pub fn run_application(overrides: ConfigOverrides) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync()?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let flags = ApplicationFlags { config_io, overrides };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("progressor-jump".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(380.0, 520.0);
    settings.window.resizable = false;

    // this function will call process::exit() unless there was a startup error
    MyApplication::run(settings)?;
    Ok(())
}
