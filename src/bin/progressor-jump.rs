use std::env;
use log::info;
use msgbox::IconType;
use progressor_jump::{init_logging, run};
use progressor_jump::error::{error_msgbox, AppRunError, ConfigError};

fn main() -> Result<(), AppRunError> {
    init_logging();
    info!(concat!("Progressor Jump ", env!("CARGO_PKG_VERSION")));

    let args = env::args();

    match run(args) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            if let Err(err) = msgbox::create(
                concat!("Progressor Jump ", env!("CARGO_PKG_VERSION")),
                "This application has already been started",
                IconType::Error,
            ) {
                eprintln!("Failed to create msgbox: {:?}", err);
            }
            Ok(())
        },
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
