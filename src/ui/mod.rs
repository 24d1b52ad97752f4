pub mod document;
pub mod reflector;
