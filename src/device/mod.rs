pub mod constants;
pub mod progressor;
pub mod protocol;
pub mod scale;
pub mod simulated;
pub mod types;
