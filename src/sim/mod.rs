pub mod input_sim;
pub mod types;
