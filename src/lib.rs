pub mod models;
pub mod queue;
pub mod services;
pub mod utils;
