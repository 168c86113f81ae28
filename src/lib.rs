pub mod board;
pub mod cli;
pub mod logging;
pub mod notification;
pub mod settings;
pub mod store;
pub mod types;
