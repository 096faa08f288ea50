mod commands;

pub use commands::{document, Cli};
