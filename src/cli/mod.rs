pub(crate) mod command;

pub use self::command::{Args, Command, OutputFormat};
