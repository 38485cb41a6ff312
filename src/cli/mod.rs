pub mod actions;
pub mod command;
pub mod repl;

pub use command::{Action, Command};
pub use repl::{Repl, ReplCommand, parse_line};
