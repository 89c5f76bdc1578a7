//! Terminal surface: a line-oriented loop over one [`Session`](crate::application::Session).

mod render;
mod repl;

pub use render::TypingRenderer;
pub use repl::{parse_command, Command, Console};
