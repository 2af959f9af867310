// Terminal front end - the interactive chat loop.

#[path = "repl.rs"]
pub mod repl;

pub use repl::Repl;
