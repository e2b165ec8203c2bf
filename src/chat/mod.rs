pub mod render;
mod repl;

pub use repl::run;
