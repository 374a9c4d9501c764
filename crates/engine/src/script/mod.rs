mod command;
mod engine;
mod host;

pub use command::{MapCommand, MapCommandList};
pub use engine::{ScriptEngine, ScriptMode};
pub use host::ScriptHost;

#[cfg(test)]
pub(crate) use host::testing;
