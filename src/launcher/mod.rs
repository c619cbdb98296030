pub mod browser;
pub mod error;
pub mod manifest;
pub mod preview;
pub mod progress;
pub mod shell;
pub mod workflow;

#[cfg(test)]
pub mod testing;

pub use workflow::Workflow;
