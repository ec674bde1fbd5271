pub mod job;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod reveal;
