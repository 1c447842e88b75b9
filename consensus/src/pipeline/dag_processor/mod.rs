pub mod processor;

pub use processor::{DagProcessingMessage, DagProcessor, FinalizeResultSender, StrongBlockResultSender};
