pub mod processor;

pub use processor::SubblockProcessor;
