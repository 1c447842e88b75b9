pub mod aggregation;
pub mod difficulty;
pub mod finalizer;
pub mod kos;
pub mod ordering;
pub mod selector;
pub mod strong_block_validator;
pub mod validator;
