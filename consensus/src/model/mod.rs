pub mod epoch;
pub mod services;
pub mod stores;
