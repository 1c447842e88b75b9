use crate::errors::StoreResult;
use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::path::Path;

pub use conn_builder::ConnBuilder;

mod conn_builder;

/// The DB type used for Bobtail stores
pub type DB = DBWithThreadMode<MultiThreaded>;

/// Deletes an existing DB if it exists
pub fn delete_db(db_dir: impl AsRef<Path>) -> StoreResult<()> {
    if !db_dir.as_ref().exists() {
        return Ok(());
    }
    DB::destroy(&rocksdb::Options::default(), db_dir)?;
    Ok(())
}
