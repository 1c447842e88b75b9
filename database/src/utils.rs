use crate::{db::ConnBuilder, errors::StoreResult, prelude::DB};
use std::sync::{Arc, Weak};
use tempfile::TempDir;

/// Keeps a temporary DB directory alive. The directory is removed on drop,
/// after the DB itself has been closed.
pub struct DbLifetime {
    weak_db_ref: Weak<DB>,
    tempdir: Option<TempDir>,
}

impl DbLifetime {
    pub fn new(tempdir: TempDir, weak_db_ref: Weak<DB>) -> Self {
        Self { tempdir: Some(tempdir), weak_db_ref }
    }

    /// Tracks a DB living in a directory owned by someone else
    pub fn without_destroy(weak_db_ref: Weak<DB>) -> Self {
        Self { tempdir: None, weak_db_ref }
    }
}

impl Drop for DbLifetime {
    fn drop(&mut self) {
        if self.weak_db_ref.strong_count() > 0 {
            // The DB outlives this guard, so leave the files in place for it
            if let Some(tempdir) = self.tempdir.take() {
                std::mem::forget(tempdir);
            }
        }
    }
}

pub fn create_temp_db_with<P>(builder: ConnBuilder<P>) -> StoreResult<(DbLifetime, Arc<DB>)> {
    let tempdir = tempfile::Builder::new().prefix("bobtail-db-").tempdir()?;
    let db = builder.with_db_path(tempdir.path().to_owned()).build()?;
    Ok((DbLifetime::new(tempdir, Arc::downgrade(&db)), db))
}

/// Creates a DB within a temp directory, returning `StoreResult<(DbLifetime, Arc<DB>)>`.
/// Callers must keep the lifetime guard alive for as long as the DB is used.
#[macro_export]
macro_rules! create_temp_db {
    ($conn_builder: expr) => {{ $crate::utils::create_temp_db_with($conn_builder) }};
}
