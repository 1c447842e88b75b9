use crate::{db::DB, errors::StoreResult};
use rocksdb::{BlockBasedOptions, DBCompressionType};
use std::{path::PathBuf, sync::Arc};

const KB: usize = 1024;
const MB: usize = 1024 * KB;

#[derive(Debug)]
pub struct Unspecified;

/// Builds a RocksDB connection. The path must be set before `build` becomes available.
#[derive(Debug)]
pub struct ConnBuilder<Path> {
    db_path: Path,
    create_if_missing: bool,
    parallelism: usize,
    files_limit: i32,
    write_buffer_size: usize,
}

impl Default for ConnBuilder<Unspecified> {
    fn default() -> Self {
        ConnBuilder { db_path: Unspecified, create_if_missing: true, parallelism: 1, files_limit: 500, write_buffer_size: 16 * MB }
    }
}

impl<Path> ConnBuilder<Path> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf> {
        ConnBuilder {
            db_path,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            files_limit: self.files_limit,
            write_buffer_size: self.write_buffer_size,
        }
    }

    pub fn with_create_if_missing(self, create_if_missing: bool) -> Self {
        ConnBuilder { create_if_missing, ..self }
    }

    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> Self {
        ConnBuilder { parallelism: parallelism.into(), ..self }
    }

    pub fn with_files_limit(self, files_limit: impl Into<i32>) -> Self {
        ConnBuilder { files_limit: files_limit.into(), ..self }
    }

    pub fn with_write_buffer_size(self, write_buffer_size: usize) -> Self {
        ConnBuilder { write_buffer_size, ..self }
    }
}

impl ConnBuilder<PathBuf> {
    pub fn build(self) -> StoreResult<Arc<DB>> {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_keep_log_file_num(1);
        opts.set_compression_per_level(&[DBCompressionType::None, DBCompressionType::Lz4, DBCompressionType::Lz4]);
        opts.set_level_compaction_dynamic_level_bytes(true);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(4.9, true);
        block_opts.set_block_size(64 * KB);
        opts.set_block_based_table_factory(&block_opts);

        opts.set_max_open_files(self.files_limit);
        opts.create_if_missing(self.create_if_missing);
        Ok(Arc::new(DB::open(&opts, &self.db_path)?))
    }
}
