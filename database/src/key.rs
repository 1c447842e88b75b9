use crate::registry::{DatabaseStorePrefixes, SEPARATOR};
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display};

/// A store key laid out as `prefix || key`
#[derive(Clone)]
pub struct DbKey {
    path: Vec<u8>,
    prefix_len: usize,
}

impl DbKey {
    pub fn new<TKey>(prefix: &[u8], key: TKey) -> Self
    where
        TKey: AsRef<[u8]>,
    {
        Self { path: prefix.iter().chain(key.as_ref().iter()).copied().collect(), prefix_len: prefix.len() }
    }

    pub fn new_with_bucket<TBucket, TKey>(prefix: &[u8], bucket: TBucket, key: TKey) -> Self
    where
        TBucket: AsRef<[u8]>,
        TKey: AsRef<[u8]>,
    {
        let mut db_key = Self::prefix_only(prefix);
        db_key.add_bucket(bucket);
        db_key.add_key(key);
        db_key
    }

    pub fn prefix_only(prefix: &[u8]) -> Self {
        Self::new(prefix, [])
    }

    /// Appends a bucket, which becomes part of the prefix
    pub fn add_bucket<TBucket>(&mut self, bucket: TBucket)
    where
        TBucket: AsRef<[u8]>,
    {
        self.path.extend(bucket.as_ref().iter());
        self.prefix_len += bucket.as_ref().len();
    }

    pub fn add_key<TKey>(&mut self, key: TKey)
    where
        TKey: AsRef<[u8]>,
    {
        self.path.extend(key.as_ref().iter());
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }
}

impl AsRef<[u8]> for DbKey {
    fn as_ref(&self) -> &[u8] {
        &self.path
    }
}

impl Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut pos = 0;
        if self.prefix_len > 0 {
            if let Some(prefix) = DatabaseStorePrefixes::from_u8(self.path[0]) {
                write!(f, "{:?}/", prefix)?;
                pos += 1;
                if self.prefix_len > 1 && self.path[1] == SEPARATOR {
                    pos += 1;
                }
            }
        }
        f.write_str(&faster_hex::hex_string(&self.path[pos..]))
    }
}

impl Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bobtail_hashes::Hash;

    #[test]
    fn test_key_display() {
        let key = DbKey::new(&[DatabaseStorePrefixes::StrongBlocks.into()], Hash::from_u64_word(0xab));
        assert!(key.to_string().starts_with("StrongBlocks/ab00"));
        assert_eq!(key.prefix_len(), 1);

        let key = DbKey::new_with_bucket(&[DatabaseStorePrefixes::StrongBlockHashByHeight.into()], [1u8, 2], [3u8]);
        assert_eq!(key.prefix_len(), 3);
        assert_eq!(key.as_ref(), &[DatabaseStorePrefixes::StrongBlockHashByHeight as u8, 1, 2, 3]);
    }
}
