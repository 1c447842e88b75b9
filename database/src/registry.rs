use enum_primitive_derive::Primitive;

/// `u8::MAX` is never used as a store prefix, so it may separate a prefix from a bucket
pub const SEPARATOR: u8 = u8::MAX;

#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DatabaseStorePrefixes {
    // ---- Consensus ----
    ChainState = 1,
    StrongBlocks = 2,
    StrongBlockHashByHeight = 3,

    // ---- Metadata ----
    DatabaseVersion = 124,

    /// Reserved as a separator
    Separator = SEPARATOR,
}

impl From<DatabaseStorePrefixes> for Vec<u8> {
    fn from(value: DatabaseStorePrefixes) -> Self {
        [value as u8].to_vec()
    }
}

impl From<DatabaseStorePrefixes> for u8 {
    fn from(value: DatabaseStorePrefixes) -> Self {
        value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_prefix_roundtrip() {
        for prefix in [DatabaseStorePrefixes::ChainState, DatabaseStorePrefixes::StrongBlocks, DatabaseStorePrefixes::StrongBlockHashByHeight] {
            assert_eq!(DatabaseStorePrefixes::from_u8(prefix.into()), Some(prefix));
        }
        assert_eq!(DatabaseStorePrefixes::from_u8(77), None);
        assert_eq!(size_of::<u8>(), size_of::<DatabaseStorePrefixes>());
    }
}
