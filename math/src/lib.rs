pub mod uint;

use thiserror::Error;

pub use uint::Uint256;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UintError {
    #[error("hex string of {0} digits does not fit 256 bits")]
    InvalidHexLength(usize),

    #[error("invalid hex character")]
    InvalidHexChar,

    #[error("value does not fit 256 bits")]
    Overflow,
}
