use crate::UintError;
use malachite_nz::natural::Natural;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    iter::Sum,
    ops::{Add, Div, Not, Rem, Shl, Shr, Sub},
};

const LIMBS: usize = 4;

/// Little-endian 256-bit unsigned integer
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Uint256(pub [u64; LIMBS]);

impl Uint256 {
    pub const ZERO: Self = Uint256([0; LIMBS]);
    pub const ONE: Self = Uint256([1, 0, 0, 0]);
    pub const MAX: Self = Uint256([u64::MAX; LIMBS]);
    pub const BITS: u32 = LIMBS as u32 * u64::BITS;
    pub const BYTES: usize = LIMBS * size_of::<u64>();

    #[inline]
    pub const fn from_u64(n: u64) -> Self {
        Uint256([n, 0, 0, 0])
    }

    #[inline]
    pub const fn from_u128(n: u128) -> Self {
        Uint256([n as u64, (n >> 64) as u64, 0, 0])
    }

    /// The low 64 bits
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0[0]
    }

    #[inline]
    pub fn try_as_u64(self) -> Option<u64> {
        (self.0[1..].iter().all(|&w| w == 0)).then_some(self.0[0])
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Position of the highest set bit plus one, or zero for zero
    #[inline]
    pub fn bits(&self) -> u32 {
        for (i, &word) in self.0.iter().enumerate().rev() {
            if word != 0 {
                return u64::BITS * i as u32 + (u64::BITS - word.leading_zeros());
            }
        }
        0
    }

    #[inline]
    pub fn leading_zeros(&self) -> u32 {
        Self::BITS - self.bits()
    }

    /// Shifts left, dropping bits shifted past the top. `s >= 256` yields zero.
    pub fn wrapping_shl(self, s: u32) -> Self {
        if s >= Self::BITS {
            return Self::ZERO;
        }
        let word_shift = (s / u64::BITS) as usize;
        let bit_shift = s % u64::BITS;
        let mut ret = [0u64; LIMBS];
        for i in word_shift..LIMBS {
            ret[i] = self.0[i - word_shift] << bit_shift;
            if bit_shift > 0 && i > word_shift {
                ret[i] |= self.0[i - word_shift - 1] >> (u64::BITS - bit_shift);
            }
        }
        Uint256(ret)
    }

    pub fn wrapping_shr(self, s: u32) -> Self {
        if s >= Self::BITS {
            return Self::ZERO;
        }
        let word_shift = (s / u64::BITS) as usize;
        let bit_shift = s % u64::BITS;
        let mut ret = [0u64; LIMBS];
        for i in 0..LIMBS - word_shift {
            ret[i] = self.0[i + word_shift] >> bit_shift;
            if bit_shift > 0 && i + word_shift + 1 < LIMBS {
                ret[i] |= self.0[i + word_shift + 1] << (u64::BITS - bit_shift);
            }
        }
        Uint256(ret)
    }

    #[inline]
    pub fn overflowing_add(mut self, other: Self) -> (Self, bool) {
        let mut carry = false;
        for (lhs, &rhs) in self.0.iter_mut().zip(other.0.iter()) {
            let (sum, c1) = lhs.overflowing_add(rhs);
            let (sum, c2) = sum.overflowing_add(carry as u64);
            *lhs = sum;
            carry = c1 | c2;
        }
        (self, carry)
    }

    #[inline]
    pub fn overflowing_sub(mut self, other: Self) -> (Self, bool) {
        let mut borrow = false;
        for (lhs, &rhs) in self.0.iter_mut().zip(other.0.iter()) {
            let (diff, b1) = lhs.overflowing_sub(rhs);
            let (diff, b2) = diff.overflowing_sub(borrow as u64);
            *lhs = diff;
            borrow = b1 | b2;
        }
        (self, borrow)
    }

    #[inline]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        match self.overflowing_add(other) {
            (sum, false) => Some(sum),
            _ => None,
        }
    }

    #[inline]
    pub fn saturating_add(self, other: Self) -> Self {
        self.checked_add(other).unwrap_or(Self::MAX)
    }

    #[inline]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        match self.overflowing_sub(other) {
            (diff, false) => Some(diff),
            _ => None,
        }
    }

    /// Multiplies by a word, returning the product and the carried-out top word
    #[inline]
    pub fn carrying_mul_u64(mut self, other: u64) -> (Self, u64) {
        let mut carry = 0u128;
        for word in self.0.iter_mut() {
            let n = carry + (*word as u128) * (other as u128);
            *word = n as u64;
            carry = n >> u64::BITS;
        }
        (self, carry as u64)
    }

    #[inline]
    pub fn checked_mul_u64(self, other: u64) -> Option<Self> {
        match self.carrying_mul_u64(other) {
            (product, 0) => Some(product),
            _ => None,
        }
    }

    /// Returns (quotient, remainder). Panics on division by zero, like the primitive integers.
    pub fn div_rem_u64(mut self, other: u64) -> (Self, u64) {
        assert_ne!(other, 0, "attempted to divide {} by zero", self);
        let mut rem = 0u64;
        for word in self.0.iter_mut().rev() {
            let n = ((rem as u128) << u64::BITS) | (*word as u128);
            *word = (n / other as u128) as u64;
            rem = (n % other as u128) as u64;
        }
        (self, rem)
    }

    /// Returns (quotient, remainder) by bitwise long division. Panics on division by zero.
    pub fn div_rem(self, other: Self) -> (Self, Self) {
        self.checked_div_rem(other).unwrap_or_else(|| panic!("attempted to divide {} by zero", self))
    }

    pub fn checked_div_rem(self, other: Self) -> Option<(Self, Self)> {
        let my_bits = self.bits();
        let your_bits = other.bits();
        if your_bits == 0 {
            return None;
        }
        let mut quotient = [0u64; LIMBS];
        if my_bits < your_bits {
            return Some((Self::ZERO, self));
        }

        let mut remainder = self;
        let mut shift = my_bits - your_bits;
        let mut divisor = other.wrapping_shl(shift);
        loop {
            if remainder >= divisor {
                quotient[(shift / u64::BITS) as usize] |= 1 << (shift % u64::BITS);
                remainder = remainder - divisor;
            }
            divisor = divisor.wrapping_shr(1);
            if shift == 0 {
                break;
            }
            shift -= 1;
        }
        Some((Uint256(quotient), remainder))
    }

    /// Converts to the nearest f64, rounding half to even
    pub fn as_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let leading_zeros = self.leading_zeros();
        let aligned = self.wrapping_shl(leading_zeros);
        let top = aligned.0[LIMBS - 1];
        // 53 mantissa bits including the implicit one
        let mut mantissa = top >> 11;
        let dropped = top << 53;
        let half_bit = dropped >> 63 != 0;
        let sticky = (dropped << 1) != 0 || aligned.0[..LIMBS - 1].iter().any(|&w| w != 0);
        if half_bit && (sticky || mantissa & 1 == 1) {
            mantissa += 1;
        }
        let exponent = u64::from(Self::BITS) + 1021 - u64::from(leading_zeros);
        // Addition lets a mantissa carry bump the exponent
        f64::from_bits((exponent << 52) + mantissa)
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; Self::BYTES]) -> Self {
        let mut out = [0u64; LIMBS];
        for (word, chunk) in out.iter_mut().zip(bytes.chunks_exact(8)) {
            *word = u64::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7]]);
        }
        Uint256(out)
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.0) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    #[inline]
    pub fn to_be_bytes(self) -> [u8; Self::BYTES] {
        let mut out = self.to_le_bytes();
        out.reverse();
        out
    }

    /// Parses big-endian hex of at most 64 digits
    pub fn from_hex(hex: &str) -> Result<Self, UintError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.is_empty() || hex.len() > Self::BYTES * 2 {
            return Err(UintError::InvalidHexLength(hex.len()));
        }
        let mut padded = [b'0'; Self::BYTES * 2];
        padded[Self::BYTES * 2 - hex.len()..].copy_from_slice(hex.as_bytes());
        let mut be = [0u8; Self::BYTES];
        faster_hex::hex_decode(&padded, &mut be).map_err(|_| UintError::InvalidHexChar)?;
        be.reverse();
        Ok(Self::from_le_bytes(be))
    }

    /// Decodes the compact "bits" representation of a target
    pub fn from_compact_target_bits(bits: u32) -> Self {
        let exponent = bits >> 24;
        let mantissa = bits & 0x007f_ffff;
        if bits & 0x0080_0000 != 0 {
            // Negative targets are meaningless
            return Self::ZERO;
        }
        if exponent <= 3 {
            Self::from_u64((mantissa >> (8 * (3 - exponent))) as u64)
        } else {
            Self::from_u64(mantissa as u64).wrapping_shl(8 * (exponent - 3))
        }
    }

    /// Encodes to the compact "bits" representation. Precision below the top 23 bits is dropped.
    pub fn compact_target_bits(self) -> u32 {
        let mut size = self.bits().div_ceil(8);
        let mut compact = if size <= 3 { (self.as_u64() << (8 * (3 - size))) as u32 } else { self.wrapping_shr(8 * (size - 3)).as_u64() as u32 };
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    pub fn to_natural(&self) -> Natural {
        Natural::from_limbs_asc(&self.0)
    }

    pub fn try_from_natural(n: &Natural) -> Result<Self, UintError> {
        let limbs = n.to_limbs_asc();
        if limbs.len() > LIMBS {
            return Err(UintError::Overflow);
        }
        let mut out = [0u64; LIMBS];
        out[..limbs.len()].copy_from_slice(&limbs);
        Ok(Uint256(out))
    }
}

impl PartialOrd for Uint256 {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Uint256 {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        // Limbs are little endian, so compare from the top
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl Add for Uint256 {
    type Output = Uint256;

    #[inline]
    #[track_caller]
    fn add(self, other: Uint256) -> Uint256 {
        let (sum, carry) = self.overflowing_add(other);
        debug_assert!(!carry, "attempt to add with overflow");
        sum
    }
}

impl Sub for Uint256 {
    type Output = Uint256;

    #[inline]
    #[track_caller]
    fn sub(self, other: Uint256) -> Uint256 {
        let (diff, borrow) = self.overflowing_sub(other);
        debug_assert!(!borrow, "attempt to subtract with overflow");
        diff
    }
}

impl Div for Uint256 {
    type Output = Uint256;

    #[inline]
    fn div(self, other: Uint256) -> Uint256 {
        self.div_rem(other).0
    }
}

impl Rem for Uint256 {
    type Output = Uint256;

    #[inline]
    fn rem(self, other: Uint256) -> Uint256 {
        self.div_rem(other).1
    }
}

impl Div<u64> for Uint256 {
    type Output = Uint256;

    #[inline]
    fn div(self, other: u64) -> Uint256 {
        self.div_rem_u64(other).0
    }
}

impl Rem<u64> for Uint256 {
    type Output = u64;

    #[inline]
    fn rem(self, other: u64) -> u64 {
        self.div_rem_u64(other).1
    }
}

impl Not for Uint256 {
    type Output = Uint256;

    #[inline]
    fn not(self) -> Uint256 {
        Uint256(self.0.map(|w| !w))
    }
}

impl Shl<u32> for Uint256 {
    type Output = Uint256;

    #[inline]
    fn shl(self, shift: u32) -> Uint256 {
        self.wrapping_shl(shift)
    }
}

impl Shr<u32> for Uint256 {
    type Output = Uint256;

    #[inline]
    fn shr(self, shift: u32) -> Uint256 {
        self.wrapping_shr(shift)
    }
}

impl Sum for Uint256 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Uint256> for Uint256 {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, x| acc + *x)
    }
}

impl From<u64> for Uint256 {
    #[inline]
    fn from(n: u64) -> Self {
        Self::from_u64(n)
    }
}

impl From<u128> for Uint256 {
    #[inline]
    fn from(n: u128) -> Self {
        Self::from_u128(n)
    }
}

impl fmt::LowerHex for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut hex = [0u8; Self::BYTES * 2];
        faster_hex::hex_encode(&self.to_be_bytes(), &mut hex).map_err(|_| fmt::Error)?;
        let first_non_zero = hex.iter().position(|&x| x != b'0').unwrap_or(hex.len() - 1);
        let digits = std::str::from_utf8(&hex[first_non_zero..]).map_err(|_| fmt::Error)?;
        f.pad_integral(true, "0x", digits)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let decimal = match self.try_as_u64() {
            Some(small) => small.to_string(),
            None => self.to_natural().to_string(),
        };
        f.pad_integral(true, "", &decimal)
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uint256({:#x})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{
        ChaCha8Rng,
        rand_core::{RngCore, SeedableRng},
    };

    fn random_u128s(seed: u64, n: usize) -> Vec<u128> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| ((rng.next_u64() as u128) << 64) | rng.next_u64() as u128).collect()
    }

    #[test]
    fn test_arithmetic_matches_u128() {
        let values = random_u128s(42, 256);
        for pair in values.chunks_exact(2) {
            let (a, b) = (pair[0] >> 1, pair[1] >> 1);
            let (ua, ub) = (Uint256::from_u128(a), Uint256::from_u128(b));
            assert_eq!(ua + ub, Uint256::from_u128(a + b));
            let (hi, lo) = if a > b { (a, b) } else { (b, a) };
            assert_eq!(Uint256::from_u128(hi) - Uint256::from_u128(lo), Uint256::from_u128(hi - lo));
            if lo != 0 {
                let (q, r) = Uint256::from_u128(hi).div_rem(Uint256::from_u128(lo));
                assert_eq!((q, r), (Uint256::from_u128(hi / lo), Uint256::from_u128(hi % lo)));
            }
            assert_eq!(ua.cmp(&ub), a.cmp(&b));
            assert_eq!((ua << 7) >> 7, ua);
        }
    }

    #[test]
    fn test_overflow_flags() {
        assert_eq!(Uint256::MAX.overflowing_add(Uint256::ONE), (Uint256::ZERO, true));
        assert_eq!(Uint256::ZERO.overflowing_sub(Uint256::ONE), (Uint256::MAX, true));
        assert_eq!(Uint256::MAX.checked_add(Uint256::ONE), None);
        assert_eq!(Uint256::MAX.saturating_add(Uint256::ONE), Uint256::MAX);
        assert_eq!(Uint256::MAX.checked_mul_u64(2), None);
        assert_eq!(Uint256::ONE.checked_div_rem(Uint256::ZERO), None);
    }

    #[test]
    fn test_shifts_cross_words() {
        let one = Uint256::ONE;
        assert_eq!(one << 64, Uint256([0, 1, 0, 0]));
        assert_eq!(one << 255, Uint256([0, 0, 0, 1 << 63]));
        assert_eq!(one << 256, Uint256::ZERO);
        assert_eq!(Uint256([0, 0, 0, 1 << 63]) >> 255, one);
        assert_eq!(Uint256([0, 1, 0, 0]) >> 1, Uint256([1 << 63, 0, 0, 0]));
        assert_eq!((one << 200).bits(), 201);
        assert_eq!(Uint256::ZERO.leading_zeros(), 256);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Uint256::ZERO.as_f64(), 0.0);
        assert_eq!(Uint256::from_u64(1_000_000).as_f64(), 1_000_000.0);
        assert_eq!(Uint256::from_u64(u64::MAX).as_f64(), u64::MAX as f64);
        assert_eq!((Uint256::ONE << 200).as_f64(), 2f64.powi(200));
        assert_eq!(Uint256::MAX.as_f64(), 2f64.powi(256));
    }

    #[test]
    fn test_compact_target_bits() {
        let five = Uint256::from_u64(5);
        assert_eq!(five.compact_target_bits(), 0x0105_0000);
        assert_eq!(Uint256::from_compact_target_bits(0x0105_0000), five);

        // Bitcoin's genesis target
        let bits = 0x1d00_ffff;
        let target = Uint256::from_compact_target_bits(bits);
        assert_eq!(target, Uint256::from_u64(0xffff) << (8 * (0x1d - 3)));
        assert_eq!(target.compact_target_bits(), bits);

        // The sign bit forces a longer encoding
        let x = Uint256::from_u64(0x80);
        assert_eq!(x.compact_target_bits(), 0x0200_8000);
        assert_eq!(Uint256::from_compact_target_bits(0x0200_8000), x);
        assert_eq!(Uint256::from_compact_target_bits(0x0180_0000), Uint256::ZERO);
    }

    #[test]
    fn test_natural_conversion() {
        let x = Uint256([1, 2, 3, 4]);
        assert_eq!(Uint256::try_from_natural(&x.to_natural()), Ok(x));
        let too_big = Uint256::MAX.to_natural() + Natural::from(1u32);
        assert_eq!(Uint256::try_from_natural(&too_big), Err(UintError::Overflow));
    }

    #[test]
    fn test_formatting_and_hex() {
        let x = Uint256::from_u64(255) << 128;
        assert_eq!(format!("{:x}", x), "ff00000000000000000000000000000000");
        assert_eq!(Uint256::from_hex("0xff00000000000000000000000000000000"), Ok(x));
        assert_eq!(Uint256::from_u64(630).to_string(), "630");
        assert_eq!((Uint256::ONE << 64).to_string(), "18446744073709551616");
        assert!(Uint256::from_hex("xyz").is_err());
        assert!(Uint256::from_hex("").is_err());
    }

    #[test]
    fn test_byte_order() {
        let mut bytes = [0u8; 32];
        bytes[0] = 7;
        bytes[31] = 1;
        let x = Uint256::from_le_bytes(bytes);
        assert_eq!(x, Uint256([7, 0, 0, 1 << 56]));
        assert_eq!(x.to_le_bytes(), bytes);
        assert_eq!(bincode::deserialize::<Uint256>(&bincode::serialize(&x).unwrap()).unwrap(), x);
    }
}
