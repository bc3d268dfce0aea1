use crate::constants::{
    MAX_I128_REPR, MAX_I32_SCALE, MAX_PRECISION, POWERS_10, SCALE_MASK, SCALE_SHIFT, SIGN_MASK,
    SIGN_SHIFT, U8_MASK,
};
use crate::error::Error;
use crate::ops;
use crate::ops::common::Buf12;
use crate::parse::parse_digits;
use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};

/// `Decimal` represents a 128 bit fixed-point decimal number. The finite
/// set of values of type `Decimal` are of the form m / 10<sup>e</sup>,
/// where m is an integer such that -2<sup>96</sup> < m < 2<sup>96</sup>,
/// and e is an integer between 0 and 28 inclusive.
#[derive(Clone, Copy)]
pub struct Decimal {
    // Bits 0-15: unused, must be zero.
    // Bits 16-23: the scale, a value between 0 and 28.
    // Bits 24-30: unused, must be zero.
    // Bit 31: the sign, 0 meaning positive and 1 meaning negative.
    pub(crate) flags: u32,
    // The lo, mid and hi fields together hold the 96 bit mantissa.
    pub(crate) hi: u32,
    pub(crate) lo: u32,
    pub(crate) mid: u32,
}

/// The outcome of an arithmetic kernel, translated into `Option`s and
/// `Result`s (or panics) at the public surface.
pub(crate) enum CalculationResult {
    Ok(Decimal),
    Overflow,
    DivByZero,
}

#[inline]
pub(crate) const fn flags(neg: bool, scale: u32) -> u32 {
    (scale << SCALE_SHIFT) | ((neg as u32) << SIGN_SHIFT)
}

impl Decimal {
    /// The smallest value that can be represented: -79,228,162,514,264,337,593,543,950,335.
    pub const MIN: Decimal = Decimal {
        flags: SIGN_MASK,
        hi: u32::MAX,
        lo: u32::MAX,
        mid: u32::MAX,
    };
    /// The largest value that can be represented: 79,228,162,514,264,337,593,543,950,335.
    pub const MAX: Decimal = Decimal {
        flags: 0,
        hi: u32::MAX,
        lo: u32::MAX,
        mid: u32::MAX,
    };
    /// A constant representing zero.
    pub const ZERO: Decimal = Decimal {
        flags: 0,
        hi: 0,
        lo: 0,
        mid: 0,
    };
    /// A constant representing one.
    pub const ONE: Decimal = Decimal {
        flags: 0,
        hi: 0,
        lo: 1,
        mid: 0,
    };

    /// Returns a `Decimal` with a 64 bit `m` representation and
    /// corresponding `e` scale.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is greater than 28.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// let pi = Decimal::new(3141, 3);
    /// assert_eq!(pi.mantissa(), 3141);
    /// assert_eq!(pi.scale(), 3);
    /// ```
    pub fn new(num: i64, scale: u32) -> Decimal {
        match Decimal::try_new(num, scale) {
            Ok(value) => value,
            Err(_) => panic!(
                "Scale exceeds the maximum precision allowed: {} > {}",
                scale, MAX_PRECISION
            ),
        }
    }

    /// Checked version of [`Decimal::new`], erroring instead of panicking
    /// when the scale is out of range.
    pub const fn try_new(num: i64, scale: u32) -> Result<Decimal, Error> {
        if scale > MAX_PRECISION {
            return Err(Error::ScaleExceedsMaximumPrecision(scale));
        }
        let negative = num < 0;
        let num = num.unsigned_abs();
        Ok(Decimal {
            flags: flags(negative, scale),
            hi: 0,
            lo: num as u32,
            mid: (num >> 32) as u32,
        })
    }

    /// Creates a `Decimal` using a 128 bit signed `m` representation and
    /// corresponding `e` scale.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is greater than 28 or the magnitude needs more
    /// than 96 bits.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// let pi = Decimal::from_i128_with_scale(3141i128, 3);
    /// assert_eq!(pi, Decimal::new(3141, 3));
    /// ```
    pub fn from_i128_with_scale(num: i128, scale: u32) -> Decimal {
        match Decimal::try_from_i128_with_scale(num, scale) {
            Ok(value) => value,
            Err(Error::ScaleExceedsMaximumPrecision(scale)) => panic!(
                "Scale exceeds the maximum precision allowed: {} > {}",
                scale, MAX_PRECISION
            ),
            Err(_) => panic!("Number exceeds maximum value that can be represented"),
        }
    }

    /// Checked version of [`Decimal::from_i128_with_scale`].
    pub const fn try_from_i128_with_scale(num: i128, scale: u32) -> Result<Decimal, Error> {
        if scale > MAX_PRECISION {
            return Err(Error::ScaleExceedsMaximumPrecision(scale));
        }
        if num > MAX_I128_REPR || num < -MAX_I128_REPR {
            return Err(Error::Overflow);
        }
        let negative = num < 0;
        let num = num.unsigned_abs();
        Ok(Decimal {
            flags: flags(negative, scale),
            lo: num as u32,
            mid: (num >> 32) as u32,
            hi: (num >> 64) as u32,
        })
    }

    /// Returns a `Decimal` from its constituent parts.
    ///
    /// # Arguments
    ///
    /// * `lo` - The low 32 bits of a 96 bit integer.
    /// * `mid` - The middle 32 bits of a 96 bit integer.
    /// * `hi` - The high 32 bits of a 96 bit integer.
    /// * `negative` - `true` to indicate a negative number.
    /// * `scale` - A power of 10 ranging from 0 to 28.
    pub const fn from_parts(lo: u32, mid: u32, hi: u32, negative: bool, scale: u32) -> Decimal {
        Decimal {
            lo,
            mid,
            hi,
            flags: flags(negative, scale),
        }
    }

    /// Builds a decimal from a string of ASCII digits, a base ten
    /// exponent applied to the digit string read as an integer, and a
    /// sign. Excess precision is rounded to even.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// let value = Decimal::from_scientific_parts("25", -1, false).unwrap();
    /// assert_eq!(value, Decimal::new(25, 1));
    /// ```
    pub fn from_scientific_parts(digits: &str, exponent: i32, negative: bool) -> Result<Decimal, Error> {
        parse_digits(digits.as_bytes(), exponent, negative)
    }

    /// Returns the scale of the decimal number, otherwise known as `e`.
    #[inline]
    pub const fn scale(&self) -> u32 {
        (self.flags & SCALE_MASK) >> SCALE_SHIFT
    }

    /// Returns the mantissa of the decimal number as a signed integer.
    pub const fn mantissa(&self) -> i128 {
        let raw = (((self.hi as u128) << 64) | ((self.mid as u128) << 32) | (self.lo as u128)) as i128;
        if self.is_sign_negative() {
            -raw
        } else {
            raw
        }
    }

    /// Returns true if the decimal represents zero. Negative zero counts.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.lo == 0 && self.mid == 0 && self.hi == 0
    }

    /// Returns `true` if the sign bit is set.
    #[inline(always)]
    pub const fn is_sign_negative(&self) -> bool {
        self.flags & SIGN_MASK > 0
    }

    /// Returns `true` if the sign bit is clear.
    #[inline(always)]
    pub const fn is_sign_positive(&self) -> bool {
        self.flags & SIGN_MASK == 0
    }

    pub fn set_sign_positive(&mut self, positive: bool) {
        if positive {
            self.flags &= !SIGN_MASK;
        } else {
            self.flags |= SIGN_MASK;
        }
    }

    pub fn set_sign_negative(&mut self, negative: bool) {
        self.set_sign_positive(!negative);
    }

    #[inline]
    pub(crate) const fn low64(&self) -> u64 {
        ((self.mid as u64) << 32) | (self.lo as u64)
    }

    /// Returns a serialized version of the decimal number. The resulting
    /// byte array holds four little-endian 32 bit words:
    ///
    /// * Bytes 1-4: lo portion of `m`
    /// * Bytes 5-8: mid portion of `m`
    /// * Bytes 9-12: high portion of `m`
    /// * Bytes 13-16: flags
    pub const fn serialize(&self) -> [u8; 16] {
        [
            (self.lo & U8_MASK) as u8,
            ((self.lo >> 8) & U8_MASK) as u8,
            ((self.lo >> 16) & U8_MASK) as u8,
            ((self.lo >> 24) & U8_MASK) as u8,
            (self.mid & U8_MASK) as u8,
            ((self.mid >> 8) & U8_MASK) as u8,
            ((self.mid >> 16) & U8_MASK) as u8,
            ((self.mid >> 24) & U8_MASK) as u8,
            (self.hi & U8_MASK) as u8,
            ((self.hi >> 8) & U8_MASK) as u8,
            ((self.hi >> 16) & U8_MASK) as u8,
            ((self.hi >> 24) & U8_MASK) as u8,
            (self.flags & U8_MASK) as u8,
            ((self.flags >> 8) & U8_MASK) as u8,
            ((self.flags >> 16) & U8_MASK) as u8,
            ((self.flags >> 24) & U8_MASK) as u8,
        ]
    }

    /// Deserializes the given bytes into a decimal number. The byte
    /// representation must follow the convention documented on
    /// [`Decimal::serialize`]; the caller is trusted to hand over bytes
    /// that satisfy the scale and reserved-bit invariants.
    pub const fn deserialize(bytes: [u8; 16]) -> Decimal {
        Decimal {
            lo: (bytes[0] as u32) | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16 | (bytes[3] as u32) << 24,
            mid: (bytes[4] as u32) | (bytes[5] as u32) << 8 | (bytes[6] as u32) << 16 | (bytes[7] as u32) << 24,
            hi: (bytes[8] as u32) | (bytes[9] as u32) << 8 | (bytes[10] as u32) << 16 | (bytes[11] as u32) << 24,
            flags: (bytes[12] as u32) | (bytes[13] as u32) << 8 | (bytes[14] as u32) << 16 | (bytes[15] as u32) << 24,
        }
    }

    /// Computes the absolute value of `self`.
    pub fn abs(&self) -> Decimal {
        let mut me = *self;
        me.set_sign_positive(true);
        me
    }

    /// Returns a new `Decimal` with no fractional digits. This is a true
    /// truncation towards zero, whereby no rounding is performed.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// let pi = Decimal::new(3141, 3);
    /// assert_eq!(pi.trunc(), Decimal::new(3, 0));
    /// ```
    pub fn trunc(&self) -> Decimal {
        let mut scale = self.scale();
        if scale == 0 {
            // Nothing to do
            return *self;
        }
        let mut value = Buf12::new(self.lo, self.mid, self.hi);
        while scale > 0 {
            // Precision is being dropped, so remainders don't matter.
            let chunk = scale.min(MAX_I32_SCALE as u32);
            value.div32(POWERS_10[chunk as usize] as u32);
            scale -= chunk;
        }
        Decimal::from_parts(value.u0, value.u1, value.u2, self.is_sign_negative(), 0)
    }

    /// Returns the fractional portion of the number.
    pub fn fract(&self) -> Decimal {
        *self - self.trunc()
    }

    /// Returns the largest integer less than or equal to the number.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// assert_eq!(Decimal::new(-31, 1).floor(), Decimal::new(-4, 0));
    /// assert_eq!(Decimal::new(31, 1).floor(), Decimal::new(3, 0));
    /// ```
    pub fn floor(&self) -> Decimal {
        if self.scale() == 0 {
            // Nothing to do
            return *self;
        }

        let truncated = self.trunc();
        if self.is_sign_negative() && !self.fract().is_zero() {
            truncated - Decimal::ONE
        } else {
            truncated
        }
    }

    /// Returns the smallest integer greater than or equal to the number.
    pub fn ceil(&self) -> Decimal {
        if self.scale() == 0 {
            // Nothing to do
            return *self;
        }

        if self.is_sign_positive() && !self.fract().is_zero() {
            self.trunc() + Decimal::ONE
        } else {
            self.trunc()
        }
    }

    /// Returns the maximum of the two numbers.
    pub fn max(self, other: Decimal) -> Decimal {
        if self < other {
            other
        } else {
            self
        }
    }

    /// Returns the minimum of the two numbers.
    pub fn min(self, other: Decimal) -> Decimal {
        if self > other {
            other
        } else {
            self
        }
    }

    /// Strips any trailing zeros from the fraction and maps -0 to 0.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// let number = Decimal::new(3100, 3);
    /// assert_eq!(number.normalize().scale(), 1);
    /// ```
    pub fn normalize(&self) -> Decimal {
        if self.is_zero() {
            // -0 and 0.000 both collapse to plain zero.
            return Decimal::ZERO;
        }

        let mut scale = self.scale();
        let mut value = Buf12::new(self.lo, self.mid, self.hi);
        while scale > 0 && value.div_exact(10) {
            scale -= 1;
        }
        Decimal::from_parts(value.u0, value.u1, value.u2, self.is_sign_negative(), scale)
    }

    /// Returns a new `Decimal` with no fractional digits, rounding ties
    /// to the nearest even integer. e.g. 6.5 -> 6, 7.5 -> 8
    pub fn round(&self) -> Decimal {
        self.round_dp(0)
    }

    /// Returns a new `Decimal` rounded to `dp` fractional digits, with
    /// ties going to the nearest even mantissa.
    ///
    /// # Panics
    ///
    /// Panics if `dp` is greater than 28.
    ///
    /// # Example
    ///
    /// ```
    /// use dec96::Decimal;
    ///
    /// // Demonstrating bankers rounding
    /// assert_eq!(Decimal::new(65, 1).round_dp(0), Decimal::new(6, 0));
    /// assert_eq!(Decimal::new(75, 1).round_dp(0), Decimal::new(8, 0));
    /// ```
    pub fn round_dp(&self, dp: u32) -> Decimal {
        match self.checked_round_dp(dp) {
            Ok(value) => value,
            Err(_) => panic!(
                "Scale exceeds the maximum precision allowed: {} > {}",
                dp, MAX_PRECISION
            ),
        }
    }

    /// Checked version of [`Decimal::round_dp`], erroring instead of
    /// panicking when `dp` is out of range.
    pub fn checked_round_dp(&self, dp: u32) -> Result<Decimal, Error> {
        if dp > MAX_PRECISION {
            return Err(Error::ScaleExceedsMaximumPrecision(dp));
        }

        let old_scale = self.scale();
        if old_scale <= dp {
            // There's nothing to round away.
            return Ok(*self);
        }

        // Divide out the excess digits. The remainder of the last chunk
        // decides the rounding; remainders of earlier chunks only matter
        // as a sticky bit for breaking the tie.
        let mut value = Buf12::new(self.lo, self.mid, self.hi);
        let mut diff = old_scale - dp;
        let mut sticky = false;
        let mut remainder = 0u32;
        let mut divisor = 1u32;
        while diff > 0 {
            let chunk = diff.min(MAX_I32_SCALE as u32);
            sticky |= remainder != 0;
            divisor = POWERS_10[chunk as usize] as u32;
            remainder = value.div32(divisor);
            diff -= chunk;
        }

        // The divisor is a power of ten, hence always even.
        let half = divisor >> 1;
        if remainder > half || (remainder == half && (value.u0 & 1 != 0 || sticky)) {
            // Cannot carry past 96 bits after dividing by ten or more.
            value.add64(1);
        }
        Ok(Decimal::from_parts(
            value.u0,
            value.u1,
            value.u2,
            self.is_sign_negative(),
            dp,
        ))
    }

    /// Checked addition. Computes `self + other`, returning `None` if
    /// overflow occurred.
    #[inline(always)]
    pub fn checked_add(self, other: Decimal) -> Option<Decimal> {
        match ops::add_impl(&self, &other) {
            CalculationResult::Ok(result) => Some(result),
            _ => None,
        }
    }

    /// Checked subtraction. Computes `self - other`, returning `None` if
    /// overflow occurred.
    #[inline(always)]
    pub fn checked_sub(self, other: Decimal) -> Option<Decimal> {
        match ops::sub_impl(&self, &other) {
            CalculationResult::Ok(result) => Some(result),
            _ => None,
        }
    }

    /// Checked multiplication. Computes `self * other`, returning `None`
    /// if overflow occurred.
    #[inline(always)]
    pub fn checked_mul(self, other: Decimal) -> Option<Decimal> {
        match ops::mul_impl(&self, &other) {
            CalculationResult::Ok(result) => Some(result),
            _ => None,
        }
    }

    /// Checked division. Computes `self / other`, returning `None` if
    /// `other` is zero or the quotient overflowed.
    #[inline(always)]
    pub fn checked_div(self, other: Decimal) -> Option<Decimal> {
        match ops::div_impl(&self, &other) {
            CalculationResult::Ok(quotient) => Some(quotient),
            _ => None,
        }
    }

    fn from_f32_retaining_bits(n: f32) -> Option<Decimal> {
        if !n.is_finite() {
            return None;
        }

        // Break the float into its 1/8/23 sign, exponent and mantissa
        // fields; the mantissa-as-integer view shifts the exponent left
        // by the mantissa width.
        let raw = n.to_bits();
        let positive = (raw >> 31) == 0;
        let biased_exponent = ((raw >> 23) & 0xFF) as i32;
        let mut bits = (raw & 0x007F_FFFF) as u128;

        if biased_exponent == 0 && bits == 0 {
            let mut zero = Decimal::ZERO;
            if !positive {
                zero.set_sign_negative(true);
            }
            return Some(zero);
        }

        let mut exponent2 = biased_exponent - 127;
        if biased_exponent == 0 {
            // Subnormal; the hidden bit is absent and the exponent shifts.
            exponent2 += 1;
        } else {
            bits |= 0x0080_0000;
        }
        exponent2 -= 23;

        base2_to_decimal(bits, exponent2, positive, false)
    }

    fn from_f64_retaining_bits(n: f64) -> Option<Decimal> {
        if !n.is_finite() {
            return None;
        }

        // As above but with the 1/11/52 field layout.
        let raw = n.to_bits();
        let positive = (raw >> 63) == 0;
        let biased_exponent = ((raw >> 52) & 0x7FF) as i32;
        let mut bits = (raw & 0x000F_FFFF_FFFF_FFFF) as u128;

        if biased_exponent == 0 && bits == 0 {
            let mut zero = Decimal::ZERO;
            if !positive {
                zero.set_sign_negative(true);
            }
            return Some(zero);
        }

        let mut exponent2 = biased_exponent - 1023;
        if biased_exponent == 0 {
            exponent2 += 1;
        } else {
            bits |= 0x0010_0000_0000_0000;
        }
        exponent2 -= 52;

        base2_to_decimal(bits, exponent2, positive, true)
    }
}

const OVERFLOW_96: u128 = 1 << 96;

/// Convert a base two mantissa and exponent into a decimal by absorbing
/// the power of five into the mantissa and trading the leftover power of
/// ten against the scale.
fn base2_to_decimal(mut bits: u128, exponent2: i32, positive: bool, is64: bool) -> Option<Decimal> {
    // 2^e = 10^e / 5^e
    let mut exponent5 = -exponent2;
    let mut exponent10 = exponent2;

    while exponent5 > 0 {
        if bits & 1 == 0 {
            // An even mantissa halves exactly, trading 5^1 for 10^1.
            exponent10 += 1;
            exponent5 -= 1;
            bits >>= 1;
        } else {
            exponent5 -= 1;
            let multiplied = bits * 5;
            if multiplied < OVERFLOW_96 {
                bits = multiplied;
            } else {
                // No headroom to multiply; halve instead and accept the
                // loss of the low bit.
                exponent10 += 1;
                bits >>= 1;
            }
        }
    }

    while exponent5 < 0 {
        if bits & (1 << 95) == 0 {
            // Doubling trades 10^-1 for 5^-1 without losing precision.
            exponent10 -= 1;
            exponent5 += 1;
            bits <<= 1;
        } else {
            // No headroom to double; divide by five directly, losing
            // digits unless the mantissa happens to divide evenly.
            exponent5 += 1;
            bits /= 5;
        }
    }

    // The power of ten must land in [-28, 0] to become a scale.
    while exponent10 > 0 {
        let multiplied = bits * 10;
        if multiplied >= OVERFLOW_96 {
            return None;
        }
        bits = multiplied;
        exponent10 -= 1;
    }

    while exponent10 < -(MAX_PRECISION as i32) {
        let remainder = bits % 10;
        bits /= 10;
        exponent10 += 1;
        if bits == 0 {
            // Underflowed to zero; any scale will do now.
            exponent10 = 0;
        } else if remainder >= 5 {
            bits += 1;
        }
    }

    // Remove excess decimal digits beyond the precision the binary
    // mantissa actually guarantees.
    let guaranteed_bits = if is64 { 52 } else { 24 };
    while exponent10 < 0 && (bits >> guaranteed_bits) != 0 {
        let remainder = bits % 10;
        bits /= 10;
        exponent10 += 1;
        if remainder >= 5 {
            bits += 1;
        }
    }

    // Trailing zeros carry no information; drop them.
    while exponent10 < 0 && bits != 0 && bits % 10 == 0 {
        bits /= 10;
        exponent10 += 1;
    }

    Some(Decimal::from_parts(
        bits as u32,
        (bits >> 32) as u32,
        (bits >> 64) as u32,
        !positive,
        (-exponent10) as u32,
    ))
}

impl Default for Decimal {
    fn default() -> Self {
        Decimal::ZERO
    }
}

impl Zero for Decimal {
    fn zero() -> Decimal {
        Decimal::ZERO
    }

    fn is_zero(&self) -> bool {
        Decimal::is_zero(self)
    }
}

impl One for Decimal {
    fn one() -> Decimal {
        Decimal::ONE
    }
}

macro_rules! impl_from_int {
    ($($T:ty),*) => {
        $(
            impl From<$T> for Decimal {
                #[inline]
                fn from(t: $T) -> Decimal {
                    Decimal::new(t as i64, 0)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<u64> for Decimal {
    #[inline]
    fn from(t: u64) -> Decimal {
        Decimal {
            flags: 0,
            hi: 0,
            lo: t as u32,
            mid: (t >> 32) as u32,
        }
    }
}

impl From<usize> for Decimal {
    #[inline]
    fn from(t: usize) -> Decimal {
        (t as u64).into()
    }
}

impl FromPrimitive for Decimal {
    fn from_i64(n: i64) -> Option<Decimal> {
        Some(Decimal::new(n, 0))
    }

    fn from_u64(n: u64) -> Option<Decimal> {
        Some(n.into())
    }

    fn from_i128(n: i128) -> Option<Decimal> {
        Decimal::try_from_i128_with_scale(n, 0).ok()
    }

    fn from_u128(n: u128) -> Option<Decimal> {
        if n > MAX_I128_REPR as u128 {
            return None;
        }
        Decimal::try_from_i128_with_scale(n as i128, 0).ok()
    }

    fn from_f32(n: f32) -> Option<Decimal> {
        Decimal::from_f32_retaining_bits(n)
    }

    fn from_f64(n: f64) -> Option<Decimal> {
        Decimal::from_f64_retaining_bits(n)
    }
}

impl ToPrimitive for Decimal {
    fn to_i64(&self) -> Option<i64> {
        let truncated = self.trunc();
        if truncated.hi != 0 {
            // Overflow
            return None;
        }

        let raw = truncated.low64();
        if self.is_sign_negative() {
            // The minimum value has its single exact encoding here.
            if raw > 1 << 63 {
                None
            } else {
                Some(raw.wrapping_neg() as i64)
            }
        } else if raw < 1 << 63 {
            Some(raw as i64)
        } else {
            None
        }
    }

    fn to_i128(&self) -> Option<i128> {
        Some(self.trunc().mantissa())
    }

    fn to_u64(&self) -> Option<u64> {
        if self.is_sign_negative() && !self.is_zero() {
            return None;
        }
        let truncated = self.trunc();
        if truncated.hi != 0 {
            // Overflow
            return None;
        }
        Some(truncated.low64())
    }

    fn to_u128(&self) -> Option<u128> {
        if self.is_sign_negative() && !self.is_zero() {
            return None;
        }
        Some(self.trunc().mantissa() as u128)
    }

    fn to_f64(&self) -> Option<f64> {
        let sign = if self.is_sign_negative() { -1.0 } else { 1.0 };
        let mantissa = ((self.hi as u128) << 64) | self.low64() as u128;
        let scale = self.scale();
        if scale == 0 {
            return Some(sign * mantissa as f64);
        }
        // Split off the integral part so the common small values convert
        // exactly instead of through one big rounded quotient.
        let precision = 10u128.pow(scale);
        let integral = (mantissa / precision) as f64;
        let fraction = (mantissa % precision) as f64 / precision as f64;
        Some(sign * (integral + fraction))
    }
}

impl core::convert::TryFrom<f32> for Decimal {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self, Error> {
        Decimal::from_f32_retaining_bits(value).ok_or(Error::Overflow)
    }
}

impl core::convert::TryFrom<f64> for Decimal {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Error> {
        Decimal::from_f64_retaining_bits(value).ok_or(Error::Overflow)
    }
}

impl core::convert::TryFrom<Decimal> for f32 {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Error> {
        value.to_f32().ok_or(Error::Overflow)
    }
}

impl core::convert::TryFrom<Decimal> for f64 {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Error> {
        value.to_f64().ok_or(Error::Overflow)
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal {{ mantissa: {}, scale: {} }}", self.mantissa(), self.scale())
    }
}

impl Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        let mut copy = self;
        copy.set_sign_negative(self.is_sign_positive());
        copy
    }
}

impl<'a> Neg for &'a Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal {
            flags: flags(!self.is_sign_negative(), self.scale()),
            hi: self.hi,
            lo: self.lo,
            mid: self.mid,
        }
    }
}

macro_rules! forward_all_binop {
    (impl $imp:ident for Decimal, $method:ident) => {
        impl $imp<Decimal> for Decimal {
            type Output = Decimal;

            #[inline(always)]
            fn $method(self, other: Decimal) -> Decimal {
                $imp::$method(&self, &other)
            }
        }

        impl<'a> $imp<&'a Decimal> for Decimal {
            type Output = Decimal;

            #[inline(always)]
            fn $method(self, other: &Decimal) -> Decimal {
                $imp::$method(&self, other)
            }
        }

        impl<'a> $imp<Decimal> for &'a Decimal {
            type Output = Decimal;

            #[inline(always)]
            fn $method(self, other: Decimal) -> Decimal {
                $imp::$method(self, &other)
            }
        }
    };
}

forward_all_binop!(impl Add for Decimal, add);

impl<'a, 'b> Add<&'b Decimal> for &'a Decimal {
    type Output = Decimal;

    #[inline(always)]
    fn add(self, other: &Decimal) -> Decimal {
        match self.checked_add(*other) {
            Some(sum) => sum,
            None => panic!("Addition overflowed"),
        }
    }
}

forward_all_binop!(impl Sub for Decimal, sub);

impl<'a, 'b> Sub<&'b Decimal> for &'a Decimal {
    type Output = Decimal;

    #[inline(always)]
    fn sub(self, other: &Decimal) -> Decimal {
        match self.checked_sub(*other) {
            Some(diff) => diff,
            None => panic!("Subtraction overflowed"),
        }
    }
}

forward_all_binop!(impl Mul for Decimal, mul);

impl<'a, 'b> Mul<&'b Decimal> for &'a Decimal {
    type Output = Decimal;

    #[inline(always)]
    fn mul(self, other: &Decimal) -> Decimal {
        match self.checked_mul(*other) {
            Some(product) => product,
            None => panic!("Multiplication overflowed"),
        }
    }
}

forward_all_binop!(impl Div for Decimal, div);

impl<'a, 'b> Div<&'b Decimal> for &'a Decimal {
    type Output = Decimal;

    fn div(self, other: &Decimal) -> Decimal {
        match self.checked_div(*other) {
            Some(quotient) => quotient,
            None => {
                if other.is_zero() {
                    panic!("Division by zero");
                } else {
                    panic!("Division overflowed");
                }
            }
        }
    }
}

impl AddAssign for Decimal {
    fn add_assign(&mut self, other: Decimal) {
        *self = *self + other;
    }
}

impl SubAssign for Decimal {
    fn sub_assign(&mut self, other: Decimal) {
        *self = *self - other;
    }
}

impl MulAssign for Decimal {
    fn mul_assign(&mut self, other: Decimal) {
        *self = *self * other;
    }
}

impl DivAssign for Decimal {
    fn div_assign(&mut self, other: Decimal) {
        *self = *self / other;
    }
}

impl PartialEq for Decimal {
    #[inline]
    fn eq(&self, other: &Decimal) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Equal values must hash alike even when their representations
        // differ, so hash through the double conversion. Masking the low
        // mantissa nibble papers over the rounding differences between
        // conversions of the same value at different scales.
        let value = self.to_f64().unwrap_or(0.0);
        if value == 0.0 {
            // +0 and -0 share a hash code.
            state.write_i32(0);
            return;
        }
        let bits = value.to_bits();
        state.write_i32(((bits as u32 & 0xFFFF_FFF0) ^ (bits >> 32) as u32) as i32);
    }
}

impl PartialOrd for Decimal {
    #[inline]
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Decimal) -> Ordering {
        ops::cmp_impl(self, other)
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        let mut sum = Decimal::ZERO;
        for i in iter {
            sum += i;
        }
        sum
    }
}

impl<'a> Sum<&'a Decimal> for Decimal {
    fn sum<I: Iterator<Item = &'a Decimal>>(iter: I) -> Self {
        let mut sum = Decimal::ZERO;
        for i in iter {
            sum += *i;
        }
        sum
    }
}

#[cfg(test)]
mod test {
    // Tests on private helpers; the public behaviour is covered under
    // `tests/`.

    use super::*;

    #[test]
    fn flags_packs_sign_and_scale() {
        assert_eq!(flags(false, 0), 0);
        assert_eq!(flags(false, 28), 28 << 16);
        assert_eq!(flags(true, 5), (1 << 31) | (5 << 16));
    }

    #[test]
    fn base2_conversion_of_exact_halves() {
        // 0.5 = 1 * 2^-1 converts without any precision loss.
        let value = base2_to_decimal(1, -1, true, true).unwrap();
        assert_eq!(value.mantissa(), 5);
        assert_eq!(value.scale(), 1);
    }

    #[test]
    fn base2_conversion_overflows_large_exponents() {
        assert!(base2_to_decimal(1, 100, true, true).is_none());
    }

    #[test]
    fn low64_combines_the_low_words() {
        let value = Decimal::from_parts(2, 1, 0, false, 0);
        assert_eq!(value.low64(), (1 << 32) | 2);
    }
}
