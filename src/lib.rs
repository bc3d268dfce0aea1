//! A fixed-point decimal number type built around a 96 bit mantissa, a
//! decimal scale between 0 and 28, and a sign bit.
//!
//! Values take the form `m / 10^e` with `|m| < 2^96` and `e` in `[0, 28]`,
//! which makes quantities like money behave the way people expect:
//! `0.1 + 0.2` is exactly `0.3`, multiplication carries exact scales, and
//! anything that cannot be represented exactly is rounded half-to-even.
//!
//! ```
//! use dec96::Decimal;
//!
//! let amount = Decimal::new(2500, 2); // 25.00
//! let rate = Decimal::new(8, 2);      // 0.08
//! assert_eq!(amount * rate, Decimal::new(2, 0));
//!
//! // Scales widen to the finer operand and are preserved exactly.
//! let sum = Decimal::new(10, 1) + Decimal::new(200, 2); // 1.0 + 2.00
//! assert_eq!(sum.mantissa(), 300);
//! assert_eq!(sum.scale(), 2);
//! ```
//!
//! Arithmetic that overflows the 96 bit mantissa reports it: the operator
//! impls panic like the primitive integer types do, while the
//! `checked_*` methods return `Option`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

mod constants;
mod decimal;
mod error;
mod ops;
mod parse;
#[cfg(feature = "serde")]
mod serde;

pub use crate::decimal::Decimal;
pub use crate::error::Error;
