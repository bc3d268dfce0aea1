use crate::constants::{MAX_I64_SCALE, MAX_PRECISION_I32, POWERS_10};
use crate::decimal::{CalculationResult, Decimal};
use crate::ops::common::scale_result;

pub(crate) fn mul_impl(d1: &Decimal, d2: &Decimal) -> CalculationResult {
    let negative = d1.is_sign_negative() ^ d2.is_sign_negative();
    let mut scale = (d1.scale() + d2.scale()) as i32;

    if (d1.hi | d2.hi) == 0 {
        // Both mantissas fit in 64 bits, so a single widening multiply
        // covers the whole product.
        let product = d1.low64() as u128 * d2.low64() as u128;
        let high = (product >> 64) as u64;
        let mut low = product as u64;
        if high == 0 {
            if scale > MAX_PRECISION_I32 {
                // The combined scale is out of range; divide by ten until
                // it fits. Past 10^19 the exact quotient is below a half,
                // which rounds to zero.
                scale -= MAX_PRECISION_I32;
                if scale > MAX_I64_SCALE {
                    return CalculationResult::Ok(Decimal::ZERO);
                }
                let power = POWERS_10[scale as usize];
                let remainder = low % power;
                low /= power;

                // The divisor is a power of ten, so it is always even.
                let half = power >> 1;
                if remainder > half || (remainder == half && (low & 1) != 0) {
                    low += 1;
                }
                scale = MAX_PRECISION_I32;
            }
            return CalculationResult::Ok(Decimal::from_parts(
                low as u32,
                (low >> 32) as u32,
                0,
                negative,
                scale as u32,
            ));
        }

        let mut buf = [low, high, 0];
        return match scale_result(&mut buf, 1, scale) {
            Some(scale) => CalculationResult::Ok(Decimal::from_parts(
                buf[0] as u32,
                (buf[0] >> 32) as u32,
                buf[1] as u32,
                negative,
                scale,
            )),
            None => CalculationResult::Overflow,
        };
    }

    // A 96 x 96 bit product needs up to 192 bits, accumulated from four
    // partial products:
    //
    //          [l-hi][ l-low64 ]
    //       x  [r-hi][ r-low64 ]
    //       -----------------------
    //               [ lo * lo  ]     128 bits
    //         [ lo * hi ]             96 bits
    //         [ hi * lo ]             96 bits
    //  [hi*hi]                        64 bits
    let product = d1.low64() as u128 * d2.low64() as u128;
    let mut buf = [product as u64, 0, 0];
    let mut mid = (product >> 64) as u64;
    buf[2] = d1.hi as u64 * d2.hi as u64;

    // Each cross product tops out 32 bits below the full width, so the
    // top word absorbs both carries without overflowing.
    let cross = d1.low64() as u128 * d2.hi as u128;
    let (sum, carry) = mid.overflowing_add(cross as u64);
    mid = sum;
    buf[2] = buf[2].wrapping_add((cross >> 64) as u64).wrapping_add(carry as u64);

    let cross = d2.low64() as u128 * d1.hi as u128;
    let (sum, carry) = mid.overflowing_add(cross as u64);
    mid = sum;
    buf[2] = buf[2].wrapping_add((cross >> 64) as u64).wrapping_add(carry as u64);

    buf[1] = mid;

    // Strip leading zero words before working out the scaling.
    let mut hi_index = 2;
    while buf[hi_index] == 0 {
        if hi_index == 0 {
            return CalculationResult::Ok(Decimal::ZERO);
        }
        hi_index -= 1;
    }

    match scale_result(&mut buf, hi_index, scale) {
        Some(scale) => CalculationResult::Ok(Decimal::from_parts(
            buf[0] as u32,
            (buf[0] >> 32) as u32,
            buf[1] as u32,
            negative,
            scale,
        )),
        None => CalculationResult::Overflow,
    }
}
