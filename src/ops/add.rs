use crate::constants::{MAX_I64_SCALE, POWERS_10, U32_MASK};
use crate::decimal::{CalculationResult, Decimal};
use crate::ops::common::scale_result;

pub(crate) fn add_impl(d1: &Decimal, d2: &Decimal) -> CalculationResult {
    add_sub_internal(d1, d2, false)
}

pub(crate) fn sub_impl(d1: &Decimal, d2: &Decimal) -> CalculationResult {
    add_sub_internal(d1, d2, true)
}

fn add_sub_internal(d1: &Decimal, d2: &Decimal, subtract: bool) -> CalculationResult {
    // Subtracting a like sign, or adding an unlike one, subtracts the
    // magnitudes; otherwise they add.
    let subtract_magnitudes = subtract ^ d1.is_sign_negative() ^ d2.is_sign_negative();

    if d1.scale() == d2.scale() {
        return aligned_add_sub(
            d1.low64(),
            d1.hi,
            d2,
            d1.is_sign_negative(),
            d1.scale() as i32,
            subtract_magnitudes,
        );
    }
    unaligned_add_sub(d1, d2, subtract_magnitudes)
}

/// Add or subtract two magnitudes that already share a scale. The left
/// operand arrives as raw words so the rescaling path can funnel back in
/// here once its result fits 96 bits again.
fn aligned_add_sub(
    left_low64: u64,
    left_hi: u32,
    right: &Decimal,
    mut negative: bool,
    mut scale: i32,
    subtract: bool,
) -> CalculationResult {
    let mut low64;
    let mut hi;
    if subtract {
        let (low, borrow) = left_low64.overflowing_sub(right.low64());
        low64 = low;
        let (high, b1) = left_hi.overflowing_sub(right.hi);
        let (high, b2) = high.overflowing_sub(borrow as u32);
        hi = high;
        if b1 || b2 {
            // The subtraction went the wrong way round; negate the 96 bit
            // result and flip the sign.
            hi = !hi;
            low64 = low64.wrapping_neg();
            if low64 == 0 {
                hi = hi.wrapping_add(1);
            }
            negative = !negative;
        }
    } else {
        let (low, carry) = left_low64.overflowing_add(right.low64());
        low64 = low;
        let (high, c1) = left_hi.overflowing_add(right.hi);
        let (high, c2) = high.overflowing_add(carry as u32);
        hi = high;
        if c1 || c2 {
            // Carried past 96 bits; dropping one decimal digit makes room
            // unless there are no digits left to drop.
            if scale == 0 {
                return CalculationResult::Overflow;
            }
            scale -= 1;

            // Divide the 97 bit value by ten, feeding the carry bit back
            // in from the top.
            let num = (1u64 << 32) | hi as u64;
            hi = (num / 10) as u32;
            let mut remainder = (num % 10) as u32;
            let num = ((remainder as u64) << 32) | (low64 >> 32);
            let mid = (num / 10) as u32;
            remainder = (num % 10) as u32;
            let num = ((remainder as u64) << 32) | (low64 & U32_MASK);
            let lo = (num / 10) as u32;
            remainder = (num % 10) as u32;
            low64 = ((mid as u64) << 32) | lo as u64;

            if remainder >= 5 && (remainder > 5 || (lo & 1) != 0) {
                // After a divide by ten the increment cannot carry out
                // of 96 bits again.
                let (low, carry) = low64.overflowing_add(1);
                low64 = low;
                if carry {
                    hi = hi.wrapping_add(1);
                }
            }
        }
    }
    CalculationResult::Ok(Decimal::from_parts(
        low64 as u32,
        (low64 >> 32) as u32,
        hi,
        negative,
        scale as u32,
    ))
}

fn unaligned_add_sub(d1: &Decimal, d2: &Decimal, subtract_magnitudes: bool) -> CalculationResult {
    // The operand with the larger scale fixes the result scale; the other
    // one gets multiplied up to match and may grow to 192 bits. Guess
    // that the right operand carries the larger scale, swapping if not.
    let mut negative = d1.is_sign_negative();
    let mut scale = d2.scale() as i32;
    let mut diff = scale - d1.scale() as i32;
    let (lower, other) = if diff < 0 {
        diff = -diff;
        scale = d1.scale() as i32;
        negative ^= subtract_magnitudes;
        (d2, d1)
    } else {
        (d1, d2)
    };

    let mut buf = [0u64; 3];
    let mut hi_index;

    if diff <= MAX_I64_SCALE {
        // One widening multiply applies the whole power of ten.
        let power = POWERS_10[diff as usize];
        let low = lower.low64() as u128 * power as u128;
        let high = lower.hi as u128 * power as u128 + (low >> 64);
        buf[0] = low as u64;
        buf[1] = high as u64;
        buf[2] = (high >> 64) as u64;

        if buf[2] != 0 {
            hi_index = 2;
        } else if buf[1] <= U32_MASK {
            // Still 96 bits; the aligned path finishes the job.
            return aligned_add_sub(buf[0], buf[1] as u32, other, negative, scale, subtract_magnitudes);
        } else {
            hi_index = 1;
        }
    } else {
        buf[0] = lower.low64();
        buf[1] = lower.hi as u64;
        hi_index = if lower.hi != 0 { 1 } else { 0 };

        if lower.hi == 0 && buf[0] == 0 {
            // Scaling zero is still zero; the other operand is the answer
            // once the sign of the subtraction is settled.
            return CalculationResult::Ok(Decimal::from_parts(
                other.lo,
                other.mid,
                other.hi,
                negative ^ subtract_magnitudes,
                scale as u32,
            ));
        }

        // Grow the value in chunks of at most 10^19 per multiply.
        let mut remaining = diff;
        while remaining > 0 {
            let power = if remaining >= MAX_I64_SCALE {
                POWERS_10[MAX_I64_SCALE as usize]
            } else {
                POWERS_10[remaining as usize]
            };
            remaining -= MAX_I64_SCALE;

            let product = buf[0] as u128 * power as u128;
            buf[0] = product as u64;
            let mut overflow = (product >> 64) as u64;
            let mut carry = false;
            for word in buf.iter_mut().take(hi_index + 1).skip(1) {
                let product = *word as u128 * power as u128;
                let (sum, c1) = (product as u64).overflowing_add(overflow);
                let (sum, c2) = sum.overflowing_add(carry as u64);
                *word = sum;
                carry = c1 | c2;
                overflow = (product >> 64) as u64;
            }
            if overflow != 0 || carry {
                // At most 96 + 94 bits in total, so this never runs off
                // the end of the buffer.
                hi_index += 1;
                buf[hi_index] = overflow.wrapping_add(carry as u64);
            }
        }
    }

    // Combine the rescaled value with the other operand's 96 bits.
    if subtract_magnitudes {
        let (low, borrow) = buf[0].overflowing_sub(other.low64());
        buf[0] = low;
        let (mid, b1) = buf[1].overflowing_sub(other.hi as u64);
        let (mid, b2) = mid.overflowing_sub(borrow as u64);
        buf[1] = mid;
        if b1 || b2 {
            if hi_index <= 1 {
                // Nothing above 128 bits to borrow from: the magnitudes
                // were ordered the wrong way round. The true result fits
                // 96 bits, so negate in place and flip the sign.
                let low64 = buf[0].wrapping_neg();
                let mut hi = !(buf[1] as u32);
                if low64 == 0 {
                    hi = hi.wrapping_add(1);
                }
                return CalculationResult::Ok(Decimal::from_parts(
                    low64 as u32,
                    (low64 >> 32) as u32,
                    hi,
                    !negative,
                    scale as u32,
                ));
            }
            buf[2] -= 1;
            if buf[2] == 0 {
                hi_index = 1;
            }
        }
    } else {
        let (low, carry) = buf[0].overflowing_add(other.low64());
        buf[0] = low;
        let (mid, c1) = buf[1].overflowing_add(other.hi as u64);
        let (mid, c2) = mid.overflowing_add(carry as u64);
        buf[1] = mid;
        if c1 || c2 {
            if hi_index < 2 {
                buf[2] = 1;
                hi_index = 2;
            } else {
                buf[2] += 1;
            }
        }
    }

    if hi_index > 1 || buf[1] > U32_MASK {
        scale = match scale_result(&mut buf, hi_index, scale) {
            Some(scale) => scale as i32,
            None => return CalculationResult::Overflow,
        };
    }

    CalculationResult::Ok(Decimal::from_parts(
        buf[0] as u32,
        (buf[0] >> 32) as u32,
        buf[1] as u32,
        negative,
        scale as u32,
    ))
}
