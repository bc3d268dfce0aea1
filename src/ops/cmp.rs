use crate::constants::{MAX_I64_SCALE, POWERS_10};
use crate::decimal::Decimal;

use core::cmp::Ordering;

pub(crate) fn cmp_impl(d1: &Decimal, d2: &Decimal) -> Ordering {
    // Zeros compare equal whatever their sign or scale.
    if d1.is_zero() {
        return if d2.is_zero() {
            Ordering::Equal
        } else if d2.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if d2.is_zero() {
        return if d1.is_sign_negative() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    if d1.is_sign_negative() != d2.is_sign_negative() {
        return if d1.is_sign_negative() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    // Same sign; magnitudes decide, inverted when both are negative.
    let ordering = cmp_magnitude(d1, d2);
    if d1.is_sign_negative() {
        ordering.reverse()
    } else {
        ordering
    }
}

fn cmp_magnitude(d1: &Decimal, d2: &Decimal) -> Ordering {
    let diff = d1.scale() as i32 - d2.scale() as i32;
    if diff == 0 {
        return mantissa(d1).cmp(&mantissa(d2));
    }

    // Align the coarser-scaled operand by multiplying it up; if that runs
    // past 96 bits it is bigger than the other side can ever be.
    if diff < 0 {
        match rescale96(d1.low64(), d1.hi, -diff) {
            Some(value) => value.cmp(&mantissa(d2)),
            None => Ordering::Greater,
        }
    } else {
        match rescale96(d2.low64(), d2.hi, diff) {
            Some(value) => mantissa(d1).cmp(&value),
            None => Ordering::Less,
        }
    }
}

fn mantissa(value: &Decimal) -> u128 {
    ((value.hi as u128) << 64) | value.low64() as u128
}

// Multiply a 96 bit magnitude by 10^diff, reporting None as soon as the
// result no longer fits in 96 bits.
fn rescale96(mut low64: u64, mut hi: u32, mut diff: i32) -> Option<u128> {
    while diff > 0 {
        let power = if diff >= MAX_I64_SCALE {
            POWERS_10[MAX_I64_SCALE as usize]
        } else {
            POWERS_10[diff as usize]
        };
        let low = low64 as u128 * power as u128;
        let high = hi as u128 * power as u128 + (low >> 64);
        if high > u32::MAX as u128 {
            return None;
        }
        low64 = low as u64;
        hi = high as u32;
        diff -= MAX_I64_SCALE;
    }
    Some(((hi as u128) << 64) | low64 as u128)
}
