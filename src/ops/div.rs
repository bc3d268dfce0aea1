use crate::constants::{MAX_I32_SCALE, MAX_I64_SCALE, MAX_PRECISION_I32, POWERS_10};
use crate::decimal::{CalculationResult, Decimal};
use crate::ops::common::Buf12;

/// Largest 96 bit quotients that survive a multiply by 10^index. The high
/// field holds bits 32..96 of the boundary and the low field bits 0..32;
/// index 0 is a sentinel since 10^0 never overflows.
struct PowerOverflow {
    hi: u64,
    lo: u32,
}

#[rustfmt::skip]
static POWER_OVERFLOW_VALUES: [PowerOverflow; 20] = [
    PowerOverflow { hi: u64::MAX,            lo: u32::MAX },
    PowerOverflow { hi: 1844674407370955161, lo: 2576980377 },
    PowerOverflow { hi: 184467440737095516,  lo: 687194767 },
    PowerOverflow { hi: 18446744073709551,   lo: 2645699854 },
    PowerOverflow { hi: 1844674407370955,    lo: 694066715 },
    PowerOverflow { hi: 184467440737095,     lo: 2216890319 },
    PowerOverflow { hi: 18446744073709,      lo: 2369172679 },
    PowerOverflow { hi: 1844674407370,       lo: 4102387834 },
    PowerOverflow { hi: 184467440737,        lo: 410238783 },
    PowerOverflow { hi: 18446744073,         lo: 3047500985 },
    PowerOverflow { hi: 1844674407,          lo: 1593240287 },
    PowerOverflow { hi: 184467440,           lo: 3165801135 },
    PowerOverflow { hi: 18446744,            lo: 316580113 },
    PowerOverflow { hi: 1844674,             lo: 1749644929 },
    PowerOverflow { hi: 184467,              lo: 1892951411 },
    PowerOverflow { hi: 18446,               lo: 3195772248 },
    PowerOverflow { hi: 1844,                lo: 2896557602 },
    PowerOverflow { hi: 184,                 lo: 2007642678 },
    PowerOverflow { hi: 18,                  lo: 1918751186 },
    PowerOverflow { hi: 1,                   lo: 3627848955 },
];

enum DivError {
    Overflow,
}

pub(crate) fn div_impl(dividend: &Decimal, divisor: &Decimal) -> CalculationResult {
    if divisor.is_zero() {
        return CalculationResult::DivByZero;
    }
    if dividend.is_zero() {
        return CalculationResult::Ok(Decimal::ZERO);
    }

    let mut scale = dividend.scale() as i32 - divisor.scale() as i32;
    let negative = dividend.is_sign_negative() ^ divisor.is_sign_negative();
    let mut quotient = Buf12::new(dividend.lo, dividend.mid, dividend.hi);
    let den = Buf12::new(divisor.lo, divisor.mid, divisor.hi);

    // A non-zero remainder at any point marks the quotient as scaled up,
    // which the trailing zero trim at the end keys off.
    let mut require_unscale = false;

    if den.u1 | den.u2 == 0 {
        // 32 bit divisor; a plain in-place divide does the first step.
        let divisor32 = den.u0;
        let mut remainder = quotient.div32(divisor32);

        loop {
            let current_scale;
            if remainder == 0 {
                if scale >= 0 {
                    break;
                }
                current_scale = MAX_I32_SCALE.min(-scale);
            } else {
                require_unscale = true;

                // The quotient has room for more significant digits; pull
                // them in by scaling up and dividing the remainder again.
                current_scale = match search_scale(&quotient, scale) {
                    Ok(s) => s.min(MAX_I32_SCALE),
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                };
                if current_scale == 0 {
                    // No more room; round off the remainder and stop.
                    let doubled = (remainder as u64) << 1;
                    if doubled > divisor32 as u64 || (doubled == divisor32 as u64 && quotient.u0 & 1 != 0) {
                        if round_up(&mut quotient, &mut scale).is_err() {
                            return CalculationResult::Overflow;
                        }
                    }
                    break;
                }
            }

            let power = POWERS_10[current_scale as usize];
            scale += current_scale;
            if quotient.mul_pow10(power) != 0 {
                return CalculationResult::Overflow;
            }
            let scaled = remainder as u64 * power;
            let next = scaled / divisor32 as u64;
            remainder = (scaled - next * divisor32 as u64) as u32;
            if quotient.add64(next) {
                match unscale_from_overflow(&mut quotient, scale, remainder != 0) {
                    Ok(adjusted) => scale = adjusted,
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                }
                break;
            }
        }
    } else if den.u2 == 0 {
        // 64 bit divisor; native 128 bit division does the heavy lifting.
        // The quotient fits 64 bits because the divisor needs more than 32.
        let divisor64 = den.low64();
        let dividend128 = ((dividend.hi as u128) << 64) | dividend.low64() as u128;
        let mut remainder64 = (dividend128 % divisor64 as u128) as u64;
        quotient.set_low64((dividend128 / divisor64 as u128) as u64);
        quotient.u2 = 0;

        loop {
            let current_scale;
            if remainder64 == 0 {
                if scale >= 0 {
                    break;
                }
                current_scale = MAX_I64_SCALE.min(-scale);
            } else {
                require_unscale = true;

                current_scale = match search_scale(&quotient, scale) {
                    Ok(s) => s,
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                };
                if current_scale == 0 {
                    // Doubling may overflow 64 bits, which alone means the
                    // remainder exceeds half the divisor.
                    let round = remainder64 >= 1 << 63 || {
                        let doubled = remainder64 << 1;
                        doubled > divisor64 || (doubled == divisor64 && quotient.u0 & 1 != 0)
                    };
                    if round && round_up(&mut quotient, &mut scale).is_err() {
                        return CalculationResult::Overflow;
                    }
                    break;
                }
            }

            let power = POWERS_10[current_scale as usize];
            scale += current_scale;
            if quotient.mul_pow10(power) != 0 {
                return CalculationResult::Overflow;
            }
            let scaled = remainder64 as u128 * power as u128;
            let next = (scaled / divisor64 as u128) as u64;
            remainder64 = (scaled % divisor64 as u128) as u64;
            if quotient.add64(next) {
                match unscale_from_overflow(&mut quotient, scale, remainder64 != 0) {
                    Ok(adjusted) => scale = adjusted,
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                }
                break;
            }
        }
    } else {
        // 96 bit divisor. Normalize so the divisor's top word has its high
        // bit set; shifting dividend and divisor alike leaves the quotient
        // unchanged but makes the word-at-a-time trial divides converge.
        let shift = den.u2.leading_zeros();
        let dividend128 = ((dividend.hi as u128) << 64) | dividend.low64() as u128;
        let shifted = dividend128 << shift;

        let mut remainder = [0u32; 5];
        remainder[0] = shifted as u32;
        remainder[1] = (shifted >> 32) as u32;
        remainder[2] = (shifted >> 64) as u32;
        remainder[3] = (shifted >> 96) as u32;

        let den128 = den.as_u128() << shift;
        let den = Buf12::new(den128 as u32, (den128 >> 32) as u32, (den128 >> 64) as u32);

        quotient.set_low64(div_128_by_96(&mut remainder[..4], &den) as u64);
        quotient.u2 = 0;

        loop {
            let current_scale;
            if remainder[0] | remainder[1] | remainder[2] == 0 {
                if scale >= 0 {
                    break;
                }
                current_scale = MAX_I64_SCALE.min(-scale);
            } else {
                require_unscale = true;

                current_scale = match search_scale(&quotient, scale) {
                    Ok(s) => s,
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                };
                if current_scale == 0 {
                    let rem96 = ((remainder[2] as u128) << 64)
                        | ((remainder[1] as u128) << 32)
                        | remainder[0] as u128;
                    let doubled = rem96 << 1;
                    let den128 = den.as_u128();
                    if doubled > den128 || (doubled == den128 && quotient.u0 & 1 != 0) {
                        if round_up(&mut quotient, &mut scale).is_err() {
                            return CalculationResult::Overflow;
                        }
                    }
                    break;
                }
            }

            let power = POWERS_10[current_scale as usize];
            scale += current_scale;
            if quotient.mul_pow10(power) != 0 {
                return CalculationResult::Overflow;
            }
            mul_pow10_rem(&mut remainder, power);
            let next = div_160_by_96(&mut remainder, &den);
            if quotient.add64(next) {
                let sticky = remainder[0] | remainder[1] | remainder[2] != 0;
                match unscale_from_overflow(&mut quotient, scale, sticky) {
                    Ok(adjusted) => scale = adjusted,
                    Err(DivError::Overflow) => return CalculationResult::Overflow,
                }
                break;
            }
        }
    }

    if require_unscale {
        unscale(&mut quotient, &mut scale);
    }
    CalculationResult::Ok(Decimal::from_parts(
        quotient.u0,
        quotient.u1,
        quotient.u2,
        negative,
        scale as u32,
    ))
}

/// Partial divide of a 128 bit window by a normalized 96 bit divisor,
/// yielding a 32 bit quotient and overwriting the window's low three
/// words with the remainder.
fn div_128_by_96(window: &mut [u32], den: &Buf12) -> u32 {
    if window[3] == 0 && window[2] < den.u2 {
        // Quotient is zero and the whole window is the remainder.
        return 0;
    }

    let window128 = ((window[3] as u128) << 96)
        | ((window[2] as u128) << 64)
        | ((window[1] as u128) << 32)
        | window[0] as u128;

    // Trial quotient from the top words, saturated to 32 bits; the
    // normalized divisor keeps it high by at most a few, which the
    // correction loop walks back.
    let hi64 = (window128 >> 64) as u64;
    let mut quo = (hi64 / den.u2 as u64).min(u32::MAX as u64) as u32;
    let den128 = den.as_u128();

    let (mut rem, mut went_negative) = window128.overflowing_sub(quo as u128 * den128);
    while went_negative {
        quo = quo.wrapping_sub(1);
        let (sum, carry) = rem.overflowing_add(den128);
        rem = sum;
        went_negative = !carry;
    }

    window[0] = rem as u32;
    window[1] = (rem >> 32) as u32;
    window[2] = (rem >> 64) as u32;
    window[3] = 0;
    quo
}

/// Partial divide of the 160 bit scaled remainder by a normalized 96 bit
/// divisor, via two sliding 128 by 96 steps.
fn div_160_by_96(rem: &mut [u32; 5], den: &Buf12) -> u64 {
    let mut quo = 0u64;
    if ((rem[4] as u64) << 32) | rem[3] as u64 >= den.u2 as u64 {
        quo = (div_128_by_96(&mut rem[1..5], den) as u64) << 32;
    }
    quo + div_128_by_96(&mut rem[..4], den) as u64
}

/// Multiply the 96 bit remainder by a power of ten, spilling into the
/// fourth and fifth words.
fn mul_pow10_rem(rem: &mut [u32; 5], power: u64) {
    let low64 = ((rem[1] as u64) << 32) | rem[0] as u64;
    let product = low64 as u128 * power as u128;
    let upper = rem[2] as u128 * power as u128 + (product >> 64);
    rem[0] = product as u32;
    rem[1] = (product >> 32) as u32;
    rem[2] = upper as u32;
    rem[3] = (upper >> 32) as u32;
    rem[4] = (upper >> 64) as u32;
}

/// Find the largest power of ten the quotient can be multiplied by while
/// still fitting in 96 bits and keeping the final scale at most 28.
/// Errors when even a scale of zero is out of reach.
fn search_scale(quotient: &Buf12, scale: i32) -> Result<i32, DivError> {
    let current = candidate_scale(quotient, scale);
    if current + scale < 0 && current != MAX_I64_SCALE {
        return Err(DivError::Overflow);
    }
    Ok(current)
}

fn candidate_scale(quotient: &Buf12, scale: i32) -> i32 {
    // Quotients above 2^32 / 10 in the top word cannot take another digit.
    const OVERFLOW_MAX_1_HI: u32 = 429496729;

    if scale >= MAX_PRECISION_I32 || quotient.u2 > OVERFLOW_MAX_1_HI {
        return 0;
    }

    let hi64 = quotient.high64();
    if scale > MAX_PRECISION_I32 - MAX_I64_SCALE {
        // The scale budget caps the power below the table maximum; check
        // whether the largest permitted entry fits before estimating.
        let capped = MAX_PRECISION_I32 - scale;
        let entry = &POWER_OVERFLOW_VALUES[capped as usize];
        if hi64 < entry.hi {
            return capped;
        }
        if hi64 == entry.hi {
            return if quotient.u0 > entry.lo { capped - 1 } else { capped };
        }
    }

    if hi64 == 0 {
        return MAX_I64_SCALE;
    }

    // Convert the bit position into a power of ten with the 77/256
    // approximation of log10(2). The result is never too small, so one
    // table comparison corrects the occasional overshoot.
    let zeros = hi64.leading_zeros() as i32;
    let mut current = ((zeros * 77) >> 8) + 1;
    let entry = &POWER_OVERFLOW_VALUES[current as usize];
    if hi64 > entry.hi || (hi64 == entry.hi && quotient.u0 > entry.lo) {
        current -= 1;
    }
    current
}

/// Add one to the quotient, repairing a carry past 96 bits by dropping a
/// decimal digit.
fn round_up(quotient: &mut Buf12, scale: &mut i32) -> Result<(), DivError> {
    if quotient.add64(1) {
        *scale = unscale_from_overflow(quotient, *scale, true)?;
    }
    Ok(())
}

/// Called when the quotient wrapped past 96 bits after an increment: the
/// value is exactly 2^96 plus the wrapped low words, so dividing the 97
/// bit value by ten and rounding with the remainder restores it.
fn unscale_from_overflow(num: &mut Buf12, scale: i32, sticky: bool) -> Result<i32, DivError> {
    let scale = scale - 1;
    if scale < 0 {
        return Err(DivError::Overflow);
    }

    const CARRY_BIT: u64 = 1 << 32;
    num.u2 = (CARRY_BIT / 10) as u32;
    let mut num64 = ((CARRY_BIT % 10) << 32) + num.u1 as u64;
    num.u1 = (num64 / 10) as u32;
    num64 = ((num64 % 10) << 32) + num.u0 as u64;
    num.u0 = (num64 / 10) as u32;
    let remainder = (num64 % 10) as u32;

    if remainder > 5 || (remainder == 5 && (sticky || num.u0 & 1 != 0)) {
        // Cannot wrap again; the value just came down from a divide by ten.
        num.add64(1);
    }
    Ok(scale)
}

/// Strip the trailing decimal zeros a scaled-up exact quotient carries,
/// trying the largest powers first. Every power of ten contains a
/// matching power of two, so the low bits gate each attempt cheaply.
fn unscale(quotient: &mut Buf12, scale: &mut i32) {
    while quotient.u0 & 0xFF == 0 && *scale >= 8 && quotient.div_exact(100_000_000) {
        *scale -= 8;
    }
    if quotient.u0 & 0xF == 0 && *scale >= 4 && quotient.div_exact(10_000) {
        *scale -= 4;
    }
    if quotient.u0 & 0x3 == 0 && *scale >= 2 && quotient.div_exact(100) {
        *scale -= 2;
    }
    if quotient.u0 & 0x1 == 0 && *scale >= 1 && quotient.div_exact(10) {
        *scale -= 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn power_overflow_values_bound_the_product() {
        // Each entry is the largest 96 bit value whose product with the
        // indexed power of ten still fits in 96 bits.
        for (index, entry) in POWER_OVERFLOW_VALUES.iter().enumerate().skip(1) {
            let boundary = ((entry.hi as u128) << 32) | entry.lo as u128;
            let power = POWERS_10[index] as u128;
            assert!(boundary * power < 1 << 96, "entry {} too large", index);
            assert!((boundary + 1) * power >= 1 << 96, "entry {} too small", index);
        }
    }

    #[test]
    fn search_scale_respects_the_scale_budget() {
        let tiny = Buf12::new(1, 0, 0);
        assert!(matches!(search_scale(&tiny, 0), Ok(19)));
        assert!(matches!(search_scale(&tiny, 20), Ok(8)));
        assert!(matches!(search_scale(&tiny, 28), Ok(0)));
    }

    #[test]
    fn search_scale_stops_at_full_quotients() {
        let full = Buf12::new(u32::MAX, u32::MAX, u32::MAX);
        assert!(matches!(search_scale(&full, 5), Ok(0)));
        // A full quotient that still needs its scale raised cannot recover.
        assert!(search_scale(&full, -1).is_err());
    }

    #[test]
    fn search_scale_estimates_from_the_bit_position() {
        // 2^64 requires hi64 == 1, which can absorb 10^18 more.
        let value = Buf12::new(0, 0, 1);
        match search_scale(&value, 0) {
            Ok(scale) => {
                let product = value.as_u128() * POWERS_10[scale as usize] as u128;
                assert!(product < 1 << 96);
                assert!(product * 10 >= 1 << 96);
            }
            Err(_) => panic!("unexpected overflow"),
        }
    }

    #[test]
    fn unscale_from_overflow_restores_the_carry() {
        // A quotient that wrapped to zero stands for exactly 2^96.
        let mut num = Buf12::new(0, 0, 0);
        let scale = unscale_from_overflow(&mut num, 5, false).map_err(|_| ()).unwrap();
        assert_eq!(scale, 4);
        // 2^96 / 10 = 7922816251426433759354395033 rem 6, rounded up.
        assert_eq!(num.as_u128(), (1u128 << 96) / 10 + 1);
    }

    #[test]
    fn unscale_strips_trailing_zeros_only() {
        let mut quotient = Buf12::new(1_200_000_000, 0, 0);
        let mut scale = 8;
        unscale(&mut quotient, &mut scale);
        assert_eq!(quotient.as_u128(), 12);
        assert_eq!(scale, 0);

        let mut quotient = Buf12::new(123, 0, 0);
        let mut scale = 2;
        unscale(&mut quotient, &mut scale);
        assert_eq!(quotient.as_u128(), 123);
        assert_eq!(scale, 2);
    }
}
