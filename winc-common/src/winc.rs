//! Winston credit ("winc") money newtypes.
//!
//! The ledger is denominated in winc, a non-negative arbitrary-precision
//! integer. [`Winc`] maintains the non-negativity invariant; [`SignedWinc`] is
//! the signed companion used for audit deltas, balances that a chargeback may
//! push below zero, and adjustment magnitudes.
//!
//! Amounts always serialize as decimal strings (never floats) so that no
//! precision is lost at the wire and DB boundaries.
//!
//! ### Parsing
//!
//! Use [`FromStr`]; only plain decimal digit strings are accepted, with an
//! optional leading `-` for [`SignedWinc`]. No exponents, separators, or
//! whitespace.

use std::{
    fmt::{self, Display},
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
    str::FromStr,
};

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Errors that can occur when constructing or combining winc amounts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum WincError {
    #[error("winc arithmetic produced a negative result")]
    NegativeResult,
    #[error("winc amounts must be plain decimal integer strings")]
    InvalidDecimal,
}

/// A non-negative winc amount.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub struct Winc(BigUint);

/// A signed winc amount. The running sum of a user's audit deltas is a
/// [`SignedWinc`] and equals the user's balance.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(SerializeDisplay, DeserializeFromStr)]
pub struct SignedWinc(BigInt);

// --- impl Winc --- //

impl Winc {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Addition cannot leave the non-negative range, so this never fails;
    /// the checked form exists so ledger call sites read uniformly with
    /// [`checked_sub`](Self::checked_sub).
    pub fn checked_add(&self, rhs: &Self) -> Result<Self, WincError> {
        Ok(Self(&self.0 + &rhs.0))
    }

    /// Subtraction which fails with [`WincError::NegativeResult`] rather than
    /// wrapping or panicking. All ledger debits go through this.
    pub fn checked_sub(&self, rhs: &Self) -> Result<Self, WincError> {
        if self.0 >= rhs.0 {
            Ok(Self(&self.0 - &rhs.0))
        } else {
            Err(WincError::NegativeResult)
        }
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(&self, rhs: &Self) -> Self {
        self.checked_sub(rhs).unwrap_or_else(|_| Self::zero())
    }

    /// Scaling by a non-negative integer cannot leave the range either; see
    /// [`checked_add`](Self::checked_add) for why the checked form exists.
    pub fn checked_mul(&self, rhs: u64) -> Result<Self, WincError> {
        Ok(Self(&self.0 * rhs))
    }

    /// Scale by a non-negative [`Decimal`], rounding down. Used by
    /// multiplicative adjustments; the magnitude is exact decimal arithmetic,
    /// never a float.
    pub fn mul_decimal_floor(&self, rhs: Decimal) -> Result<Self, WincError> {
        if rhs.is_sign_negative() {
            return Err(WincError::NegativeResult);
        }
        let mantissa = u128::try_from(rhs.mantissa())
            .expect("sign was checked above");
        let scaled = &self.0 * BigUint::from(mantissa);
        let divisor = BigUint::from(10u8).pow(rhs.scale());
        Ok(Self(scaled / divisor))
    }

    /// The signed difference `self - rhs`.
    pub fn signed_diff(&self, rhs: &Self) -> SignedWinc {
        SignedWinc(
            BigInt::from(self.0.clone()) - BigInt::from(rhs.0.clone()),
        )
    }

    /// Lossy conversion for metrics and log fields.
    pub fn to_f64_lossy(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::MAX)
    }
}

impl From<u64> for Winc {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Winc {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Winc {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add for Winc {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<&Winc> for Winc {
    type Output = Self;
    fn add(self, rhs: &Winc) -> Self::Output {
        Self(self.0 + &rhs.0)
    }
}

impl AddAssign<&Winc> for Winc {
    fn add_assign(&mut self, rhs: &Winc) {
        self.0 += &rhs.0;
    }
}

impl Sub for Winc {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        self.checked_sub(&rhs).expect("Underflowed")
    }
}

// Winc * scalar => Winc
impl Mul<u64> for Winc {
    type Output = Self;
    fn mul(self, rhs: u64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Winc {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl FromStr for Winc {
    type Err = WincError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WincError::InvalidDecimal);
        }
        BigUint::from_str(s)
            .map(Self)
            .map_err(|_| WincError::InvalidDecimal)
    }
}

impl Display for Winc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// --- impl SignedWinc --- //

impl SignedWinc {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// The delta `+amount`.
    pub fn credit(amount: &Winc) -> Self {
        Self(BigInt::from(amount.0.clone()))
    }

    /// The delta `-amount`.
    pub fn debit(amount: &Winc) -> Self {
        Self(-BigInt::from(amount.0.clone()))
    }

    /// Converts back to an unsigned amount, failing on negative values.
    pub fn to_winc(&self) -> Result<Winc, WincError> {
        self.0
            .to_biguint()
            .map(Winc)
            .ok_or(WincError::NegativeResult)
    }

    /// The non-negative portion of this value; negative values clamp to zero.
    pub fn clamped_to_winc(&self) -> Winc {
        self.to_winc().unwrap_or_else(|_| Winc::zero())
    }
}

impl From<Winc> for SignedWinc {
    fn from(value: Winc) -> Self {
        Self(BigInt::from(value.0))
    }
}

impl Add for SignedWinc {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Add<&SignedWinc> for SignedWinc {
    type Output = Self;
    fn add(self, rhs: &SignedWinc) -> Self::Output {
        Self(self.0 + &rhs.0)
    }
}

impl AddAssign<&SignedWinc> for SignedWinc {
    fn add_assign(&mut self, rhs: &SignedWinc) {
        self.0 += &rhs.0;
    }
}

impl Sum for SignedWinc {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl FromStr for SignedWinc {
    type Err = WincError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WincError::InvalidDecimal);
        }
        BigInt::from_str(s)
            .map(Self)
            .map_err(|_| WincError::InvalidDecimal)
    }
}

impl Display for SignedWinc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

// --- Tests and test infra --- //

#[cfg(any(test, feature = "test-utils"))]
mod arbitrary_impl {
    use proptest::{
        arbitrary::{any, Arbitrary},
        strategy::{BoxedStrategy, Strategy},
    };

    use super::*;

    impl Arbitrary for Winc {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;
        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            any::<u128>().prop_map(Winc::from).boxed()
        }
    }

    impl Arbitrary for SignedWinc {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;
        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            (any::<bool>(), any::<u128>())
                .prop_map(|(neg, magnitude)| {
                    let winc = Winc::from(magnitude);
                    if neg {
                        SignedWinc::debit(&winc)
                    } else {
                        SignedWinc::credit(&winc)
                    }
                })
                .boxed()
        }
    }
}

#[cfg(test)]
mod test {
    use proptest::{arbitrary::any, prop_assert, prop_assert_eq, proptest};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::test_utils::roundtrip;

    #[test]
    fn winc_string_roundtrips() {
        roundtrip::fromstr_display_roundtrip_proptest::<Winc>();
        roundtrip::fromstr_display_roundtrip_proptest::<SignedWinc>();
        roundtrip::json_string_roundtrip_proptest::<Winc>();
        roundtrip::json_string_roundtrip_proptest::<SignedWinc>();
    }

    #[test]
    fn winc_rejects_non_decimal_strings() {
        for bad in ["", "-1", "+1", "1.5", "1e9", " 1", "0x10", "١٢٣"] {
            assert!(Winc::from_str(bad).is_err(), "accepted {bad:?}");
        }
        for bad in ["", "-", "+1", "1.5", "--2", " 1"] {
            assert!(SignedWinc::from_str(bad).is_err(), "accepted {bad:?}");
        }
        assert_eq!(SignedWinc::from_str("-42").unwrap().to_string(), "-42");
    }

    #[test]
    fn winc_add_sub() {
        proptest!(|(a in any::<Winc>(), b in any::<Winc>())| {
            let (greater, lesser) = if a >= b { (a, b) } else { (b, a) };

            let diff = greater.checked_sub(&lesser).unwrap();
            prop_assert_eq!(lesser.clone() + &diff, greater.clone());
            prop_assert_eq!(
                lesser.checked_add(&diff).unwrap(),
                greater.clone(),
            );
            prop_assert_eq!(greater.clone() - lesser.clone(), diff);

            if greater > lesser {
                prop_assert!(lesser.checked_sub(&greater).is_err());
                prop_assert!(lesser.saturating_sub(&greater).is_zero());
            }
        });
    }

    #[test]
    #[should_panic(expected = "Underflowed")]
    fn winc_sub_operator_panics_on_underflow() {
        let _ = Winc::from(1u64) - Winc::from(2u64);
    }

    #[test]
    fn winc_mul_scalar() {
        proptest!(|(a in any::<Winc>())| {
            let doubled = a.checked_mul(2).unwrap();
            prop_assert_eq!(a.clone() + &a, doubled.clone());
            prop_assert_eq!(a.clone() * 2u64, doubled);
            prop_assert!(a.checked_mul(0).unwrap().is_zero());
            prop_assert_eq!(a.clone() * 1u64, a.clone());
        });
    }

    #[test]
    fn signed_diff_matches_checked_sub() {
        proptest!(|(a in any::<Winc>(), b in any::<Winc>())| {
            let diff = a.signed_diff(&b);
            if a >= b {
                prop_assert_eq!(
                    diff.to_winc().unwrap(),
                    a.checked_sub(&b).unwrap()
                );
            } else {
                prop_assert!(diff.is_negative());
                prop_assert!(diff.to_winc().is_err());
            }
        });
    }

    #[test]
    fn credit_debit_sum_to_zero() {
        proptest!(|(amount in any::<Winc>())| {
            let sum = SignedWinc::credit(&amount) + SignedWinc::debit(&amount);
            prop_assert!(sum.is_zero());
        });
    }

    #[test]
    fn mul_decimal_floor_basics() {
        let w = Winc::from(1000u64);
        assert_eq!(w.mul_decimal_floor(dec!(0.5)).unwrap(), Winc::from(500u64));
        assert_eq!(w.mul_decimal_floor(dec!(1)).unwrap(), Winc::from(1000u64));
        assert_eq!(w.mul_decimal_floor(dec!(0)).unwrap(), Winc::zero());
        // Rounds down.
        assert_eq!(
            Winc::from(3u64).mul_decimal_floor(dec!(0.333)).unwrap(),
            Winc::zero(),
        );
        assert!(w.mul_decimal_floor(dec!(-0.1)).is_err());
    }

    #[test]
    fn mul_decimal_floor_scales_arbitrary_precision() {
        // 10^30 winc, comfortably past u128's 64-bit cousins' reach after
        // scaling.
        let w = Winc::from_str("1000000000000000000000000000000").unwrap();
        let half = w.mul_decimal_floor(dec!(0.5)).unwrap();
        assert_eq!(
            half,
            Winc::from_str("500000000000000000000000000000").unwrap()
        );
    }
}
