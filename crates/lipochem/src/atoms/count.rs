use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroI32,
    ops::Mul,
};

use rust_decimal::Decimal;

use crate::{AverageMass, Count, Mass, MonoisotopicMass, OffsetKind};

impl Count {
    pub(crate) fn new(n: i32) -> Option<Self> {
        NonZeroI32::new(n).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0.get()
    }

    pub(crate) const fn offset_kind(self) -> OffsetKind {
        if self.0.is_negative() {
            OffsetKind::Remove
        } else {
            OffsetKind::Add
        }
    }

    // NOTE: Returns `None` when the sum is zero, which is how zeroed-out elements are dropped from compositions
    pub(crate) fn checked_add(self, other: Self) -> Option<Self> {
        self.0.get().checked_add(other.0.get()).and_then(Self::new)
    }

    pub(crate) fn checked_mul(self, factor: i32) -> Option<Self> {
        self.0.get().checked_mul(factor).and_then(Self::new)
    }
}

macro_rules! mass_mul_impls {
    // NOTE: `$mass_type` is a `tt` since it actually has to play the role of both a type (`ty`) and expression (`expr`)
    // in this impl, and `tt` appears to be the only way to pull off that sort of "metavariable polymorphism"
    ($($mass_type:tt),+ $(,)?) => {
        $(
            impl Mul<$mass_type> for Count {
                type Output = $mass_type;

                fn mul(self, rhs: $mass_type) -> Self::Output {
                    $mass_type(Decimal::from(self.0.get()) * rhs.0)
                }
            }
        )+
    };
}

mass_mul_impls!(Mass, MonoisotopicMass, AverageMass);

// NOTE: Only the magnitude is displayed (and only when it isn't 1), since signs are handled by the surrounding formula
impl Display for Count {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let count = self.0.unsigned_abs().get();
        if count > 1 {
            write!(f, "{count}")?;
        }
        Ok(())
    }
}

impl Default for Count {
    fn default() -> Self {
        const ONE: NonZeroI32 = NonZeroI32::new(1).unwrap();
        Self(ONE)
    }
}
