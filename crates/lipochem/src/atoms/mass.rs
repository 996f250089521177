use std::ops::Div;

use rust_decimal::Decimal;

use crate::{Charge, MonoisotopicMass, Mz};

impl Charge {
    #[must_use]
    pub const fn new(charge: i64) -> Self {
        Self(charge)
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Div<Charge> for MonoisotopicMass {
    type Output = Mz;

    fn div(self, rhs: Charge) -> Self::Output {
        Mz(self.0 / Decimal::from(rhs.0))
    }
}
