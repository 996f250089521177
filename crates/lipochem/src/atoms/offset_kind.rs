use std::fmt::{self, Display, Formatter};

use crate::{Count, OffsetKind};

impl OffsetKind {
    /// Gives `count` the sign of this offset, flipping it for removals
    #[must_use]
    pub(crate) const fn offset(self, count: Count) -> Count {
        match self {
            Self::Add => count,
            // NOTE: Negating a `NonZeroI32` can only overflow for `i32::MIN`, which no parsed count can reach
            Self::Remove => Count(count.0.wrapping_neg()),
        }
    }

    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }
}

impl Display for OffsetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Add => "+",
                Self::Remove => "-",
            }
        )
    }
}

impl From<OffsetKind> for i32 {
    fn from(value: OffsetKind) -> Self {
        match value {
            OffsetKind::Add => 1,
            OffsetKind::Remove => -1,
        }
    }
}
