use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::Treemap;

impl BitAndAssign<&Treemap> for Treemap {
    fn bitand_assign(&mut self, rhs: &Treemap) {
        self.and(rhs);
    }
}

impl BitOrAssign<&Treemap> for Treemap {
    fn bitor_assign(&mut self, rhs: &Treemap) {
        self.or(rhs);
    }
}

impl BitXorAssign<&Treemap> for Treemap {
    fn bitxor_assign(&mut self, rhs: &Treemap) {
        self.xor(rhs);
    }
}

/// Same as [`Treemap::and_not`], including keeping emptied shards.
impl SubAssign<&Treemap> for Treemap {
    fn sub_assign(&mut self, rhs: &Treemap) {
        self.and_not(rhs);
    }
}

impl BitAnd for &Treemap {
    type Output = Treemap;

    /// Intersection. Starts from the operand with fewer shards, since the
    /// result can only hold shards present in both.
    fn bitand(self, rhs: &Treemap) -> Treemap {
        let (small, large) = if self.shard_count() <= rhs.shard_count() {
            (self, rhs)
        } else {
            (rhs, self)
        };

        let mut result = small.clone();
        result.and(large);
        result.format = self.format;
        result
    }
}

impl BitOr for &Treemap {
    type Output = Treemap;

    fn bitor(self, rhs: &Treemap) -> Treemap {
        let mut result = self.clone();
        result.or(rhs);
        result
    }
}

impl BitXor for &Treemap {
    type Output = Treemap;

    fn bitxor(self, rhs: &Treemap) -> Treemap {
        let mut result = self.clone();
        result.xor(rhs);
        result
    }
}

impl Sub for &Treemap {
    type Output = Treemap;

    fn sub(self, rhs: &Treemap) -> Treemap {
        let mut result = self.clone();
        result.and_not(rhs);
        result
    }
}

impl BitAnd<&Treemap> for Treemap {
    type Output = Treemap;

    fn bitand(mut self, rhs: &Treemap) -> Treemap {
        self.and(rhs);
        self
    }
}

impl BitOr<&Treemap> for Treemap {
    type Output = Treemap;

    fn bitor(mut self, rhs: &Treemap) -> Treemap {
        self.or(rhs);
        self
    }
}

impl BitXor<&Treemap> for Treemap {
    type Output = Treemap;

    fn bitxor(mut self, rhs: &Treemap) -> Treemap {
        self.xor(rhs);
        self
    }
}

impl Sub<&Treemap> for Treemap {
    type Output = Treemap;

    fn sub(mut self, rhs: &Treemap) -> Treemap {
        self.and_not(rhs);
        self
    }
}
