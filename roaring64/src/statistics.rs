use std::ops::AddAssign;

/// Structural statistics summed over every shard of a [`Treemap`](crate::Treemap).
///
/// Purely observational: the counts describe how the shard containers chose
/// to encode their values and have no bearing on membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of shards (distinct high keys).
    pub shards: u64,
    /// Number of values in the set.
    pub cardinality: u64,
    /// Number of 16-bit containers across all shards.
    pub containers: u64,

    pub array_containers: u64,
    pub array_container_bytes: u64,
    pub array_container_values: u64,

    pub bitmap_containers: u64,
    pub bitmap_container_bytes: u64,
    pub bitmap_container_values: u64,

    pub run_containers: u64,
    pub run_container_bytes: u64,
    pub run_container_values: u64,
}

impl Statistics {
    /// Statistics of a single shard container.
    pub(crate) fn of_shard(bitmap: &roaring::RoaringBitmap) -> Self {
        let st = bitmap.statistics();

        Self {
            shards: 1,
            cardinality: st.cardinality,
            containers: u64::from(st.n_containers),

            array_containers: u64::from(st.n_array_containers),
            array_container_bytes: u64::from(st.n_bytes_array_containers),
            array_container_values: u64::from(st.n_values_array_containers),

            bitmap_containers: u64::from(st.n_bitset_containers),
            bitmap_container_bytes: u64::from(st.n_bytes_bitset_containers),
            bitmap_container_values: u64::from(st.n_values_bitset_containers),

            run_containers: u64::from(st.n_run_containers),
            run_container_bytes: u64::from(st.n_bytes_run_containers),
            run_container_values: u64::from(st.n_values_run_containers),
        }
    }
}

impl AddAssign for Statistics {
    fn add_assign(&mut self, rhs: Self) {
        self.shards += rhs.shards;
        self.cardinality += rhs.cardinality;
        self.containers += rhs.containers;

        self.array_containers += rhs.array_containers;
        self.array_container_bytes += rhs.array_container_bytes;
        self.array_container_values += rhs.array_container_values;

        self.bitmap_containers += rhs.bitmap_containers;
        self.bitmap_container_bytes += rhs.bitmap_container_bytes;
        self.bitmap_container_values += rhs.bitmap_container_values;

        self.run_containers += rhs.run_containers;
        self.run_container_bytes += rhs.run_container_bytes;
        self.run_container_values += rhs.run_container_values;
    }
}

impl std::iter::Sum for Statistics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, st| {
            acc += st;
            acc
        })
    }
}
