use crate::error::RingCreateError;

/// Immutable geometry for a [`crate::Ring`] (spec §3 "header with immutable
/// geometry").
///
/// `size` is always a power of two; `capacity = size - 1` is the maximum
/// number of simultaneously live elements; `htd_max = capacity / 8` bounds
/// how far a single reservation may run ahead of its side's own tail before
/// the MT reservation algorithm must clamp it (this keeps one greedy
/// producer from starving the `wait until producer.tail == old_head` step
/// in spec §4.1 step 6 for an unbounded time).
#[derive(Debug, Clone, Copy)]
pub struct RingGeometry {
    size: u32,
    mask: u32,
    capacity: u32,
    htd_max: u32,
}

impl RingGeometry {
    /// Computes the geometry for a ring whose usable capacity is the
    /// smallest power of two strictly greater than `requested_count`, minus
    /// one (spec §4.1 `create`).
    pub fn for_requested_count(requested_count: usize) -> Result<Self, RingCreateError> {
        let needed = requested_count as u64 + 1;
        let size = needed.next_power_of_two();
        if size > u64::from(u32::MAX) {
            return Err(RingCreateError::SizeOverflow {
                requested: requested_count,
                needed,
            });
        }
        let size = size as u32;
        let capacity = size - 1;
        let htd_max = (capacity / 8).max(1);
        Ok(Self {
            size,
            mask: size - 1,
            capacity,
            htd_max,
        })
    }

    #[inline]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    #[inline]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub const fn htd_max(&self) -> u32 {
        self.htd_max
    }
}

/// Preset geometry sized for low-latency single-producer pipelines (15
/// live elements, fits comfortably in L1).
pub fn low_latency_geometry() -> RingGeometry {
    RingGeometry::for_requested_count(15).expect("static preset never overflows")
}

/// Preset geometry sized for high-fan-in multi-producer stress scenarios.
pub fn high_throughput_geometry() -> RingGeometry {
    RingGeometry::for_requested_count((1 << 18) - 1).expect("static preset never overflows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `size` is always a power of two strictly greater than the
        /// request, and `mask`/`capacity`/`htd_max` stay internally
        /// consistent with it, for any request that doesn't overflow u32.
        #[test]
        fn geometry_is_a_consistent_power_of_two(requested_count in 0usize..(1 << 24)) {
            let geometry = RingGeometry::for_requested_count(requested_count).unwrap();
            prop_assert!(geometry.size().is_power_of_two());
            prop_assert!(u64::from(geometry.size()) > requested_count as u64);
            prop_assert_eq!(geometry.capacity(), geometry.size() - 1);
            prop_assert_eq!(geometry.mask(), geometry.size() - 1);
            prop_assert!(geometry.htd_max() >= 1);
            prop_assert!(geometry.htd_max() <= geometry.capacity().max(1));
        }

        /// `mask` always clears exactly the bits a modular index needs
        /// cleared: `index & mask` never exceeds `capacity`.
        #[test]
        fn mask_bounds_any_index_within_capacity(
            requested_count in 0usize..(1 << 20),
            index in any::<u32>(),
        ) {
            let geometry = RingGeometry::for_requested_count(requested_count).unwrap();
            prop_assert!(index & geometry.mask() <= geometry.capacity());
        }
    }
}
