//! Strongly typed car identifier.
//!
//! A `CarId` is assigned once when a car is built and never changes, even
//! when the car moves to another position in the train.  Position is the
//! index into `Train::cars`; identity is the `CarId`.

use std::fmt;

/// Stable identity of one car.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CarId(pub u32);

impl CarId {
    /// Sentinel meaning "no valid ID", equal to `u32::MAX`.
    pub const INVALID: CarId = CarId(u32::MAX);

    /// Cast to `usize`.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for CarId {
    /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
    #[inline(always)]
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CarId({})", self.0)
    }
}

impl TryFrom<usize> for CarId {
    type Error = std::num::TryFromIntError;
    fn try_from(n: usize) -> Result<CarId, Self::Error> {
        u32::try_from(n).map(CarId)
    }
}
