//! Lot numbering
//!
//! Lot numbers only move forward per blend. The next lot follows the highest
//! recorded one; a blend with no history needs its first number entered by
//! the operator.

use crate::store::Store;
use crate::{Error, Result};

/// How the next lot number for a blend is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotAssignment {
    /// Derived from history (highest recorded lot + 1)
    Next(i64),
    /// No history; the operator must supply a number
    NeedsManualEntry,
}

pub async fn lot_assignment(store: &Store, blend_code: &str) -> Result<LotAssignment> {
    Ok(match store.find_next_lot(blend_code).await? {
        Some(next) => LotAssignment::Next(next),
        None => LotAssignment::NeedsManualEntry,
    })
}

/// The lot number following `lot`; the last representable number has none
pub fn next_after(blend_code: &str, lot: i64) -> Result<i64> {
    lot.checked_add(1).ok_or_else(|| {
        Error::InvalidInput(format!("blend {} has no lot number after {}", blend_code, lot))
    })
}

/// Choose the lot number for a new upload
///
/// The chosen lot must have a successor, so the blend's next upload can
/// still be numbered.
pub fn resolve(assignment: LotAssignment, blend_code: &str, manual: Option<i64>) -> Result<i64> {
    let lot = match (assignment, manual) {
        (LotAssignment::Next(next), None) => next,
        (LotAssignment::Next(next), Some(lot)) if lot >= next => lot,
        (LotAssignment::Next(next), Some(lot)) => {
            return Err(Error::InvalidInput(format!(
                "lot {} for blend {} must be at least {}",
                lot, blend_code, next
            )))
        }
        (LotAssignment::NeedsManualEntry, Some(lot)) if lot >= 0 => lot,
        (LotAssignment::NeedsManualEntry, Some(lot)) => {
            return Err(Error::InvalidInput(format!("lot number {} is negative", lot)))
        }
        (LotAssignment::NeedsManualEntry, None) => {
            return Err(Error::LotNumberRequired(blend_code.to_string()))
        }
    };
    next_after(blend_code, lot)?;
    Ok(lot)
}

/// Look up the blend's history and choose the lot number for a new upload
pub async fn resolve_lot(store: &Store, blend_code: &str, manual: Option<i64>) -> Result<i64> {
    let assignment = lot_assignment(store, blend_code).await?;
    resolve(assignment, blend_code, manual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_gives_next_lot() {
        assert_eq!(resolve(LotAssignment::Next(12), "B1", None).unwrap(), 12);
    }

    #[test]
    fn test_manual_lot_must_move_forward() {
        assert_eq!(resolve(LotAssignment::Next(12), "B1", Some(15)).unwrap(), 15);
        assert!(matches!(
            resolve(LotAssignment::Next(12), "B1", Some(11)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_first_lot_needs_manual_entry() {
        assert!(matches!(
            resolve(LotAssignment::NeedsManualEntry, "B1", None),
            Err(Error::LotNumberRequired(code)) if code == "B1"
        ));
        assert_eq!(resolve(LotAssignment::NeedsManualEntry, "B1", Some(0)).unwrap(), 0);
        assert!(resolve(LotAssignment::NeedsManualEntry, "B1", Some(-1)).is_err());
    }

    #[test]
    fn test_last_representable_lot_is_refused() {
        assert!(matches!(
            resolve(LotAssignment::NeedsManualEntry, "B1", Some(i64::MAX)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            resolve(LotAssignment::Next(12), "B1", Some(i64::MAX)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            resolve(LotAssignment::Next(i64::MAX), "B1", None),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(
            resolve(LotAssignment::Next(12), "B1", Some(i64::MAX - 1)).unwrap(),
            i64::MAX - 1
        );
    }

    #[test]
    fn test_next_after_overflow() {
        assert_eq!(next_after("B1", 41).unwrap(), 42);
        assert!(matches!(next_after("B1", i64::MAX), Err(Error::InvalidInput(_))));
    }
}
