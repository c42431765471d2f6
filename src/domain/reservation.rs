//! Time-bounded holds on inventory units.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Holder, VariantId};

/// Default hold duration for a reservation.
pub const DEFAULT_HOLD_HOURS: i64 = 24;

/// A time-bounded claim on inventory units, distinct from a committed sale.
///
/// One reservation exists per (variant, holder) pair; it is created on the
/// first add-to-cart, refreshed on every quantity change, and deleted on item
/// removal, checkout commit, or lazy expiry. A reservation with
/// `quantity == 0` is treated as non-existent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub variant_id: VariantId,
    pub holder: Holder,
    pub quantity: u32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    /// Create a fresh reservation expiring `hold` from now.
    #[must_use]
    pub fn new(variant_id: VariantId, holder: Holder, quantity: u32, hold: Duration) -> Self {
        let now = Utc::now();
        Self {
            variant_id,
            holder,
            quantity,
            reserved_at: now,
            expires_at: now + hold,
        }
    }

    /// Whether this reservation still counts against availability at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.quantity > 0 && self.expires_at > now
    }

    /// Set a new quantity and restart the hold window.
    ///
    /// Every quantity change refreshes `expires_at`; the shopper keeps the
    /// full hold as long as they keep touching the line.
    pub fn refresh(&mut self, quantity: u32, hold: Duration) {
        self.quantity = quantity;
        self.expires_at = Utc::now() + hold;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold() -> Duration {
        Duration::hours(DEFAULT_HOLD_HOURS)
    }

    #[test]
    fn new_reservation_is_active_for_the_hold_window() {
        let r = Reservation::new(VariantId::new("v1"), Holder::session("s1"), 2, hold());
        assert!(r.is_active(Utc::now()));
        assert!(!r.is_active(Utc::now() + Duration::hours(25)));
    }

    #[test]
    fn zero_quantity_reservation_is_never_active() {
        let r = Reservation::new(VariantId::new("v1"), Holder::session("s1"), 0, hold());
        assert!(!r.is_active(Utc::now()));
    }

    #[test]
    fn refresh_resets_the_expiry_window() {
        let mut r = Reservation::new(VariantId::new("v1"), Holder::account("a1"), 1, hold());
        r.expires_at = Utc::now() - Duration::hours(1);
        assert!(!r.is_active(Utc::now()));

        r.refresh(3, hold());
        assert_eq!(r.quantity, 3);
        assert!(r.is_active(Utc::now()));
        assert!(r.expires_at > Utc::now() + Duration::hours(23));
    }
}
