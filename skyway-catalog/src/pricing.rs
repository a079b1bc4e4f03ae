use chrono::{DateTime, Utc};
use skyway_core::model::FlightPricing;

/// Picks the pricing record in force at `at`.
///
/// Several records can overlap; the one that became effective last wins,
/// then the most recently created, then the highest id, so the answer never
/// depends on storage order.
pub fn select_active(records: &[FlightPricing], at: DateTime<Utc>) -> Option<&FlightPricing> {
    records
        .iter()
        .filter(|p| p.is_effective_at(at))
        .max_by(|a, b| {
            a.effective_from
                .cmp(&b.effective_from)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        })
}
