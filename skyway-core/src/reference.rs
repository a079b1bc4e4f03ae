use async_trait::async_trait;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::error::{BookingError, ConflictKind, CoreResult};

/// Ambiguous glyphs (0/O, 1/I) are left out so references can be read aloud.
const PNR_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const HEX: &[u8] = b"0123456789ABCDEF";

pub const DEFAULT_REFERENCE_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    BookingReference,
    TicketNumber,
    BaggageTag,
    TransactionId,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::BookingReference => "booking reference",
            ReferenceKind::TicketNumber => "ticket number",
            ReferenceKind::BaggageTag => "baggage tag",
            ReferenceKind::TransactionId => "transaction id",
        };
        f.write_str(name)
    }
}

impl ReferenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::BookingReference => "BK",
            ReferenceKind::TicketNumber => "TK",
            ReferenceKind::BaggageTag => "BG",
            ReferenceKind::TransactionId => "TX",
        }
    }

    fn body(&self) -> (&'static [u8], usize) {
        match self {
            ReferenceKind::BookingReference => (PNR_CHARSET, 8),
            ReferenceKind::TicketNumber => (b"0123456789", 12),
            ReferenceKind::BaggageTag => (b"0123456789", 10),
            ReferenceKind::TransactionId => (HEX, 16),
        }
    }

    /// A random value of this kind. Not checked for uniqueness.
    pub fn candidate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let (charset, len) = self.body();
        let mut value = String::with_capacity(self.prefix().len() + len);
        value.push_str(self.prefix());
        for _ in 0..len {
            value.push(charset[rng.gen_range(0..charset.len())] as char);
        }
        value
    }

    /// Shape check: right prefix, length and alphabet.
    pub fn matches(&self, value: &str) -> bool {
        let (charset, len) = self.body();
        value
            .strip_prefix(self.prefix())
            .map(|rest| rest.len() == len && rest.bytes().all(|b| charset.contains(&b)))
            .unwrap_or(false)
    }
}

/// Looks a value up in the persisted namespace of its kind.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn reference_exists(&self, kind: ReferenceKind, value: &str) -> CoreResult<bool>;
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceGenerator {
    max_attempts: u32,
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_ATTEMPTS)
    }
}

impl ReferenceGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws candidates until one is unused both in the store and in `issued`
    /// (values handed out earlier in the same batch). The winner is added to
    /// `issued`.
    pub async fn issue<P>(
        &self,
        kind: ReferenceKind,
        lookup: &P,
        issued: &mut HashSet<String>,
    ) -> CoreResult<String>
    where
        P: ReferenceLookup + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = kind.candidate(&mut rand::thread_rng());
            if issued.contains(&candidate) {
                debug!(%kind, attempt, "candidate repeated within batch");
                continue;
            }
            if lookup.reference_exists(kind, &candidate).await? {
                debug!(%kind, attempt, "candidate already persisted");
                continue;
            }
            issued.insert(candidate.clone());
            return Ok(candidate);
        }
        Err(BookingError::Conflict(ConflictKind::Reference(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Reports the first `collisions` lookups as taken.
    struct CollidingLookup {
        collisions: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ReferenceLookup for CollidingLookup {
        async fn reference_exists(&self, _kind: ReferenceKind, _value: &str) -> CoreResult<bool> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(n < self.collisions)
        }
    }

    fn lookup(collisions: u32) -> CollidingLookup {
        CollidingLookup {
            collisions,
            calls: AtomicU32::new(0),
        }
    }

    #[test]
    fn candidates_have_expected_shape() {
        let mut rng = rand::thread_rng();
        for kind in [
            ReferenceKind::BookingReference,
            ReferenceKind::TicketNumber,
            ReferenceKind::BaggageTag,
            ReferenceKind::TransactionId,
        ] {
            let value = kind.candidate(&mut rng);
            assert!(kind.matches(&value), "{} -> {}", kind, value);
        }
        assert!(!ReferenceKind::BookingReference.matches("BK0000000O"));
        assert!(!ReferenceKind::TicketNumber.matches("TK123"));
    }

    #[tokio::test]
    async fn retries_past_persisted_collisions() {
        let generator = ReferenceGenerator::new(8);
        let lookup = lookup(3);
        let mut issued = HashSet::new();

        let value = generator
            .issue(ReferenceKind::TicketNumber, &lookup, &mut issued)
            .await
            .unwrap();

        assert!(issued.contains(&value));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_with_conflict_after_max_attempts() {
        let generator = ReferenceGenerator::new(2);
        let lookup = lookup(u32::MAX);
        let mut issued = HashSet::new();

        let err = generator
            .issue(ReferenceKind::BookingReference, &lookup, &mut issued)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BookingError::Conflict(ConflictKind::Reference(ReferenceKind::BookingReference))
        ));
        assert!(issued.is_empty());
    }

    #[tokio::test]
    async fn batch_values_are_distinct() {
        let generator = ReferenceGenerator::default();
        let lookup = lookup(0);
        let mut issued = HashSet::new();
        for _ in 0..50 {
            generator
                .issue(ReferenceKind::BaggageTag, &lookup, &mut issued)
                .await
                .unwrap();
        }
        assert_eq!(issued.len(), 50);
    }
}
