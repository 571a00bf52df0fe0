//! Baud-rate fallback policy.

use crate::protocol::ProtocolFamily;
use crate::result::UploadOutcome;

/// Ordered list of rates to try, consumed one attempt at a time.
///
/// The first rate is the board's declared upload speed; the family's
/// fallback rates follow, without repeats. Only a synchronization failure
/// moves the ladder forward; any other outcome ends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaudLadder {
    rates: Vec<u32>,
    next: usize,
}

impl BaudLadder {
    pub fn new(family: ProtocolFamily, declared: Option<u32>) -> Self {
        let mut rates = vec![declared.filter(|b| *b > 0).unwrap_or(family.default_baud())];
        for &rate in family.fallback_bauds() {
            if !rates.contains(&rate) {
                rates.push(rate);
            }
        }
        Self { rates, next: 0 }
    }

    pub fn rates(&self) -> &[u32] {
        &self.rates
    }

    /// Rate for the next attempt, given the outcome of the previous one
    /// (`None` before the first attempt).
    pub fn advance(&mut self, previous: Option<UploadOutcome>) -> Option<u32> {
        match previous {
            None | Some(UploadOutcome::SyncFailure) => {
                let rate = self.rates.get(self.next).copied();
                self.next += 1;
                rate
            }
            Some(_) => None,
        }
    }
}
