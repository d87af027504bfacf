use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;

/// Process-wide document number allocator.
///
/// Numbers look like `SO-20260415-0001`: prefix, issue date, then a counter
/// that resets per prefix and day. Allocation is a single locked increment,
/// so two concurrent callers can never draw the same number.
#[derive(Debug, Default)]
pub struct DocumentSequence {
    counters: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl DocumentSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, prefix: &str, date: NaiveDate) -> String {
        let mut counters = match self.counters.lock() {
            Ok(guard) => guard,
            // The counter map cannot be left half-updated, so a poisoned
            // lock is still usable.
            Err(poisoned) => poisoned.into_inner(),
        };
        let counter = counters.entry((prefix.to_owned(), date)).or_insert(0);
        *counter += 1;
        format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()
    }

    #[test]
    fn numbers_increment_per_prefix_and_day() {
        let seq = DocumentSequence::new();
        let date = test_date();

        assert_eq!(seq.next("SO", date), "SO-20260415-0001");
        assert_eq!(seq.next("SO", date), "SO-20260415-0002");
        assert_eq!(seq.next("PO", date), "PO-20260415-0001");

        let next_day = date.succ_opt().unwrap();
        assert_eq!(seq.next("SO", next_day), "SO-20260416-0001");
    }

    #[test]
    fn concurrent_allocation_never_duplicates() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let seq = Arc::new(DocumentSequence::new());
        let date = test_date();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let seq = Arc::clone(&seq);
            handles.push(thread::spawn(move || {
                (0..25).map(|_| seq.next("SO", date)).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for number in handle.join().expect("worker panicked") {
                assert!(seen.insert(number), "duplicate document number");
            }
        }
        assert_eq!(seen.len(), 200);
    }
}
