#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::utils::relay_utils::timestamp_local_display;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Hard cap on retained callback entries; the oldest entry is evicted when
// an insert would exceed it.
pub const MAX_ENTRIES: usize = 100;

// ***************************************************************************
//                               Data Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// CallbackEntry:
// ---------------------------------------------------------------------------
/** One inbound callback: the payload exactly as posted, plus receipt
 * metadata.  Entries are immutable once created and owned exclusively by
 * the store.
 */
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEntry {
    pub data: Value,
    pub received_at: String,
    pub source_ip: String,
    pub user_agent: String,
}

// ---------------------------------------------------------------------------
// ReceiveAck:
// ---------------------------------------------------------------------------
/** Acknowledgment returned to the caller of receive(). */
#[derive(Debug)]
pub struct ReceiveAck {
    pub received_at: String,
    pub total_entries: usize,
}

// ***************************************************************************
//                             CallbackStore
// ***************************************************************************
/** The process-wide buffer of received callbacks, newest first.  All access
 * goes through a single mutex; the lock is never held across I/O, only for
 * the insert/snapshot/clear itself.
 */
pub struct CallbackStore {
    entries: Mutex<VecDeque<CallbackEntry>>,
}

impl CallbackStore {
    pub fn new() -> Self {
        Self { entries: Mutex::new(VecDeque::with_capacity(MAX_ENTRIES)) }
    }

    // -----------------------------------------------------------------------
    // receive:
    // -----------------------------------------------------------------------
    /** Record a callback payload.  The new entry goes to the front of the
     * sequence; the oldest entry is dropped once the cap is exceeded.
     */
    pub fn receive(&self, data: Value, source_ip: String, user_agent: String) -> ReceiveAck {
        let entry = CallbackEntry {
            data,
            received_at: timestamp_local_display(),
            source_ip,
            user_agent,
        };
        let received_at = entry.received_at.clone();

        let mut guard = self.guard();
        guard.push_front(entry);
        if guard.len() > MAX_ENTRIES {
            guard.pop_back();
        }

        ReceiveAck { received_at, total_entries: guard.len() }
    }

    // -----------------------------------------------------------------------
    // list:
    // -----------------------------------------------------------------------
    /** Snapshot of all entries, newest first.  Readers work on the clone so
     * the lock is released before any rendering or serialization happens.
     */
    pub fn list(&self) -> Vec<CallbackEntry> {
        self.guard().iter().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // clear:
    // -----------------------------------------------------------------------
    /** Drop every entry and report how many were removed. */
    pub fn clear(&self) -> usize {
        let mut guard = self.guard();
        let removed = guard.len();
        guard.clear();
        removed
    }

    // -----------------------------------------------------------------------
    // len:
    // -----------------------------------------------------------------------
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    // -----------------------------------------------------------------------
    // guard:
    // -----------------------------------------------------------------------
    // Entries are plain data, so a panic while the lock was held cannot have
    // left them logically inconsistent; recover from poisoning.
    fn guard(&self) -> MutexGuard<'_, VecDeque<CallbackEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CallbackStore {
    fn default() -> Self {
        Self::new()
    }
}

// Dumping the runtime context should not dump payloads; the count suffices.
impl std::fmt::Debug for CallbackStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackStore").field("len", &self.len()).finish()
    }
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with(n: usize) -> CallbackStore {
        let store = CallbackStore::new();
        for i in 0..n {
            store.receive(json!({"seq": i}), "127.0.0.1".to_string(), "test".to_string());
        }
        store
    }

    #[test]
    fn receive_then_list() {
        let store = CallbackStore::new();
        let ack = store.receive(json!({"foo": 1}), "10.0.0.1".to_string(), "curl/8".to_string());
        assert_eq!(ack.total_entries, 1);

        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, json!({"foo": 1}));
        assert_eq!(entries[0].source_ip, "10.0.0.1");
        assert_eq!(entries[0].user_agent, "curl/8");
        assert_eq!(entries[0].received_at, ack.received_at);
    }

    #[test]
    fn newest_first_ordering() {
        let store = store_with(5);
        let entries = store.list();
        assert_eq!(entries[0].data, json!({"seq": 4}));
        assert_eq!(entries[4].data, json!({"seq": 0}));
    }

    #[test]
    fn cap_evicts_oldest() {
        let store = store_with(MAX_ENTRIES + 7);
        let entries = store.list();
        assert_eq!(entries.len(), MAX_ENTRIES);
        // Most recent insert is at index 0.
        assert_eq!(entries[0].data, json!({"seq": MAX_ENTRIES + 6}));
        // The 7 oldest entries were evicted.
        assert_eq!(entries[MAX_ENTRIES - 1].data, json!({"seq": 7}));
    }

    #[test]
    fn ack_counts_saturate_at_cap() {
        let store = store_with(MAX_ENTRIES);
        let ack = store.receive(json!("more"), "ip".to_string(), "ua".to_string());
        assert_eq!(ack.total_entries, MAX_ENTRIES);
    }

    #[test]
    fn clear_empties_and_counts() {
        let store = store_with(12);
        assert_eq!(store.clear(), 12);
        assert_eq!(store.len(), 0);
        assert!(store.list().is_empty());
        // Clearing an empty store removes nothing.
        assert_eq!(store.clear(), 0);
    }
}
