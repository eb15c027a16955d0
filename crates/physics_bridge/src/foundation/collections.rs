//! Slot map helpers for handle-based registries
//!
//! Engine handles cross the bridge as plain `u64` values. Slot map keys are
//! packed with [`KeyData::as_ffi`], which never yields zero for a live key,
//! so zero stays free to act as the "absent" sentinel.

pub use slotmap::{Key, KeyData, SlotMap};

/// Pack a slot map key into a raw, non-zero handle value
pub fn key_to_raw<K: Key>(key: K) -> u64 {
    key.data().as_ffi()
}

/// Unpack a raw handle value into a slot map key
///
/// Returns `None` for the zero sentinel.
pub fn raw_to_key<K: Key>(raw: u64) -> Option<K> {
    if raw == 0 {
        None
    } else {
        Some(KeyData::from_ffi(raw).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    slotmap::new_key_type! {
        struct TestKey;
    }

    #[test]
    fn test_raw_roundtrip_is_non_zero() {
        let mut map: SlotMap<TestKey, u32> = SlotMap::with_key();
        let key = map.insert(7);
        let raw = key_to_raw(key);

        assert_ne!(raw, 0);
        let back: TestKey = raw_to_key(raw).unwrap();
        assert_eq!(map.get(back), Some(&7));
    }

    #[test]
    fn test_zero_is_absent() {
        assert!(raw_to_key::<TestKey>(0).is_none());
    }

    #[test]
    fn test_stale_key_does_not_resolve() {
        let mut map: SlotMap<TestKey, u32> = SlotMap::with_key();
        let key = map.insert(1);
        let raw = key_to_raw(key);
        map.remove(key);
        map.insert(2);

        let stale: TestKey = raw_to_key(raw).unwrap();
        assert!(map.get(stale).is_none());
    }
}
