#![no_main]
use libfuzzer_sys::fuzz_target;
use shutter_core::StoredState;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let s = StoredState::from_decimal(text);
        let _ = s.to_decimal();
    }

    if data.len() >= 8 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data[..8]);
        let s = StoredState::from_u64(u64::from_le_bytes(raw));
        // Anything that decodes as valid must survive a round trip.
        if s.is_valid() {
            assert_eq!(StoredState::from_u64(s.to_u64()), s);
        }
    }
});
