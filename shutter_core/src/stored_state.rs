//! Packed persisted state: both course times and the current level in one
//! `u64`, or its fixed-width decimal text form.
//!
//! Bit layout, counted from the least significant bit:
//!
//! | bits     | field                              |
//! |----------|------------------------------------|
//! | 0..=3    | reserved, always zero              |
//! | 4        | raw level, bit 7                   |
//! | 5..=11   | raw level, bits 0..=6              |
//! | 12..=37  | down course time (26 bits, ms)     |
//! | 38..=63  | up course time (26 bits, ms)       |
//!
//! The raw level is `level + LEVEL_OFFSET`; any raw value below the offset
//! decodes as "level unknown" (encoded as raw 0). Raw levels up to 127 sit
//! entirely in bits 5..=11, so only level 100 (raw 128) needs bit 4.

/// Width of each course-time field.
pub const COURSE_TIME_BITS: u32 = 26;
/// Largest encodable course time (ms).
pub const MAX_COURSE_TIME: u32 = (1 << COURSE_TIME_BITS) - 1;
/// Offset added to a level before packing it.
pub const LEVEL_OFFSET: u8 = 28;
/// Highest valid level (fully closed).
pub const MAX_LEVEL: u8 = 100;
/// Digits in the decimal form (`u64::MAX` has 20).
pub const STATE_DIGITS: usize = 20;

const UP_SHIFT: u32 = 38;
const DOWN_SHIFT: u32 = 12;
const LEVEL_LOW_SHIFT: u32 = 5;
const LEVEL_HIGH_SHIFT: u32 = 4;
const COURSE_MASK: u64 = (1 << COURSE_TIME_BITS) - 1;
const LEVEL_LOW_MASK: u64 = 0x7F;

/// Decoded view of the persisted state.
///
/// Setters enforce the field ranges, so a value built through them always
/// encodes losslessly. Values decoded from storage may be out of range;
/// check `is_valid` before trusting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredState {
    up_course_time: u32,
    down_course_time: u32,
    level: Option<u8>,
}

impl Default for StoredState {
    fn default() -> Self {
        Self::new()
    }
}

impl StoredState {
    /// All-zero state; never valid.
    pub const fn new() -> Self {
        Self {
            up_course_time: 0,
            down_course_time: 0,
            level: Some(0),
        }
    }

    /// Decode a packed value.
    pub fn from_u64(state: u64) -> Self {
        let up = (state >> UP_SHIFT) & COURSE_MASK;
        let down = (state >> DOWN_SHIFT) & COURSE_MASK;
        let raw_low = (state >> LEVEL_LOW_SHIFT) & LEVEL_LOW_MASK;
        let raw_high = (state >> LEVEL_HIGH_SHIFT) & 1;
        let raw = (raw_high << 7) | raw_low;
        let level = if raw < u64::from(LEVEL_OFFSET) {
            None
        } else {
            // raw <= 255, so the difference always fits in a u8.
            u8::try_from(raw - u64::from(LEVEL_OFFSET)).ok()
        };
        Self {
            up_course_time: u32::try_from(up).unwrap_or(0),
            down_course_time: u32::try_from(down).unwrap_or(0),
            level,
        }
    }

    /// Encode into the packed form.
    pub fn to_u64(&self) -> u64 {
        let raw = match self.level {
            None => 0,
            Some(level) => (u64::from(level) + u64::from(LEVEL_OFFSET)) & 0xFF,
        };
        ((u64::from(self.up_course_time) & COURSE_MASK) << UP_SHIFT)
            | ((u64::from(self.down_course_time) & COURSE_MASK) << DOWN_SHIFT)
            | ((raw & LEVEL_LOW_MASK) << LEVEL_LOW_SHIFT)
            | ((raw >> 7) << LEVEL_HIGH_SHIFT)
    }

    /// Decode the decimal form.
    ///
    /// Reads at most `STATE_DIGITS` leading ASCII digits and stops at the first
    /// non-digit. A value that overflows `u64` decodes as the all-zero
    /// (invalid) state.
    pub fn from_decimal(text: &str) -> Self {
        let mut value: u64 = 0;
        for b in text.bytes().take(STATE_DIGITS) {
            if !b.is_ascii_digit() {
                break;
            }
            let next = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')));
            match next {
                Some(v) => value = v,
                None => return Self::new(),
            }
        }
        Self::from_u64(value)
    }

    /// Zero-padded decimal form, always `STATE_DIGITS` long.
    pub fn to_decimal(&self) -> String {
        format!("{:0width$}", self.to_u64(), width = STATE_DIGITS)
    }

    /// Both course times configured and the level in range (or unknown).
    pub fn is_valid(&self) -> bool {
        let level_valid = match self.level {
            None => true,
            Some(level) => level <= MAX_LEVEL,
        };
        self.up_course_time > 0 && self.down_course_time > 0 && level_valid
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }

    /// Set the level; `None` marks it unknown. Levels above 100 are ignored.
    pub fn set_level(&mut self, level: Option<u8>) -> bool {
        if matches!(level, Some(l) if l > MAX_LEVEL) {
            return false;
        }
        self.level = level;
        true
    }

    pub fn up_course_time(&self) -> u32 {
        self.up_course_time
    }

    /// Ignored (returns false) for 0 or values above `MAX_COURSE_TIME`.
    pub fn set_up_course_time(&mut self, ms: u32) -> bool {
        if !course_time_in_range(ms) {
            return false;
        }
        self.up_course_time = ms;
        true
    }

    pub fn down_course_time(&self) -> u32 {
        self.down_course_time
    }

    /// Ignored (returns false) for 0 or values above `MAX_COURSE_TIME`.
    pub fn set_down_course_time(&mut self, ms: u32) -> bool {
        if !course_time_in_range(ms) {
            return false;
        }
        self.down_course_time = ms;
        true
    }

    /// Forget everything. The result is rejected by `is_valid`.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Course time fits the encoding and is not the "unconfigured" zero.
#[inline]
pub fn course_time_in_range(ms: u32) -> bool {
    ms > 0 && ms <= MAX_COURSE_TIME
}

impl From<u64> for StoredState {
    fn from(state: u64) -> Self {
        Self::from_u64(state)
    }
}

impl From<StoredState> for u64 {
    fn from(state: StoredState) -> Self {
        state.to_u64()
    }
}

impl core::fmt::Display for StoredState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:0width$}", self.to_u64(), width = STATE_DIGITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(up: u32, down: u32, level: Option<u8>) -> StoredState {
        let mut s = StoredState::new();
        assert!(s.set_up_course_time(up));
        assert!(s.set_down_course_time(down));
        assert!(s.set_level(level));
        s
    }

    #[test]
    fn up_course_time_occupies_top_26_bits() {
        let s = state(MAX_COURSE_TIME, 1, None);
        let packed = s.to_u64();
        assert_eq!(packed >> 38, u64::from(MAX_COURSE_TIME));
        assert_eq!(StoredState::from_u64(packed).up_course_time(), MAX_COURSE_TIME);
    }

    #[test]
    fn down_course_time_sits_between_level_and_up() {
        let s = state(1, MAX_COURSE_TIME, None);
        let packed = s.to_u64();
        assert_eq!((packed >> 12) & COURSE_MASK, u64::from(MAX_COURSE_TIME));
        assert_eq!(packed >> 38, 1);
        assert_eq!(
            StoredState::from_u64(packed).down_course_time(),
            MAX_COURSE_TIME
        );
    }

    #[test]
    fn level_is_offset_and_reserved_bits_stay_clear() {
        let packed = state(1, 1, Some(0)).to_u64();
        assert_eq!((packed >> 5) & 0x7F, u64::from(LEVEL_OFFSET));
        assert_eq!(packed & 0x1F, 0);

        let packed = state(1, 1, Some(99)).to_u64();
        assert_eq!((packed >> 5) & 0x7F, 127);
        assert_eq!(packed & 0x1F, 0);
    }

    #[test]
    fn level_100_uses_the_high_level_bit_without_touching_down_course() {
        let s = state(10_000, 12_000, Some(100));
        let packed = s.to_u64();
        assert_eq!(packed & 0x0F, 0, "reserved bits must stay zero");
        assert_eq!((packed >> 4) & 1, 1);
        assert_eq!((packed >> 5) & 0x7F, 0);
        assert_eq!(StoredState::from_u64(packed), s);
    }

    #[test]
    fn matches_reference_layout_for_levels_below_100() {
        // (up << 38) | (down << 12) | ((level + 28) << 5)
        let expected = (10_000u64 << 38) | (12_000u64 << 12) | (78u64 << 5);
        assert_eq!(state(10_000, 12_000, Some(50)).to_u64(), expected);
        assert_eq!(
            StoredState::from_u64(expected),
            state(10_000, 12_000, Some(50))
        );
    }

    #[test]
    fn unknown_level_is_distinct_from_zero() {
        let none = state(500, 600, None);
        let zero = state(500, 600, Some(0));
        assert_ne!(none.to_u64(), zero.to_u64());
        assert_eq!(StoredState::from_u64(none.to_u64()).level(), None);
        assert_eq!(StoredState::from_u64(zero.to_u64()).level(), Some(0));
    }

    #[test]
    fn raw_levels_below_offset_decode_as_unknown() {
        for raw in 0..u64::from(LEVEL_OFFSET) {
            let packed = (1u64 << 38) | (1u64 << 12) | (raw << 5);
            assert_eq!(StoredState::from_u64(packed).level(), None, "raw {raw}");
        }
    }

    #[test]
    fn out_of_range_raw_level_is_invalid() {
        // raw 129 -> level 101
        let packed = (1u64 << 38) | (1u64 << 12) | (1u64 << 4) | (1u64 << 5);
        let s = StoredState::from_u64(packed);
        assert_eq!(s.level(), Some(101));
        assert!(!s.is_valid());
    }

    #[test]
    fn validity_requires_both_course_times() {
        assert!(!StoredState::new().is_valid());
        let mut s = StoredState::new();
        s.set_up_course_time(100);
        assert!(!s.is_valid());
        s.set_down_course_time(100);
        assert!(s.is_valid());
        s.set_level(None);
        assert!(s.is_valid());
        s.reset();
        assert!(!s.is_valid());
        assert_eq!(s.to_u64(), u64::from(LEVEL_OFFSET) << 5);
    }

    #[test]
    fn setters_reject_out_of_range_values() {
        let mut s = state(100, 200, Some(10));
        assert!(!s.set_up_course_time(0));
        assert!(!s.set_up_course_time(MAX_COURSE_TIME + 1));
        assert!(!s.set_down_course_time(0));
        assert!(!s.set_down_course_time(u32::MAX));
        assert!(!s.set_level(Some(101)));
        assert_eq!(s, state(100, 200, Some(10)));
    }

    #[test]
    fn decimal_form_is_zero_padded_to_twenty_digits() {
        let s = state(1, 1, Some(0));
        let text = s.to_decimal();
        assert_eq!(text.len(), STATE_DIGITS);
        assert_eq!(text, s.to_string());
        assert!(text.starts_with("0000000"));
        assert_eq!(StoredState::from_decimal(&text), s);

        let big = state(MAX_COURSE_TIME, MAX_COURSE_TIME, Some(100));
        assert_eq!(StoredState::from_decimal(&big.to_decimal()), big);
    }

    #[test]
    fn decimal_parsing_stops_at_first_non_digit() {
        let s = state(3, 4, Some(5));
        let text = format!("{}\n", s.to_decimal());
        assert_eq!(StoredState::from_decimal(&text), s);
        assert_eq!(
            StoredState::from_decimal("4096x34"),
            StoredState::from_u64(4096)
        );
        assert_eq!(StoredState::from_decimal("4096x34").down_course_time(), 1);
        assert!(!StoredState::from_decimal("").is_valid());
        assert!(!StoredState::from_decimal("garbage").is_valid());
    }

    #[test]
    fn decimal_overflow_decodes_as_invalid() {
        let s = StoredState::from_decimal("99999999999999999999");
        assert_eq!(s, StoredState::new());
        assert!(!s.is_valid());
    }
}
