use proptest::prelude::*;
use shutter_core::mocks::{SpyMotor, SpyStore};
use shutter_core::stored_state::{MAX_COURSE_TIME, MAX_LEVEL};
use shutter_core::{CourseCfg, SafetyCfg, StoredState, build_shutter};
use shutter_traits::ManualClock;

fn level_strategy() -> impl Strategy<Value = Option<u8>> {
    prop_oneof![Just(None), (0u8..=MAX_LEVEL).prop_map(Some)]
}

/// A request the property harness can throw at a running shutter.
#[derive(Debug, Clone)]
enum Cmd {
    SetLevel(u8),
    Stop,
    Wait(u64),
}

fn cmd_strategy() -> impl Strategy<Value = Cmd> {
    prop_oneof![
        (0u8..=120).prop_map(Cmd::SetLevel),
        Just(Cmd::Stop),
        (1u64..400).prop_map(Cmd::Wait),
    ]
}

proptest! {
    #[test]
    fn codec_round_trips(
        up in 1u32..=MAX_COURSE_TIME,
        down in 1u32..=MAX_COURSE_TIME,
        level in level_strategy(),
    ) {
        let mut s = StoredState::new();
        prop_assert!(s.set_up_course_time(up));
        prop_assert!(s.set_down_course_time(down));
        prop_assert!(s.set_level(level));
        prop_assert!(s.is_valid());

        let decoded = StoredState::from_u64(s.to_u64());
        prop_assert_eq!(decoded, s);
        prop_assert_eq!(StoredState::from_decimal(&s.to_decimal()), s);
    }

    #[test]
    fn reserved_bits_are_never_set(
        up in 1u32..=MAX_COURSE_TIME,
        down in 1u32..=MAX_COURSE_TIME,
        level in level_strategy(),
    ) {
        let mut s = StoredState::new();
        s.set_up_course_time(up);
        s.set_down_course_time(down);
        s.set_level(level);
        prop_assert_eq!(s.to_u64() & 0xF, 0);
    }

    #[test]
    fn any_decimal_input_decodes_without_panicking(text in "\\PC{0,30}") {
        let s = StoredState::from_decimal(&text);
        if s.is_valid() {
            prop_assert!(s.level().is_none_or(|l| l <= MAX_LEVEL));
        }
    }

    #[test]
    fn levels_stay_in_range_under_random_requests(
        start in 0u8..=MAX_LEVEL,
        cmds in proptest::collection::vec(cmd_strategy(), 1..60),
    ) {
        let mut initial = StoredState::new();
        initial.set_up_course_time(2_000);
        initial.set_down_course_time(3_000);
        initial.set_level(Some(start));

        let store = SpyStore::with_state(initial.to_u64());
        let clock = ManualClock::new();
        let mut shutter = build_shutter(
            SpyMotor::new(),
            store.clone(),
            CourseCfg { up_course_ms: 2_000, down_course_ms: 3_000, calibration_ratio: 0.1 },
            SafetyCfg { delay_ms: 50 },
            Some(Box::new(clock.clone())),
        )
        .expect("build");

        for cmd in cmds {
            match cmd {
                Cmd::SetLevel(l) => shutter.set_level(l),
                Cmd::Stop => shutter.stop(),
                Cmd::Wait(ms) => {
                    for _ in 0..ms / 5 {
                        clock.advance_ms(5);
                        shutter.tick().expect("tick");
                    }
                }
            }
            prop_assert!(shutter.current_level().is_none_or(|l| l <= MAX_LEVEL));
            prop_assert!(shutter.target_level().is_none_or(|l| l <= MAX_LEVEL));
        }
        for w in store.writes() {
            let s = StoredState::from_u64(w);
            prop_assert!(s.level().is_none_or(|l| l <= MAX_LEVEL));
            prop_assert!(s.is_valid());
        }
    }
}
