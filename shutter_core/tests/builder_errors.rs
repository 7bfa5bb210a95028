use rstest::rstest;
use shutter_core::error::BuildError;
use shutter_core::mocks::{FailingStore, SpyMotor, SpyStore};
use shutter_core::{CourseCfg, DynShutter, SafetyCfg};

#[test]
fn builder_missing_store_yields_typed_build_error() {
    let err = DynShutter::builder()
        .with_motor(SpyMotor::new())
        .with_course_time(10_000, 0)
        .try_build()
        .expect_err("should fail with MissingStore");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingStore) => {}
        other => panic!("expected MissingStore, got: {other:?}"),
    }
}

#[test]
fn builder_missing_motor_yields_typed_build_error() {
    let err = DynShutter::builder()
        .with_store(SpyStore::new())
        .try_build()
        .expect_err("should fail with MissingMotor");

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingMotor)
    ));
}

#[rstest]
#[case(CourseCfg { up_course_ms: 10_000, down_course_ms: 0, calibration_ratio: 0.0 }, "calibration_ratio")]
#[case(CourseCfg { up_course_ms: 10_000, down_course_ms: 0, calibration_ratio: 1.5 }, "calibration_ratio")]
#[case(CourseCfg { up_course_ms: 10_000, down_course_ms: 0, calibration_ratio: f32::NAN }, "calibration_ratio")]
#[case(CourseCfg { up_course_ms: 1 << 26, down_course_ms: 0, calibration_ratio: 0.1 }, "up_course_ms")]
#[case(CourseCfg { up_course_ms: 10_000, down_course_ms: 1 << 26, calibration_ratio: 0.1 }, "down_course_ms")]
#[case(CourseCfg { up_course_ms: 0, down_course_ms: 5_000, calibration_ratio: 0.1 }, "down_course_ms")]
fn invalid_course_is_rejected(#[case] course: CourseCfg, #[case] field: &str) {
    let err = DynShutter::builder()
        .with_motor(SpyMotor::new())
        .with_store(SpyStore::new())
        .with_course(course)
        .build()
        .expect_err("invalid course");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(field), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[test]
fn oversized_safety_delay_is_rejected() {
    let err = DynShutter::builder()
        .with_motor(SpyMotor::new())
        .with_store(SpyStore::new())
        .with_course_time(10_000, 0)
        .with_safety(SafetyCfg { delay_ms: 120_000 })
        .build()
        .expect_err("delay too long");
    assert!(format!("{err}").contains("delay_ms"));
}

#[test]
fn unreadable_store_builds_with_unknown_level() {
    let shutter = DynShutter::builder()
        .with_motor(SpyMotor::new())
        .with_store(FailingStore)
        .with_course_time(10_000, 0)
        .build()
        .expect("store failures are not fatal");
    assert_eq!(shutter.current_level(), None);
    assert!(!shutter.is_reset());
}

#[test]
fn course_left_unset_keeps_reset_mode() {
    let mut shutter = DynShutter::builder()
        .with_motor(SpyMotor::new())
        .with_store(SpyStore::new())
        .build()
        .expect("build");
    assert!(shutter.is_reset());
    shutter.set_course_time(10_000, 12_000);
    assert!(shutter.begin());
    assert_eq!(shutter.down_course_time(), 12_000);
}
