use balancer_core::mocks::RecordingActuator;
use balancer_core::{ActuatorRange, BuildError, ControlCfg, ControlHandle};
use rstest::rstest;

fn build_error(r: eyre::Result<ControlHandle>) -> BuildError {
    let err = r.expect_err("build should fail");
    err.downcast_ref::<BuildError>()
        .cloned()
        .unwrap_or_else(|| panic!("not a BuildError: {err:?}"))
}

#[test]
fn missing_actuator_is_reported() {
    let err = build_error(ControlHandle::builder().try_build());
    assert!(matches!(err, BuildError::MissingActuator));
}

#[rstest]
#[case(ActuatorRange { min_deg: 90.0, max_deg: 90.0 }, "min_deg")]
#[case(ActuatorRange { min_deg: 120.0, max_deg: 60.0 }, "min_deg")]
#[case(ActuatorRange { min_deg: f32::NAN, max_deg: 180.0 }, "finite")]
fn bad_range_is_rejected(#[case] range: ActuatorRange, #[case] needle: &str) {
    let err = build_error(
        ControlHandle::builder()
            .with_actuator(RecordingActuator::new())
            .with_range(range)
            .build(),
    );
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn initial_position_outside_range_is_rejected() {
    let err = build_error(
        ControlHandle::builder()
            .with_actuator(RecordingActuator::new())
            .with_initial_position(200.0)
            .build(),
    );
    assert!(err.to_string().contains("initial position"));
}

#[rstest]
#[case(ControlCfg { deadband_cm: -0.1, integral_limit: 100.0 }, "deadband")]
#[case(ControlCfg { deadband_cm: 0.5, integral_limit: 0.0 }, "integral_limit")]
#[case(ControlCfg { deadband_cm: 0.5, integral_limit: f32::INFINITY }, "integral_limit")]
fn bad_control_shape_is_rejected(#[case] control: ControlCfg, #[case] needle: &str) {
    let err = build_error(
        ControlHandle::builder()
            .with_actuator(RecordingActuator::new())
            .with_control(control)
            .build(),
    );
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn failed_build_does_not_command_the_actuator() {
    let act = RecordingActuator::new();
    let _ = ControlHandle::builder()
        .with_actuator(act.clone())
        .with_initial_position(-5.0)
        .build();
    assert!(act.commands().is_empty());
}
