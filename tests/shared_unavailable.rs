use padstate::backends::mock::{MockLibraries, MockXInput};
use padstate::config::XInputConfig;
use padstate::xinput::{Revision, XInput};
use padstate::InputError;

#[test]
fn failed_resolution_is_kept_for_the_process() {
    let pads = MockXInput::new();
    let nothing = MockLibraries::new(&pads, []);
    let err = XInput::shared_with(&nothing, &XInputConfig::default()).unwrap_err();
    assert!(matches!(err, InputError::FacilityUnavailable));

    let installed = MockLibraries::new(&pads, [Revision::V1_4]);
    let again = XInput::shared_with(&installed, &XInputConfig::default()).unwrap_err();
    assert!(matches!(again, InputError::FacilityUnavailable));
    assert!(installed.probed().is_empty(), "no second probe");
}
