use padstate::backends::mock::{MockLibraries, MockXInput};
use padstate::config::{Config, XInputConfig};
use padstate::xinput::ffi::RawKeystroke;
use padstate::xinput::{
    BatteryDeviceType, BatteryLevel, Controller, GamepadButton, GamepadButtons, Keystroke,
    KeystrokeFlags, Revision, Slot, XInput,
};
use padstate::{Device, DeviceRegistry, InputError};
use std::sync::Arc;
use std::time::Duration;

fn bind(pads: &MockXInput, installed: &[Revision], config: &XInputConfig) -> Arc<XInput> {
    let probe = MockLibraries::new(pads, installed.iter().copied());
    Arc::new(XInput::resolve(&probe, config).unwrap())
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn registry_tracks_controllers_by_slot() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::One);
    pads.connect(Slot::Three);

    let mut reg: DeviceRegistry<Controller, _> = DeviceRegistry::new(api);
    reg.discover().unwrap();
    let ids: Vec<_> = reg.all().iter().map(|c| c.id().to_string()).collect();
    assert_eq!(ids, ["xinput:0", "xinput:2"]);

    pads.set_buttons(Slot::Three, GamepadButtons::B);
    reg.update(ms(16)).unwrap();
    assert!(reg.get("xinput:2").unwrap().just_pressed(GamepadButton::B));

    pads.disconnect(Slot::One);
    reg.update(ms(32)).unwrap();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.default_device().unwrap().unwrap().slot(), Slot::Three);
}

#[test]
fn failing_slot_does_not_stop_the_others() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::One);
    pads.connect(Slot::Two);

    let mut reg: DeviceRegistry<Controller, _> = DeviceRegistry::new(api);
    reg.discover().unwrap();

    pads.fail_next(Slot::One, 87);
    pads.set_buttons(Slot::Two, GamepadButtons::X);
    let err = reg.update(ms(16)).unwrap_err();

    assert!(matches!(err, InputError::Native { code: 87, .. }));
    assert!(reg.get("xinput:1").unwrap().is_pressed(GamepadButton::X));
}

#[test]
fn configured_effect_drives_the_motors() {
    let config = Config::from_toml_str(
        r#"
        [xinput]
        max_revision = "1.4"

        [effects.fade]
        keyframes = [
            { time = 0,   left = 1.0, right = 0.0 },
            { time = 120, left = 0.0, right = 1.0 },
        ]
        "#,
    )
    .unwrap();

    let pads = MockXInput::new();
    let api = bind(&pads, &Revision::NEWEST_FIRST, &config.xinput);
    assert_eq!(api.revision(), Revision::V1_4);

    pads.connect(Slot::Two);
    let mut pad = Controller::new(api, Slot::Two);
    pad.update(ms(0)).unwrap();

    let fade = config.effect("fade").unwrap().clone();
    pad.play(Arc::new(fade));
    pad.update(ms(500)).unwrap();
    pad.update(ms(560)).unwrap();
    pad.update(ms(560)).unwrap();
    pad.update(ms(700)).unwrap();

    assert!(!pad.is_playing());
    assert_eq!(
        pads.vibrations(Slot::Two),
        vec![(65535, 0), (32768, 32768), (0, 0)]
    );
}

#[test]
fn unplugging_stops_the_effect() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::One);

    let mut pad = Controller::new(api, Slot::One);
    pad.update(ms(0)).unwrap();
    pad.play(Arc::new(padstate::VibrationSequence::looping()));
    assert!(pad.is_playing());

    pads.disconnect(Slot::One);
    pad.update(ms(16)).unwrap();
    assert!(!pad.is_playing());
    assert!(pad.vibration().is_zero());
}

#[test]
fn legacy_revision_answers_headset_queries() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_3], &XInputConfig::default());
    let mut pad = Controller::new(Arc::clone(&api), Slot::One);

    assert!(matches!(
        pad.audio_device_ids(),
        Err(InputError::NotConnected { slot: 0 })
    ));

    pads.connect(Slot::One);
    pad.update(ms(0)).unwrap();
    let ids = pad.audio_device_ids().unwrap();
    assert_eq!(ids.render, None);
    assert_eq!(ids.capture, None);

    let battery = pad.battery_information(BatteryDeviceType::Gamepad).unwrap();
    assert_eq!(battery.level, BatteryLevel::Full);
}

#[test]
fn keystrokes_are_read_in_order_then_none() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::One);
    let pad = Controller::new(api, Slot::One);

    // VK_PAD_A down, then auto-repeat.
    pads.push_keystroke(
        Slot::One,
        RawKeystroke {
            virtual_key: 0x5800,
            flags: 0x0001,
            ..RawKeystroke::default()
        },
    );
    pads.push_keystroke(
        Slot::One,
        RawKeystroke {
            virtual_key: 0x5800,
            flags: 0x0001 | 0x0004,
            ..RawKeystroke::default()
        },
    );

    assert_eq!(
        pad.keystroke().unwrap(),
        Some(Keystroke {
            virtual_key: 0x5800,
            flags: KeystrokeFlags::KEY_DOWN,
            ..Keystroke::default()
        })
    );
    let repeat = pad.keystroke().unwrap().unwrap();
    assert!(repeat.is_set(KeystrokeFlags::KEY_DOWN | KeystrokeFlags::REPEAT));
    assert!(!repeat.is_set(KeystrokeFlags::KEY_UP));
    assert_eq!(repeat.slot(), Some(Slot::One));

    assert!(pad.keystroke().unwrap().is_none());
}

#[test]
fn replugged_controller_is_found_again() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::Two);

    let mut reg: DeviceRegistry<Controller, _> = DeviceRegistry::new(api);
    reg.discover().unwrap();
    assert_eq!(reg.len(), 1);

    pads.disconnect(Slot::Two);
    reg.update(ms(16)).unwrap();
    assert!(reg.is_empty());
    assert!(reg.default_device().unwrap().is_none());

    pads.connect(Slot::Two);
    pads.set_buttons(Slot::Two, GamepadButtons::START);
    let pad = reg.default_device().unwrap().expect("found after replug");
    assert_eq!(pad.slot(), Slot::Two);
    assert!(pad.just_pressed(GamepadButton::Start));
}

#[test]
fn registry_config_limits_controllers() {
    let config = Config::from_toml_str("[registry]\nmax_controllers = 1").unwrap();
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &config.xinput);
    pads.connect(Slot::One);
    pads.connect(Slot::Two);

    let mut reg: DeviceRegistry<Controller, _> = DeviceRegistry::from_config(api, &config);
    reg.discover().unwrap();

    assert_eq!(reg.len(), 1);
    assert_eq!(reg.all()[0].slot(), Slot::One);
}

#[test]
fn rediscovery_silences_motors_of_dropped_sessions() {
    let pads = MockXInput::new();
    let api = bind(&pads, &[Revision::V1_4], &XInputConfig::default());
    pads.connect(Slot::One);

    let mut reg: DeviceRegistry<Controller, _> = DeviceRegistry::new(api);
    reg.discover().unwrap();
    reg.all_mut()[0].set_vibration(1.0, 1.0).unwrap();

    reg.discover().unwrap();
    assert_eq!(pads.vibrations(Slot::One), vec![(65535, 65535), (0, 0)]);

    reg.all_mut()[0].set_vibration(0.0, 1.0).unwrap();
    assert!(reg.notify_disconnected("xinput:0"));
    assert_eq!(
        pads.vibrations(Slot::One),
        vec![(65535, 65535), (0, 0), (0, 65535), (0, 0)]
    );
}
