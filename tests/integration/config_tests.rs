//! Configuration persistence through the NVS adapter.

use ospid::adapters::nvs::NvsAdapter;
use ospid::app::commands::AppCommand;
use ospid::app::events::AppEvent;
use ospid::app::ports::{ConfigError, ConfigPort, StoragePort};
use ospid::app::service::ControlLoop;
use ospid::config::{ControllerConfig, PowerOnBehavior};
use ospid::control::pid::{Direction, Mode};
use ospid::error::Error;

use crate::mock_hw::{Bench, RecordingSink, v};

#[test]
fn save_then_load_restores_settings() {
    let store = NvsAdapter::new();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();

    let mut first = ControlLoop::new(ControllerConfig::default()).unwrap();
    first.start(0, &mut bench, &mut sink).unwrap();
    for cmd in [
        AppCommand::SetSetpoint(v("180.5")),
        AppCommand::SetDirection(Direction::Reverse),
        AppCommand::SetTripLimits {
            lower: None,
            upper: Some(v("250")),
            auto_reset: true,
        },
        AppCommand::SetOutputWindow(v("10")),
        AppCommand::SaveConfig,
    ] {
        first.handle_command(0, cmd, &mut bench, &store, &mut sink).unwrap();
    }
    assert!(sink.contains(&AppEvent::ConfigSaved));

    let mut bench = Bench::new("25");
    let mut second = ControlLoop::new(ControllerConfig::default()).unwrap();
    second
        .handle_command(0, AppCommand::LoadConfig, &mut bench, &store, &mut sink)
        .unwrap();

    assert_eq!(second.config(), first.config());
    assert_eq!(second.setpoint(), v("180.5"));
    assert_eq!(bench.ssr.window_ms(), 10_000);
    assert!(sink.contains(&AppEvent::ConfigLoaded));
}

#[test]
fn load_without_saved_config_uses_defaults() {
    let store = NvsAdapter::new();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();

    let config = ControllerConfig {
        setpoint: v("99"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    ctl.handle_command(0, AppCommand::LoadConfig, &mut bench, &store, &mut sink)
        .unwrap();
    assert_eq!(ctl.config(), &ControllerConfig::default());
}

#[test]
fn corrupted_store_leaves_loop_untouched() {
    let mut store = NvsAdapter::new();
    store.write("ospid", "ctrlcfg", &[0xFF, 0xFF, 0xFF]).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();

    let mut ctl = ControlLoop::new(ControllerConfig::default()).unwrap();
    let res = ctl.handle_command(0, AppCommand::LoadConfig, &mut bench, &store, &mut sink);
    assert_eq!(res, Err(Error::Config(ConfigError::Corrupted)));
    assert_eq!(ctl.config(), &ControllerConfig::default());
    assert!(!sink.contains(&AppEvent::ConfigLoaded));
}

#[test]
fn power_on_disable_starts_manual() {
    let store = NvsAdapter::new();
    store
        .save(&ControllerConfig {
            mode: Mode::Automatic,
            power_on: PowerOnBehavior::Disable,
            manual_output: v("12.5"),
            ..Default::default()
        })
        .unwrap();

    let mut ctl = ControlLoop::new(store.load().unwrap()).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.tick(0, &mut bench, &mut sink);

    assert_eq!(ctl.mode(), Mode::Manual);
    assert_eq!(ctl.output(), v("12.5"));
    assert_eq!(sink.events[0], AppEvent::Started(Mode::Manual));
}

#[test]
fn config_blob_is_compact() {
    let store = NvsAdapter::new();
    store.save(&ControllerConfig::default()).unwrap();
    let mut buf = [0u8; 128];
    let len = store.read("ospid", "ctrlcfg", &mut buf).unwrap();
    // Eight decimals at two bytes each, plus enums, options and the u16.
    assert!(len < 40, "config blob is {len} bytes");
    // The setpoint leads the blob as little-endian raw units.
    assert_eq!(buf[..2], 250i16.to_le_bytes());
}
