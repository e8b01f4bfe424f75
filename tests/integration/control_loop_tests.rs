//! End-to-end control loop scenarios: closed loop against the process
//! simulator, trips, profiles, mode changes and the SSR window.

use ospid::adapters::nvs::NvsAdapter;
use ospid::adapters::simulator::ProcessSimulator;
use ospid::app::commands::AppCommand;
use ospid::app::events::AppEvent;
use ospid::app::service::ControlLoop;
use ospid::config::ControllerConfig;
use ospid::control::autotune::{AutoTuneSettings, TunedGains, TuningRule};
use ospid::control::pid::{Gain, Mode};
use ospid::error::Error;
use ospid::profile::{Profile, ProfileStep, StepKind};
use ospid::safety::TripCause;

use crate::mock_hw::{Bench, RecordingSink, v};

fn g(s: &str) -> Gain {
    s.parse().expect("test literal")
}

// ── Closed loop ───────────────────────────────────────────────

#[test]
fn closed_loop_settles_on_setpoint() {
    let config = ControllerConfig {
        setpoint: v("120"),
        kp: g("1"),
        ki: g("0.01"),
        kd: g("0"),
        mode: Mode::Automatic,
        manual_output: v("50"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut sim = ProcessSimulator::new();
    let mut sink = RecordingSink::default();

    ctl.start(0, &mut sim, &mut sink).unwrap();
    assert_eq!(ctl.input(), v("100"));

    for n in 0..3000u32 {
        ctl.tick(n * 1000, &mut sim, &mut sink);
    }

    let pv = ctl.input();
    assert!(pv >= v("119") && pv <= v("121"), "pv = {pv}");
    let out = ctl.output();
    assert!(out >= v("59") && out <= v("61"), "out = {out}");
    assert_eq!(ctl.tick_count(), 3000);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 3000);
}

#[test]
fn switching_to_automatic_is_bumpless() {
    let config = ControllerConfig {
        setpoint: v("100"),
        manual_output: v("50"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut sim = ProcessSimulator::new();
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut sim, &mut sink).unwrap();
    ctl.tick(0, &mut sim, &mut sink);
    assert_eq!(ctl.output(), v("50"));

    ctl.handle_command(0, AppCommand::SetMode(Mode::Automatic), &mut sim, &store, &mut sink)
        .unwrap();
    ctl.tick(1000, &mut sim, &mut sink);

    // At the operating point with zero error the output stays put.
    assert_eq!(ctl.output(), v("50"));
    assert!(sink.contains(&AppEvent::ModeChanged {
        from: Mode::Manual,
        to: Mode::Automatic,
    }));
}

#[test]
fn manual_output_ignored_in_automatic() {
    let config = ControllerConfig {
        mode: Mode::Automatic,
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.handle_command(0, AppCommand::SetManualOutput(v("80")), &mut bench, &store, &mut sink)
        .unwrap();
    assert_eq!(ctl.config().manual_output, v("0"));
}

// ── Trip ──────────────────────────────────────────────────────

#[test]
fn trip_forces_output_off_until_reset() {
    let config = ControllerConfig {
        manual_output: v("100"),
        trip_upper: Some(v("30")),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.tick(0, &mut bench, &mut sink);
    assert!(bench.ssr.is_on());

    bench.set_reading("35.2");
    ctl.tick(100, &mut bench, &mut sink);
    assert!(ctl.is_tripped());
    assert!(!bench.ssr.is_on());
    assert_eq!(bench.last_output(), Some(v("0")));
    assert!(sink.contains(&AppEvent::Tripped(TripCause::AboveUpper)));

    // No auto-reset: back in band is not enough.
    bench.set_reading("25");
    ctl.tick(200, &mut bench, &mut sink);
    assert!(ctl.is_tripped());
    assert_eq!(ctl.output(), v("0"));

    ctl.handle_command(300, AppCommand::ResetTrip, &mut bench, &store, &mut sink)
        .unwrap();
    ctl.tick(300, &mut bench, &mut sink);
    assert!(!ctl.is_tripped());
    assert_eq!(ctl.output(), v("100"));
    assert_eq!(sink.count(|e| *e == AppEvent::TripCleared), 1);
}

#[test]
fn trip_auto_reset_clears_in_band() {
    let config = ControllerConfig {
        manual_output: v("40"),
        trip_lower: Some(v("10")),
        trip_upper: Some(v("30")),
        trip_auto_reset: true,
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut bench = Bench::new("5");
    let mut sink = RecordingSink::default();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.tick(0, &mut bench, &mut sink);
    assert!(sink.contains(&AppEvent::Tripped(TripCause::BelowLower)));
    assert_eq!(ctl.output(), v("0"));

    bench.set_reading("12");
    ctl.tick(100, &mut bench, &mut sink);
    assert!(!ctl.is_tripped());
    assert_eq!(ctl.output(), v("40"));
}

#[test]
fn open_sensor_reported_once() {
    let config = ControllerConfig {
        mode: Mode::Automatic,
        setpoint: v("60"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut bench = Bench::new("20");
    let mut sink = RecordingSink::default();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    bench.reading = None;
    for n in 0..5 {
        ctl.tick(n * 100, &mut bench, &mut sink);
    }
    assert_eq!(sink.count(|e| matches!(e, AppEvent::InputFault(_))), 1);
    assert!(bench.outputs.iter().all(|o| *o == v("0")));
}

// ── Profile ───────────────────────────────────────────────────

fn ramp_and_soak() -> Profile {
    let mut p = Profile::new("ramp-soak").unwrap();
    p.add_step(ProfileStep::new(StepKind::RampToSetpoint, 10_000, v("50")))
        .unwrap();
    p.add_step(ProfileStep::new(StepKind::SoakAtValue, 5_000, v("50")).with_buzzer())
        .unwrap();
    p
}

#[test]
fn profile_drives_setpoint() {
    let mut ctl = ControlLoop::new(ControllerConfig::default()).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.handle_command(0, AppCommand::StartProfile(ramp_and_soak()), &mut bench, &store, &mut sink)
        .unwrap();

    ctl.tick(5_000, &mut bench, &mut sink);
    assert_eq!(ctl.setpoint(), v("37.5"));
    assert_eq!(ctl.telemetry().profile_step, Some(0));

    ctl.tick(10_000, &mut bench, &mut sink);
    assert_eq!(ctl.setpoint(), v("50"));
    assert!(sink.contains(&AppEvent::ProfileAdvanced { step: 1, buzzer: false }));

    ctl.tick(15_000, &mut bench, &mut sink);
    assert!(sink.contains(&AppEvent::ProfileAdvanced { step: 1, buzzer: true }));
    assert!(sink.contains(&AppEvent::ProfileEnded { completed: true }));
    assert!(ctl.profile().is_none());
    assert_eq!(ctl.setpoint(), v("50"));
}

#[test]
fn stopping_profile_restores_setpoint() {
    let mut ctl = ControlLoop::new(ControllerConfig::default()).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    ctl.handle_command(0, AppCommand::StartProfile(ramp_and_soak()), &mut bench, &store, &mut sink)
        .unwrap();
    ctl.tick(2_000, &mut bench, &mut sink);
    assert_eq!(ctl.setpoint(), v("30"));

    ctl.handle_command(2_000, AppCommand::StopProfile, &mut bench, &store, &mut sink)
        .unwrap();
    assert_eq!(ctl.setpoint(), v("25"));
    assert!(sink.contains(&AppEvent::ProfileEnded { completed: false }));
}

#[test]
fn empty_profile_rejected() {
    let mut ctl = ControlLoop::new(ControllerConfig::default()).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    let empty = Profile::new("empty").unwrap();
    let res = ctl.handle_command(0, AppCommand::StartProfile(empty), &mut bench, &store, &mut sink);
    assert!(matches!(res, Err(Error::Profile(_))));
    assert!(ctl.profile().is_none());
}

// ── Auto-tune ─────────────────────────────────────────────────

/// Tick every 250 ms until the auto-tuner reports a result; returns the
/// time of the finishing tick.
fn tune_until_done(ctl: &mut ControlLoop, sim: &mut ProcessSimulator, sink: &mut RecordingSink) -> u32 {
    for n in 1..4000u32 {
        let now = n * 250;
        ctl.tick(now, sim, sink);
        if ctl.autotune().is_none() {
            return now;
        }
    }
    panic!("auto-tune never finished");
}

fn converged_gains(sink: &RecordingSink) -> TunedGains {
    sink.events
        .iter()
        .find_map(|e| match e {
            AppEvent::AutoTuneConverged(gains) => Some(*gains),
            _ => None,
        })
        .expect("auto-tune converged")
}

#[test]
fn autotune_finds_gains_for_simulated_process() {
    let config = ControllerConfig {
        manual_output: v("50"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut sim = ProcessSimulator::new();
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut sim, &mut sink).unwrap();
    ctl.tick(0, &mut sim, &mut sink);
    ctl.handle_command(
        0,
        AppCommand::StartAutoTune(AutoTuneSettings::default()),
        &mut sim,
        &store,
        &mut sink,
    )
    .unwrap();

    let done = tune_until_done(&mut ctl, &mut sim, &mut sink);
    // Five half cycles of roughly 22 s each.
    assert!(done > 60_000 && done < 300_000, "done at {done} ms");

    let gains = converged_gains(&sink);
    assert!(gains.kp > g("1") && gains.kp < g("6"), "{gains:?}");
    assert!(gains.ki.is_positive() && gains.kd.is_positive(), "{gains:?}");
    assert!((30_000..80_000).contains(&gains.ultimate_period_ms), "{gains:?}");

    assert_eq!((ctl.config().kp, ctl.config().ki, ctl.config().kd), (gains.kp, gains.ki, gains.kd));
    assert!(sink.contains(&AppEvent::TuningsChanged {
        kp: gains.kp,
        ki: gains.ki,
        kd: gains.kd,
    }));
    // The relay output is withdrawn.
    assert_eq!(ctl.output(), v("50"));
    assert_eq!(ctl.mode(), Mode::Manual);
    assert!(!ctl.telemetry().tuning);
}

#[test]
fn autotune_hands_back_to_automatic_without_a_bump() {
    let config = ControllerConfig {
        setpoint: v("100"),
        kp: g("1"),
        ki: g("0.01"),
        kd: g("0"),
        mode: Mode::Automatic,
        manual_output: v("50"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut sim = ProcessSimulator::new();
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut sim, &mut sink).unwrap();
    ctl.tick(0, &mut sim, &mut sink);
    assert_eq!(ctl.output(), v("50"));

    let settings = AutoTuneSettings {
        rule: TuningRule::TyreusLuybenPi,
        ..Default::default()
    };
    ctl.handle_command(0, AppCommand::StartAutoTune(settings), &mut sim, &store, &mut sink)
        .unwrap();
    tune_until_done(&mut ctl, &mut sim, &mut sink);

    let gains = converged_gains(&sink);
    assert_eq!(gains.kd, g("0"));
    assert_eq!(ctl.mode(), Mode::Automatic);
    // The PID restarts from the output the run began with.
    assert_eq!(ctl.output(), v("50"));
}

#[test]
fn stopping_autotune_restores_output() {
    let config = ControllerConfig {
        manual_output: v("50"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut sim = ProcessSimulator::new();
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    ctl.start(0, &mut sim, &mut sink).unwrap();
    ctl.tick(0, &mut sim, &mut sink);
    ctl.handle_command(
        0,
        AppCommand::StartAutoTune(AutoTuneSettings::default()),
        &mut sim,
        &store,
        &mut sink,
    )
    .unwrap();
    for n in 1..40u32 {
        ctl.tick(n * 250, &mut sim, &mut sink);
    }
    assert_eq!(ctl.output(), v("60"));

    ctl.handle_command(10_000, AppCommand::StopAutoTune, &mut sim, &store, &mut sink)
        .unwrap();
    ctl.tick(10_000, &mut sim, &mut sink);
    assert_eq!(ctl.output(), v("50"));
    assert!(sink.contains(&AppEvent::AutoTuneCancelled));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::TuningsChanged { .. })), 0);
}

// ── SSR window ────────────────────────────────────────────────

#[test]
fn ssr_follows_manual_output_within_window() {
    let config = ControllerConfig {
        manual_output: v("25"),
        output_window_seconds: v("2"),
        ..Default::default()
    };
    let mut ctl = ControlLoop::new(config).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();

    ctl.start(0, &mut bench, &mut sink).unwrap();
    assert_eq!(bench.ssr.window_ms(), 2000);

    // 25 % of 2 s: on for the first 500 ms of every window.
    let mut on = Vec::new();
    for t in (0..4000).step_by(250) {
        ctl.tick(t, &mut bench, &mut sink);
        on.push(bench.ssr.is_on());
    }
    let expected = [true, true, false, false, false, false, false, false];
    assert_eq!(on[..8], expected);
    assert_eq!(on[8..], expected);
}

#[test]
fn window_command_validated() {
    let mut ctl = ControlLoop::new(ControllerConfig::default()).unwrap();
    let mut bench = Bench::new("25");
    let mut sink = RecordingSink::default();
    let store = NvsAdapter::new();

    let res = ctl.handle_command(0, AppCommand::SetOutputWindow(v("0.5")), &mut bench, &store, &mut sink);
    assert!(matches!(res, Err(Error::Config(_))));
    assert_eq!(bench.ssr.window_ms(), 5000);

    ctl.handle_command(0, AppCommand::SetOutputWindow(v("2.5")), &mut bench, &store, &mut sink)
        .unwrap();
    assert_eq!(bench.ssr.window_ms(), 2500);
    assert_eq!(ctl.config().output_window_seconds, v("2.5"));
}
