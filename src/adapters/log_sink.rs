//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (serial console in production).  A host-link adapter
//! would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | mode={:?}{} | SP={} PV={} | out={}% | trip={} | step={}",
                    t.mode,
                    if t.tuning { " (tuning)" } else { "" },
                    t.setpoint,
                    t.input,
                    t.output,
                    if t.tripped { "YES" } else { "no" },
                    t.profile_step.map_or(-1, |s| s as i32),
                );
            }
            AppEvent::Started(mode) => {
                info!("START | mode={:?}", mode);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {:?} -> {:?}", from, to);
            }
            AppEvent::TuningsChanged { kp, ki, kd } => {
                info!("TUNE | kp={} ki={} kd={}", kp, ki, kd);
            }
            AppEvent::Tripped(cause) => {
                error!("TRIP | {:?}, output forced to 0", cause);
            }
            AppEvent::TripCleared => {
                info!("TRIP | cleared");
            }
            AppEvent::ProfileAdvanced { step, buzzer } => {
                info!("PROFILE | step={}{}", step, if *buzzer { " (buzzer)" } else { "" });
            }
            AppEvent::ProfileEnded { completed } => {
                info!("PROFILE | {}", if *completed { "completed" } else { "cancelled" });
            }
            AppEvent::AutoTuneStarted => {
                info!("ATUNE | started");
            }
            AppEvent::AutoTuneConverged(g) => {
                info!(
                    "ATUNE | converged kp={} ki={} kd={} Pu={}ms",
                    g.kp, g.ki, g.kd, g.ultimate_period_ms
                );
            }
            AppEvent::AutoTuneFailed(cause) => {
                warn!("ATUNE | failed: {:?}", cause);
            }
            AppEvent::AutoTuneCancelled => {
                info!("ATUNE | cancelled");
            }
            AppEvent::InputFault(e) => {
                warn!("FAULT | input: {}", e);
            }
            AppEvent::OutputFault(e) => {
                warn!("FAULT | output: {}", e);
            }
            AppEvent::ConfigSaved => {
                info!("CONFIG | saved");
            }
            AppEvent::ConfigLoaded => {
                info!("CONFIG | loaded");
            }
        }
    }
}
