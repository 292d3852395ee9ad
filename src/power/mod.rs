//! Sleep prevention controller
//!
//! Keeps the OS awake while enabled, using the layered mechanisms in
//! `mechanism`. Enabling asserts the continuous execution-state flag and the
//! power request object, then schedules two uncoordinated repeating timers:
//! a fixed 30-second refresher that re-runs the whole mechanism chain, and a
//! synthetic-input ticker whose cadence and pointer displacement come from
//! the active protection profile. The two may overlap; neither waits for
//! the other.
//!
//! Enabling succeeds when at least one underlying mechanism engaged, and a
//! `true` from `prevent_sleep()` is the caller's warrant that something is
//! actually holding the machine awake. When a refresh tick finds every
//! mechanism failing, that is escalated as total degradation through the
//! registered handler rather than disappearing into the log.

mod mechanism;

pub use mechanism::{CONTINUOUS_ASSERTION, IDLE_TIMER_RESET, SYNTHETIC_INPUT};

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::platform::{InputApi, PowerApi};
use crate::task::RepeatingTask;

/// Cadence of the execution-state refresher, independent of profile.
pub const IDLE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Named aggressiveness levels for the synthetic-input ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtectionProfile {
    Light,
    #[default]
    Medium,
    Heavy,
    Custom,
}

impl ProtectionProfile {
    /// Synthetic-input ticker cadence.
    pub fn refresh_interval(&self) -> Duration {
        match self {
            ProtectionProfile::Light => Duration::from_secs(60),
            ProtectionProfile::Medium => Duration::from_secs(30),
            ProtectionProfile::Heavy => Duration::from_secs(15),
            ProtectionProfile::Custom => Duration::from_secs(120),
        }
    }

    /// Pointer displacement per nudge.
    pub fn pointer_delta_px(&self) -> i32 {
        match self {
            ProtectionProfile::Light => 20,
            ProtectionProfile::Medium => 50,
            ProtectionProfile::Heavy => 100,
            ProtectionProfile::Custom => 100,
        }
    }
}

impl fmt::Display for ProtectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtectionProfile::Light => "light",
            ProtectionProfile::Medium => "medium",
            ProtectionProfile::Heavy => "heavy",
            ProtectionProfile::Custom => "custom",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtectionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ProtectionProfile::Light),
            "medium" => Ok(ProtectionProfile::Medium),
            "heavy" => Ok(ProtectionProfile::Heavy),
            "custom" => Ok(ProtectionProfile::Custom),
            other => Err(format!("unknown protection profile '{other}'")),
        }
    }
}

/// Every mechanism failed on the same tick. Escalated, not just logged:
/// wakefulness is no longer guaranteed and the user must be told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalDegradation {
    pub failed: Vec<&'static str>,
}

pub type DegradationHandler = Arc<dyn Fn(&TotalDegradation) + Send + Sync>;

#[derive(Default)]
struct WakeState {
    preventing: bool,
    profile: ProtectionProfile,
    continuous_engaged: bool,
    request_engaged: bool,
    refresh_task: Option<RepeatingTask>,
    input_task: Option<RepeatingTask>,
    last_degradation: Option<TotalDegradation>,
}

pub struct SleepPreventionController {
    power: Arc<dyn PowerApi>,
    input: Arc<dyn InputApi>,
    state: Arc<Mutex<WakeState>>,
    // Cheap read for is_preventing_sleep and for in-flight ticks to check
    // intent after a cancellation race.
    preventing: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<DegradationHandler>>>,
}

impl SleepPreventionController {
    pub fn new(power: Arc<dyn PowerApi>, input: Arc<dyn InputApi>) -> Self {
        Self {
            power,
            input,
            state: Arc::new(Mutex::new(WakeState::default())),
            preventing: Arc::new(AtomicBool::new(false)),
            handler: Arc::new(Mutex::new(None)),
        }
    }

    /// Register the callback invoked on total degradation.
    pub fn set_degradation_handler<F>(&self, handler: F)
    where
        F: Fn(&TotalDegradation) + Send + Sync + 'static,
    {
        *self.handler.lock().unwrap() = Some(Arc::new(handler));
    }

    /// Begin holding the machine awake. Idempotent; repeated calls do not
    /// re-issue the OS engagement calls. Returns true only when at least
    /// one mechanism actually engaged.
    pub fn prevent_sleep(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.preventing {
            debug!("sleep prevention already enabled");
            return true;
        }

        let continuous = self.power.assert_continuous();
        if let Err(e) = &continuous {
            warn!(error = %e, "continuous execution-state assertion failed");
        }
        let request = self.power.acquire_power_request();
        if let Err(e) = &request {
            warn!(error = %e, "power request engagement failed");
        }

        state.continuous_engaged = continuous.is_ok();
        state.request_engaged = request.is_ok();
        if !state.continuous_engaged && !state.request_engaged {
            error!("sleep prevention failed to engage any mechanism");
            return false;
        }

        state.preventing = true;
        state.last_degradation = None;
        self.preventing.store(true, Ordering::SeqCst);

        state.refresh_task = Some(self.spawn_refresh());
        state.input_task = Some(self.spawn_input_ticker(state.profile));

        info!(profile = %state.profile, "sleep prevention enabled");
        true
    }

    /// Stop holding the machine awake. Idempotent and panic-free; safe to
    /// call from a destructor path. Cancels both timers, clears the power
    /// request, restores the plain continuous flag. Returns true when the
    /// restore worked or nothing was ever engaged.
    pub fn allow_sleep(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.preventing {
            debug!("sleep prevention not enabled");
            return true;
        }

        state.preventing = false;
        self.preventing.store(false, Ordering::SeqCst);
        if let Some(task) = state.refresh_task.take() {
            task.cancel();
        }
        if let Some(task) = state.input_task.take() {
            task.cancel();
        }

        let anything_engaged = state.continuous_engaged || state.request_engaged;
        if state.request_engaged {
            if let Err(e) = self.power.release_power_request() {
                warn!(error = %e, "power request release failed");
            }
            state.request_engaged = false;
        }

        let cleared = self.power.clear_continuous();
        if let Err(e) = &cleared {
            warn!(error = %e, "continuous flag restore failed");
        }
        state.continuous_engaged = false;

        info!("sleep prevention disabled");
        cleared.is_ok() || !anything_engaged
    }

    /// Switch profiles. When currently preventing sleep, the synthetic-input
    /// ticker is rescheduled at the new cadence immediately rather than
    /// waiting out the old interval.
    pub fn set_protection_level(&self, profile: ProtectionProfile) {
        let mut state = self.state.lock().unwrap();
        state.profile = profile;
        info!(
            %profile,
            interval_secs = profile.refresh_interval().as_secs(),
            delta_px = profile.pointer_delta_px(),
            "protection level set"
        );

        if state.preventing {
            state.input_task = Some(self.spawn_input_ticker(profile));
        }
    }

    pub fn is_preventing_sleep(&self) -> bool {
        self.preventing.load(Ordering::SeqCst)
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn protection_level(&self) -> ProtectionProfile {
        self.state.lock().unwrap().profile
    }

    /// The most recent total degradation since sleep prevention was last
    /// enabled, if any.
    pub fn last_degradation(&self) -> Option<TotalDegradation> {
        self.state.lock().unwrap().last_degradation.clone()
    }

    fn spawn_refresh(&self) -> RepeatingTask {
        let power = self.power.clone();
        let input = self.input.clone();
        let state = self.state.clone();
        let preventing = self.preventing.clone();
        let handler = self.handler.clone();

        RepeatingTask::spawn("wake-refresh", IDLE_REFRESH_INTERVAL, move || {
            refresh_tick(&*power, &*input, &state, &preventing, &handler);
        })
    }

    fn spawn_input_ticker(&self, profile: ProtectionProfile) -> RepeatingTask {
        let input = self.input.clone();
        let preventing = self.preventing.clone();
        let delta_px = profile.pointer_delta_px();

        RepeatingTask::spawn("synthetic-input", profile.refresh_interval(), move || {
            if !preventing.load(Ordering::SeqCst) {
                return;
            }
            if let Err(e) = mechanism::attempt_synthetic_input(&*input, delta_px) {
                warn!(error = %e, "synthetic input tick failed");
            }
        })
    }

    /// Run one refresh tick synchronously. Test hook.
    #[cfg(test)]
    fn run_refresh_tick(&self) {
        refresh_tick(
            &*self.power,
            &*self.input,
            &self.state,
            &self.preventing,
            &self.handler,
        );
    }
}

/// One pass of the full mechanism chain, with degradation bookkeeping.
fn refresh_tick(
    power: &dyn PowerApi,
    input: &dyn InputApi,
    state: &Mutex<WakeState>,
    preventing: &AtomicBool,
    handler: &Mutex<Option<DegradationHandler>>,
) {
    if !preventing.load(Ordering::SeqCst) {
        return;
    }

    let delta_px = state.lock().unwrap().profile.pointer_delta_px();
    let report = mechanism::run_all(power, input, delta_px);

    if report.all_failed() {
        let degradation = TotalDegradation {
            failed: report.failed,
        };
        error!(failed = ?degradation.failed, "all wake mechanisms failed this tick");
        state.lock().unwrap().last_degradation = Some(degradation.clone());

        let handler = handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(&degradation);
        }
    }
}

impl Drop for SleepPreventionController {
    fn drop(&mut self) {
        if self.is_preventing_sleep() {
            info!("controller dropped while preventing sleep, restoring");
            self.allow_sleep();
        }
    }
}
