//! Core facade
//!
//! Wires the binding table, registrar, launcher, monitor, sleep-prevention
//! controller, and lock telemetry into the single surface the outer layers
//! (GUI, config persistence, CLI) talk to. Everything here delegates; the
//! engine holds no logic of its own beyond construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bindings::{BindingTable, Conflict};
use crate::chord::Chord;
use crate::error::Error;
use crate::launcher::{Launcher, ProcessSet};
use crate::lock::{LockStats, LockTelemetry};
use crate::monitor::ProcessMonitor;
use crate::platform::{HotkeyHook, InputApi, PowerApi, ProcessApi, SessionApi};
use crate::power::{ProtectionProfile, SleepPreventionController, TotalDegradation};
use crate::registrar::HotkeyRegistrar;
use crate::target::Target;

pub struct Engine {
    table: Arc<BindingTable>,
    tracked: Arc<ProcessSet>,
    procs: Arc<dyn ProcessApi>,
    registrar: HotkeyRegistrar,
    power: SleepPreventionController,
    lock: LockTelemetry,
}

impl Engine {
    pub fn new(
        hook: Arc<dyn HotkeyHook>,
        procs: Arc<dyn ProcessApi>,
        power_api: Arc<dyn PowerApi>,
        input: Arc<dyn InputApi>,
        session: Arc<dyn SessionApi>,
    ) -> Self {
        let table = Arc::new(BindingTable::new());
        let tracked = Arc::new(ProcessSet::new());
        let launcher = Arc::new(Launcher::new(procs.clone(), tracked.clone()));
        let monitor = Arc::new(ProcessMonitor::new(procs.clone(), tracked.clone()));
        let registrar = HotkeyRegistrar::new(hook, table.clone(), launcher, monitor);
        let power = SleepPreventionController::new(power_api, input);
        let lock = LockTelemetry::new(session);

        Self {
            table,
            tracked,
            procs,
            registrar,
            power,
            lock,
        }
    }

    // Bindings

    pub fn add_binding(&self, chord: &str, target: &str) -> Result<(), Error> {
        self.table.add(chord, target)
    }

    #[allow(dead_code)] // Public API for the configuration collaborator
    pub fn remove_binding(&self, chord: &str) -> bool {
        self.table.remove(chord)
    }

    pub fn list_bindings(&self) -> HashMap<Chord, Target> {
        self.table.snapshot()
    }

    pub fn check_conflict(&self, chord: &str) -> Conflict {
        self.table.check(chord)
    }

    // Registration lifecycle

    pub fn start(&self) -> Result<(), Error> {
        self.registrar.start()
    }

    pub fn stop(&self) {
        self.registrar.stop()
    }

    /// Live tracked-process count. Prunes dead entries on the way, so a
    /// process that exited is excluded from this very read.
    pub fn running_count(&self) -> usize {
        self.tracked.prune(&*self.procs)
    }

    // Sleep prevention

    pub fn prevent_sleep(&self) -> bool {
        self.power.prevent_sleep()
    }

    pub fn allow_sleep(&self) -> bool {
        self.power.allow_sleep()
    }

    pub fn set_protection_level(&self, profile: ProtectionProfile) {
        self.power.set_protection_level(profile)
    }

    pub fn is_preventing_sleep(&self) -> bool {
        self.power.is_preventing_sleep()
    }

    pub fn set_degradation_handler<F>(&self, handler: F)
    where
        F: Fn(&TotalDegradation) + Send + Sync + 'static,
    {
        self.power.set_degradation_handler(handler)
    }

    #[allow(dead_code)] // Public API for the GUI collaborator
    pub fn last_degradation(&self) -> Option<TotalDegradation> {
        self.power.last_degradation()
    }

    // Telemetry

    pub fn poll_lock_state(&self) -> bool {
        self.lock.poll_lock_state()
    }

    pub fn lock_statistics(&self) -> LockStats {
        self.lock.statistics()
    }
}
