//! Non-Windows fallbacks for the power, input, and session primitives
//!
//! The host binding for these primitives is Windows-only. Elsewhere each
//! mechanism reports failure honestly instead of pretending to work, so the
//! sleep-prevention controller's degradation reporting stays truthful, and
//! the session probe reports an always-interactive session.

use anyhow::anyhow;

use super::{InputApi, PowerApi, SessionApi};

pub struct NativePowerApi;

impl NativePowerApi {
    pub fn new() -> Self {
        Self
    }
}

impl PowerApi for NativePowerApi {
    fn reset_idle_timer(&self) -> anyhow::Result<()> {
        Err(anyhow!("execution-state primitive unavailable on this platform"))
    }

    fn assert_continuous(&self) -> anyhow::Result<()> {
        Err(anyhow!("execution-state primitive unavailable on this platform"))
    }

    fn clear_continuous(&self) -> anyhow::Result<()> {
        Err(anyhow!("execution-state primitive unavailable on this platform"))
    }

    fn acquire_power_request(&self) -> anyhow::Result<()> {
        Err(anyhow!("power request object unavailable on this platform"))
    }

    fn release_power_request(&self) -> anyhow::Result<()> {
        Err(anyhow!("power request object unavailable on this platform"))
    }
}

pub struct NativeInputApi;

impl NativeInputApi {
    pub fn new() -> Self {
        Self
    }
}

impl InputApi for NativeInputApi {
    fn send_wake_key(&self) -> anyhow::Result<()> {
        Err(anyhow!("synthetic input unavailable on this platform"))
    }

    fn nudge_pointer(&self, _delta_px: i32) -> anyhow::Result<()> {
        Err(anyhow!("synthetic input unavailable on this platform"))
    }
}

pub struct NativeSessionApi;

impl NativeSessionApi {
    pub fn new() -> Self {
        Self
    }
}

impl SessionApi for NativeSessionApi {
    fn foreground_window_present(&self) -> bool {
        true
    }
}
