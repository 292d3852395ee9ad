//! Windows power, input, and session primitives
//!
//! Key Win32 APIs:
//! - SetThreadExecutionState for the idle reset and continuous assertion
//! - PowerCreateRequest/PowerSetRequest/PowerClearRequest for the power
//!   request object, which outlives thread-state flags across suspension
//! - SendInput for the wake keypress and pointer nudge
//! - GetForegroundWindow for the interactive-session probe

use std::sync::Mutex;

use anyhow::anyhow;
use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Power::{
    ES_CONTINUOUS, ES_DISPLAY_REQUIRED, ES_SYSTEM_REQUIRED, EXECUTION_STATE, PowerClearRequest,
    PowerCreateRequest, PowerRequestSystemRequired, PowerSetRequest, SetThreadExecutionState,
};
use windows::Win32::System::Threading::{POWER_REQUEST_CONTEXT_SIMPLE_STRING, REASON_CONTEXT};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
    MOUSEEVENTF_MOVE, MOUSEINPUT, SendInput, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

use super::{InputApi, PowerApi, SessionApi};

/// F15: present on no physical keyboard, ignored by foreground apps, still
/// counts as user activity for the idle timer.
const VK_F15: u16 = 0x7E;

fn set_execution_state(flags: EXECUTION_STATE) -> anyhow::Result<()> {
    // Returns the previous state, or 0 on failure.
    let previous = unsafe { SetThreadExecutionState(flags) };
    if previous.0 == 0 {
        return Err(anyhow!("SetThreadExecutionState({:#x}) failed", flags.0));
    }
    trace!(flags = flags.0, previous = previous.0, "execution state set");
    Ok(())
}

/// Execution-state flags and the power request object.
pub struct NativePowerApi {
    // Created once on first acquire, reused afterwards.
    request: Mutex<Option<HANDLE>>,
}

// SAFETY: the HANDLE is only touched under the mutex.
unsafe impl Send for NativePowerApi {}
unsafe impl Sync for NativePowerApi {}

impl NativePowerApi {
    pub fn new() -> Self {
        Self {
            request: Mutex::new(None),
        }
    }

    fn ensure_request(&self) -> anyhow::Result<HANDLE> {
        let mut slot = self.request.lock().unwrap();
        if let Some(handle) = *slot {
            return Ok(handle);
        }

        let mut reason: Vec<u16> = "wakebind: launched programs are running\0"
            .encode_utf16()
            .collect();
        let context = REASON_CONTEXT {
            Version: 0,
            Flags: POWER_REQUEST_CONTEXT_SIMPLE_STRING,
            Reason: windows::Win32::System::Threading::REASON_CONTEXT_0 {
                SimpleReasonString: windows::core::PWSTR(reason.as_mut_ptr()),
            },
        };
        let handle = unsafe { PowerCreateRequest(&context) }
            .map_err(|e| anyhow!("PowerCreateRequest failed: {e}"))?;
        *slot = Some(handle);
        Ok(handle)
    }
}

impl Default for NativePowerApi {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativePowerApi {
    fn drop(&mut self) {
        if let Some(handle) = self.request.lock().unwrap().take() {
            unsafe {
                let _ = PowerClearRequest(handle, PowerRequestSystemRequired);
                let _ = CloseHandle(handle);
            }
        }
    }
}

impl PowerApi for NativePowerApi {
    fn reset_idle_timer(&self) -> anyhow::Result<()> {
        set_execution_state(ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED)
    }

    fn assert_continuous(&self) -> anyhow::Result<()> {
        set_execution_state(ES_CONTINUOUS | ES_SYSTEM_REQUIRED | ES_DISPLAY_REQUIRED)
    }

    fn clear_continuous(&self) -> anyhow::Result<()> {
        set_execution_state(ES_CONTINUOUS)
    }

    fn acquire_power_request(&self) -> anyhow::Result<()> {
        let handle = self.ensure_request()?;
        unsafe { PowerSetRequest(handle, PowerRequestSystemRequired) }
            .map_err(|e| anyhow!("PowerSetRequest failed: {e}"))
    }

    fn release_power_request(&self) -> anyhow::Result<()> {
        let slot = self.request.lock().unwrap();
        let Some(handle) = *slot else {
            return Ok(());
        };
        unsafe { PowerClearRequest(handle, PowerRequestSystemRequired) }
            .map_err(|e| anyhow!("PowerClearRequest failed: {e}"))
    }
}

/// Synthetic input via SendInput.
pub struct NativeInputApi;

impl NativeInputApi {
    pub fn new() -> Self {
        Self
    }
}

impl InputApi for NativeInputApi {
    fn send_wake_key(&self) -> anyhow::Result<()> {
        let inputs = [keyboard_input(VK_F15, false), keyboard_input(VK_F15, true)];
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent != inputs.len() as u32 {
            return Err(anyhow!("SendInput sent {sent} of {} key events", inputs.len()));
        }
        trace!("sent wake key");
        Ok(())
    }

    fn nudge_pointer(&self, delta_px: i32) -> anyhow::Result<()> {
        let inputs = [mouse_move(delta_px, 0), mouse_move(-delta_px, 0)];
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent != inputs.len() as u32 {
            return Err(anyhow!("SendInput sent {sent} of {} move events", inputs.len()));
        }
        trace!(delta_px, "nudged pointer");
        Ok(())
    }
}

fn keyboard_input(vk: u16, up: bool) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: if up { KEYEVENTF_KEYUP } else { KEYBD_EVENT_FLAGS(0) },
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_move(dx: i32, dy: i32) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: MOUSEEVENTF_MOVE,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Foreground-window probe. A locked session exposes no foreground window
/// to the interactive desktop.
pub struct NativeSessionApi;

impl NativeSessionApi {
    pub fn new() -> Self {
        Self
    }
}

impl SessionApi for NativeSessionApi {
    fn foreground_window_present(&self) -> bool {
        let hwnd = unsafe { GetForegroundWindow() };
        !hwnd.0.is_null()
    }
}
