//! Native hook and process-table backends
//!
//! The hotkey hook rides on `global-hotkey`, which owns the OS-level
//! registration and delivers triggers through a process-wide receiver.
//! Process queries go through `sysinfo`; URL and folder dispatch go through
//! the system opener.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::trace;

use super::{HookId, HotkeyHook, ProcessApi};
use crate::chord::Chord;

/// Hotkey hook backed by the OS global-hotkey facility.
pub struct NativeHook {
    manager: Mutex<GlobalHotKeyManager>,
    // HotKey values are kept for unregistration, which needs the original.
    registered: Mutex<HashMap<HookId, HotKey>>,
}

impl NativeHook {
    pub fn new() -> anyhow::Result<Self> {
        let manager = GlobalHotKeyManager::new().context("failed to initialize hotkey manager")?;
        Ok(Self {
            manager: Mutex::new(manager),
            registered: Mutex::new(HashMap::new()),
        })
    }
}

impl HotkeyHook for NativeHook {
    fn is_privileged(&self) -> bool {
        process_is_privileged()
    }

    fn install(&self, chord: &Chord) -> anyhow::Result<HookId> {
        let hotkey = parse_chord(chord)?;
        let id = hotkey.id();
        self.manager
            .lock()
            .unwrap()
            .register(hotkey)
            .with_context(|| format!("OS rejected hotkey '{chord}'"))?;
        self.registered.lock().unwrap().insert(id, hotkey);
        Ok(id)
    }

    fn uninstall(&self, id: HookId) -> anyhow::Result<()> {
        let Some(hotkey) = self.registered.lock().unwrap().remove(&id) else {
            return Ok(());
        };
        self.manager
            .lock()
            .unwrap()
            .unregister(hotkey)
            .with_context(|| format!("failed to unregister hook {id}"))
    }

    fn try_recv(&self) -> Option<HookId> {
        while let Ok(event) = GlobalHotKeyEvent::receiver().try_recv() {
            if event.state() == HotKeyState::Pressed {
                return Some(event.id());
            }
            // Releases are irrelevant here; keep draining.
        }
        None
    }
}

/// Translate a validated chord into an OS hotkey.
///
/// Format validation is deliberately permissive, so this is where chords
/// with no usable key token (e.g. `ctrl+` or `ctrl+shift`) actually fail;
/// the registrar collects such failures per hook.
fn parse_chord(chord: &Chord) -> anyhow::Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut key = None;

    for token in chord.tokens() {
        match token {
            "ctrl" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "win" => modifiers |= Modifiers::SUPER,
            other => {
                if key.replace(token_to_code(other)?).is_some() {
                    return Err(anyhow!("chord '{chord}' has more than one key token"));
                }
            }
        }
    }

    let code = key.ok_or_else(|| anyhow!("chord '{chord}' has no key token"))?;
    Ok(HotKey::new(Some(modifiers), code))
}

/// Map a chord key token to a key code.
fn token_to_code(token: &str) -> anyhow::Result<Code> {
    let code = match token {
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,
        "space" => Code::Space,
        "enter" => Code::Enter,
        "tab" => Code::Tab,
        "esc" | "escape" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" | "del" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" => Code::PageUp,
        "pagedown" => Code::PageDown,
        "up" => Code::ArrowUp,
        "down" => Code::ArrowDown,
        "left" => Code::ArrowLeft,
        "right" => Code::ArrowRight,
        "minus" | "-" => Code::Minus,
        "equal" | "=" => Code::Equal,
        "comma" | "," => Code::Comma,
        "period" | "." => Code::Period,
        "slash" | "/" => Code::Slash,
        "backslash" | "\\" => Code::Backslash,
        "semicolon" | ";" => Code::Semicolon,
        "quote" | "'" => Code::Quote,
        "grave" | "`" => Code::Backquote,
        other => return Err(anyhow!("unknown key token '{other}'")),
    };
    Ok(code)
}

#[cfg(windows)]
fn process_is_privileged() -> bool {
    // Global hooks on Windows need elevation to fire over elevated windows.
    unsafe { windows::Win32::UI::Shell::IsUserAnAdmin().as_bool() }
}

#[cfg(not(windows))]
fn process_is_privileged() -> bool {
    true
}

/// Process table, spawning, and target dispatch through the host OS.
pub struct NativeProcessApi {
    system: Mutex<System>,
}

impl NativeProcessApi {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for NativeProcessApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessApi for NativeProcessApi {
    fn is_alive(&self, pid: u32) -> bool {
        let mut system = self.system.lock().unwrap();
        let pid = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        system.process(pid).is_some()
    }

    fn find_by_exe(&self, exe: &Path) -> Option<u32> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes(ProcessesToUpdate::All, true);

        for (pid, process) in system.processes() {
            let Some(path) = process.exe() else { continue };
            // Resolve before comparing; the table may report symlinked paths.
            let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            if resolved == exe {
                trace!(pid = pid.as_u32(), exe = %exe.display(), "found process by exe");
                return Some(pid.as_u32());
            }
        }
        None
    }

    fn spawn(&self, exe: &Path) -> anyhow::Result<u32> {
        let child = Command::new(exe)
            .spawn()
            .with_context(|| format!("failed to spawn {}", exe.display()))?;
        // The child is intentionally not reaped here; liveness is tracked
        // through the process table like any adopted process.
        Ok(child.id())
    }

    fn open_url(&self, url: &str) -> anyhow::Result<()> {
        // Bare www. addresses need a scheme before the system opener
        // recognizes them.
        let url = if url.starts_with("www.") {
            format!("https://{url}")
        } else {
            url.to_string()
        };
        open::that(&url).with_context(|| format!("failed to open url {url}"))
    }

    fn open_dir(&self, path: &Path) -> anyhow::Result<()> {
        open::that(path).with_context(|| format!("failed to open folder {}", path.display()))
    }

    fn canonicalize(&self, path: &Path) -> std::io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}
