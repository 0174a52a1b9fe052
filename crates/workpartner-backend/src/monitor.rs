use std::collections::HashMap;
use std::path::Path;

use chrono::{Duration, Local};
use windows_sys::Win32::Foundation::{CloseHandle, FILETIME, HANDLE, HWND};
use windows_sys::Win32::System::SystemInformation::GetTickCount;
use windows_sys::Win32::System::Threading::{
    GetProcessTimes, OpenProcess, QueryFullProcessImageNameW, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{GetLastInputInfo, LASTINPUTINFO};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
};
use workpartner_core::{ActivityProbe, ActivitySample};

const PROCESS_CACHE_LIMIT: usize = 4096;

/// Executables whose window title stands in for the active tab.
const BROWSER_EXES: [&str; 7] = [
    "chrome.exe",
    "msedge.exe",
    "firefox.exe",
    "whale.exe",
    "opera.exe",
    "brave.exe",
    "vivaldi.exe",
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct ProcessKey {
    pid: u32,
    creation_time: u64,
}

pub struct WindowsMonitor {
    exe_cache: HashMap<ProcessKey, String>,
}

impl WindowsMonitor {
    pub fn new() -> Self {
        Self {
            exe_cache: HashMap::new(),
        }
    }

    pub fn sample(&mut self) -> ActivitySample {
        ActivitySample {
            at: Local::now(),
            probe: self.foreground_probe(),
            idle: idle_millis()
                .map(|ms| Duration::milliseconds(i64::from(ms)))
                .unwrap_or_else(Duration::zero),
        }
    }

    fn foreground_probe(&mut self) -> Option<ActivityProbe> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_null() {
            return None;
        }
        let pid = window_pid(hwnd)?;
        let exe_name = self.resolve_exe(pid)?;
        let window_title = window_title(hwnd);

        let is_browser = BROWSER_EXES
            .iter()
            .any(|browser| exe_name.eq_ignore_ascii_case(browser));
        let url = (is_browser && !window_title.is_empty()).then(|| window_title.clone());
        Some(ActivityProbe {
            process_name: exe_name,
            window_title,
            url,
        })
    }

    fn resolve_exe(&mut self, pid: u32) -> Option<String> {
        let Some(creation_time) = process_creation_time(pid) else {
            return process_path(pid).map(|path| exe_name_from_path(&path, pid));
        };
        let key = ProcessKey { pid, creation_time };
        if let Some(exe) = self.exe_cache.get(&key) {
            return Some(exe.clone());
        }

        let exe = exe_name_from_path(&process_path(pid)?, pid);
        if self.exe_cache.len() >= PROCESS_CACHE_LIMIT {
            self.exe_cache.clear();
        }
        self.exe_cache.insert(key, exe.clone());
        Some(exe)
    }
}

fn idle_millis() -> Option<u32> {
    let mut lii = LASTINPUTINFO {
        cbSize: std::mem::size_of::<LASTINPUTINFO>() as u32,
        dwTime: 0,
    };
    let ok = unsafe { GetLastInputInfo(&mut lii) };
    if ok == 0 {
        return None;
    }

    let now_tick = unsafe { GetTickCount() };
    Some(now_tick.wrapping_sub(lii.dwTime))
}

fn window_pid(hwnd: HWND) -> Option<u32> {
    let mut pid: u32 = 0;
    unsafe {
        GetWindowThreadProcessId(hwnd, &mut pid);
    }
    (pid != 0).then_some(pid)
}

fn window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }

    let mut buffer: Vec<u16> = vec![0; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32) };
    if copied <= 0 {
        return String::new();
    }
    String::from_utf16_lossy(&buffer[..copied as usize]).trim().to_owned()
}

fn process_creation_time(pid: u32) -> Option<u64> {
    with_process_handle(pid, |handle| {
        let mut creation = zero_filetime();
        let mut exit = zero_filetime();
        let mut kernel = zero_filetime();
        let mut user = zero_filetime();

        let ok = unsafe { GetProcessTimes(handle, &mut creation, &mut exit, &mut kernel, &mut user) };
        if ok == 0 {
            return None;
        }
        Some((u64::from(creation.dwHighDateTime) << 32) | u64::from(creation.dwLowDateTime))
    })
}

fn process_path(pid: u32) -> Option<String> {
    with_process_handle(pid, |handle| {
        let mut buffer: Vec<u16> = vec![0; 4096];
        let mut size: u32 = buffer.len() as u32;
        let ok = unsafe { QueryFullProcessImageNameW(handle, 0, buffer.as_mut_ptr(), &mut size) };
        if ok == 0 || size == 0 {
            return None;
        }
        Some(String::from_utf16_lossy(&buffer[..size as usize]))
    })
}

fn with_process_handle<T>(pid: u32, f: impl FnOnce(HANDLE) -> Option<T>) -> Option<T> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid) };
    if handle.is_null() {
        return None;
    }

    let result = f(handle);
    unsafe {
        CloseHandle(handle);
    }
    result
}

fn exe_name_from_path(path: &str, pid: u32) -> String {
    Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| format!("pid-{pid}"))
}

fn zero_filetime() -> FILETIME {
    FILETIME {
        dwLowDateTime: 0,
        dwHighDateTime: 0,
    }
}
