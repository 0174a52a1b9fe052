use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use windows_sys::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, MB_ICONINFORMATION, MB_ICONWARNING, MB_OK, MB_SETFOREGROUND, MB_TOPMOST,
};

static ALERT_OPEN: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy)]
pub enum AlertKind {
    Nag,
    Advice,
}

/// Shows a top-most message box on its own thread. Dropped while another one is open.
pub fn show(kind: AlertKind, message: &str) {
    if ALERT_OPEN.swap(true, Ordering::AcqRel) {
        tracing::debug!("alert skipped, another one is open");
        return;
    }

    let text = wide(message);
    let (caption, icon) = match kind {
        AlertKind::Nag => (wide("WorkPartner - Focus Mode"), MB_ICONWARNING),
        AlertKind::Advice => (wide("WorkPartner"), MB_ICONINFORMATION),
    };
    let spawned = thread::Builder::new()
        .name("workpartner-alert".to_owned())
        .spawn(move || {
            unsafe {
                MessageBoxW(
                    std::ptr::null_mut(),
                    text.as_ptr(),
                    caption.as_ptr(),
                    MB_OK | icon | MB_TOPMOST | MB_SETFOREGROUND,
                );
            }
            ALERT_OPEN.store(false, Ordering::Release);
        });
    if let Err(err) = spawned {
        ALERT_OPEN.store(false, Ordering::Release);
        tracing::error!(error = %err, "failed to spawn alert thread");
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}
