#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

#[cfg(windows)]
mod alert;
mod config;
#[cfg(windows)]
mod monitor;

use anyhow::Result;

use crate::config::Config;

fn main() -> Result<()> {
    let config = Config::from_args()?;
    run(config)
}

#[cfg(not(windows))]
fn run(_config: Config) -> Result<()> {
    anyhow::bail!("workpartner-backend watches the Windows foreground window and only runs on Windows")
}

#[cfg(windows)]
fn run(config: Config) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use anyhow::Context;
    use chrono::Local;
    use workpartner_core::{logging, Recorder, RecorderOptions, Workspace};

    use crate::alert::AlertKind;
    use crate::monitor::WindowsMonitor;

    let _instance_guard = match instance::acquire()? {
        Some(guard) => guard,
        None => {
            eprintln!("workpartner-backend is already running");
            return Ok(());
        }
    };

    config.paths.ensure_root()?;
    logging::init_logging(&config.paths.log_dir(), "info").context("failed to set up logging")?;

    let workspace = Workspace::open(config.paths.clone()).with_context(|| {
        format!("failed to open data directory: {}", config.paths.root().display())
    })?;
    for file in workspace.recovered_files() {
        tracing::warn!(
            path = %file.path.display(),
            backup = %file.backup.display(),
            "data file was corrupt and has been reset"
        );
    }

    let mut recorder = Recorder::new(
        workspace,
        RecorderOptions {
            focus_mode: config.focus_mode,
            advice: config.advice,
        },
    )?;
    let mut monitor = WindowsMonitor::new();

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_signal = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || {
        shutdown_signal.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("ctrlc handler registration failed: {err}");
    }

    tracing::info!(
        "WorkPartner backend started | data={} | items={} | poll={}ms | focus_mode={} | advice={}",
        config.paths.root().display(),
        config.paths.items_db().display(),
        config.poll_interval.as_millis(),
        config.focus_mode,
        config.advice,
    );

    while !shutdown.load(Ordering::Relaxed) {
        let sample = monitor.sample();
        match recorder.ingest(&sample) {
            Ok(report) => {
                if let Some(nag) = &report.nag {
                    alert::show(AlertKind::Nag, &nag.message);
                }
                if let Some(suggestion) = &report.suggestion {
                    tracing::info!(?suggestion, "focus suggestion");
                    alert::show(AlertKind::Advice, &suggestion.message());
                }
            }
            Err(err) => tracing::error!("tick failed: {err}"),
        }
        thread::sleep(config.poll_interval);
    }

    recorder.flush(Local::now())?;
    tracing::info!("WorkPartner backend stopped");
    Ok(())
}

#[cfg(windows)]
mod instance {
    use anyhow::{anyhow, Result};
    use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE};
    use windows_sys::Win32::System::Threading::CreateMutexW;
    use workpartner_core::DAEMON_MUTEX_NAME;

    pub struct InstanceGuard {
        handle: HANDLE,
    }

    impl Drop for InstanceGuard {
        fn drop(&mut self) {
            if !self.handle.is_null() {
                unsafe {
                    CloseHandle(self.handle);
                }
            }
        }
    }

    /// `None` when another daemon already holds the mutex.
    pub fn acquire() -> Result<Option<InstanceGuard>> {
        let name: Vec<u16> = DAEMON_MUTEX_NAME
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        let handle = unsafe { CreateMutexW(std::ptr::null(), 0, name.as_ptr()) };
        if handle.is_null() {
            return Err(anyhow!("CreateMutexW failed"));
        }

        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe {
                CloseHandle(handle);
            }
            return Ok(None);
        }

        Ok(Some(InstanceGuard { handle }))
    }
}
