mod cli;
mod commands;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use workpartner_core::{logging, DataPaths, Workspace};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = cli.data_dir.clone().unwrap_or_else(DataPaths::default_root);
    let mut paths = DataPaths::new(root);
    if let Some(items_db) = cli.items_db.clone() {
        paths = paths.with_items_db(items_db);
    }

    if let Command::Reset { yes } = cli.command {
        return commands::reset(paths, yes);
    }

    logging::init_logging(&paths.log_dir(), "warn").context("failed to set up logging")?;
    let mut ws = Workspace::open(paths.clone())
        .with_context(|| format!("failed to open data directory: {}", paths.root().display()))?;
    for file in ws.recovered_files() {
        eprintln!(
            "warning: {} could not be read and was reset (backup: {})",
            file.path.display(),
            file.backup.display()
        );
    }

    let result = commands::execute(&mut ws, cli.command, cli.json);
    if let Err(err) = &result {
        tracing::error!("command failed: {err:#}");
    }
    result
}

/// Whether the tracking daemon holds its instance mutex; `None` off Windows.
#[cfg(windows)]
pub fn daemon_running() -> Option<bool> {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenMutexW, SYNCHRONIZATION_SYNCHRONIZE};

    let name: Vec<u16> = workpartner_core::DAEMON_MUTEX_NAME
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();
    let handle = unsafe { OpenMutexW(SYNCHRONIZATION_SYNCHRONIZE, 0, name.as_ptr()) };
    if handle.is_null() {
        return Some(false);
    }
    unsafe {
        CloseHandle(handle);
    }
    Some(true)
}

#[cfg(not(windows))]
pub fn daemon_running() -> Option<bool> {
    None
}
