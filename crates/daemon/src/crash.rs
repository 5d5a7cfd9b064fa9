// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash handler: unexpected panics outside the pool's barrier are dumped
//! to `logs/crash-<epoch-ms>.log` with a captured backtrace before the
//! previous hook runs.

use std::io::Write;
use std::path::{Path, PathBuf};

pub fn install(log_dir: &Path) {
    let log_dir: PathBuf = log_dir.to_path_buf();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        if let Err(e) = write_crash_log(&log_dir, info, &backtrace) {
            eprintln!("unable to write crash log: {e}");
        }
        previous(info);
    }));
}

fn write_crash_log(
    log_dir: &Path,
    info: &std::panic::PanicHookInfo<'_>,
    backtrace: &std::backtrace::Backtrace,
) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let path = log_dir.join(format!("crash-{stamp}.log"));
    let mut file = std::fs::File::create(&path)?;
    writeln!(file, "{info}")?;
    writeln!(file)?;
    writeln!(file, "{backtrace}")?;
    eprintln!("crash log written to {}", path.display());
    Ok(())
}
