//! Logger initialisation

use anyhow::{Context, Result};
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Map the -v / -q flags to a level filter
pub fn level_filter(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// File name for a log started now, e.g. `vehicle_20240101_120000.log`
pub fn log_file_name() -> String {
    format!("vehicle_{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}

/// Initialize logging based on verbosity level.
///
/// With a log directory, records go to stderr and to a timestamped file in
/// that directory. Returns the path of the log file, if any.
pub fn init_logging(verbose: u8, quiet: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut builder = Builder::new();
    builder
        .filter_level(level_filter(verbose, quiet))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {:?}", dir))?;
            let path = dir.join(log_file_name());
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            builder.target(Target::Pipe(Box::new(Tee { file })));
            Some(path)
        }
        None => None,
    };

    builder
        .try_init()
        .context("Logger already initialized")?;
    Ok(log_path)
}

/// Writes every record to stderr and to the log file
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr errors are ignored
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}
