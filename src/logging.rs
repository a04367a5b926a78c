use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

pub const LOG_FILE: &str = "certdeck.log";

/// Route `log` output to `<data_dir>/certdeck.log`; the terminal belongs to
/// the UI. `RUST_LOG` overrides the configured level.
pub fn init(data_dir: &Path, level: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or(level))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("installing logger")?;
    Ok(path)
}
