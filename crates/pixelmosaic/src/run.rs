use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use renderer::{WindowOptions, WindowRuntime};
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::settings::{ConfigSource, Overrides};

const WATCH_INTERVAL: Duration = Duration::from_millis(500);

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let source = ConfigSource::resolve(args.config.as_deref())?;
    let overrides = Overrides {
        quality: args.quality,
        paused: args.paused,
    };
    let file = overrides.apply(source.load()?);

    let mut options = WindowOptions::new(file);
    if let Some(size) = args.size {
        options = options.with_size(size);
    }
    tracing::info!(
        config = %source.path.display(),
        quality = %options.file.mosaic.quality,
        width = options.size.0,
        height = options.size.1,
        "starting pixel mosaic preview"
    );

    let runtime = WindowRuntime::spawn(options)?;
    let mut watcher = (!args.no_watch).then(|| ConfigWatcher::new(source.path.clone()));

    while !runtime.is_finished() {
        thread::sleep(WATCH_INTERVAL);
        let Some(watcher) = watcher.as_mut() else {
            continue;
        };
        if !watcher.changed() {
            continue;
        }
        match source.load() {
            Ok(file) => {
                if let Err(err) = runtime.update(overrides.apply(file)) {
                    tracing::debug!(error = %err, "configuration reload skipped");
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(error = %message, "keeping previous configuration");
            }
        }
    }

    runtime.shutdown()
}

/// Polls a file's modification time.
///
/// Creation and deletion count as changes, so dropping a config file next to a
/// running preview applies it and removing it restores defaults.
struct ConfigWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl ConfigWatcher {
    fn new(path: PathBuf) -> Self {
        let last_seen = modified(&path);
        tracing::debug!(path = %path.display(), "watching configuration");
        Self { path, last_seen }
    }

    fn changed(&mut self) -> bool {
        let current = modified(&self.path);
        if current == self.last_seen {
            return false;
        }
        self.last_seen = current;
        tracing::info!(path = %self.path.display(), "configuration changed; reloading");
        true
    }
}

fn modified(path: &std::path::Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
