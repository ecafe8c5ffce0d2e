use slog::{o, Drain, Level, Logger};
use std::fs::OpenOptions;
use std::path::Path;

/// Logging handle threaded through the orchestration code. A `Context` without a
/// logger silently drops every record, which is what the tests rely on.
#[derive(Clone, Debug)]
pub struct Context {
    pub logger: Option<Logger>,
}

impl Context {
    pub fn empty() -> Context {
        Context { logger: None }
    }

    pub fn with_logger(logger: Logger) -> Context {
        Context {
            logger: Some(logger),
        }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }
}

pub fn setup_logger(verbose: bool) -> Logger {
    let level = if verbose { Level::Debug } else { Level::Info };
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .build()
        .filter_level(level)
        .ignore_res();
    Logger::root(drain, o!())
}

pub fn setup_file_logger(path: &Path) -> Result<Logger, String> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| format!("unable to create log file {}\n{}", path.display(), e))?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Ok(Logger::root(drain, o!()))
}
