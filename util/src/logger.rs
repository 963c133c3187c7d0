//! Mission logging
//!
//! Log lines go to the terminal, coloured by level, and uncoloured to the session's log file. Both
//! carry the seconds elapsed since the session started. Noisy modules (those logging every control
//! tick) can be given their own level so that `-v` stays readable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Level};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Module {0} would hide warnings at level `{1}`")]
    InvalidModuleLevel(String, log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `module_levels` overrides `min_level` for the given module paths (e.g.
/// `("nav_lib::sim", LevelFilter::Info)`).
///
/// # Notes
///
/// - `min_level` must be at least `log::Level::Info`, and no module may be
///   set below `Warn`. Warnings and errors are never filtered out of a mission
///   log.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: LevelFilter,
    module_levels: &[(&str, LevelFilter)],
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }
    for (module, level) in module_levels {
        if *level < Level::Warn {
            return Err(LoggerInitError::InvalidModuleLevel(module.to_string(), *level))
        }
    }

    let terminal = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::get_elapsed_seconds(),
                level_to_colored(record.level()),
                target_prefix(record.level(), record.target()),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:10.6} {}] {}{}",
                session::get_elapsed_seconds(),
                level_tag(record.level()),
                target_prefix(record.level(), record.target()),
                message
            ))
        })
        .chain(
            fern::log_file(&session.log_file_path)
                .map_err(LoggerInitError::LogFileInitError)?
        );

    let mut dispatch = fern::Dispatch::new().level(min_level);
    for (module, level) in module_levels {
        dispatch = dispatch.level_for(module.to_string(), *level);
    }

    dispatch
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    for (module, level) in module_levels {
        info!("    {}: {:?}", module, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Three letter tag for a log level
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info  => "INF",
        Level::Warn  => "WRN",
        Level::Error => "ERR"
    }
}

fn level_to_colored(level: Level) -> ColoredString {
    let tag = level_tag(level);

    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info  => tag.normal(),
        Level::Warn  => tag.yellow(),
        Level::Error => tag.red().bold()
    }
}

/// Debug and trace lines name the module they came from.
fn target_prefix(level: Level, target: &str) -> String {
    match level > Level::Info {
        true => format!("{}: ", target),
        false => String::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target_only_when_verbose() {
        assert_eq!(target_prefix(Level::Info, "nav_lib::auto"), "");
        assert_eq!(target_prefix(Level::Warn, "nav_lib::auto"), "");
        assert_eq!(target_prefix(Level::Debug, "nav_lib::auto"), "nav_lib::auto: ");
        assert_eq!(target_prefix(Level::Trace, "nav_lib::sim"), "nav_lib::sim: ");
    }

    #[test]
    fn test_level_tags() {
        assert_eq!(level_tag(Level::Warn), "WRN");
        assert!(level_to_colored(Level::Error).to_string().contains("ERR"));
    }
}
