//! Logger setup.
//!
//! Everything logs through the `log` facade; `env_logger` is the backend.

/// Filter used when `RUST_LOG` is unset. wgpu is chatty at info.
pub const DEFAULT_FILTER: &str = "warn,coordinate_spaces=info";

/// Install the global logger, honouring `RUST_LOG` when it is set.
///
/// Returns `false` if a logger was already installed.
pub fn init_logging() -> bool {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
    let installed = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_ok();

    if installed {
        log::debug!("logging initialized");
    }
    installed
}
