//! Logger setup for binaries and tests embedding the bridge

/// Install `env_logger` filtered by `RUST_LOG`, defaulting to `info`.
/// Later calls are no-ops.
pub fn init_logging() {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
    if result.is_err() {
        log::trace!("Logger already installed");
    }
}
