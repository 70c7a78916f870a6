use tracing_subscriber::EnvFilter;

pub const LOG_VAR: &str = "PROMPT_TAGS_LOG";

/// Install the stderr subscriber. Safe to call more than once.
pub fn init() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_VAR)
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
