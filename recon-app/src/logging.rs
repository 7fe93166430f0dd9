//! Tracing subscriber setup.

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    pub enable_tracy: bool,
}

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
pub fn init(config: &LoggingConfig) {
    #[cfg(feature = "tracy")]
    {
        if config.enable_tracy {
            use tracing_subscriber::Layer;
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            tracing_subscriber::registry()
                .with(tracing_tracy::TracyLayer::default())
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .with_filter(
                            tracing_subscriber::EnvFilter::try_from_default_env()
                                .unwrap_or_else(|_| config.level.clone().into()),
                        ),
                )
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    #[cfg(not(feature = "tracy"))]
    if config.enable_tracy {
        tracing::warn!("--tracy ignored: built without the `tracy` feature");
    }
}
