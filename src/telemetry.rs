use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::configuration::Environment;

/// Default filter when `RUST_LOG` is not set
fn default_directive(environment: Environment) -> &'static str {
    match environment {
        Environment::Local | Environment::Dev => "debug",
        Environment::Prod => "info",
    }
}

/// Install the global subscriber.
///
/// `local` gets human-readable lines; `dev` and `prod` emit JSON with the
/// current span's fields. `RUST_LOG` overrides the level in every environment.
pub fn init_telemetry(environment: Environment) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(environment)));

    let registry = tracing_subscriber::registry().with(env_filter);

    match environment {
        Environment::Local => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .init(),
        Environment::Dev | Environment::Prod => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .json()
                    .with_current_span(true),
            )
            .init(),
    }
}
