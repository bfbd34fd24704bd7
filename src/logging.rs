use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset
fn default_directives(env: &Environment) -> &'static str {
    match env {
        Environment::Dev => "digiurban=debug,tower_http=debug,sqlx=warn,info",
        Environment::Staging => "digiurban=debug,tower_http=info,sqlx=warn,info",
        Environment::Prod => "digiurban=info,tower_http=info,warn",
    }
}

fn filter_for(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Server logging: JSON lines in prod, pretty output with source locations in dev
pub fn init_logging(env: &Environment) {
    let registry = tracing_subscriber::registry().with(filter_for(default_directives(env)));
    let fmt = tracing_subscriber::fmt::layer().with_target(true);

    if env.is_prod() {
        registry
            .with(fmt.json().flatten_event(true).with_current_span(true))
            .init();
    } else {
        registry
            .with(fmt.pretty().with_file(env.is_dev()).with_line_number(env.is_dev()))
            .init();
    }

    tracing::info!(environment = ?env, "Logging initialized");
}

/// Compact stderr logging for command line tools
pub fn init_cli_logging(verbose: bool) {
    let default = if verbose { "digiurban=debug,info" } else { "warn" };

    tracing_subscriber::registry()
        .with(filter_for(default))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        for env in [Environment::Dev, Environment::Staging, Environment::Prod] {
            let directives = default_directives(&env);
            assert!(directives.parse::<EnvFilter>().is_ok(), "{}", directives);
        }
    }
}
