use std::env;

/// Initializes tracing using the provided log level as the default filter.
///
/// `RUST_LOG` takes precedence when it is set and non-empty. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = filter_directive(level, env::var("RUST_LOG").ok());

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

fn filter_directive(level: &str, rust_log: Option<String>) -> String {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("m2e_store={},sea_orm=warn,sqlx=warn", level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_scopes_crate() {
        assert_eq!(
            filter_directive("debug", None),
            "m2e_store=debug,sea_orm=warn,sqlx=warn"
        );
    }

    #[test]
    fn rust_log_wins_unless_blank() {
        assert_eq!(filter_directive("info", Some("trace".into())), "trace");
        assert_eq!(
            filter_directive("info", Some("  ".into())),
            "m2e_store=info,sea_orm=warn,sqlx=warn"
        );
    }
}
