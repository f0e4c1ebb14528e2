#![allow(non_snake_case)]

#[cfg(feature = "ssr")]
mod config {
    use rag_client::BackendConfig;
    use serde::Deserialize;

    #[derive(Deserialize, Clone, Debug, Default)]
    pub struct Config {
        #[serde(default)]
        pub server: ServerConfig,
        #[serde(default)]
        pub backend: BackendConfig,
        #[serde(default)]
        pub session: SessionConfig,
    }

    #[derive(Deserialize, Clone, Debug)]
    pub struct ServerConfig {
        pub bind: String,
        pub port: u16,
    }

    #[derive(Deserialize, Clone, Debug)]
    pub struct SessionConfig {
        pub path: String,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                bind: "127.0.0.1".into(),
                port: 3000,
            }
        }
    }

    impl Default for SessionConfig {
        fn default() -> Self {
            Self {
                path: "data/session.json".into(),
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn load(path: &str) -> Config {
        match std::fs::read_to_string(path) {
            Ok(contents) => match parse(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("failed to parse config {path}: {e}, using defaults");
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read config {path}: {e}, using defaults");
                Config::default()
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn full_config_parses() {
            let config = parse(
                r#"
                [server]
                bind = "0.0.0.0"
                port = 8080

                [backend]
                base_url = "http://rag-backend:8000"
                timeout_secs = 10

                [session]
                path = "/var/lib/rag-console/session.json"
                "#,
            )
            .unwrap();
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.backend.base_url, "http://rag-backend:8000");
            assert_eq!(config.backend.timeout_secs, 10);
            assert_eq!(config.session.path, "/var/lib/rag-console/session.json");
        }

        #[test]
        fn missing_sections_use_defaults() {
            let config = parse("[backend]\nbase_url = \"http://b:9000\"\n").unwrap();
            assert_eq!(config.server.bind, "127.0.0.1");
            assert_eq!(config.server.port, 3000);
            assert_eq!(config.backend.timeout_secs, rag_client::api::DEFAULT_TIMEOUT_SECS);
            assert_eq!(config.session.path, "data/session.json");
        }

        #[test]
        fn unreadable_config_falls_back() {
            let config = load("/nonexistent/rag-console.toml");
            assert_eq!(config.backend.base_url, "http://127.0.0.1:8000");
        }
    }
}

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use std::sync::Arc;

    use axum::Router;
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use rag_api::middleware::auth::AppState;
    use rag_client::{ConsoleMetrics, FileStorage};
    use rag_ui::{shell, App};
    use tower_http::trace::TraceLayer;
    use tracing_subscriber::{fmt, EnvFilter};

    // Initialize tracing
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse config path from args
    let args: Vec<String> = std::env::args().collect();
    let configPath = if let Some(idx) = args.iter().position(|a| a == "--config") {
        args.get(idx + 1)
            .cloned()
            .unwrap_or_else(|| "config.example.toml".into())
    } else {
        "config.example.toml".into()
    };

    let appConfig = config::load(&configPath);
    tracing::info!(
        "loaded config from {configPath}: bind={}:{} backend={}",
        appConfig.server.bind,
        appConfig.server.port,
        appConfig.backend.base_url
    );

    let metrics = ConsoleMetrics::new()
        .unwrap_or_else(|e| panic!("failed to set up metrics: {e}"));
    let storage = Arc::new(FileStorage::new(&appConfig.session.path));
    let client = rag_client::connect(&appConfig.backend, storage, metrics.clone())
        .unwrap_or_else(|e| panic!("failed to set up backend client: {e}"));

    match client.guard().current_user() {
        Some(user) => tracing::info!("resuming session for {} ({})", user.username, user.role),
        None => tracing::info!("no saved session, login required"),
    }

    let appState = AppState {
        client: client.clone(),
        metrics: metrics.clone(),
    };

    // Get Leptos configuration
    let conf = get_configuration(None).expect("failed to load Leptos configuration");
    let leptosOptions = conf.leptos_options;
    let addr = format!("{}:{}", appConfig.server.bind, appConfig.server.port);

    // Generate route list from Leptos App
    let routes = generate_route_list(App);

    let apiRouter = rag_api::api_router(appState.clone());

    // Pages without a current session cookie redirect to /login
    let pageAuthLayer = axum::middleware::from_fn_with_state(
        appState,
        rag_api::middleware::auth::require_page_auth,
    );

    // Server functions reach the backend through the ApiClient in context;
    // the JSON API carries the same client in its own state.
    let app = Router::new()
        .leptos_routes_with_context(
            &leptosOptions,
            routes,
            {
                let client = client.clone();
                move || {
                    leptos::prelude::provide_context(client.clone());
                }
            },
            {
                let leptosOptions = leptosOptions.clone();
                move || shell(leptosOptions.clone())
            },
        )
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptosOptions)
        .merge(apiRouter)
        .layer(pageAuthLayer)
        .layer(axum::middleware::from_fn_with_state(
            metrics,
            rag_api::middleware::metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http());

    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));
    axum::serve(listener, app.into_make_service())
        .await
        .expect("server exited with error");
}

#[cfg(not(feature = "ssr"))]
fn main() {}
