//! Hello Gateway - reference workload for the edge render gateway.
//!
//! Serves two pages:
//! - `/` renders `Home.js` with a hydration bundle at `/js/Home.js`
//! - `/greet?name=...` resolves its options per request and renders `Greeting.js`

mod views;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use edge_sdk::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Serve server-rendered pages through the edge render gateway
#[derive(Parser)]
#[command(name = "hello-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file path (TOML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(cli.config.as_deref())?;
    let gateway = build_gateway(config);

    gateway.on_error(|err, _res| {
        tracing::error!(error = %err.detail(), "request failed");
    });

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    gateway
        .serve_with_shutdown(listener, async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Gateway stopped")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let (config, base) = match path {
        Some(path) => {
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| cwd.join(p))
                .unwrap_or_else(|| cwd.clone());
            (GatewayConfig::load(path)?, base)
        }
        None => (GatewayConfig::new(), cwd),
    };
    Ok(config.apply_env().resolve(&base))
}

fn build_gateway(config: GatewayConfig) -> Gateway {
    let gateway = Gateway::builder(config)
        .workload("hello-gateway")
        .component("Home.js", component_fn(views::home))
        .component("Greeting.js", component_fn(views::greeting))
        .template("_layout.js", template_fn(views::layout))
        .build();

    gateway.get(
        "/",
        RenderRequest::new()
            .with_component("Home.js")
            .with_template("_layout.js")
            .with_meta(hydrate())
            .with_bundle(true),
    );

    gateway.get(
        "/greet",
        RouteOptions::deferred(|ctx: RequestContext, _: ResponseWriter, done: Done| async move {
            let name = ctx.query_param("name").unwrap_or("stranger").to_string();
            done.call(
                RenderRequest::new()
                    .with_component("Greeting.js")
                    .with_template("_layout.js")
                    .with_prop("name", name)
                    .with_prop("title", "Greetings")
                    .with_meta(hydrate())
                    .with_expose("greeting")
                    .with_bundle(true),
            );
        }),
    );

    gateway
}

fn hydrate() -> Props {
    let mut meta = Props::new();
    meta.insert("hydrate".to_string(), json!(true));
    meta
}
