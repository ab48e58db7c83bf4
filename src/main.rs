//! og-image: serve or render Open Graph images from an HTML template file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use maud::Render;
use og_image::{OgImage, OgImageOptions, Params};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "og-image", version, about = "Render Open Graph images with headless Chrome")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a template over HTTP
    Serve {
        /// HTML file with `{{name}}` placeholders
        #[arg(long)]
        template: PathBuf,
        /// TOML handler options
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
        #[arg(long, default_value = "/api/og")]
        path: String,
    },
    /// Render a template once and write the result to a file
    Render {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Template parameter as `key=value`; repeatable
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {:?}", s))
}

/// Substitute `{{name}}` placeholders with escaped parameter values. Unknown
/// names become empty.
fn fill_placeholders(template: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some(value) = params.get(name) {
                    value.render_to(&mut out);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn build_handler(template: &Path, config: Option<&Path>) -> Result<OgImage> {
    let source = std::fs::read_to_string(template)
        .with_context(|| format!("reading template {}", template.display()))?;
    let source = Arc::new(source);

    let options = match config {
        Some(path) => OgImageOptions::load(path)?,
        None => OgImageOptions::default(),
    };

    let handler = OgImage::<HashMap<String, String>>::builder()
        .html(move |params: HashMap<String, String>| {
            let source = Arc::clone(&source);
            async move { Ok(fill_placeholders(&source, &params)) }
        })
        .options(options)
        .build()?;
    Ok(handler)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "og_image=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Serve {
            template,
            config,
            addr,
            path,
        } => {
            let handler = build_handler(&template, config.as_deref())?;
            tracing::info!(
                "serving {} on http://{}{} ({} strategy, {:?} mode)",
                template.display(),
                addr,
                path,
                handler.config().strategy,
                handler.config().env_mode
            );
            let app = handler.into_router(&path);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {}", addr))?;
            axum::serve(listener, app).await?;
        }
        Command::Render {
            template,
            out,
            config,
            params,
        } => {
            let handler = build_handler(&template, config.as_deref())?;
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            let rendered = handler.render(Params::from_query(Some(&query))).await?;
            std::fs::write(&out, &rendered.body)
                .with_context(|| format!("writing {}", out.display()))?;
            tracing::info!(
                "wrote {} ({} bytes, {})",
                out.display(),
                rendered.body.len(),
                rendered.content_type.to_str().unwrap_or("binary")
            );
        }
    }
    Ok(())
}
