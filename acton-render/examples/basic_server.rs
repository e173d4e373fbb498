//! Basic acton-render server example
//!
//! Demonstrates:
//! - Observability initialization
//! - Template set compilation with a layout and HTMX helpers
//! - HTML pages, HTML fragments, JSON and redirects from one extractor
//!
//! Run with: `cargo run --example basic_server`

use acton_render::{observability, prelude::*, template::helpers::htmx_funcs};
use axum::{routing::get, Router};
use std::time::{SystemTime, UNIX_EPOCH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init()?;

    let options = RenderOptions::default()
        .with_directory(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"))
        .with_layout("layout")
        .with_funcs(htmx_funcs());
    let renderer = Renderer::new(options)?;

    tracing::info!(
        sets = ?renderer.sets().names(),
        mode = ?renderer.mode(),
        "Templates compiled"
    );

    let app = Router::new()
        .route("/", get(index))
        .route("/clock", get(clock))
        .route("/api/clock", get(api_clock))
        .route("/home", get(home))
        .with_state(renderer);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Server listening on http://127.0.0.1:3000");

    axum::serve(listener, app).await?;

    Ok(())
}

fn seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Full page wrapped in the layout
async fn index(mut render: Render) -> Render {
    render.html(StatusCode::OK, "index", &context! { title => "acton-render" }, None);
    render
}

/// Fragment for HTMX swaps, rendered without the layout
async fn clock(mut render: Render) -> Render {
    render.html(
        StatusCode::OK,
        "partials/clock",
        &context! { seconds => seconds() },
        Some(&HtmlOptions::no_layout()),
    );
    render
}

async fn api_clock(mut render: Render) -> Render {
    render.json(StatusCode::OK, &json!({ "seconds": seconds() }));
    render
}

async fn home(mut render: Render) -> Render {
    render.redirect("/", None);
    render
}
