use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Path as UrlPath, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use log::{error, info, warn};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use quire_core::config::SiteConfig;
use quire_core::{Error as SiteError, INDEX_SLUG, SiteIndex, load_site};
use quire_generator::{
    RenderMode, category_groups, render_archive, render_category, render_not_found, render_page,
};
use std::{net::SocketAddr, path::PathBuf};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use super::load_config;

#[derive(Clone)]
struct AppState {
    site_path: PathBuf,
    drafts: bool,
    reload_tx: broadcast::Sender<()>,
}

/// A freshly loaded site, or the error page explaining why it didn't load
type Loaded = std::result::Result<(SiteConfig, SiteIndex), Response>;

/// Start preview server with hot reload for local development.
///
/// This command:
/// - Validates quire.toml up front
/// - Re-reads pages from disk on every request
/// - Serves static files under /static/
/// - Watches the site directory and triggers a reload on change
pub async fn run(path: PathBuf, port: Option<u16>, drafts: bool) -> Result<()> {
    println!("📓 Starting preview server...");
    println!("   Site: {}", path.display());

    let config = load_config(&path)?;
    let drafts = drafts || config.build.drafts;
    let port = port.unwrap_or(config.serve.port);

    let content_dir = path.join(&config.build.content_dir);
    match load_site(&content_dir, &config.site.author, drafts) {
        Ok(report) if report.is_ok() => {
            println!("   ✓ Loaded: {}", config.site.title);
            println!("   ✓ Pages: {}", report.site.len());
        }
        Ok(report) => {
            warn!(
                "{} page(s) failed to load; the preview will show the errors",
                report.errors.len()
            );
        }
        Err(e) => warn!("{}: {}", content_dir.display(), e),
    }

    let (reload_tx, _) = broadcast::channel::<()>(100);

    let state = AppState {
        site_path: path.clone(),
        drafts,
        reload_tx: reload_tx.clone(),
    };
    let app = router(state, path.join(&config.build.static_dir));

    // notify reports absolute paths
    let watcher_path = path.canonicalize().unwrap_or_else(|_| path.clone());
    let watcher_output = watcher_path.join(&config.build.output_dir);
    tokio::spawn(async move {
        if let Err(e) = watch_files(watcher_path, watcher_output, reload_tx).await {
            error!("File watcher error: {}", e);
        }
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn router(state: AppState, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/_reload", get(sse_handler))
        .route("/posts/", get(archive_handler))
        .route("/categories/{name}/", get(category_handler))
        .route("/{slug}", get(page_handler))
        .route("/{slug}/", get(page_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Watch for file changes and trigger reload
async fn watch_files(
    path: PathBuf,
    output_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher =
        notify::recommended_watcher(move |res: std::result::Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;

    watcher.watch(&path, RecursiveMode::Recursive)?;

    while let Some(event) = rx.recv().await {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
                // Skip editor temp files, hidden files and build output
                if event.paths.iter().any(|p| {
                    let filename = p.file_name().unwrap_or_default().to_string_lossy();
                    !filename.starts_with('.')
                        && !filename.ends_with('~')
                        && !p.starts_with(&output_dir)
                }) {
                    info!("File changed, reloading...");
                    let _ = reload_tx.send(());
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// SSE endpoint for hot reload
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            if rx.recv().await.is_ok() {
                yield Ok(Event::default().data("reload"));
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// HTML-escape a string for the error page
///
/// Escapes: & < > " '
fn html_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#x27;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

fn error_page(problems: &[String]) -> Response {
    let items: String = problems
        .iter()
        .map(|p| format!("<li><pre>{}</pre></li>", html_escape(p)))
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html><head><title>Error</title></head><body>
<h1>Site Error</h1>
<ul>{}</ul>
<script>
const eventSource = new EventSource('/_reload');
eventSource.onmessage = () => location.reload();
</script>
</body></html>"#,
        items
    );

    (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
}

/// Reload config and pages from disk
fn load(state: &AppState) -> Loaded {
    let config = load_config(&state.site_path).map_err(|e| error_page(&[format!("{:#}", e)]))?;

    let content_dir = state.site_path.join(&config.build.content_dir);
    let report = load_site(&content_dir, &config.site.author, state.drafts)
        .map_err(|e| error_page(&[format!("{}: {}", content_dir.display(), e)]))?;

    if !report.is_ok() {
        let problems: Vec<String> = report
            .errors
            .iter()
            .map(|failure| format!("{}: {}", failure.path.display(), failure.error))
            .collect();
        return Err(error_page(&problems));
    }

    Ok((config, report.site))
}

fn not_found(path: &str, config: &SiteConfig) -> Response {
    (
        StatusCode::NOT_FOUND,
        Html(render_not_found(path, &config.site, RenderMode::Preview)),
    )
        .into_response()
}

fn page_response(loaded: Loaded, slug: &str, path: &str) -> Response {
    let (config, site) = match loaded {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    match site.lookup(slug) {
        Ok(page) => match render_page(page, &config.site, RenderMode::Preview) {
            Ok(html) => Html(html).into_response(),
            Err(e) => error_page(&[format!("{}: {}", slug, e)]),
        },
        Err(SiteError::NotFound(_)) => not_found(path, &config),
        Err(e) => error_page(&[e.to_string()]),
    }
}

async fn index_handler(State(state): State<AppState>) -> Response {
    page_response(load(&state), INDEX_SLUG, "/")
}

async fn page_handler(State(state): State<AppState>, UrlPath(slug): UrlPath<String>) -> Response {
    let path = format!("/{}/", slug);
    page_response(load(&state), &slug, &path)
}

async fn archive_handler(State(state): State<AppState>) -> Response {
    match load(&state) {
        Ok((config, site)) => {
            Html(render_archive(&site, &config.site, RenderMode::Preview)).into_response()
        }
        Err(response) => response,
    }
}

async fn category_handler(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    let (config, site) = match load(&state) {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let groups = category_groups(&site);
    match groups.get(&name) {
        Some(group) => Html(render_category(
            group.name,
            &group.pages,
            &config.site,
            RenderMode::Preview,
        ))
        .into_response(),
        None => not_found(&format!("/categories/{}/", name), &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CONFIG: &str = r#"
[site]
title = "Notebook"
author = "Jane Doe"
base_url = "https://example.org"
"#;

    fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn page(title: &str, extra: &str, body: &str) -> String {
        format!(
            "+++\ntitle = \"{}\"\ndate = 2024-01-01\n{}\n+++\n\n{}\n",
            title, extra, body
        )
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "quire.toml", CONFIG);
        write(dir.path(), "content/index.md", &page("Home", "", "Welcome home."));
        write(
            dir.path(),
            "content/about.md",
            &page("About", "categories = [\"Meta\"]", "About this notebook."),
        );
        write(dir.path(), "static/style.css", "body { margin: 0; }");
        dir
    }

    fn app(dir: &Path) -> Router {
        let (reload_tx, _) = broadcast::channel(4);
        router(
            AppState {
                site_path: dir.to_path_buf(),
                drafts: false,
                reload_tx,
            },
            dir.join("static"),
        )
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(
            html_escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
        assert_eq!(html_escape("\"q\""), "&quot;q&quot;");
        assert_eq!(html_escape("トラック"), "トラック");
    }

    #[tokio::test]
    async fn test_serves_home_and_pages() {
        let dir = site();

        let (status, body) = get(app(dir.path()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Welcome home."));
        assert!(body.contains("/_reload"));

        let (status, body) = get(app(dir.path()), "/about/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.matches("About this notebook.").count(), 1);

        let (status, _) = get(app(dir.path()), "/about").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_slug_is_404() {
        let dir = site();
        let (status, body) = get(app(dir.path()), "/missing/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("/missing/"));

        let (status, _) = get(app(dir.path()), "/categories/nothing/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing_pages() {
        let dir = site();
        let (status, body) = get(app(dir.path()), "/posts/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/about/"));

        let (status, body) = get(app(dir.path()), "/categories/meta/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Meta"));
        assert!(body.contains("/about/"));
    }

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = site();
        let (status, body) = get(app(dir.path()), "/static/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn test_broken_site_shows_error_page() {
        let dir = site();
        write(
            dir.path(),
            "content/copy.md",
            &page("Copy", "slug = \"about\"", "Duplicate."),
        );

        let (status, body) = get(app(dir.path()), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Duplicate slug &#x27;about&#x27;"));
    }

    #[tokio::test]
    async fn test_reload_picks_up_edits() {
        let dir = site();
        write(dir.path(), "content/about.md", &page("About", "", "Edited text."));

        let (status, body) = get(app(dir.path()), "/about/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Edited text."));
    }
}
