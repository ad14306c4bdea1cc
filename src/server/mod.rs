//! Request-time server with live reload

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::content::PostStore;
use crate::generator::SiteRenderer;
use crate::Site;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    store: PostStore,
    renderer: SiteRenderer,
    static_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// A rendered page and its status
type Page = (StatusCode, String);

impl ServerState {
    fn new(site: &Site, reload_tx: broadcast::Sender<()>, live_reload: bool) -> Result<Self> {
        Ok(Self {
            store: site.store(),
            renderer: SiteRenderer::new(&site.config)?,
            static_dir: site.static_dir.clone(),
            reload_tx,
            live_reload,
        })
    }

    fn home(&self) -> Result<Page> {
        let posts = self.store.list_posts()?;
        let html = self.renderer.render_home(&posts, Utc::now())?;
        Ok((StatusCode::OK, html))
    }

    fn blog(&self) -> Result<Page> {
        let posts = self.store.list_posts()?;
        let html = self.renderer.render_blog(&posts, Utc::now())?;
        Ok((StatusCode::OK, html))
    }

    /// Missing posts, and drafts in production, get the not-found page
    fn post(&self, slug: &str) -> Result<Page> {
        match self.store.get_post(slug) {
            Some(post) if self.store.is_visible(&post) => {
                let html = self.renderer.render_post(&post, Utc::now())?;
                Ok((StatusCode::OK, html))
            }
            Some(_) => {
                tracing::debug!("Hiding draft '{}' in {} mode", slug, self.store.mode());
                self.not_found()
            }
            None => self.not_found(),
        }
    }

    fn sitemap(&self) -> Result<String> {
        let posts = self.store.list_posts()?;
        Ok(self.renderer.render_sitemap(&posts, Utc::now()))
    }

    fn not_found(&self) -> Result<Page> {
        let html = self.renderer.render_not_found(Utc::now())?;
        Ok((StatusCode::NOT_FOUND, html))
    }

    /// Turn a rendered page (or a rendering failure) into a response
    fn respond(&self, page: Result<Page>) -> Response {
        match page {
            Ok((status, html)) => {
                let html = if self.live_reload {
                    inject_live_reload(&html)
                } else {
                    html
                };
                (status, Html(html)).into_response()
            }
            Err(e) => {
                tracing::error!("Rendering failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Internal server error: {:#}", e),
                )
                    .into_response()
            }
        }
    }
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState::new(site, reload_tx.clone(), watch)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {} ({} mode)", url, site.config.mode);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let content_dir = site.content_dir.clone();
        let static_dir = site.static_dir.clone();
        let config_path = site.config_path();

        // The watcher blocks on its event channel, so it gets its own thread
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(content_dir, static_dir, config_path, reload_tx) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/blog", get(blog_handler))
        .route("/blog/", get(blog_handler))
        .route("/blog/:slug", get(post_handler))
        .route("/blog/:slug/", get(post_handler))
        .route("/sitemap.xml", get(sitemap_handler))
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home_handler(State(state): State<Arc<ServerState>>) -> Response {
    state.respond(state.home())
}

async fn blog_handler(State(state): State<Arc<ServerState>>) -> Response {
    state.respond(state.blog())
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    state.respond(state.post(&slug))
}

async fn sitemap_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.sitemap() {
        Ok(xml) => ([(header::CONTENT_TYPE, "application/xml")], xml).into_response(),
        Err(e) => state.respond(Err(e)),
    }
}

/// Serve static assets, falling back to the not-found page
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.static_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.into_response(),
        Ok(_) => state.respond(state.not_found()),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Watch for file changes and tell connected browsers to reload.
/// Pages are rendered per request, so content edits need no rebuild.
fn watch_and_reload(
    content_dir: PathBuf,
    static_dir: PathBuf,
    config_path: PathBuf,
    reload_tx: broadcast::Sender<()>,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for dir in [&content_dir, &static_dir] {
        if dir.exists() {
            debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("Watching: {:?}", dir);
        }
    }

    if config_path.exists() {
        debouncer
            .watcher()
            .watch(&config_path, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching: {:?}", config_path);
    }

    forward_changes(&rx, &config_path, &reload_tx);

    Ok(())
}

/// Turn debounced file events into reload notifications until the
/// watcher goes away
fn forward_changes(
    rx: &std::sync::mpsc::Receiver<DebounceEventResult>,
    config_path: &std::path::Path,
    reload_tx: &broadcast::Sender<()>,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| is_relevant_change(&e.path))
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    tracing::info!("File changed: {}", event.path.display());
                }

                if relevant.iter().any(|e| e.path == config_path) {
                    tracing::warn!("_config.yml changed, restart the server to apply it");
                }

                let _ = reload_tx.send(());
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(_) => {
                tracing::debug!("File watcher stopped");
                break;
            }
        }
    }
}

/// Skip editor and VCS noise
fn is_relevant_change(path: &std::path::Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git")
        && !path_str.contains(".DS_Store")
        && !path_str.contains("node_modules")
        && !path_str.ends_with('~')
        && !path_str.ends_with(".swp")
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::fs;
    use tempfile::TempDir;

    fn server_state(mode: Mode, live_reload: bool) -> (TempDir, ServerState) {
        let dir = TempDir::new().unwrap();
        let blog = dir.path().join("content/blog");
        fs::create_dir_all(&blog).unwrap();
        fs::write(
            blog.join("open-guard.mdx"),
            "---\ntitle: Open Guard\ndescription: D\npublishedAt: 2024-01-01\nauthor: Ana\ncategory: bjj-techniques\n---\n\nGrips.\n",
        )
        .unwrap();
        fs::write(
            blog.join("unreleased.mdx"),
            "---\ntitle: Unreleased\ndescription: D\npublishedAt: 2024-02-01\nauthor: Ana\ncategory: product-updates\ndraft: true\n---\n\nSoon.\n",
        )
        .unwrap();
        fs::write(
            blog.join("broken.mdx"),
            "---\ntitle: Broken\ndescription: D\npublishedAt: 2023-01-01\nauthor: Ana\ncategory: community\n---\n\n<Callout>\n\nnever closed\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap().with_mode(mode);
        let (tx, _) = broadcast::channel(1);
        let state = ServerState::new(&site, tx, live_reload).unwrap();
        (dir, state)
    }

    #[test]
    fn test_post_route() {
        let (_dir, state) = server_state(Mode::Production, false);
        let (status, html) = state.post("open-guard").unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<title>Open Guard | Avanco Blog</title>"));

        let (status, html) = state.post("missing").unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(html.contains("Post Not Found"));

        let (status, _) = state.post("../_config").unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_drafts_hidden_in_production_only() {
        let (_dir, state) = server_state(Mode::Production, false);
        assert_eq!(state.post("unreleased").unwrap().0, StatusCode::NOT_FOUND);
        assert!(!state.blog().unwrap().1.contains("Unreleased"));

        let (_dir, state) = server_state(Mode::Development, false);
        assert_eq!(state.post("unreleased").unwrap().0, StatusCode::OK);
        assert!(state.blog().unwrap().1.contains("Unreleased"));
    }

    #[test]
    fn test_compile_error_is_server_error() {
        let (_dir, state) = server_state(Mode::Production, false);
        assert!(state.post("broken").is_err());
        let response = state.respond(state.post("broken"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_live_reload_injection() {
        let (_dir, state) = server_state(Mode::Production, true);
        let response = state.respond(state.home());
        assert_eq!(response.status(), StatusCode::OK);

        let html = inject_live_reload("<html><body>hi</body></html>");
        assert!(html.contains("/__livereload"));
        assert!(html.ends_with("</html>"));
        assert_eq!(html.matches("</body>").count(), 1);

        let bare = inject_live_reload("<p>hi</p>");
        assert!(bare.starts_with("<p>hi</p>"));
    }

    #[test]
    fn test_sitemap_lists_visible_posts() {
        let (_dir, state) = server_state(Mode::Production, false);
        let xml = state.sitemap().unwrap();
        assert!(xml.contains("<loc>https://avanco.ai/blog/open-guard</loc>"));
        assert!(xml.contains("<loc>https://avanco.ai/blog/broken</loc>"));
        assert!(!xml.contains("unreleased"));
    }

    #[test]
    fn test_file_changes_trigger_reload() {
        use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind};

        let config_path = PathBuf::from("site/_config.yml");
        let (tx, rx) = std::sync::mpsc::channel::<DebounceEventResult>();
        let (reload_tx, mut reload_rx) = broadcast::channel(4);

        let event = |path: &str| DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        };
        tx.send(Ok(vec![event("site/content/blog/.a.mdx.swp")])).unwrap();
        tx.send(Ok(vec![event("site/content/blog/a.mdx")])).unwrap();
        tx.send(Ok(vec![event("site/_config.yml")])).unwrap();
        drop(tx);

        // Returns once the sender is gone instead of parking forever
        forward_changes(&rx, &config_path, &reload_tx);

        assert!(reload_rx.try_recv().is_ok());
        assert!(reload_rx.try_recv().is_ok());
        assert!(reload_rx.try_recv().is_err());
    }

    #[test]
    fn test_relevant_change_filter() {
        assert!(is_relevant_change(std::path::Path::new("content/blog/a.mdx")));
        assert!(!is_relevant_change(std::path::Path::new("content/blog/.a.mdx.swp")));
        assert!(!is_relevant_change(std::path::Path::new("content/blog/a.mdx~")));
    }
}
