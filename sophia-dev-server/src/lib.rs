use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::State,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::{Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use notify::Watcher;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tower_http::services::{ServeDir, ServeFile};

/// Path of the websocket pages connect to for reload messages.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Configuration for the live development server
#[derive(Debug, Clone)]
pub struct LiveServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Root directory to serve and watch
    pub root: PathBuf,
    /// Auto-open browser
    pub open: bool,
    /// Substrings of paths whose changes never trigger a reload
    pub ignore: Vec<String>,
}

impl Default for LiveServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            root: PathBuf::from("./build"),
            open: false,
            ignore: vec![],
        }
    }
}

/// Serves a built site and reloads open pages whenever it changes on disk.
pub struct LiveServer {
    config: LiveServerConfig,
    reload_tx: broadcast::Sender<String>,
}

impl LiveServer {
    pub fn new(config: LiveServerConfig) -> Self {
        let (reload_tx, _) = broadcast::channel::<String>(100);
        Self { config, reload_tx }
    }

    /// Static files from the root, `404.html` for misses and the reload
    /// socket. HTML responses get the reload script injected.
    pub fn router(&self) -> Router {
        let root = &self.config.root;
        let serve_dir =
            ServeDir::new(root).not_found_service(ServeFile::new(root.join("404.html")));

        Router::new()
            .route(LIVERELOAD_PATH, get(websocket_handler))
            .fallback_service(serve_dir)
            .layer(middleware::from_fn(inject_livereload))
            .with_state(AppState {
                reload_tx: self.reload_tx.clone(),
            })
    }

    /// Run until the listener fails.
    pub async fn run(self) -> Result<()> {
        if !self.config.root.exists() {
            anyhow::bail!(
                "Root directory does not exist: {}",
                self.config.root.display()
            );
        }

        let watcher_reload_tx = self.reload_tx.clone();
        let watch_path = self.config.root.clone();
        let ignore_patterns = self.config.ignore.clone();
        tokio::spawn(async move {
            if let Err(e) = start_file_watcher(watch_path, watcher_reload_tx, ignore_patterns).await
            {
                tracing::error!(error = %e, "File watcher stopped");
            }
        });

        let app = self.router();
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;

        tracing::info!(
            address = %format!("http://{addr}"),
            root = %self.config.root.display(),
            "Serving site with live reload"
        );

        if self.config.open {
            if let Err(e) = open::that(format!("http://{addr}")) {
                tracing::warn!(error = %e, "Failed to open browser");
            }
        }

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<String>,
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| websocket_connection(socket, state.reload_tx))
}

async fn websocket_connection(mut socket: WebSocket, reload_tx: broadcast::Sender<String>) {
    let mut rx = reload_tx.subscribe();

    if socket
        .send(Message::Text("connected".to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Ok(reload_msg) => {
                        if socket.send(Message::Text(reload_msg.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
            msg = socket.recv() => {
                if msg.is_none() {
                    break;
                }
            }
        }
    }
}

async fn inject_livereload(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read page for live reload injection");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Length changes once the script is in.
    parts.headers.remove(header::CONTENT_LENGTH);
    let html = inject_livereload_script(&String::from_utf8_lossy(&bytes));
    Response::from_parts(parts, Body::from(html))
}

async fn start_file_watcher(
    watch_path: PathBuf,
    reload_tx: broadcast::Sender<String>,
    ignore_patterns: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| {
            if let Ok(events) = res {
                for event in events {
                    if !is_ignored(&event.path, &ignore_patterns) {
                        let _ = tx.blocking_send(event.path);
                    }
                }
            }
        },
    )?;

    debouncer
        .watcher()
        .watch(&watch_path, notify::RecursiveMode::Recursive)?;
    tracing::debug!(path = %watch_path.display(), "Watching output directory");

    // A rebuild touches many files at once; reload once per burst.
    let mut last_reload: Option<Instant> = None;
    while let Some(path) = rx.recv().await {
        tracing::debug!(path = %path.display(), "Output changed");

        let now = Instant::now();
        if last_reload.is_none_or(|last| now.duration_since(last) > Duration::from_millis(1000)) {
            let _ = reload_tx.send("reload".to_string());
            last_reload = Some(now);
            tracing::info!("Reloading connected pages");
        }
    }

    Ok(())
}

fn is_ignored(path: &Path, patterns: &[String]) -> bool {
    let path = path.to_string_lossy();
    patterns.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// Inject live reload script into HTML content
pub fn inject_livereload_script(html: &str) -> String {
    let script = format!(
        r#"
<script>
(function() {{
    const socket = new WebSocket('ws://' + location.host + '{LIVERELOAD_PATH}');
    socket.onmessage = function(event) {{
        if (event.data === 'reload') {{
            location.reload();
        }}
    }};
    socket.onclose = function() {{
        console.log('Live reload disconnected');
    }};
}})();
</script>
"#
    );

    // Before the closing body tag, or at the end if there is none
    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script.len());
        result.push_str(&html[..pos]);
        result.push_str(&script);
        result.push_str(&html[pos..]);
        result
    } else {
        format!("{html}{script}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("index.html"),
            "<html><body><h1>Home</h1></body></html>",
        )
        .unwrap();
        fs::write(dir.path().join("404.html"), "<html><body>Page Not Found</body></html>").unwrap();
        fs::create_dir_all(dir.path().join("assets/css")).unwrap();
        fs::write(dir.path().join("assets/css/style.css"), "body { margin: 0; }").unwrap();
        dir
    }

    fn server(root: &Path) -> LiveServer {
        LiveServer::new(LiveServerConfig {
            root: root.to_path_buf(),
            ..LiveServerConfig::default()
        })
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn script_goes_before_closing_body() {
        let html = inject_livereload_script("<html><body><p>hi</p></body></html>");
        let script = html.find("<script>").unwrap();
        assert!(script > html.find("<p>hi</p>").unwrap());
        assert!(script < html.rfind("</body>").unwrap());
        assert!(html.contains(LIVERELOAD_PATH));
    }

    #[test]
    fn script_is_appended_without_body_tag() {
        let html = inject_livereload_script("<p>fragment</p>");
        assert!(html.starts_with("<p>fragment</p>"));
        assert!(html.trim_end().ends_with("</script>"));
    }

    #[test]
    fn ignore_patterns_match_substrings() {
        let patterns = vec![".git".to_string(), ".tmp".to_string()];
        assert!(is_ignored(Path::new("build/.git/HEAD"), &patterns));
        assert!(is_ignored(Path::new("build/page.tmp"), &patterns));
        assert!(!is_ignored(Path::new("build/docs/intro/index.html"), &patterns));
    }

    #[tokio::test]
    async fn html_pages_get_reload_script() {
        let dir = site();
        let (status, body) = get(server(dir.path()).router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>Home</h1>"));
        assert!(body.contains(LIVERELOAD_PATH));
    }

    #[tokio::test]
    async fn other_files_are_served_untouched() {
        let dir = site();
        let (status, body) = get(server(dir.path()).router(), "/assets/css/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body { margin: 0; }");
    }

    #[tokio::test]
    async fn missing_pages_get_not_found_page() {
        let dir = site();
        let (status, body) = get(server(dir.path()).router(), "/docs/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Page Not Found"));
    }

    #[tokio::test]
    async fn run_fails_without_root() {
        let dir = TempDir::new().unwrap();
        let err = server(&dir.path().join("missing")).run().await.unwrap_err();
        assert!(err.to_string().contains("Root directory does not exist"));
    }
}
