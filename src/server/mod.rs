//! Development server with live reload
//!
//! Serves the public directory, rebuilds when the configuration or local
//! assets change, and optionally re-fetches from Notion on a fixed
//! interval. Unknown paths get the generated 404 page.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use percent_encoding::percent_decode_str;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::commands::generate::{self, GenerateOptions};
use crate::helpers::encode_uri_component;
use crate::Blog;

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

/// Index files tried for directory requests, in order
const INDEX_FILES: [&str; 2] = ["index.html", "index.xml"];

/// How `server` runs
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub ip: String,
    pub port: u16,
    /// Rebuild and live reload on local changes
    pub watch: bool,
    pub open: bool,
    /// Rebuild from Notion every N seconds
    pub revalidate: Option<u64>,
    pub generate: GenerateOptions,
}

/// Server state
struct ServerState {
    public_dir: PathBuf,
    base_path: String,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Start the development server
pub async fn start(blog: &Blog, options: ServerOptions) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: blog.public_dir.clone(),
        base_path: blog.config.base_path(),
        reload_tx: reload_tx.clone(),
        live_reload: options.watch,
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if options.ip == "localhost" {
        "127.0.0.1"
    } else {
        options.ip.as_str()
    };
    let addr: SocketAddr = format!("{}:{}", bind_ip, options.port).parse()?;

    let url = format!(
        "http://{}:{}{}/",
        options.ip,
        options.port,
        blog.config.base_path()
    );
    println!("Server running at {}", url);
    if options.watch {
        println!("Live reload enabled. Watching for changes...");
    }
    if let Some(secs) = options.revalidate {
        println!("Revalidating content every {}s", secs);
    }
    println!("Press Ctrl+C to stop.");

    if options.open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if options.watch || options.revalidate.is_some() {
        let blog = blog.clone();
        let options = options.clone();
        tokio::spawn(async move {
            if let Err(e) = rebuild_loop(blog, options, reload_tx).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Local inputs of a build
fn watch_paths(blog: &Blog) -> Vec<(PathBuf, RecursiveMode)> {
    vec![
        (blog.config_path(), RecursiveMode::NonRecursive),
        (blog.assets_dir.clone(), RecursiveMode::Recursive),
        (blog.base_dir.join("locales"), RecursiveMode::Recursive),
        (blog.snapshot_dir.clone(), RecursiveMode::Recursive),
    ]
}

/// Rebuild on file changes and on the revalidation interval
async fn rebuild_loop(
    blog: Blog,
    options: ServerOptions,
    reload_tx: broadcast::Sender<()>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res| {
        let _ = tx.send(res);
    })?;

    if options.watch {
        for (path, mode) in watch_paths(&blog) {
            if path.exists() {
                debouncer.watcher().watch(&path, mode)?;
                tracing::debug!("Watching: {:?}", path);
            }
        }
    }

    let mut interval = options
        .revalidate
        .filter(|secs| *secs > 0)
        .map(|secs| tokio::time::interval(Duration::from_secs(secs)));
    if let Some(interval) = interval.as_mut() {
        // The first tick completes immediately; the site was just built
        interval.tick().await;
    }

    loop {
        let revalidate = async {
            match interval.as_mut() {
                Some(interval) => {
                    interval.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        let generate_options = tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(Ok(events)) => {
                        let relevant: Vec<_> = events
                            .iter()
                            .filter(|e| is_relevant(&e.path))
                            .collect();
                        if relevant.is_empty() {
                            continue;
                        }
                        for event in &relevant {
                            println!("📝 File changed: {}", event.path.display());
                        }
                        options.generate.clone()
                    }
                    Some(Err(e)) => {
                        tracing::error!("Watch error: {:?}", e);
                        continue;
                    }
                    None => break,
                }
            }
            _ = revalidate => {
                tracing::info!("Revalidating content from Notion");
                GenerateOptions {
                    offline: false,
                    ..options.generate.clone()
                }
            }
        };

        println!("\n🔄 Regenerating...");
        let current = reload_blog(&blog);
        match generate::run(&current, &generate_options).await {
            Ok(()) => {
                println!("✅ Regenerated successfully!");
                let _ = reload_tx.send(());
            }
            Err(e) => {
                println!("❌ Generation failed: {:#}", e);
            }
        }
    }

    drop(debouncer);
    Ok(())
}

/// Re-read the configuration, keeping the previous one if it is broken
fn reload_blog(previous: &Blog) -> Blog {
    match Blog::new(&previous.base_dir) {
        Ok(blog) => blog,
        Err(e) => {
            tracing::warn!("Keeping previous configuration: {:#}", e);
            previous.clone()
        }
    }
}

/// Filter out irrelevant events (editor backups, VCS files)
fn is_relevant(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    !path_str.contains(".git")
        && !path_str.contains(".DS_Store")
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

/// Map a request path onto a file in the public directory
fn resolve_path(public_dir: &Path, base_path: &str, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let path = decoded.strip_prefix(base_path).unwrap_or(&*decoded);
    let relative = Path::new(path.trim_start_matches('/'));

    // No escaping the public directory
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let candidate = public_dir.join(relative);
    if candidate.is_dir() {
        return INDEX_FILES
            .iter()
            .map(|index| candidate.join(index))
            .find(|p| p.is_file());
    }
    if candidate.is_file() {
        return Some(candidate);
    }

    let with_html = public_dir.join(format!("{}.html", relative.display()));
    with_html.is_file().then_some(with_html)
}

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    mut request: Request<Body>,
) -> Response {
    let resolved = resolve_path(&state.public_dir, &state.base_path, request.uri().path());

    let Some(file_path) = resolved else {
        return not_found(&state).await;
    };

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(render_html(&state, content)).into_response(),
            Err(_) => not_found(&state).await,
        }
    } else {
        // Point the request at the resolved file and let ServeDir stream it
        let Some(uri) = file_uri(&state.public_dir, &file_path).and_then(|u| u.parse().ok())
        else {
            return not_found(&state).await;
        };
        *request.uri_mut() = uri;

        let mut service = ServeDir::new(&state.public_dir);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Encoded request path of a file under the public directory
fn file_uri(public_dir: &Path, file_path: &Path) -> Option<String> {
    let relative = file_path.strip_prefix(public_dir).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| encode_uri_component(&c.as_os_str().to_string_lossy()))
        .collect();
    Some(format!("/{}", segments.join("/")))
}

/// The generated 404 page, or a plain message before the first build
async fn not_found(state: &ServerState) -> Response {
    match tokio::fs::read_to_string(state.public_dir.join("404.html")).await {
        Ok(content) => (StatusCode::NOT_FOUND, Html(render_html(state, content))).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn render_html(state: &ServerState, content: String) -> String {
    if state.live_reload {
        inject_live_reload(&content)
    } else {
        content
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replace("</body>", LIVE_RELOAD_SCRIPT)
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
    use std::fs;
    use tempfile::TempDir;

    fn public() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("hello")).unwrap();
        fs::create_dir_all(root.join("feed")).unwrap();
        fs::create_dir_all(root.join("tag/C#")).unwrap();
        fs::write(root.join("index.html"), "home").unwrap();
        fs::write(root.join("hello/index.html"), "hello").unwrap();
        fs::write(root.join("feed/index.xml"), "<feed/>").unwrap();
        fs::write(root.join("tag/C#/index.html"), "tag").unwrap();
        fs::write(root.join("404.html"), "missing").unwrap();
        temp
    }

    #[test]
    fn test_resolve_path() {
        let temp = public();
        let root = temp.path();

        assert_eq!(resolve_path(root, "", "/"), Some(root.join("index.html")));
        assert_eq!(
            resolve_path(root, "", "/hello"),
            Some(root.join("hello/index.html"))
        );
        assert_eq!(
            resolve_path(root, "", "/feed"),
            Some(root.join("feed/index.xml"))
        );
        assert_eq!(
            resolve_path(root, "", "/tag/C%23"),
            Some(root.join("tag/C#/index.html"))
        );
        assert_eq!(resolve_path(root, "", "/404"), Some(root.join("404.html")));
        assert_eq!(resolve_path(root, "", "/nope"), None);
        assert_eq!(resolve_path(root, "", "/../etc/passwd"), None);
    }

    #[test]
    fn test_resolve_path_under_base_path() {
        let temp = public();
        let root = temp.path();
        assert_eq!(
            resolve_path(root, "/blog", "/blog/hello/"),
            Some(root.join("hello/index.html"))
        );
        assert_eq!(
            resolve_path(root, "/blog", "/blog/"),
            Some(root.join("index.html"))
        );
    }

    #[test]
    fn test_file_uri() {
        let root = Path::new("/srv/public");
        assert_eq!(
            file_uri(root, Path::new("/srv/public/feed/index.xml")).as_deref(),
            Some("/feed/index.xml")
        );
        assert_eq!(
            file_uri(root, Path::new("/srv/public/tag/C#/a b.png")).as_deref(),
            Some("/tag/C%23/a%20b.png")
        );
        assert_eq!(file_uri(root, Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn test_inject_live_reload() {
        let html = inject_live_reload("<html><body>hi</body></html>");
        assert!(html.contains("__livereload"));
        assert!(html.ends_with("</html>"));
        assert!(inject_live_reload("bare").starts_with("bare"));
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(Path::new("/site/blog.config.yml")));
        assert!(!is_relevant(Path::new("/site/.git/index")));
        assert!(!is_relevant(Path::new("/site/blog.config.yml~")));
    }
}
