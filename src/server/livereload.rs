// src/server/livereload.rs

//! Live-reload channel between the build pipelines and connected browsers.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::broadcast;

/// Route serving the SSE stream.
pub const EVENTS_PATH: &str = "/__livereload";

/// Route serving [`CLIENT_JS`].
pub const CLIENT_PATH: &str = "/__livereload.js";

const CHANNEL_CAPACITY: usize = 64;

static BODY_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("body close pattern is valid"));

/// Something connected browsers should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Reload the whole page.
    Reload,
    /// A build-relative file changed. Stylesheets are swapped in place,
    /// anything else reloads.
    Stream { path: String },
}

impl ReloadEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            ReloadEvent::Reload => "reload",
            ReloadEvent::Stream { .. } => "stream",
        }
    }

    /// SSE data payload.
    pub fn data(&self) -> &str {
        match self {
            ReloadEvent::Reload => "",
            ReloadEvent::Stream { path } => path,
        }
    }
}

/// Cloneable sender side of the channel. Publishing without subscribers is a
/// no-op, so pipelines can push events whether or not a server runs.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadEvent>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Ask every client to reload. Returns the number of clients reached.
    pub fn reload(&self) -> usize {
        self.publish(ReloadEvent::Reload)
    }

    /// Announce a rebuilt file, relative to the build root.
    pub fn stream(&self, path: impl Into<String>) -> usize {
        self.publish(ReloadEvent::Stream { path: path.into() })
    }

    fn publish(&self, event: ReloadEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

/// Browser side of the channel.
pub const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__livereload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("stream", function (e) {
    var path = e.data;
    if (!/\.css$/.test(path)) {
      window.location.reload();
      return;
    }
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var swapped = false;
    for (var i = 0; i < links.length; i++) {
      var href = links[i].getAttribute("href") || "";
      if (href.split("?")[0].replace(/^\//, "") === path) {
        links[i].setAttribute("href", href.split("?")[0] + "?v=" + Date.now());
        swapped = true;
      }
    }
    if (!swapped) {
      window.location.reload();
    }
  });
})();
"#;

const CLIENT_TAG: &str = "<script src=\"/__livereload.js\"></script>";

/// Insert the client script before the last `</body>`, or append it when the
/// document has none.
pub fn inject_client(html: &str) -> String {
    match BODY_CLOSE_RE.find_iter(html).last() {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + CLIENT_TAG.len());
            out.push_str(&html[..m.start()]);
            out.push_str(CLIENT_TAG);
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{html}{CLIENT_TAG}"),
    }
}
