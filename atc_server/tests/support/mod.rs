// Shared primitives for one-time server bootstrapping across integration tests.
#![allow(dead_code)]
use atc_server::ServerConfig;
use atc_server::domain::{Bound, Bounds};
use atc_server::use_cases::{EngineSettings, SimulationParams};
use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

/// Population target used by the test server; the live population is one more.
pub const MAX_TRACKS: usize = 10;
/// Body of the viewer index page served from the test public directory.
pub const INDEX_HTML: &str = "<html><body>paper atc</body></html>";

// Global address ("host:port") used by all tests after the server publishes its bound address.
static SERVER_ADDR: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

pub fn http_url(path: &str) -> String {
    format!("http://{}{}", ensure_server(), path)
}

pub fn ws_url() -> String {
    format!("ws://{}/a", ensure_server())
}

// Ensure the test server is running and return its address.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published = Arc::new(OnceLock::<String>::new());
        let published_thread = Arc::clone(&published);
        let config = ServerConfig {
            public_dir: public_dir(),
            engine: EngineSettings {
                tick_interval: Duration::from_millis(50),
                simulation: SimulationParams {
                    max_tracks: MAX_TRACKS,
                    speed_limit: 3,
                    bounds: Bounds {
                        latitude: Bound::new(0, 50),
                        longitude: Bound::new(0, 50),
                        altitude: Bound::new(3, 20),
                    },
                },
            },
        };

        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_thread.set(addr.to_string());
                atc_server::run(listener, config).await.expect("server failed");
            });
        });

        wait_for_readiness(published);
    });

    SERVER_ADDR
        .get()
        .expect("server address should be initialized")
        .as_str()
}

// Writes a throwaway public directory containing only `index.html`.
fn public_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("atc-server-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create public dir");
    std::fs::write(dir.join("index.html"), INDEX_HTML).expect("write index.html");
    dir
}

// Wait for address publication and then for the server socket to accept TCP connections.
fn wait_for_readiness(published: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published.get() {
            break addr.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_ADDR.set(addr.clone());

    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
