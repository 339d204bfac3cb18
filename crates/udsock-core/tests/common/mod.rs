#![allow(dead_code)]

use rand::Rng;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tempfile::TempDir;
use udsock_core::{Domain, Endpoint, SocketType};

/// A socket path inside a fresh temporary directory. Keep the `TempDir`
/// alive for as long as the path is in use.
pub fn socket_path(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::Builder::new()
        .prefix("udsock-test-")
        .tempdir()
        .expect("create temp dir");
    let path = dir.path().join(format!("{name}.sock"));
    (dir, path)
}

/// A blocking stream endpoint bound to `path` and listening.
pub fn listener(path: &Path) -> Endpoint {
    let mut listener = Endpoint::new(Domain::Unix, SocketType::Stream).expect("create listener");
    listener.bind(path).expect("bind listener");
    listener.listen(10).expect("listen");
    listener
}

/// Connect a new stream endpoint to `path` on another thread and run `body`
/// with it.
pub fn spawn_client<F, T>(path: &Path, body: F) -> JoinHandle<udsock_core::Result<T>>
where
    F: FnOnce(&Endpoint) -> udsock_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let path = path.to_path_buf();
    std::thread::spawn(move || {
        let mut client = Endpoint::new(Domain::Unix, SocketType::Stream)?;
        client.connect(&path)?;
        body(&client)
    })
}

pub fn random_payload(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill(&mut data[..]);
    data
}
