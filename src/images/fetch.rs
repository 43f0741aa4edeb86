use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::Client;
use reqwest::header;
use tracing::warn;

use crate::error::ExtractError;
use crate::record::ImageAsset;

const DEFAULT_MAX_BYTES: usize = 10_000_000;
const DEFAULT_TIMEOUT_SECS: u64 = 20;

// The image CDN rejects obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT: &str = "image/avif,image/webp,image/*,*/*";

/// Byte and time budgets for one download attempt.
#[derive(Debug, Clone)]
pub struct FetchCaps {
    pub max_bytes: usize,
    pub timeout: Duration,
}

impl Default for FetchCaps {
    fn default() -> Self {
        FetchCaps {
            max_bytes: DEFAULT_MAX_BYTES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum FetchFailure {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reported length {0} exceeds the byte cap")]
    DeclaredOversize(u64),
    #[error("body exceeds the byte cap")]
    Oversize,
}

/// Download one image under the caps. Never errors outward: any transport
/// failure, timeout or oversize condition yields None with the reason
/// logged, and the slot stays empty.
pub async fn fetch_image(client: &Client, url: &str, caps: &FetchCaps) -> Option<ImageAsset> {
    match try_fetch(client, url, caps).await {
        Ok(asset) => Some(asset),
        Err(failure) => {
            let err = ExtractError::ImageFetch { message: failure.to_string() };
            warn!(reason = err.reason(), url, "image skipped: {failure}");
            None
        }
    }
}

async fn try_fetch(
    client: &Client,
    url: &str,
    caps: &FetchCaps,
) -> Result<ImageAsset, FetchFailure> {
    let resp = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, ACCEPT)
        .timeout(caps.timeout)
        .send()
        .await?
        .error_for_status()?;

    // abort before touching the body when the server already admits the
    // payload is over budget
    if let Some(len) = resp.content_length() {
        if len > caps.max_bytes as u64 {
            return Err(FetchFailure::DeclaredOversize(len));
        }
    }

    let mime = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = read_capped(resp, caps.max_bytes).await?;
    Ok(ImageAsset { url: url.to_string(), bytes, mime })
}

// Stream the body up to the cap; a true length beyond it discards the whole
// asset, since a truncated image must never be persisted.
async fn read_capped(mut resp: reqwest::Response, cap: usize) -> Result<Bytes, FetchFailure> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = resp.chunk().await? {
        if buf.len() + chunk.len() > cap {
            return Err(FetchFailure::Oversize);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Minimal HTTP/1.1 server for one connection: sends the given head and
    // body, counts body bytes actually written out.
    async fn serve_once(
        head: String,
        body: Vec<u8>,
        body_bytes_sent: Arc<AtomicUsize>,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = [0u8; 4096];
            let _ = sock.read(&mut req).await;
            sock.write_all(head.as_bytes()).await.unwrap();
            if !body.is_empty() && sock.write_all(&body).await.is_ok() {
                body_bytes_sent.store(body.len(), Ordering::SeqCst);
            }
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/img.jpg")
    }

    #[tokio::test]
    async fn small_image_is_fetched_with_mime() {
        let body = vec![0xFFu8; 512];
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let url = serve_once(head, body, Arc::new(AtomicUsize::new(0))).await;
        let client = Client::new();
        let asset = fetch_image(&client, &url, &FetchCaps::default()).await.unwrap();
        assert_eq!(asset.bytes.len(), 512);
        assert_eq!(asset.mime.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn declared_oversize_aborts_before_reading_the_body() {
        // the server never writes a body; if the client tried to read one it
        // would sit in the read until its timeout instead of returning fast
        let sent = Arc::new(AtomicUsize::new(0));
        let head = "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 99999999\r\n\r\n"
            .to_string();
        let url = serve_once(head, Vec::new(), sent.clone()).await;
        let client = Client::new();
        let caps = FetchCaps { max_bytes: 1_000_000, timeout: Duration::from_secs(30) };
        let fetched = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_image(&client, &url, &caps),
        )
        .await
        .expect("must abort on the declared length, not wait for a body");
        assert!(fetched.is_none());
        assert_eq!(sent.load(Ordering::SeqCst), 0, "zero body bytes were ever sent");
    }

    #[tokio::test]
    async fn true_oversize_discards_the_whole_asset() {
        // no Content-Length up front; the body itself overruns the cap
        let body = vec![0u8; 4096];
        let head = "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nConnection: close\r\n\r\n"
            .to_string();
        let url = serve_once(head, body, Arc::new(AtomicUsize::new(0))).await;
        let client = Client::new();
        let caps = FetchCaps { max_bytes: 1024, timeout: Duration::from_secs(5) };
        assert!(fetch_image(&client, &url, &caps).await.is_none());
    }

    #[tokio::test]
    async fn http_error_status_yields_absent() {
        let head = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            .to_string();
        let url = serve_once(head, Vec::new(), Arc::new(AtomicUsize::new(0))).await;
        let client = Client::new();
        assert!(fetch_image(&client, &url, &FetchCaps::default()).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_yields_absent() {
        let client = Client::new();
        let caps = FetchCaps { max_bytes: 1024, timeout: Duration::from_millis(500) };
        // nothing listens on this port
        assert!(fetch_image(&client, "http://127.0.0.1:9/img.jpg", &caps).await.is_none());
    }
}
