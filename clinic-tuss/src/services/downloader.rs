//! Remote archive download
//!
//! Single attempt, no retry. The body is streamed to disk chunk by chunk and
//! a partially written file is removed on any failure.

use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::ImportError;

const USER_AGENT: &str = concat!("clinic-tuss/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) file fetcher
pub struct Downloader {
    http_client: reqwest::Client,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Result<Self, ImportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { http_client })
    }

    /// GET `url` and write the body to `dest`
    ///
    /// Returns `dest` on success. Non-200 responses fail with
    /// `ImportError::Download` before anything is written.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, ImportError> {
        tracing::info!(url = %url, "Downloading archive");

        let mut response = self.http_client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(url = %url, status = status.as_u16(), "Download rejected");
            return Err(ImportError::Download {
                status: status.as_u16(),
            });
        }

        match write_body(&mut response, dest).await {
            Ok(bytes) => {
                tracing::info!(
                    path = %dest.display(),
                    bytes,
                    "Download complete"
                );
                Ok(dest.to_path_buf())
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    tracing::debug!(
                        path = %dest.display(),
                        error = %remove_err,
                        "No partial download to remove"
                    );
                }
                Err(e)
            }
        }
    }
}

async fn write_body(response: &mut reqwest::Response, dest: &Path) -> Result<u64, ImportError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn downloader() -> Downloader {
        Downloader::new(Duration::from_secs(10)).unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_body_to_disk() {
        let base = serve(Router::new().route("/TUSS.zip", get(|| async { "zip-bytes" }))).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("TUSS.zip");

        let path = downloader()
            .download(&format!("{}/TUSS.zip", base), &dest)
            .await
            .unwrap();

        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"zip-bytes");
    }

    #[tokio::test]
    async fn test_download_non_200_is_rejected_without_file() {
        let base = serve(Router::new().route(
            "/TUSS.zip",
            get(|| async { (AxumStatus::NOT_FOUND, "gone") }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("TUSS.zip");

        let err = downloader()
            .download(&format!("{}/TUSS.zip", base), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Download { status: 404 }));
        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_other_success_codes_are_rejected() {
        let base = serve(Router::new().route(
            "/TUSS.zip",
            get(|| async { (AxumStatus::NO_CONTENT, "") }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();

        let err = downloader()
            .download(&format!("{}/TUSS.zip", base), &dir.path().join("TUSS.zip"))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Download { status: 204 }));
    }

    #[tokio::test]
    async fn test_truncated_body_removes_partial_file() {
        use tokio::io::AsyncReadExt;

        // Promises 1000 bytes, sends 7, then closes the connection
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("TUSS.zip");

        let err = downloader()
            .download(&format!("http://{}/TUSS.zip", addr), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Transport(_)), "got {:?}", err);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_connection_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("TUSS.zip");

        let err = downloader()
            .download(&format!("http://{}/TUSS.zip", addr), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Transport(_)));
        assert!(!dest.exists());
    }
}
