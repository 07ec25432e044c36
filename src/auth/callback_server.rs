//! Loopback redirect listener
//!
//! Accepts the single browser redirect that carries the authorization code.
//! The listener binds an ephemeral port so the redirect URI is only known
//! after binding.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use crate::Result;
use crate::error::Error;

const SUCCESS_HTML: &str = "<!DOCTYPE html><html><head><meta charset=\"UTF-8\">\
<title>Courier</title></head><body style=\"font-family: sans-serif; text-align: center\">\
<h1>Gmail access granted</h1><p>You can close this window and return to your terminal.</p>\
</body></html>";

const ERROR_HTML: &str = "<!DOCTYPE html><html><head><meta charset=\"UTF-8\">\
<title>Courier</title></head><body style=\"font-family: sans-serif; text-align: center\">\
<h1>Authorization failed</h1><p>Check your terminal for details.</p>\
</body></html>";

/// Authorization code received on the redirect
#[derive(Debug, Clone)]
pub struct AuthorizationResult {
    pub code: String,
}

/// A bound loopback listener waiting for one redirect
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    /// Bind `127.0.0.1` on an OS-assigned port
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await
            .map_err(|e| Error::Auth(format!("Failed to start callback listener: {}", e)))?;
        let port = listener.local_addr()
            .map_err(|e| Error::Auth(format!("Failed to read callback address: {}", e)))?
            .port();

        tracing::info!("Callback listener on http://127.0.0.1:{}", port);
        Ok(Self { listener, port })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Block until the browser redirect arrives, then answer it.
    ///
    /// Connections that close or send no request line (browser preconnects)
    /// are skipped.
    pub async fn wait(self, expected_state: &str) -> Result<AuthorizationResult> {
        loop {
            let (mut socket, peer) = self.listener.accept().await
                .map_err(|e| Error::Auth(format!("Failed to accept redirect: {}", e)))?;
            tracing::debug!("Redirect connection from {}", peer);

            let mut buffer = vec![0u8; 8192];
            let n = match socket.read(&mut buffer).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!("Dropping connection from {}: {}", peer, e);
                    continue;
                }
            };
            let request = String::from_utf8_lossy(&buffer[..n]);
            if request_target(&request).is_none() {
                tracing::debug!("Ignoring empty connection from {}", peer);
                continue;
            }

            let result = parse_callback_request(&request, expected_state);

            let (status, body) = match &result {
                Ok(_) => ("200 OK", SUCCESS_HTML),
                Err(_) => ("400 Bad Request", ERROR_HTML),
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;

            return result;
        }
    }
}

/// Target of the request line, `/?code=..` in `GET /?code=.. HTTP/1.1`
fn request_target(request: &str) -> Option<&str> {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
}

/// Extract `code` from `GET /?code=..&state=.. HTTP/1.1`
fn parse_callback_request(request: &str, expected_state: &str) -> Result<AuthorizationResult> {
    let target = request_target(request)
        .ok_or_else(|| Error::Auth("Malformed redirect request".to_string()))?;

    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| Error::Auth(format!("Failed to parse redirect URL: {}", e)))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(err) = param("error") {
        let description = param("error_description").unwrap_or_else(|| "no description".to_string());
        return Err(Error::Auth(format!("Consent denied: {} - {}", err, description)));
    }

    if param("state").as_deref() != Some(expected_state) {
        return Err(Error::Auth("State mismatch on redirect".to_string()));
    }

    let code = param("code")
        .ok_or_else(|| Error::Auth("Missing authorization code".to_string()))?;

    Ok(AuthorizationResult { code })
}
