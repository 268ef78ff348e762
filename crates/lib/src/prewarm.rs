//! Best-effort pre-warming of deployed entry-points.
//!
//! After a successful deploy, one request per needed entry-point triggers
//! cold-start initialization ahead of real traffic. Requests fan out
//! concurrently, each bounded by its own timeout that cancels the in-flight
//! request; a hung or failed request is logged and costs at most one cold
//! start, so nothing here can fail the lifecycle. No retries.

use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::functions::types::NeededFunctionSet;

/// Send one pre-warm request per needed entry-point.
///
/// Returns the number of requests that completed. Failures and timeouts are
/// logged, never raised, and never block the other requests.
pub async fn prewarm(needed: &NeededFunctionSet, base_url: &str, timeout: Duration) -> usize {
  if needed.is_empty() {
    debug!("no entry-points to pre-warm");
    return 0;
  }

  let client = match reqwest::Client::builder().build() {
    Ok(client) => client,
    Err(e) => {
      warn!(error = %e, "failed to build pre-warm client, skipping pre-warm");
      return 0;
    }
  };

  let base = base_url.trim_end_matches('/').to_string();
  let mut join_set = JoinSet::new();

  for kind in needed.iter().copied() {
    let url = format!("{}{}", base, kind.route());
    let client = client.clone();

    join_set.spawn(async move {
      info!(url = %url, "sending pre-warm request");

      match client.get(&url).timeout(timeout).send().await {
        Ok(response) => {
          debug!(url = %url, status = %response.status(), "pre-warm request completed");
          true
        }
        Err(e) if e.is_timeout() => {
          warn!(url = %url, "pre-warm request timed out and was cancelled");
          false
        }
        Err(e) => {
          warn!(url = %url, error = %e, "pre-warm request failed");
          false
        }
      }
    });
  }

  let mut completed = 0;
  while let Some(result) = join_set.join_next().await {
    if matches!(result, Ok(true)) {
      completed += 1;
    }
  }

  info!(completed, attempted = needed.len(), "pre-warm finished");
  completed
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::functions::types::FunctionKind;
  use std::time::Instant;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};

  fn kinds(list: &[FunctionKind]) -> NeededFunctionSet {
    list.iter().copied().collect()
  }

  #[tokio::test]
  async fn empty_set_sends_nothing() {
    let completed = prewarm(&NeededFunctionSet::new(), "http://localhost:1", Duration::from_secs(1)).await;
    assert_eq!(completed, 0);
  }

  #[tokio::test]
  async fn hits_each_needed_entry_point() {
    let mut server = mockito::Server::new_async().await;
    let api = server.mock("GET", "/.functions/__api").with_status(200).create_async().await;
    let dsg = server.mock("GET", "/.functions/__dsg").with_status(200).create_async().await;

    let completed = prewarm(
      &kinds(&[FunctionKind::Api, FunctionKind::Dsg]),
      &server.url(),
      Duration::from_secs(5),
    )
    .await;

    assert_eq!(completed, 2);
    api.assert_async().await;
    dsg.assert_async().await;
  }

  #[tokio::test]
  async fn trailing_slash_in_base_url_is_tolerated() {
    let mut server = mockito::Server::new_async().await;
    let ssr = server.mock("GET", "/.functions/__ssr").with_status(200).create_async().await;

    let completed = prewarm(
      &kinds(&[FunctionKind::Ssr]),
      &format!("{}/", server.url()),
      Duration::from_secs(5),
    )
    .await;

    assert_eq!(completed, 1);
    ssr.assert_async().await;
  }

  #[tokio::test]
  async fn failed_request_is_swallowed() {
    // Nothing listens on this port; the request errors immediately.
    let completed = prewarm(&kinds(&[FunctionKind::Api]), "http://127.0.0.1:1", Duration::from_secs(1)).await;
    assert_eq!(completed, 0);
  }

  #[tokio::test]
  async fn hanging_entry_point_is_cancelled_without_blocking_others() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
      loop {
        let (mut socket, _) = match listener.accept().await {
          Ok(conn) => conn,
          Err(_) => return,
        };
        tokio::spawn(async move {
          let mut buf = vec![0u8; 2048];
          let n = socket.read(&mut buf).await.unwrap_or(0);
          let request = String::from_utf8_lossy(&buf[..n]).to_string();

          if request.contains("__ssr") {
            // Hold the connection open well past the client timeout.
            tokio::time::sleep(Duration::from_secs(60)).await;
          } else {
            let _ = socket
              .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
              .await;
          }
        });
      }
    });

    let started = Instant::now();
    let completed = prewarm(
      &kinds(&[FunctionKind::Api, FunctionKind::Ssr, FunctionKind::Dsg]),
      &format!("http://{}", addr),
      Duration::from_millis(500),
    )
    .await;

    // The two responsive entry-points complete; the hanging one is cancelled
    // by its own timeout without delaying the rest.
    assert_eq!(completed, 2);
    assert!(started.elapsed() < Duration::from_secs(5));
  }
}
