//! HTTP utilities for fetching release listings, installers and add-on archives.
//!
//! Transport errors and 5xx responses are retried according to the [`RetryPolicy`];
//! 4xx responses and empty bodies fail immediately. Downloads stream into a `.partial` file
//! that is renamed into place only after the full, non-empty body has been written.

use crate::pipeline::{
    Error, Result,
    clock::Clock,
    error::ErrorExt,
    settings::RetryPolicy,
    utils::fs::remove_file,
};
use std::{path::Path, time::Duration};
use tokio::io::AsyncWriteExt;

/// Builds the shared HTTP client.
pub fn client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .timeout(timeout)
        .build()?)
}

/// Outcome of a single attempt.
enum Attempt<T> {
    Done(T),
    Retry(Error),
}

async fn with_retry<C, T, F, Fut>(clock: &C, retry: &RetryPolicy, url: &str, mut op: F) -> Result<T>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Attempt<T>>>,
{
    let mut attempt = 1;
    loop {
        match op().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Retry(err) if attempt < retry.attempts => {
                let delay = retry.backoff(attempt);
                log::warn!(
                    "Attempt {}/{} for {} failed: {}; retrying in {}s",
                    attempt,
                    retry.attempts,
                    url,
                    err,
                    delay.as_secs()
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
            Attempt::Retry(err) => return Err(err),
        }
    }
}

async fn send(client: &reqwest::Client, url: &str) -> Result<Attempt<reqwest::Response>> {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return Ok(Attempt::Retry(Error::Download {
                url: url.to_string(),
                reason: e.to_string(),
            }));
        }
    };

    let status = response.status();
    if status.is_success() {
        return Ok(Attempt::Done(response));
    }

    let err = Error::Download {
        url: url.to_string(),
        reason: format!("HTTP {}", status),
    };
    if status.is_server_error() {
        Ok(Attempt::Retry(err))
    } else {
        Err(err)
    }
}

/// Fetches a page as text.
pub async fn fetch_text<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    retry: &RetryPolicy,
    url: &str,
) -> Result<String> {
    log::info!("Fetching {}", url);

    with_retry(clock, retry, url, move || async move {
        let response = match send(client, url).await? {
            Attempt::Done(response) => response,
            Attempt::Retry(err) => return Ok(Attempt::Retry(err)),
        };
        match response.text().await {
            Ok(text) => Ok(Attempt::Done(text)),
            Err(e) => Ok(Attempt::Retry(Error::Download {
                url: url.to_string(),
                reason: format!("failed to read response: {}", e),
            })),
        }
    })
    .await
}

/// Downloads `url` into `dest`, returning the number of bytes written.
///
/// On any failure `dest` does not exist afterwards.
pub async fn download_to_file<C: Clock>(
    client: &reqwest::Client,
    clock: &C,
    retry: &RetryPolicy,
    url: &str,
    dest: &Path,
) -> Result<u64> {
    log::info!("Downloading {}", url);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .fs_context("creating download directory", parent)?;
    }
    remove_file(dest).await?;

    let partial = dest.with_extension("partial");
    let partial_path: &Path = &partial;
    let result = with_retry(clock, retry, url, move || {
        stream_once(client, url, partial_path)
    })
    .await;

    let written = match result {
        Ok(written) => written,
        Err(e) => {
            remove_file(&partial).await?;
            return Err(e);
        }
    };

    if written == 0 {
        remove_file(&partial).await?;
        return Err(Error::Download {
            url: url.to_string(),
            reason: "response body is empty".to_string(),
        });
    }

    tokio::fs::rename(&partial, dest)
        .await
        .fs_context("moving download into place", dest)?;

    log::info!("Downloaded {} bytes to {}", written, dest.display());
    Ok(written)
}

async fn stream_once(client: &reqwest::Client, url: &str, partial: &Path) -> Result<Attempt<u64>> {
    let mut response = match send(client, url).await? {
        Attempt::Done(response) => response,
        Attempt::Retry(err) => return Ok(Attempt::Retry(err)),
    };

    let mut file = tokio::fs::File::create(partial)
        .await
        .fs_context("creating download file", partial)?;
    let mut written = 0u64;

    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                file.write_all(&chunk)
                    .await
                    .fs_context("writing download file", partial)?;
                written += chunk.len() as u64;
            }
            Ok(None) => break,
            Err(e) => {
                return Ok(Attempt::Retry(Error::Download {
                    url: url.to_string(),
                    reason: format!("connection dropped after {} bytes: {}", written, e),
                }));
            }
        }
    }

    file.flush()
        .await
        .fs_context("flushing download file", partial)?;
    Ok(Attempt::Done(written))
}
