use std::fmt::Debug;
use std::time::{Duration, Instant};

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::Client;
use tokio::sync::Mutex;

use crate::error::UpstreamError;

use super::FetchResult;

/// Yahoo rotates crumbs roughly daily; refresh well before that.
const CRUMB_LIFETIME: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Clone)]
pub struct Crumb {
    pub cookie: String,
    pub value: String,
    obtained_at: Instant,
}

impl Debug for Crumb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crumb")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Cookie + crumb pair shared by every request issued through one fetcher.
pub struct CrumbCache {
    cookie_url: String,
    crumb_url: String,
    state: Mutex<Option<Crumb>>,
}

impl CrumbCache {
    pub fn new(cookie_url: impl Into<String>, crumb_url: impl Into<String>) -> Self {
        Self {
            cookie_url: cookie_url.into(),
            crumb_url: crumb_url.into(),
            state: Mutex::new(None),
        }
    }

    /// Return the cached crumb, fetching a fresh one when absent or stale.
    pub async fn get(&self, client: &Client) -> FetchResult<Crumb> {
        let mut guard = self.state.lock().await;

        if let Some(crumb) = guard.as_ref() {
            if crumb.obtained_at.elapsed() < CRUMB_LIFETIME {
                return Ok(crumb.clone());
            }
        }

        let fresh = self.fetch(client).await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached crumb after the upstream rejected it.
    pub async fn invalidate(&self) {
        self.state.lock().await.take();
    }

    async fn fetch(&self, client: &Client) -> FetchResult<Crumb> {
        // fc.yahoo.com answers 404 but still sets the session cookie
        let response = client.get(&self.cookie_url).send().await?;

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|header| header.to_str().ok())
            .and_then(|raw| raw.split(';').next())
            .map(str::to_string)
            .ok_or_else(|| {
                UpstreamError::Malformed("cookie endpoint did not set a session cookie".to_string())
            })?;

        let response = client
            .get(&self.crumb_url)
            .header(COOKIE, &cookie)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                symbol: "crumb".to_string(),
            });
        }

        let value = response.text().await?.trim().to_string();
        if value.is_empty() || value.contains('<') {
            return Err(UpstreamError::Malformed(
                "crumb endpoint returned an unusable crumb".to_string(),
            ));
        }

        log::debug!("Obtained fresh upstream crumb");
        Ok(Crumb {
            cookie,
            value,
            obtained_at: Instant::now(),
        })
    }
}
