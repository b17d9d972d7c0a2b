use std::sync::Arc;
use std::time::Instant;

use common::RawRecord;
use futures::stream::{self, Stream};
use http::{header, HeaderValue, Request};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::backoff::{Attempts, RetryPolicy};
use crate::error::FetchError;
use crate::exec::{HttpExec, ReqwestExecutor};
use crate::metrics;
use crate::model::{
    decode_record, decode_records, error_message, is_rate_limited, parse_rate_limit,
    parse_retry_after, Page,
};

const DEFAULT_API_BASE: &str = "https://api.github.com/";
const API_VERSION: &str = "2022-11-28";

#[derive(Clone)]
pub struct PageFetcherBuilder {
    user_agent: String,
    api_base: String,
    token: Option<String>,
    page_size: u32,
    policy: RetryPolicy,
    http_exec: Option<Arc<dyn HttpExec>>,
}

impl PageFetcherBuilder {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            page_size: 100,
            policy: RetryPolicy::default(),
            http_exec: None,
        }
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn http_exec(mut self, exec: Arc<dyn HttpExec>) -> Self {
        self.http_exec = Some(exec);
        self
    }

    pub fn build(self) -> anyhow::Result<PageFetcher> {
        let exec = match self.http_exec {
            Some(exec) => exec,
            None => Arc::new(ReqwestExecutor::new(&self.user_agent)?),
        };
        // `Url::join` drops the last segment unless the base ends with '/'.
        let base = if self.api_base.ends_with('/') {
            self.api_base
        } else {
            format!("{}/", self.api_base)
        };
        Ok(PageFetcher {
            exec,
            base: Url::parse(&base)?,
            user_agent: self.user_agent,
            token: self.token,
            page_size: self.page_size,
            policy: self.policy,
        })
    }
}

/// Walks paginated collection endpoints one request at a time.
pub struct PageFetcher {
    exec: Arc<dyn HttpExec>,
    base: Url,
    user_agent: String,
    token: Option<String>,
    page_size: u32,
    policy: RetryPolicy,
}

struct Cursor {
    endpoint: String,
    params: Vec<(String, String)>,
    page: u32,
}

impl PageFetcher {
    pub fn builder(user_agent: impl Into<String>) -> PageFetcherBuilder {
        PageFetcherBuilder::new(user_agent)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Lazily yields every non-empty page of `endpoint`, starting at page 1.
    ///
    /// The stream ends cleanly at the first empty page. Any [`FetchError`] is
    /// yielded once and ends the stream; pages already yielded stay valid.
    pub fn fetch_all(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> impl Stream<Item = Result<Page, FetchError>> + Send + '_ {
        let cursor = Cursor {
            endpoint: endpoint.to_string(),
            params,
            page: 1,
        };
        stream::try_unfold(Some(cursor), move |state| async move {
            let Some(cursor) = state else {
                return Ok(None);
            };
            if cursor.page > 1 {
                self.throttle().await;
            }

            let records = self
                .fetch_page(&cursor.endpoint, &cursor.params, cursor.page)
                .await?;
            if records.is_empty() {
                debug!(endpoint = %cursor.endpoint, page = cursor.page, "reached empty page");
                return Ok(None);
            }

            metrics::PAGES_TOTAL.inc();
            let page = Page {
                number: cursor.page,
                records,
            };
            let next = Cursor {
                page: cursor.page + 1,
                ..cursor
            };
            Ok(Some((page, Some(next))))
        })
    }

    #[instrument(skip(self, params), fields(per_page = self.page_size))]
    pub async fn fetch_page(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        page: u32,
    ) -> Result<Vec<RawRecord>, FetchError> {
        let mut url = self.base.join(endpoint.trim_start_matches('/'))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("per_page", &self.page_size.to_string());
        }

        let body = self.get_with_retry(&url).await?;
        decode_records(&body).map_err(|reason| FetchError::InvalidPayload {
            target: url.to_string(),
            reason,
        })
    }

    /// Single-object GET with the same retry policy as list pages.
    #[instrument(skip(self))]
    pub async fn fetch_one(&self, endpoint: &str) -> Result<RawRecord, FetchError> {
        let url = self.base.join(endpoint.trim_start_matches('/'))?;
        let body = self.get_with_retry(&url).await?;
        let record = decode_record(&body).map_err(|reason| FetchError::InvalidPayload {
            target: url.to_string(),
            reason,
        })?;
        self.throttle().await;
        Ok(record)
    }

    /// The mandatory pause between requests. A no-op when the policy has no delay.
    pub async fn throttle(&self) {
        let delay = self.policy.request_delay;
        if delay.is_zero() {
            return;
        }
        metrics::SLEEP_SECONDS
            .with_label_values(&["throttle"])
            .inc_by(delay.as_secs_f64());
        sleep(delay).await;
    }

    async fn get_with_retry(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let target = url.to_string();
        let mut attempts = Attempts::default();

        loop {
            let request = self.build_request(url)?;
            let start = Instant::now();
            let result = self.exec.execute(request).await;
            metrics::LATENCY.observe(start.elapsed().as_secs_f64());

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    metrics::REQUESTS_TOTAL
                        .with_label_values(&["transient"])
                        .inc();
                    let Some(wait) = attempts.transient(&self.policy) else {
                        return Err(FetchError::Transient {
                            target,
                            attempts: attempts.total(),
                            source: err,
                        });
                    };
                    warn!(
                        url = %target,
                        attempt = attempts.transient,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    metrics::RETRIES_TOTAL.with_label_values(&["transient"]).inc();
                    metrics::SLEEP_SECONDS
                        .with_label_values(&["transient"])
                        .inc_by(wait.as_secs_f64());
                    sleep(wait).await;
                    continue;
                }
            };

            let status = response.status();
            let (parts, body) = response.into_parts();

            if status.is_success() {
                metrics::REQUESTS_TOTAL.with_label_values(&["success"]).inc();
                return Ok(body);
            }

            if is_rate_limited(status, &parts.headers, &body) {
                metrics::REQUESTS_TOTAL
                    .with_label_values(&["rate_limited"])
                    .inc();
                let rate_info = parse_rate_limit(&parts.headers);
                let hint = parse_retry_after(&parts.headers);
                let Some(wait) = attempts.rate_limited(&self.policy) else {
                    warn!(
                        url = %target,
                        attempts = attempts.rate_limited,
                        "rate limit retries exhausted"
                    );
                    return Err(FetchError::RateLimited {
                        target,
                        attempts: attempts.rate_limited,
                    });
                };
                warn!(
                    status = %status,
                    url = %target,
                    attempt = attempts.rate_limited,
                    cooldown_secs = wait.as_secs(),
                    retry_after_seconds = hint.as_ref().map(|advice| advice.wait.as_secs()),
                    rate_limit_remaining = rate_info.as_ref().map(|data| data.remaining),
                    rate_limit_reset = rate_info.as_ref().map(|data| data.reset.timestamp()),
                    "rate limited, cooling down"
                );
                metrics::RETRIES_TOTAL
                    .with_label_values(&["rate_limited"])
                    .inc();
                metrics::SLEEP_SECONDS
                    .with_label_values(&["rate_limit"])
                    .inc_by(wait.as_secs_f64());
                sleep(wait).await;
                continue;
            }

            metrics::REQUESTS_TOTAL
                .with_label_values(&["client_error"])
                .inc();
            let message = error_message(&body);
            warn!(
                status = %status,
                url = %target,
                github_request_id = parts
                    .headers
                    .get("x-github-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-"),
                message = %message,
                "request rejected"
            );
            return Err(FetchError::Client {
                target,
                status,
                message,
            });
        }
    }

    fn build_request(&self, url: &Url) -> Result<Request<Vec<u8>>, FetchError> {
        let mut request = Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::USER_AGENT, self.user_agent.as_str())
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .body(Vec::new())?;

        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(http::Error::from)?;
            value.set_sensitive(true);
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }
        Ok(request)
    }
}
