pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod postgres;
pub mod shared;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use folio::{
    api::create_router,
    db::{ContentStore, MemoryContentStore},
    models::{SearchRequest, SearchResponse},
    request_context::TenantContext,
    AppState, Config,
};
use std::sync::Arc;
use tower::ServiceExt as _;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;

/// Router and services over an in-memory content store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryContentStore>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryContentStore::new());
        Self::new_with_backend(configure, store.clone(), store).await
    }

    /// Seed through `store` while searches go through `backend`, which
    /// usually wraps `store`.
    pub async fn new_with_backend(
        configure: impl FnOnce(&mut Config),
        store: Arc<MemoryContentStore>,
        backend: Arc<dyn ContentStore>,
    ) -> anyhow::Result<Self> {
        let shared = shared::shared().await?;
        let mut config = shared.base_config.clone();
        configure(&mut config);

        let state = AppState::with_store(config, backend);
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            store,
        })
    }

    /// Run a search directly against the service.
    pub async fn search(
        &self,
        tenant: &TenantContext,
        request: SearchRequest,
    ) -> folio::Result<SearchResponse> {
        self.state.search_service.search(tenant, request).await
    }

    /// Follow `nextCursor` until the last page, returning every page.
    pub async fn search_all_pages(
        &self,
        tenant: &TenantContext,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<SearchResponse>> {
        let mut pages = Vec::new();
        let mut request = request;
        loop {
            let page = self.search(tenant, request.clone()).await?;
            let next = page.next_cursor.clone();
            let has_more = page.has_more;
            pages.push(page);
            match next {
                Some(cursor) if has_more => request.after = Some(cursor),
                _ => break,
            }
            anyhow::ensure!(pages.len() <= 1000, "pagination did not terminate");
        }
        Ok(pages)
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request_with_extra_headers(method, path_and_query, body, &[])
            .await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .body(match body {
                Some(bytes) => Body::from(bytes),
                None => Body::empty(),
            })
            .context("build request")?;

        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }
}

pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    with_test_app_with_config(|_| {}, f).await
}

pub async fn with_test_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let app = TestApp::new_with_config(configure).await?;
    f(&app).await
}
