//! Request handlers.
//!
//! # Responsibilities
//! - Upload ingestion endpoint (raw, zip, multipart)
//! - Temporary-site serving under /p/{token}/...
//! - Premium-site serving by subdomain (router fallback)
//! - JSON reporting endpoints and the operator pages
//!
//! # Design Decisions
//! - Handlers collect request bodies asynchronously, then run the blocking
//!   ingest work on `spawn_blocking`
//! - Premium subdomain selection takes precedence over /p/ paths
//! - The operator endpoints answer 404 (not 401) on a bad password

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, Path as UrlPath, Query, State},
    http::{header, HeaderMap, Method, Request, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::http::response::{dir_listing_page, not_found_page, sites_listing_page};
use crate::http::server::AppState;
use crate::ingest::{self, FormFile, IngestError, UploadKind};
use crate::paths::humanize_size;
use crate::resolve::{self, Resolution};
use crate::site::model::{Site, SiteFile};

fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// The premium site selected by the request's Host header, if any.
fn premium_site(state: &AppState, headers: &HeaderMap) -> Option<Site> {
    let label = resolve::premium_label(&request_host(headers))?;
    state.store.find(&label).filter(|s| s.is_premium)
}

fn plain_not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found\n").into_response()
}

// POST /upload, POST /api/upload, and any POST/PUT reaching the fallback.
pub async fn handle_upload(State(state): State<AppState>, req: Request<Body>) -> Response {
    let host = request_host(req.headers());
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or("").to_string();
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let kind = match UploadKind::detect(content_type.as_deref(), &path) {
        Ok(kind) => kind,
        Err(err) => return err.into_response(),
    };
    let target = match ingest::prepare_target(
        &state.store,
        &state.config.storage.data_dir,
        &host,
        &query,
    ) {
        Ok(site) => site,
        Err(err) => return err.into_response(),
    };
    tracing::info!(
        site = %target.name,
        kind = ?kind,
        premium = target.is_premium,
        "Upload started"
    );

    let result = match kind {
        UploadKind::Raw | UploadKind::Archive => {
            let body =
                match axum::body::to_bytes(req.into_body(), state.config.limits.max_upload_bytes)
                    .await
                {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        return IngestError::MalformedForm(format!("body read failed: {err}"))
                            .into_response()
                    }
                };
            let store = state.store.clone();
            let data_dir = state.config.storage.data_dir.clone();
            run_blocking(move || match kind {
                UploadKind::Raw => ingest::ingest_raw(&store, target, &path, body, &host),
                _ => ingest::ingest_archive(&store, &data_dir, target, body, &host),
            })
            .await
        }
        UploadKind::MultipartForm => {
            let form_files = match collect_form_files(req, &state).await {
                Ok(files) => files,
                Err(err) => return err.into_response(),
            };
            let store = state.store.clone();
            run_blocking(move || ingest::ingest_multipart(&store, target, form_files, &host)).await
        }
    };

    match result {
        Ok(outcome) => {
            tracing::info!(
                site = %outcome.site_name,
                files = outcome.file_count,
                url = %outcome.url,
                "Upload complete"
            );
            (StatusCode::OK, outcome.url).into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Upload failed");
            err.into_response()
        }
    }
}

async fn run_blocking<F>(work: F) -> Result<ingest::IngestOutcome, IngestError>
where
    F: FnOnce() -> Result<ingest::IngestOutcome, IngestError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(err) => Err(IngestError::Io(std::io::Error::other(err))),
    }
}

/// Drain every file field of a multipart form. An oversize payload fails
/// here (the body limit applies) and nothing is ingested.
async fn collect_form_files(
    req: Request<Body>,
    state: &AppState,
) -> Result<Vec<FormFile>, IngestError> {
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|err| IngestError::MalformedForm(err.to_string()))?;
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| IngestError::MalformedForm(err.to_string()))?
    {
        let name = field
            .name()
            .map(str::to_string)
            .or_else(|| field.file_name().map(str::to_string))
            .unwrap_or_default();
        let bytes: Bytes = field
            .bytes()
            .await
            .map_err(|err| IngestError::MalformedForm(err.to_string()))?;
        files.push(FormFile { name, bytes });
    }
    Ok(files)
}

// GET /p/{token}
pub async fn serve_site_bare(
    State(state): State<AppState>,
    UrlPath(token): UrlPath<String>,
    req: Request<Body>,
) -> Response {
    serve_token_path(state, token, String::new(), req).await
}

// GET /p/{token}/
pub async fn serve_site_root(
    State(state): State<AppState>,
    UrlPath(token): UrlPath<String>,
    req: Request<Body>,
) -> Response {
    serve_token_path(state, token, "/".to_string(), req).await
}

// GET /p/{token}/{*path}
pub async fn serve_site_file(
    State(state): State<AppState>,
    UrlPath((token, rest)): UrlPath<(String, String)>,
    req: Request<Body>,
) -> Response {
    serve_token_path(state, token, format!("/{rest}"), req).await
}

async fn serve_token_path(
    state: AppState,
    _token: String,
    rest: String,
    req: Request<Body>,
) -> Response {
    // premium subdomains win over path-based selection
    if let Some(site) = premium_site(&state, req.headers()) {
        return serve_resolved(&state, site, req.uri().path(), req.uri(), req.headers()).await;
    }
    let Some(site) = state.store.find_by_path_token(req.uri().path()) else {
        return plain_not_found();
    };
    serve_resolved(&state, site, &rest, req.uri(), req.headers()).await
}

/// Router fallback: premium-subdomain serving for GET/HEAD, upload for
/// POST/PUT, 404 otherwise.
pub async fn fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    let method = req.method();
    if method == Method::POST || method == Method::PUT {
        return handle_upload(State(state), req).await;
    }
    if method == Method::GET || method == Method::HEAD {
        let Some(site) = premium_site(&state, req.headers()) else {
            return plain_not_found();
        };
        return serve_resolved(&state, site, req.uri().path(), req.uri(), req.headers()).await;
    }
    (StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n").into_response()
}

/// Apply the resolution state machine to one site and render the outcome.
async fn serve_resolved(
    state: &AppState,
    site: Site,
    rest: &str,
    uri: &Uri,
    headers: &HeaderMap,
) -> Response {
    match resolve::resolve(&site, rest) {
        Resolution::AppendSlash => Redirect::permanent(&format!("{}/", uri.path())).into_response(),
        Resolution::DirListing => Html(dir_listing_page(&site)).into_response(),
        Resolution::ToggleSpa => {
            if state.store.toggle_spa(&site.name).is_err() {
                return plain_not_found();
            }
            let back = headers
                .get(header::REFERER)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("_dir");
            Redirect::to(back).into_response()
        }
        Resolution::Serve(file) => serve_file(&site, &file, StatusCode::OK).await,
        Resolution::SpaFallback(file) => serve_file(&site, &file, StatusCode::OK).await,
        Resolution::Custom404(file) => serve_file(&site, &file, StatusCode::NOT_FOUND).await,
        Resolution::NotFound => {
            let requested = rest.strip_prefix('/').unwrap_or(rest);
            (
                StatusCode::NOT_FOUND,
                Html(not_found_page(&site, requested)),
            )
                .into_response()
        }
    }
}

async fn serve_file(site: &Site, file: &SiteFile, status: StatusCode) -> Response {
    match tokio::fs::read(&file.disk_path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
            (
                status,
                [(header::CONTENT_TYPE, mime.to_string())],
                bytes,
            )
                .into_response()
        }
        Err(err) => {
            tracing::warn!(
                site = %site.name,
                file = %file.path,
                path = %file.disk_path.display(),
                error = %err,
                "File read failed"
            );
            plain_not_found()
        }
    }
}

#[derive(Deserialize)]
pub struct SiteInfoQuery {
    name: Option<String>,
}

// GET /api/site-info.json?name=... (name optional on a premium subdomain)
pub async fn site_info(
    State(state): State<AppState>,
    Query(query): Query<SiteInfoQuery>,
    headers: HeaderMap,
) -> Response {
    let name = query
        .name
        .or_else(|| resolve::premium_label(&request_host(&headers)));
    let Some(name) = name else {
        return (StatusCode::BAD_REQUEST, "Error: missing 'name' parameter\n").into_response();
    };
    let Some(site) = state.store.find(&name) else {
        return plain_not_found();
    };
    Json(json!({
        "Files": site.files,
        "IsSPA": site.is_spa,
    }))
    .into_response()
}

// GET /api/summary.json
pub async fn summary(State(state): State<AppState>) -> Response {
    let (count, size) = state.store.stats();
    Json(json!({
        "SitesCount": count,
        "SitesSize": size,
        "SitesSizeStr": humanize_size(size),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct AdminQuery {
    pwd: Option<String>,
}

fn admin_authorized(state: &AppState, query: &AdminQuery) -> bool {
    let expected = &state.config.admin.password;
    !expected.is_empty() && query.pwd.as_deref() == Some(expected.as_str())
}

// GET /api/sites.json?pwd=...
pub async fn sites_json(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Response {
    if !admin_authorized(&state, &query) {
        return plain_not_found();
    }
    Json(state.store.snapshot(&state.config.listener.public_host)).into_response()
}

// GET /sites?pwd=...
pub async fn sites_page(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Response {
    if !admin_authorized(&state, &query) {
        return plain_not_found();
    }
    let summaries = state.store.snapshot(&state.config.listener.public_host);
    Html(sites_listing_page(&summaries)).into_response()
}

// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}
