use std::collections::HashMap;

use {
    axum::{
        body::Body,
        extract::{Query, State},
        http::{StatusCode, header},
        response::{Html, IntoResponse, Json, Redirect, Response},
    },
    axum_extra::extract::cookie::{Cookie, CookieJar, SameSite},
    bytes::Bytes,
    futures::StreamExt,
    tokio_util::io::ReaderStream,
    tracing::{error, info, warn},
};

use crate::state::AppState;

/// Cookie carrying the download pass identifier.
pub const PASS_COOKIE: &str = "buchi_pass_id";

/// Page served to visitors holding a valid pass.
const DOWNLOAD_PAGE: &str = include_str!("assets/download.html");

// ── GET / ────────────────────────────────────────────────────────────────────

/// Serve the download page, issuing a pass first if the visitor brought a
/// valid token instead of one.
pub async fn root(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(cookie) = jar.get(PASS_COOKIE)
        && state.passes.is_valid(cookie.value())
    {
        return Html(DOWNLOAD_PAGE).into_response();
    }

    let Some(token) = params.get("token").filter(|t| !t.is_empty()) else {
        return forbidden("missing or invalid token");
    };

    match state.device.validate_token(token).await {
        Ok(true) => {
            let pass_id = state.passes.issue();
            let cookie = Cookie::build((PASS_COOKIE, pass_id))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(time::Duration::seconds(
                    state.passes.ttl().as_secs() as i64
                ))
                .build();
            // Redirect so the page loads with the cookie in place.
            (jar.add(cookie), Redirect::to("/")).into_response()
        },
        Ok(false) => {
            warn!("device rejected token");
            forbidden("invalid token")
        },
        Err(e) => {
            error!(error = %e, "token validation failed");
            internal_error("device unreachable")
        },
    }
}

// ── GET /api/fileinfo ────────────────────────────────────────────────────────

/// Describe the shared file. Requires an unconsumed pass.
pub async fn fileinfo(State(state): State<AppState>, jar: CookieJar) -> Response {
    if !has_valid_pass(&state, &jar) {
        return forbidden("no valid download pass");
    }

    match state.file.info().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            error!(error = %e, "failed to read file metadata");
            internal_error("failed to read file information")
        },
    }
}

// ── GET /download ────────────────────────────────────────────────────────────

/// Consume the visitor's pass and stream the file.
///
/// A completed transfer triggers service shutdown. A transfer that dies
/// mid-stream is only logged: the response is already partially written
/// and the pass is spent either way.
pub async fn download(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(cookie) = jar.get(PASS_COOKIE) else {
        return forbidden("no download pass");
    };
    if !state.passes.consume(cookie.value()) {
        return forbidden("invalid or already used pass");
    }

    let file = match tokio::fs::File::open(state.file.path()).await {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, path = %state.file.path().display(), "failed to open file");
            return internal_error("failed to open file");
        },
    };
    let size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(e) => {
            error!(error = %e, "failed to stat file");
            return internal_error("failed to read file information");
        },
    };

    let name = state.file.name();
    let shutdown = state.shutdown.clone();
    let body = async_stream::stream! {
        let mut chunks = ReaderStream::new(file);
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => yield Ok::<Bytes, std::io::Error>(bytes),
                Err(e) => {
                    // Mid-transfer failure: the stream is already
                    // committed, nothing to retry.
                    error!(error = %e, "file transfer failed");
                    yield Err(e);
                    return;
                },
            }
        }
        info!("download completed");
        shutdown.trigger();
    };

    match Response::builder()
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(body))
    {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "failed to build download response");
            internal_error("failed to build response")
        },
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn has_valid_pass(state: &AppState, jar: &CookieJar) -> bool {
    jar.get(PASS_COOKIE)
        .is_some_and(|c| state.passes.is_valid(c.value()))
}

fn forbidden(msg: &'static str) -> Response {
    (StatusCode::FORBIDDEN, msg).into_response()
}

fn internal_error(msg: &'static str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
}
