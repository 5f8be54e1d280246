use std::borrow::Cow;

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};

use crate::{handlers, GatewayError, GatewayState};

/// Operation a request maps to. First match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    IssueUploadTarget,
    Store(String),
    Retrieve(String),
    Delete(String),
    Unmatched,
}

impl Route {
    /// Resolve from method and path. Keys are the percent-decoded path
    /// without its leading `/` (or without `/upload/` for puts).
    pub fn resolve(method: &Method, path: &str) -> Self {
        if *method == Method::POST && path == "/" {
            return Self::IssueUploadTarget;
        }

        let key = || decode_key(path.strip_prefix('/').unwrap_or(path));
        if *method == Method::DELETE {
            Self::Delete(key())
        } else if *method == Method::PUT {
            match path.strip_prefix("/upload/") {
                Some(rest) => Self::Store(decode_key(rest)),
                None => Self::Unmatched,
            }
        } else if *method == Method::GET {
            Self::Retrieve(key())
        } else {
            Self::Unmatched
        }
    }
}

fn decode_key(raw: &str) -> String {
    urlencoding::decode(raw)
        .unwrap_or(Cow::Borrowed(raw))
        .into_owned()
}

/// Single entry point for every request that is not a CORS preflight
pub async fn dispatch(State(state): State<GatewayState>, request: Request) -> Response {
    let route = Route::resolve(request.method(), request.uri().path());

    let result = match route {
        Route::IssueUploadTarget => handlers::issue_upload_target(&state, request).await,
        Route::Store(key) => handlers::store_object(&state, key, request).await,
        Route::Retrieve(key) => handlers::retrieve_object(&state, key, request.headers()).await,
        Route::Delete(key) => handlers::delete_object(&state, key).await,
        Route::Unmatched => Err(GatewayError::not_found("Not found")),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}
