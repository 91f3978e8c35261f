//! Registration page, embedded into the binary.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "www/"]
struct Assets;

/// `/register` → `/register/`, so relative asset links resolve.
pub async fn redirect_to_index() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/register/")])
}

/// Serve the registration page.
pub async fn index() -> Response {
    serve("index.html")
}

/// Serve a file from the registration UI.
pub async fn asset(Path(path): Path<String>) -> Response {
    if path.is_empty() || path.ends_with('/') {
        return serve(&format!("{}index.html", path));
    }
    serve(&path)
}

fn serve(path: &str) -> Response {
    match Assets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], file.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
    }
}
