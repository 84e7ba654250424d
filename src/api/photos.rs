/// Serving stored issue photos
use crate::{context::AppContext, error::CivicResult};
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/photos/:key", get(get_photo))
}

/// Photo bytes; keys are content hashes so responses never change
async fn get_photo(State(ctx): State<AppContext>, Path(key): Path<String>) -> CivicResult<Response> {
    let (data, content_type) = ctx.photos.open(&key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        data,
    )
        .into_response())
}
