pub mod accusations;
pub mod admin;
pub mod comments;
pub mod objects;
pub mod photos;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(accusations::router())
        .merge(photos::router())
        .merge(comments::router())
        .merge(admin::router())
        .merge(objects::router())
}
