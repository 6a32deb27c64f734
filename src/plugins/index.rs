//! Index plugin: serves the navigation listing at `/`.

use axum::Json;
use axum::extract::State;
use axum::routing::get;
use serde::Serialize;

use super::Plugin;
use crate::app_state::AppState;
use crate::error::ServerError;
use crate::realtime::ChannelBuilder;
use crate::routes::RouteRegistry;

/// Registers the site index at `/`.
#[derive(Debug)]
pub struct IndexPlugin;

impl Plugin for IndexPlugin {
    fn name(&self) -> &'static str {
        "index"
    }

    fn register(
        &self,
        routes: &mut RouteRegistry,
        _realtime: &mut ChannelBuilder,
    ) -> Result<(), ServerError> {
        routes.register_named("/", "index", get(index_handler))
    }
}

/// Navigation listing of every registered page.
#[derive(Debug, Serialize)]
struct IndexPage {
    pages: Vec<String>,
}

/// `GET /` — List all registered routes.
async fn index_handler(State(state): State<AppState>) -> Json<IndexPage> {
    Json(IndexPage {
        pages: state.routes.pages().to_vec(),
    })
}
