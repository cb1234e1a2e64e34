//! Admin endpoints.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use ussd_infra::config::load_menu;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Summary of a successfully loaded menu.
#[derive(Debug, Serialize)]
pub struct ReloadSummary {
    pub steps: usize,
    pub languages: Vec<String>,
}

/// POST /admin/catalog/reload - Re-read catalog and locales and swap them in.
///
/// On any error the running menu is kept and the error is returned.
pub async fn reload_catalog(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReloadSummary>>, AppError> {
    let started = Instant::now();

    let menu = load_menu(&state.config.menu).await?;
    let mut languages: Vec<String> = menu.localizer.languages().map(str::to_string).collect();
    languages.sort();
    let summary = ReloadSummary {
        steps: menu.catalog.len(),
        languages,
    };

    state.engine.reload_menu(menu).map_err(|e| {
        tracing::warn!(error = %e, "catalog reload rejected");
        AppError::from(e)
    })?;

    Ok(Json(ApiResponse::timed(summary, started)))
}
