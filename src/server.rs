use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::error::DashboardError;
use crate::selection::Selection;
use crate::style::ColorScheme;
use crate::types::{blank_as_none, LngLat, RegionId};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

pub struct AppState {
    pub dashboard: Dashboard,
    pub config: AppConfig,
}

/// Recoverable failures become a 422 with the user-facing message.
impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        warn!("{}", self);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "warning": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
pub struct YearsParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    indicator: Option<String>,
}

#[derive(Deserialize)]
pub struct LocateParams {
    lng: f64,
    lat: f64,
}

// Spelled out rather than flattening `Selection`: flattened fields lose
// their types in query-string decoding.
#[derive(Deserialize)]
pub struct ClickParams {
    lng: f64,
    lat: f64,
    #[serde(default, deserialize_with = "blank_as_none")]
    indicator: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    year: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    scheme: Option<ColorScheme>,
    #[serde(default)]
    reverse: bool,
    #[serde(default, deserialize_with = "blank_as_none")]
    region: Option<RegionId>,
}

impl ClickParams {
    fn split(self) -> (Selection, LngLat) {
        let selection = Selection {
            indicator: self.indicator,
            year: self.year,
            scheme: self.scheme,
            reverse: self.reverse,
            region: self.region,
        };
        (selection, LngLat { lng: self.lng, lat: self.lat })
    }
}

#[derive(Serialize)]
pub struct LocateResponse {
    id: RegionId,
    name: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/indicators", get(indicators_handler))
        .route("/api/years", get(years_handler))
        .route("/api/map", get(map_handler))
        .route("/api/click", get(click_handler))
        .route("/api/trend", get(trend_handler))
        .route("/api/locate", get(locate_handler));

    if let Some(dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

pub async fn start_server(config: AppConfig, dashboard: Dashboard) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState { dashboard, config });

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn indicators_handler(State(state): State<Arc<AppState>>) -> Response {
    let d = &state.config.display;
    Json(json!({
        "indicators": state.dashboard.indicators(),
        "schemes": ColorScheme::ALL
            .iter()
            .map(|s| json!({ "scheme": s, "label": s.label() }))
            .collect::<Vec<_>>(),
        "default_scheme": state.dashboard.default_scheme(),
        "center": d.center,
        "zoom": d.zoom,
    }))
    .into_response()
}

async fn years_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<YearsParams>,
) -> Result<Json<Vec<String>>, DashboardError> {
    state.dashboard.years(params.indicator.as_deref()).map(Json)
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(selection): Query<Selection>,
) -> Result<Response, DashboardError> {
    let view = state.dashboard.map_view(&selection)?;
    let input = &state.config.input;

    Ok(Json(json!({
        "indicator": view.indicator,
        "year": view.year,
        "legend": view.choropleth,
        "warnings": view.warnings,
        "regions": view.to_geojson(&input.id_property, &input.name_property),
    }))
    .into_response())
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClickParams>,
) -> Response {
    let (selection, at) = params.split();
    Json(state.dashboard.click(&selection, at)).into_response()
}

async fn trend_handler(
    State(state): State<Arc<AppState>>,
    Query(selection): Query<Selection>,
) -> Result<Response, DashboardError> {
    let chart = state.dashboard.trend(&selection)?;
    Ok(Json(chart).into_response())
}

async fn locate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
) -> Json<Option<LocateResponse>> {
    let at = LngLat { lng: params.lng, lat: params.lat };
    Json(state.dashboard.locate(at).map(|region| LocateResponse {
        id: region.id.clone(),
        name: state.dashboard.region_name(&region.id),
    }))
}
