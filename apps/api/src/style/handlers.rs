use axum::Json;
use serde::{Deserialize, Serialize};

use crate::style::router::{explain, route, score_signals, StyleProfile};
use crate::style::scoring_table::Color;
use crate::style::signals::SignalTuple;

#[derive(Debug, Deserialize)]
pub struct RoutePreviewRequest {
    #[serde(flatten)]
    pub signals: SignalTuple,
    #[serde(default)]
    pub constraints: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RankedColor {
    pub color: Color,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RoutePreviewResponse {
    pub profile: StyleProfile,
    pub scores: Vec<RankedColor>,
    pub explanation: Vec<String>,
}

/// POST /api/v1/style/route
/// Pure preview of the routing decision; no collaborators are called.
pub async fn handle_route_preview(Json(req): Json<RoutePreviewRequest>) -> Json<RoutePreviewResponse> {
    let scores = score_signals(&req.signals)
        .ranked()
        .into_iter()
        .map(|(color, score)| RankedColor { color, score })
        .collect();

    Json(RoutePreviewResponse {
        profile: route(&req.signals).with_constraints(req.constraints),
        scores,
        explanation: explain(&req.signals),
    })
}
