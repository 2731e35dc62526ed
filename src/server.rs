use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::construct::{parse_hash, ObjId, ObjectKey};
use crate::error::{PlacedbError, Result};
use crate::interface::StoreInterface;
use crate::query::Listing;
use crate::view::icon_file;

pub struct AppState {
    pub store: Arc<StoreInterface>,
    pub icon_dir: PathBuf,
}

type Shared = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "withMapNames")]
    pub with_map_names: Option<String>,
}

pub fn router(state: Shared) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);
    Router::new()
        .route("/obj/:objid", get(object_by_id))
        .route("/obj/:map_type/:map_name/:hash_id", get(object_by_key))
        .route("/obj/:map_type/:map_name/:hash_id/gen_group", get(gen_group))
        .route("/obj/:map_type/:map_name/:hash_id/ai_groups", get(ai_groups))
        .route("/hash/:hash_id", get(object_by_hash))
        .route("/objs/:map_type", get(objs_by_type))
        .route("/objs/:map_type/:map_name", get(objs_by_map))
        .route("/objids/:map_type", get(objids_by_type))
        .route("/objids/:map_type/:map_name", get(objids_by_map))
        .route("/region/:token/:map_name", get(region_rows))
        .route("/icon/:objid", get(icon))
        .layer(cors)
        .with_state(state)
}

// The store is synchronous, so every query runs on a blocking thread.
async fn blocking<T, F>(state: &Shared, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&StoreInterface) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| {
            warn!(error = %e, "Join error");
            PlacedbError::Execution(e.to_string())
        })?
}

fn not_found(empty: Value) -> Response {
    (StatusCode::NOT_FOUND, Json(empty)).into_response()
}

fn failure(route: &'static str, started: Instant, e: PlacedbError, empty: Value) -> Response {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = match e {
        PlacedbError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PlacedbError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let msg = format!("{e}");
    warn!(route, %msg, code = %status.as_u16(), ms, "query error");
    if status == StatusCode::NOT_FOUND {
        return not_found(empty);
    }
    (status, Json(json!({ "error": msg }))).into_response()
}

fn one<T: Serialize>(route: &'static str, started: Instant, result: Result<Option<T>>) -> Response {
    match result {
        Ok(Some(found)) => {
            info!(route, ms = started.elapsed().as_secs_f64() * 1000.0, "query complete");
            Json(found).into_response()
        }
        Ok(None) => {
            debug!(route, "no match");
            not_found(json!({}))
        }
        Err(e) => failure(route, started, e, json!({})),
    }
}

fn many<T: Serialize>(route: &'static str, started: Instant, result: Result<Vec<T>>, empty_is_not_found: bool) -> Response {
    match result {
        Ok(rows) if rows.is_empty() && empty_is_not_found => {
            debug!(route, "no match");
            not_found(json!([]))
        }
        Ok(rows) => {
            info!(route, rows = rows.len(), ms = started.elapsed().as_secs_f64() * 1000.0, "query complete");
            Json(rows).into_response()
        }
        Err(e) => failure(route, started, e, json!([])),
    }
}

fn object_key(map_type: String, map_name: String, hash_id: &str) -> Option<ObjectKey> {
    parse_hash(hash_id).map(|hash_id| ObjectKey::new(map_type, map_name, hash_id))
}

async fn object_by_id(State(state): State<Shared>, Path(objid): Path<String>) -> Response {
    let started = Instant::now();
    let Ok(objid) = objid.parse::<ObjId>() else {
        return not_found(json!({}));
    };
    one("obj", started, blocking(&state, move |s| s.object_by_id(objid)).await)
}

async fn object_by_key(
    State(state): State<Shared>,
    Path((map_type, map_name, hash_id)): Path<(String, String, String)>,
) -> Response {
    let started = Instant::now();
    let Some(key) = object_key(map_type, map_name, &hash_id) else {
        return not_found(json!({}));
    };
    one("obj_key", started, blocking(&state, move |s| s.object_by_key(&key)).await)
}

async fn object_by_hash(State(state): State<Shared>, Path(hash_id): Path<String>) -> Response {
    let started = Instant::now();
    let Some(hash_id) = parse_hash(&hash_id) else {
        return not_found(json!({}));
    };
    one("hash", started, blocking(&state, move |s| s.object_by_hash(hash_id)).await)
}

async fn gen_group(
    State(state): State<Shared>,
    Path((map_type, map_name, hash_id)): Path<(String, String, String)>,
) -> Response {
    let started = Instant::now();
    let Some(key) = object_key(map_type, map_name, &hash_id) else {
        return not_found(json!([]));
    };
    many("gen_group", started, blocking(&state, move |s| s.gen_group(&key)).await, true)
}

async fn ai_groups(
    State(state): State<Shared>,
    Path((map_type, map_name, hash_id)): Path<(String, String, String)>,
) -> Response {
    let started = Instant::now();
    let Some(key) = object_key(map_type, map_name, &hash_id) else {
        return not_found(json!([]));
    };
    many("ai_groups", started, blocking(&state, move |s| s.ai_groups(&key)).await, true)
}

fn listing(map_type: String, map_name: Option<String>, params: ListParams) -> Result<Option<Listing>> {
    let Some(query) = params.q else {
        return Ok(None);
    };
    let limit = match params.limit.as_deref() {
        None | Some("") => None,
        Some(text) => {
            let invalid = || PlacedbError::InvalidInput(format!("limit must be an integer, got '{text}'"));
            let limit = text.parse::<i64>().map_err(|_| invalid())?;
            // negative means unlimited
            if limit < 0 { None } else { Some(u32::try_from(limit).map_err(|_| invalid())?) }
        }
    };
    let with_map_names = matches!(params.with_map_names.as_deref(), Some("1" | "true" | "yes"));
    Ok(Some(Listing { map_type, map_name, query, limit, with_map_names }))
}

async fn list(state: Shared, route: &'static str, map_type: String, map_name: Option<String>, params: ListParams, ids_only: bool) -> Response {
    let started = Instant::now();
    let listing = match listing(map_type, map_name, params) {
        Ok(Some(listing)) => listing,
        // no query string: nothing to list
        Ok(None) => return Json(json!([])).into_response(),
        Err(e) => return failure(route, started, e, json!([])),
    };
    if ids_only {
        many(route, started, blocking(&state, move |s| s.list_ids(&listing)).await, false)
    } else {
        many(route, started, blocking(&state, move |s| s.list(&listing)).await, false)
    }
}

async fn objs_by_type(State(state): State<Shared>, Path(map_type): Path<String>, Query(params): Query<ListParams>) -> Response {
    list(state, "objs", map_type, None, params, false).await
}

async fn objs_by_map(
    State(state): State<Shared>,
    Path((map_type, map_name)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Response {
    list(state, "objs", map_type, Some(map_name), params, false).await
}

async fn objids_by_type(State(state): State<Shared>, Path(map_type): Path<String>, Query(params): Query<ListParams>) -> Response {
    list(state, "objids", map_type, None, params, true).await
}

async fn objids_by_map(
    State(state): State<Shared>,
    Path((map_type, map_name)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Response {
    list(state, "objids", map_type, Some(map_name), params, true).await
}

async fn region_rows(State(state): State<Shared>, Path((token, map_name)): Path<(String, String)>) -> Response {
    let started = Instant::now();
    // reject before a blocking thread or the store is involved
    if let Err(e) = token.parse::<crate::construct::RegionLevel>() {
        return failure("region", started, e, json!([]));
    }
    many("region", started, blocking(&state, move |s| s.region_rows(&token, &map_name)).await, true)
}

async fn icon(State(state): State<Shared>, Path(objid): Path<String>) -> Response {
    let Ok(objid) = objid.parse::<ObjId>() else {
        return not_found(json!({}));
    };
    let lookup = blocking(&state, move |s| {
        s.actor_of(objid)?
            .ok_or_else(|| PlacedbError::NotFound(format!("object {objid}")))
    });
    let actor = match lookup.await {
        Ok(actor) => actor,
        Err(e) => {
            debug!(objid, error = %e, "icon lookup failed");
            return not_found(json!({}));
        }
    };
    let path = state.icon_dir.join(icon_file(&actor));
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => {
            debug!(objid, path = %path.display(), error = %e, "icon unavailable");
            not_found(json!({}))
        }
    }
}
