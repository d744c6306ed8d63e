//! In-memory REST server used as the live target for client tests.
//!
//! Routes:
//! - `/api/entity`: list (`?tag=` may repeat; all tags must match) and create
//! - `/api/entity/{id}`: get, replace (PUT), partial update (PATCH), delete
//! - `/api/secure`: requires `Authorization: bearer {SECRET_TOKEN}`
//! - `/echo`, `/echo/{*rest}`: any method; reflects the request as JSON
//! - `/status/{code}`: answers with `code` and its reason phrase as text

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// The only bearer token `/api/secure` accepts.
pub const SECRET_TOKEN: &str = "letmein";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewEntity {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Entity>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/api/entity", get(list_entities).post(create_entity))
        .route(
            "/api/entity/{id}",
            get(get_entity)
                .put(replace_entity)
                .patch(update_entity)
                .delete(delete_entity),
        )
        .route("/api/secure", get(secure))
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Values of every `tag` pair in a raw query string, in order.
fn requested_tags(query: Option<&str>) -> Vec<String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .filter(|(key, _)| key == "tag")
                .map(|(_, value)| value.into_owned())
                .collect()
        })
        .unwrap_or_default()
}

async fn list_entities(State(db): State<Db>, RawQuery(query): RawQuery) -> Json<Vec<Entity>> {
    let wanted = requested_tags(query.as_deref());
    let entities = db.read().await;
    let mut matching: Vec<Entity> = entities
        .values()
        .filter(|e| wanted.iter().all(|tag| e.tags.contains(tag)))
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    Json(matching)
}

async fn create_entity(
    State(db): State<Db>,
    Json(input): Json<NewEntity>,
) -> (StatusCode, Json<Entity>) {
    let entity = Entity {
        id: Uuid::new_v4(),
        name: input.name,
        tags: input.tags,
    };
    info!(id = %entity.id, "entity created");
    db.write().await.insert(entity.id, entity.clone());
    (StatusCode::CREATED, Json(entity))
}

async fn get_entity(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Entity>, (StatusCode, &'static str)> {
    let entities = db.read().await;
    entities
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "not found"))
}

async fn replace_entity(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<NewEntity>,
) -> Result<Json<Entity>, (StatusCode, &'static str)> {
    let mut entities = db.write().await;
    let entity = entities
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;
    entity.name = input.name;
    entity.tags = input.tags;
    Ok(Json(entity.clone()))
}

async fn update_entity(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(patch): Json<EntityPatch>,
) -> Result<Json<Entity>, (StatusCode, &'static str)> {
    let mut entities = db.write().await;
    let entity = entities
        .get_mut(&id)
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;
    if let Some(name) = patch.name {
        entity.name = name;
    }
    if let Some(tags) = patch.tags {
        entity.tags = tags;
    }
    Ok(Json(entity.clone()))
}

async fn delete_entity(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let removed = db.write().await.remove(&id);
    match removed {
        Some(_) => {
            info!(%id, "entity deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err((StatusCode::NOT_FOUND, "not found")),
    }
}

async fn secure(headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, &'static str)> {
    let expected = format!("bearer {SECRET_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case(&expected));
    if !authorized {
        return Err((StatusCode::UNAUTHORIZED, "missing or invalid bearer token"));
    }
    Ok(Json(serde_json::json!({ "access": "granted" })))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let reason = status.canonical_reason().unwrap_or("Unknown");
    Ok((status, reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_serializes_to_json() {
        let entity = Entity {
            id: Uuid::nil(),
            name: "Test".to_string(),
            tags: vec!["a".to_string()],
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Test");
        assert_eq!(json["tags"][0], "a");
    }

    #[test]
    fn new_entity_defaults_tags_to_empty() {
        let input: NewEntity = serde_json::from_str(r#"{"name":"No tags"}"#).unwrap();
        assert_eq!(input.name, "No tags");
        assert!(input.tags.is_empty());
    }

    #[test]
    fn new_entity_rejects_missing_name() {
        let result: Result<NewEntity, _> = serde_json::from_str(r#"{"tags":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn patch_fields_are_optional() {
        let patch: EntityPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.name.is_none());
        assert!(patch.tags.is_none());
    }

    #[test]
    fn repeated_tag_keys_are_collected_in_order() {
        assert_eq!(
            requested_tags(Some("tag=red&page=1&tag=blue")),
            vec!["red".to_string(), "blue".to_string()]
        );
        assert!(requested_tags(None).is_empty());
    }
}
