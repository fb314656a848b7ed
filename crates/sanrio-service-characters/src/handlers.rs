//! Character CRUD and search handlers.
//!
//! Each handler validates through its extractors, performs one or two store
//! calls, writes its domain event and answers with the stored representation.
//! Only a missing document is translated (to `NOT_FOUND`); any other store
//! failure is left unhandled and surfaces as a 500.

use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    Json,
};
use serde_json::json;

use sanrio_lib::{
    build_search_body, Character, CharacterCreate, SearchParams, StoredCharacter, ValidationErrors,
};
use sanrio_service_shared::{
    record_character_operation, record_search_results, AppState, DeletedResponse, HandlerError,
    HandlerResult, RequestId, SearchResponse, ValidatedJson, ValidatedQuery,
};

/// Record the outcome of a failed operation and pass the error on.
fn failed(operation: &str, err: HandlerError) -> HandlerError {
    let outcome = match &err {
        HandlerError::Api(_) => "not_found",
        HandlerError::Invalid(_) => "invalid",
        HandlerError::Unhandled(_) => "error",
    };
    record_character_operation(operation, outcome);
    err
}

/// Handle `POST /characters`.
pub async fn create_character(
    State(state): State<AppState>,
    request_id: RequestId,
    uri: Uri,
    ValidatedJson(payload): ValidatedJson<CharacterCreate>,
) -> HandlerResult<(StatusCode, Json<Character>)> {
    let document = payload.to_document()?;
    let id = state
        .store()
        .index_document(state.index(), None, &document)
        .await
        .map_err(|e| failed("create", e.into()))?;

    state.events().info(json!({
        "request_id": request_id.as_str(),
        "event": "character_created",
        "path": uri.path(),
        "status_code": 201,
        "elasticsearch_doc_id": id,
        "payload": document,
    }));
    record_character_operation("create", "ok");

    Ok((StatusCode::CREATED, Json(Character::new(id, payload))))
}

/// Handle `GET /characters/{id}`.
pub async fn get_character(
    State(state): State<AppState>,
    request_id: RequestId,
    uri: Uri,
    Path(id): Path<String>,
) -> HandlerResult<Json<StoredCharacter>> {
    let source = state
        .store()
        .get_document(state.index(), &id)
        .await
        .map_err(|e| failed("get", HandlerError::from_lookup(e, &id)))?;
    let character = StoredCharacter::from_source(id, source);

    state.events().info(json!({
        "request_id": request_id.as_str(),
        "event": "character_fetched",
        "path": uri.path(),
        "status_code": 200,
        "elasticsearch_doc_id": character.id(),
    }));
    record_character_operation("get", "ok");

    Ok(Json(character))
}

/// Handle `PUT /characters/{id}`: full replacement of an existing record.
pub async fn update_character(
    State(state): State<AppState>,
    request_id: RequestId,
    uri: Uri,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<CharacterCreate>,
) -> HandlerResult<Json<Character>> {
    // Not atomic with the write below; concurrent deletes race at the store.
    state
        .store()
        .get_document(state.index(), &id)
        .await
        .map_err(|e| failed("update", HandlerError::from_lookup(e, &id)))?;

    let document = payload.to_document()?;
    state
        .store()
        .index_document(state.index(), Some(&id), &document)
        .await
        .map_err(|e| failed("update", e.into()))?;

    state.events().info(json!({
        "request_id": request_id.as_str(),
        "event": "character_updated",
        "path": uri.path(),
        "status_code": 200,
        "elasticsearch_doc_id": id,
        "payload": document,
    }));
    record_character_operation("update", "ok");

    Ok(Json(Character::new(id, payload)))
}

/// Handle `DELETE /characters/{id}`.
pub async fn delete_character(
    State(state): State<AppState>,
    request_id: RequestId,
    uri: Uri,
    Path(id): Path<String>,
) -> HandlerResult<Json<DeletedResponse>> {
    state
        .store()
        .delete_document(state.index(), &id)
        .await
        .map_err(|e| failed("delete", HandlerError::from_lookup(e, &id)))?;

    state.events().info(json!({
        "request_id": request_id.as_str(),
        "event": "character_deleted",
        "path": uri.path(),
        "status_code": 200,
        "elasticsearch_doc_id": id,
    }));
    record_character_operation("delete", "ok");

    Ok(Json(DeletedResponse::new(id)))
}

/// Handle `GET /search`.
pub async fn search_characters(
    State(state): State<AppState>,
    request_id: RequestId,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> HandlerResult<Json<SearchResponse>> {
    if let Some(max) = state.config().max_page_size {
        if params.size > max {
            return Err(HandlerError::Invalid(ValidationErrors::single(
                "size",
                format!("size must be less than or equal to {}", max),
            )));
        }
    }

    let body = build_search_body(&params);
    let result = state.store().search(state.index(), &body).await?;

    let hits = result
        .hits
        .into_iter()
        .map(|hit| StoredCharacter::from_source(hit.id, hit.source))
        .collect::<Vec<_>>();

    state.events().info(json!({
        "request_id": request_id.as_str(),
        "event": "search_executed",
        "query": params.q,
        "filters": params.filters_json(),
        "page": params.page,
        "size": params.size,
        "results_count": hits.len(),
    }));
    record_search_results(hits.len(), params.fuzzy);

    Ok(Json(SearchResponse {
        total: result.total,
        page: params.page,
        size: params.size,
        hits,
    }))
}
