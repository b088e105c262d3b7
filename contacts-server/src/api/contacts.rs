use crate::auth::Principal;
use crate::errors::ApiError;
use crate::models::{Contact, ContactDraft, ContactId, ContactPayload};
use crate::openapi::CONTACTS_TAG;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Json, Path, State,
    },
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use log::{debug, info};

/// Contact routes, all of them behind the authorization gate
pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route(
            "/contacts/{id}",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[utoipa::path(
    get,
    path = "/contacts",
    tag = CONTACTS_TAG,
    security(("bearer" = ["read"])),
    responses(
        (status = 200, description = "All contacts ordered by id", body = Vec<Contact>),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the read scope")
    )
)]
pub(crate) async fn list_contacts(State(state): State<AppState>) -> Json<Vec<Contact>> {
    Json(state.contacts.list().await)
}

#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = CONTACTS_TAG,
    security(("bearer" = ["read"])),
    params(("id" = i32, Path, description = "Contact id")),
    responses(
        (status = 200, description = "The contact", body = Contact),
        (status = 400, description = "The id is not an integer"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the read scope"),
        (status = 404, description = "No contact with this id")
    )
)]
pub(crate) async fn get_contact(
    State(state): State<AppState>,
    id: Result<Path<ContactId>, PathRejection>,
) -> Result<Json<Contact>, ApiError> {
    let id = contact_id(id)?;
    state
        .contacts
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Contact {id} was not found")))
}

#[utoipa::path(
    post,
    path = "/contacts",
    tag = CONTACTS_TAG,
    security(("bearer" = ["write"])),
    request_body = ContactPayload,
    responses(
        (status = 201, description = "Contact created", body = Contact,
            headers(("Location" = String, description = "URL of the new contact"))),
        (status = 400, description = "Invalid body or missing name"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the write scope")
    )
)]
pub(crate) async fn create_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let draft = contact_draft(payload)?;
    let contact = state.contacts.add(draft).await;
    info!("Contact {} created by '{}'", contact.id, principal.subject);

    let location = format!("/contacts/{}", contact.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(contact)).into_response())
}

#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = CONTACTS_TAG,
    security(("bearer" = ["write"])),
    params(("id" = i32, Path, description = "Contact id")),
    request_body = ContactPayload,
    responses(
        (status = 200, description = "Contact replaced", body = Contact),
        (status = 400, description = "Invalid id, invalid body or missing name"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the write scope"),
        (status = 404, description = "No contact with this id")
    )
)]
pub(crate) async fn update_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    id: Result<Path<ContactId>, PathRejection>,
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<Json<Contact>, ApiError> {
    let id = contact_id(id)?;
    let draft = contact_draft(payload)?;
    let contact = state.contacts.update(id, draft).await?;
    info!("Contact {} updated by '{}'", id, principal.subject);
    Ok(Json(contact))
}

#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = CONTACTS_TAG,
    security(("bearer" = ["write"])),
    params(("id" = i32, Path, description = "Contact id")),
    responses(
        (status = 204, description = "Contact deleted"),
        (status = 400, description = "The id is not an integer"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Token lacks the write scope"),
        (status = 404, description = "No contact with this id")
    )
)]
pub(crate) async fn delete_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    id: Result<Path<ContactId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = contact_id(id)?;
    state.contacts.delete(id).await?;
    info!("Contact {} deleted by '{}'", id, principal.subject);
    Ok(StatusCode::NO_CONTENT)
}

fn contact_id(id: Result<Path<ContactId>, PathRejection>) -> Result<ContactId, ApiError> {
    id.map(|Path(id)| id).map_err(|rejection| {
        debug!("Rejected contact id: {}", rejection.body_text());
        ApiError::bad_request("The contact id must be an integer")
    })
}

fn contact_draft(
    payload: Result<Json<ContactPayload>, JsonRejection>,
) -> Result<ContactDraft, ApiError> {
    let Json(payload) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    Ok(ContactDraft::try_from(payload)?)
}
