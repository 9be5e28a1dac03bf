//! The public site API: one route, dispatched on the `action` query
//! parameter, answering every request with the
//! `{"status": ..., "message": ..., "data": ...}` envelope.
//!
//! Unlike the admin API, JSON bodies here are strict: an unreadable body is
//! a 400 and an oversized one is a 413.

use axum::body::to_bytes;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::file::UploadedFile;
use crate::models::application::{MembershipApplication, NewApplication};
use crate::models::committee::{CommitteeMember, CommitteeMemberUpdate, NewCommitteeMember};
use crate::models::event::Event;
use crate::models::gallery::GalleryImage;
use crate::models::notice::Notice;
use crate::models::search;
use crate::routes::AppState;
use crate::util;

#[derive(Debug, Default, Deserialize)]
pub struct PublicParams {
    action: Option<String>,
    id: Option<i64>,
    q: Option<String>,
    #[serde(rename = "eventId")]
    event_id: Option<i64>,
    #[serde(rename = "eventTitle")]
    event_title: Option<String>,
}

#[tracing::instrument(skip(state, headers, request), fields(action = params.action.as_deref().unwrap_or("")))]
pub async fn dispatch(
    State(state): State<AppState>,
    Query(params): Query<PublicParams>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let method = request.method().clone();
    match route_action(&state, &params, &headers, &method, request).await {
        Ok(response) => response,
        Err(err) => envelope_error(&err),
    }
}

async fn route_action(
    state: &AppState,
    params: &PublicParams,
    headers: &HeaderMap,
    method: &Method,
    request: Request,
) -> ApiResult<Response> {
    match params.action.as_deref() {
        Some("gallery") => {
            require_method(method, Method::GET)?;
            let images =
                GalleryImage::public_list(&state.config.uploads_mount, &state.pool).await?;
            Ok(success(json!(images), "success"))
        }
        Some("news") => {
            require_method(method, Method::GET)?;
            let news = Notice::news(&state.pool).await?;
            Ok(success(json!(news), "success"))
        }
        Some("news_detail") => {
            require_method(method, Method::GET)?;
            let id = params
                .id
                .ok_or_else(|| ApiError::BadRequest("News ID is required".to_owned()))?;
            let item = Notice::news_detail(id, &state.pool)
                .await?
                .ok_or_else(|| ApiError::BadRequest("News item not found".to_owned()))?;
            Ok(success(json!(item), "success"))
        }
        Some("committee_members") => {
            require_method(method, Method::GET)?;
            let members = CommitteeMember::all(&state.pool).await?;
            Ok(success(json!(members), "success"))
        }
        Some("committee_member") => committee_member(state, params, method, request).await,
        Some("members") => {
            require_method(method, Method::GET)?;
            let members = CommitteeMember::all(&state.pool).await?;
            Ok(success(json!(members), "success"))
        }
        Some("events") => {
            require_method(method, Method::GET)?;
            let events = Event::public_list(&state.pool).await?;
            Ok(success(json!(events), "success"))
        }
        Some("rsvp") => rsvp(state, params, method, request).await,
        Some("applications") => {
            require_method(method, Method::POST)?;
            applications(state, headers, request).await
        }
        Some("search") => {
            require_method(method, Method::GET)?;
            let query = params
                .q
                .as_deref()
                .filter(|q| !q.is_empty())
                .ok_or_else(|| ApiError::BadRequest("Search query is required".to_owned()))?;
            let results = search::search(query, &state.pool).await?;
            let message = format!("Found {} results", results.len());
            Ok(success(json!(results), &message))
        }
        _ => Err(ApiError::NotFound(
            "Unknown action or invalid request".to_owned(),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CommitteeCreateInput {
    name: Option<String>,
    position: Option<String>,
    committee_type: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    membership_type: Option<String>,
    profile_image: Option<String>,
    joined_date: Option<String>,
    status: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn committee_member(
    state: &AppState,
    params: &PublicParams,
    method: &Method,
    request: Request,
) -> ApiResult<Response> {
    if *method == Method::GET {
        let id = params
            .id
            .ok_or_else(|| ApiError::BadRequest("Member ID is required".to_owned()))?;
        let member = CommitteeMember::with_member_id(id, &state.pool).await?;
        Ok(success(json!(member), "success"))
    } else if *method == Method::POST {
        let input: CommitteeCreateInput =
            read_json(request, state.config.max_payload_size).await?;
        let (name, position, committee_type) =
            match (input.name, input.position, input.committee_type) {
                (Some(name), Some(position), Some(committee_type))
                    if !name.is_empty() && !position.is_empty() && !committee_type.is_empty() =>
                {
                    (name, position, committee_type)
                }
                _ => {
                    return Err(ApiError::BadRequest(
                        "Name, position, and committee type are required".to_owned(),
                    ))
                }
            };

        let mut new = NewCommitteeMember::defaults(name, position, committee_type);
        new.email = input.email.filter(|email| !email.is_empty());
        new.phone = input.phone.unwrap_or_default();
        new.address = input.address.unwrap_or_default();
        if let Some(membership_type) = input.membership_type {
            new.membership_type = membership_type;
        }
        new.profile_image = input.profile_image;
        if let Some(joined_date) = input.joined_date.filter(|date| !date.is_empty()) {
            new.joined_date = util::parse_date(&joined_date)?;
        }
        if let Some(status) = input.status {
            new.status = status;
        }
        if let Some(start_date) = input.start_date.filter(|date| !date.is_empty()) {
            new.start_date = util::parse_date(&start_date)?;
        }
        new.end_date = match input.end_date.filter(|date| !date.is_empty()) {
            Some(date) => Some(util::parse_date(&date)?),
            None => None,
        };

        let member_id = CommitteeMember::create(&new, &state.pool).await?;
        Ok(success(
            json!({ "id": member_id }),
            "Committee member created successfully",
        ))
    } else if *method == Method::PUT {
        let id = params
            .id
            .ok_or_else(|| ApiError::BadRequest("Member ID is required".to_owned()))?;
        let update: CommitteeMemberUpdate =
            read_json(request, state.config.max_payload_size).await?;
        let affected = CommitteeMember::update(id, &update, &state.pool).await?;
        Ok(success(
            json!({ "affected": affected }),
            "Committee member updated successfully",
        ))
    } else if *method == Method::DELETE {
        let id = params
            .id
            .ok_or_else(|| ApiError::BadRequest("Member ID is required".to_owned()))?;
        let affected = CommitteeMember::deactivate(id, &state.pool).await?;
        Ok(success(
            json!({ "affected": affected }),
            "Committee member deleted successfully",
        ))
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RsvpInput {
    #[serde(rename = "eventId")]
    event_id: Option<i64>,
    #[serde(rename = "eventTitle")]
    event_title: Option<String>,
}

/// Anonymous attendance signal. POST is the real interface; GET reads the
/// same fields from the query string so a browser address bar can exercise
/// it.
#[tracing::instrument(skip_all)]
async fn rsvp(
    state: &AppState,
    params: &PublicParams,
    method: &Method,
    request: Request,
) -> ApiResult<Response> {
    let input: RsvpInput = if *method == Method::POST {
        read_json(request, state.config.max_payload_size).await?
    } else if *method == Method::GET {
        RsvpInput {
            event_id: params.event_id,
            event_title: params.event_title.clone(),
        }
    } else {
        return Err(ApiError::MethodNotAllowed);
    };

    let (event_id, event_title) = match (input.event_id, input.event_title) {
        (Some(id), Some(title)) if !title.is_empty() => (id, title),
        _ => {
            return Err(ApiError::BadRequest(
                "Event ID and title are required".to_owned(),
            ))
        }
    };

    let count = Event::rsvp(event_id, &event_title, &state.pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Event not found or not available".to_owned()))?;

    Ok(success(
        json!({ "success": true, "rsvp_count": count }),
        "RSVP submitted successfully",
    ))
}

const APPLICATION_REQUIRED_FIELDS: &[&str] =
    &["full_name", "email", "phone", "visa_type", "transaction_id"];

async fn applications(
    state: &AppState,
    headers: &HeaderMap,
    request: Request,
) -> ApiResult<Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid form body: {}", err)))?;

    let mut fields = std::collections::HashMap::new();
    let mut interests: Vec<String> = Vec::new();
    let mut screenshot = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid form body: {}", err)))?
    {
        let name = match field.name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        if name == "payment_screenshot" {
            let file_name = field.file_name().unwrap_or("upload").to_owned();
            let content = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(format!("Invalid form body: {}", err)))?
                .to_vec();
            screenshot = Some(UploadedFile { file_name, content });
        } else {
            let value = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(format!("Invalid form body: {}", err)))?;
            if name == "interests" || name == "interests[]" {
                interests.push(value);
            } else {
                fields.insert(name, value);
            }
        }
    }

    for required in APPLICATION_REQUIRED_FIELDS {
        if fields.get(*required).map_or(true, |value| value.is_empty()) {
            return Err(ApiError::BadRequest(format!(
                "Missing required field: {}",
                required
            )));
        }
    }
    let email = fields["email"].clone();
    if !util::valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_owned()));
    }

    let payment_screenshot = match &screenshot {
        Some(upload) => upload.save(&state.config, "payments")?,
        None => String::new(),
    };
    let arrival_date = match fields.get("arrival_date").filter(|date| !date.is_empty()) {
        Some(date) => Some(util::parse_date(date)?),
        None => None,
    };

    let new = NewApplication {
        full_name: fields["full_name"].clone(),
        email,
        phone: fields["phone"].clone(),
        address: fields.get("address").cloned().unwrap_or_default(),
        designation: fields.get("designation").cloned().unwrap_or_default(),
        membership_type: fields
            .get("membership_type")
            .cloned()
            .unwrap_or_else(|| "General".to_owned()),
        university: fields.get("university").cloned().unwrap_or_default(),
        visa_type: fields.get("visa_type").cloned(),
        other_visa: fields.get("other_visa").cloned().unwrap_or_default(),
        arrival_date,
        transaction_id: fields["transaction_id"].clone(),
        payment_screenshot,
        interests: interests.join(", "),
        notes: fields.get("notes").cloned().unwrap_or_default(),
        ip_address: auth::client_ip(headers),
    };

    let application = MembershipApplication::create(&new, &state.pool).await?;
    Ok(success(
        json!({
            "success": true,
            "application_id": application.application_id,
            "member_code": application.member_code,
        }),
        "Application submitted successfully",
    ))
}

fn require_method(actual: &Method, expected: Method) -> Result<(), ApiError> {
    if *actual == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

/// Strict JSON body reader for the public API: an empty body is an empty
/// object, bad JSON is a 400, and anything over the configured cap is a 413.
async fn read_json<T: DeserializeOwned + Default>(
    request: Request,
    max_size: usize,
) -> ApiResult<T> {
    if let Some(length) = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
    {
        if length > max_size {
            return Err(ApiError::PayloadTooLarge);
        }
    }

    let bytes = to_bytes(request.into_body(), max_size)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON: {}", err)))
}

/// Success envelope. The `data` key is omitted when there is nothing in it.
fn success<T: Serialize>(data: T, message: &str) -> Response {
    let data = json!(data);
    let mut body = json!({ "status": "success", "message": message });
    let empty = match &data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if !empty {
        body["data"] = data;
    }
    Json(body).into_response()
}

fn envelope_error(err: &ApiError) -> Response {
    (
        err.status(),
        Json(json!({ "status": "error", "message": err.public_message() })),
    )
        .into_response()
}
