//! The dashboard API. Endpoints map method + final path segment to a
//! handler; responses are bare JSON values and errors render as
//! `{"error": "..."}` with the matching status.

use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::error::{ApiError, ApiResult};
use crate::file::UploadedFile;
use crate::models::activity::ActivityLog;
use crate::models::application::{ApplicationStatus, MembershipApplication, NewApplication};
use crate::models::banner::{Banner, BannerStatus, BannerUpdate};
use crate::models::committee::CommitteeRole;
use crate::models::dashboard::DashboardStats;
use crate::models::event::{Event, NewEvent};
use crate::models::gallery::GalleryImage;
use crate::models::member::{Member, NewMember};
use crate::models::notice::Notice;
use crate::models::session::Session;
use crate::models::user::{AdminUser, NewAdmin, Role};
use crate::routes::{lenient_json, AppState};
use crate::util;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route(
            "/notices",
            get(list_notices).post(create_notice).delete(delete_notice),
        )
        .route(
            "/events",
            get(list_events).post(create_event).delete(delete_event),
        )
        .route("/members", get(list_members).post(create_member))
        .route("/admins", get(list_admins).post(create_admin))
        .route("/payments", get(list_payments))
        .route("/users", get(list_users))
        .route(
            "/gallery",
            get(list_gallery)
                .post(upload_gallery_image)
                .delete(delete_gallery_image),
        )
        .route("/committee", get(list_committee))
        .route("/dashboard", get(dashboard))
        .route(
            "/membership-applications",
            get(list_applications)
                .post(create_application)
                .put(update_application),
        )
        .route(
            "/banners",
            get(list_banners)
                .post(upload_banner)
                .put(update_banner)
                .delete(delete_banner),
        )
        .route("/activity-logs", get(list_activity_logs))
        .method_not_allowed_fallback(method_not_allowed)
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[derive(Debug, Default, Deserialize)]
struct LoginInput {
    email: Option<String>,
    password: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let input: LoginInput = lenient_json(&body);
    let (email, password) = match (input.email, input.password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_owned(),
            ))
        }
    };

    // Same generic failure for unknown, inactive, and wrong-password cases.
    let user = AdminUser::for_login(&email, &state.pool)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    if !bcrypt::verify(&password, &user.pass_hash).unwrap_or(false) {
        return Err(ApiError::InvalidCredentials);
    }

    let session = Session::create(user.user_id, state.config.session_ttl_hours, &state.pool).await?;
    AdminUser::update_last_login(user.user_id, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(user.user_id),
        "User logged in",
        &auth::client_ip(&headers),
    )
    .await;

    let account = AdminUser::with_id(user.user_id, &state.pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": session.token,
        "user": account,
    })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    // Logout always succeeds, even for tokens that never existed.
    if let Some(token) = auth::bearer_token(&headers) {
        if let Err(err) = Session::delete_by_token(token, &state.pool).await {
            tracing::warn!("logout cleanup failed: {err}");
        }
    }
    Json(json!({ "success": true, "message": "Logout successful" }))
}

async fn list_notices(State(state): State<AppState>) -> ApiResult<Json<Vec<Notice>>> {
    Ok(Json(Notice::published(&state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct NoticeInput {
    title: Option<String>,
    content: Option<String>,
}

async fn create_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Notice>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: NoticeInput = lenient_json(&body);
    let (title, content) = match (input.title, input.content) {
        (Some(title), Some(content)) if !title.is_empty() => (title, content),
        _ => {
            return Err(ApiError::BadRequest(
                "Title and content are required".to_owned(),
            ))
        }
    };

    let notice = Notice::create(&title, &content, session.user_id, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Created notice: {}", title),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(notice))
}

#[derive(Debug, Default, Deserialize)]
struct NoticeDeleteInput {
    notice_id: Option<i64>,
}

async fn delete_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: NoticeDeleteInput = lenient_json(&body);
    let notice_id = input
        .notice_id
        .ok_or_else(|| ApiError::BadRequest("Notice ID is required".to_owned()))?;

    if !Notice::delete(notice_id, &state.pool).await? {
        return Err(ApiError::NotFound("Notice not found".to_owned()));
    }
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Deleted notice ID: {}", notice_id),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Notice deleted successfully",
    })))
}

async fn list_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(Event::all(&state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct EventInput {
    title: Option<String>,
    name: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    date: Option<String>,
    time: Option<String>,
    organized_by: Option<i64>,
}

impl EventInput {
    /// The dashboard sends either explicit start/end datetimes or a bare
    /// `date` plus optional `time`; both forms are accepted.
    fn resolve_range(
        &self,
    ) -> ApiResult<(Option<time::OffsetDateTime>, Option<time::OffsetDateTime>)> {
        let start = match (&self.start_date, &self.date) {
            (Some(start), _) => Some(util::parse_datetime(start)?),
            (None, Some(date)) => Some(util::parse_datetime(&format!(
                "{} {}",
                date,
                self.time.as_deref().unwrap_or("00:00:00")
            ))?),
            (None, None) => None,
        };
        let end = match (&self.end_date, &self.date) {
            (Some(end), _) => Some(util::parse_datetime(end)?),
            (None, Some(date)) => Some(util::parse_datetime(&format!(
                "{} {}",
                date,
                self.time.as_deref().unwrap_or("23:59:59")
            ))?),
            (None, None) => None,
        };
        Ok((start, end))
    }
}

async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Event>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: EventInput = lenient_json(&body);

    let title = input
        .title
        .clone()
        .or_else(|| input.name.clone())
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Event title is required".to_owned()))?;
    let (start_date, end_date) = input.resolve_range()?;

    let new = NewEvent {
        title: title.clone(),
        description: input.description.unwrap_or_default(),
        location: input.location.unwrap_or_default(),
        start_date,
        end_date,
        organized_by: input.organized_by.or(session.member_id),
    };
    let event = Event::create(&new, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Created event: {}", title),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(event))
}

#[derive(Debug, Default, Deserialize)]
struct EventDeleteInput {
    event_id: Option<i64>,
}

async fn delete_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: EventDeleteInput = lenient_json(&body);
    let event_id = input
        .event_id
        .ok_or_else(|| ApiError::BadRequest("Event ID is required".to_owned()))?;

    if !Event::delete(event_id, &state.pool).await? {
        return Err(ApiError::NotFound("Event not found".to_owned()));
    }
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Deleted event ID: {}", event_id),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Event deleted successfully",
    })))
}

async fn list_members(State(state): State<AppState>) -> ApiResult<Json<Vec<Member>>> {
    Ok(Json(Member::active(&state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct MemberInput {
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    designation: Option<String>,
    membership_type: Option<String>,
    joined_date: Option<String>,
    status: Option<String>,
}

async fn create_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Member>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: MemberInput = lenient_json(&body);

    let full_name = input
        .full_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Full name and email are required".to_owned()))?;
    let email = input
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Full name and email are required".to_owned()))?;
    let joined_date = match input.joined_date.filter(|date| !date.is_empty()) {
        Some(date) => util::parse_date(&date)?,
        None => util::today(),
    };

    let new = NewMember {
        full_name: full_name.clone(),
        email: Some(email),
        phone: input.phone.unwrap_or_default(),
        address: input.address.unwrap_or_default(),
        designation: input.designation.unwrap_or_default(),
        membership_type: input.membership_type.unwrap_or_else(|| "General".to_owned()),
        profile_image: None,
        joined_date,
        status: input.status.unwrap_or_else(|| "Active".to_owned()),
    };
    let member = Member::create(&new, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Created member: {}", full_name),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(member))
}

async fn list_admins(State(state): State<AppState>) -> ApiResult<Json<Vec<AdminUser>>> {
    Ok(Json(AdminUser::admins(&state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct AdminInput {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<Role>,
    member_id: Option<i64>,
    full_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    designation: Option<String>,
}

async fn create_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AdminUser>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    session.require_role(
        &[Role::SuperAdmin],
        "Forbidden - Only Super Admin can create admins",
    )?;

    let input: AdminInput = lenient_json(&body);
    let (username, email, password) = match (input.username, input.email, input.password) {
        (Some(username), Some(email), Some(password)) if !username.is_empty() => {
            (username, email, password)
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Username, email, and password are required".to_owned(),
            ))
        }
    };
    if input.member_id.is_none() && input.full_name.as_deref().unwrap_or("").is_empty() {
        return Err(ApiError::BadRequest(
            "Full name is required when creating a new member".to_owned(),
        ));
    }

    let new = NewAdmin {
        username: username.clone(),
        email,
        password,
        role: input.role.unwrap_or(Role::Admin),
        member_id: input.member_id,
        full_name: input.full_name,
        phone: input.phone.unwrap_or_default(),
        address: input.address.unwrap_or_default(),
        designation: input.designation.unwrap_or_default(),
    };
    let admin = AdminUser::create_admin(new, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Created admin: {}", username),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(admin))
}

/// Dues tracking never made it past the schema; the listing is an
/// intentional stub.
async fn list_payments() -> Json<Value> {
    Json(json!([]))
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<AdminUser>>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    session.require_role(
        &[Role::SuperAdmin, Role::Admin],
        "Forbidden - Insufficient permissions",
    )?;

    Ok(Json(AdminUser::all(&state.pool).await?))
}

async fn list_gallery(State(state): State<AppState>) -> ApiResult<Json<Vec<GalleryImage>>> {
    Ok(Json(GalleryImage::all(&state.pool).await?))
}

#[axum::debug_handler]
#[tracing::instrument(skip_all)]
async fn upload_gallery_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let session = auth::require_session(&headers, &state.pool).await?;

    let mut title = String::new();
    let mut description = String::new();
    let mut event_id = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => title = field.text().await.map_err(bad_multipart)?,
            Some("description") => description = field.text().await.map_err(bad_multipart)?,
            Some("event_id") => {
                let text = field.text().await.map_err(bad_multipart)?;
                if !text.is_empty() {
                    event_id = Some(text.parse::<i64>().map_err(|_| {
                        ApiError::BadRequest("Invalid event_id".to_owned())
                    })?);
                }
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content = field.bytes().await.map_err(bad_multipart)?.to_vec();
                image = Some(UploadedFile { file_name, content });
            }
            _ => {}
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("No image file uploaded".to_owned()))?;
    let image_path = image.save(&state.config, "gallery")?;

    let created = GalleryImage::create(
        &title,
        &description,
        &image_path,
        session.user_id,
        event_id,
        &state.pool,
    )
    .await?;
    let label = if title.is_empty() { "Untitled" } else { &title };
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Uploaded gallery image: {}", label),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(json!({ "success": true, "data": created })))
}

#[derive(Debug, Default, Deserialize)]
struct GalleryDeleteInput {
    image_id: Option<i64>,
}

async fn delete_gallery_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: GalleryDeleteInput = lenient_json(&body);
    let image_id = input
        .image_id
        .ok_or_else(|| ApiError::BadRequest("Image ID is required".to_owned()))?;

    if !GalleryImage::delete(image_id, &state.pool).await? {
        return Err(ApiError::NotFound("Image not found".to_owned()));
    }
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Deleted gallery image ID: {}", image_id),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Image deleted successfully",
    })))
}

async fn list_committee(State(state): State<AppState>) -> ApiResult<Json<Vec<CommitteeRole>>> {
    Ok(Json(CommitteeRole::active(&state.pool).await?))
}

async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DashboardStats>> {
    auth::require_session(&headers, &state.pool).await?;
    Ok(Json(DashboardStats::load(&state.pool).await?))
}

async fn list_applications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MembershipApplication>>> {
    Ok(Json(MembershipApplication::all(&state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationInput {
    full_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    designation: Option<String>,
    membership_type: Option<String>,
    notes: Option<String>,
}

/// Applications submitted through the dashboard form; like the public form,
/// this path takes no authentication.
async fn create_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<MembershipApplication>> {
    let input: ApplicationInput = lenient_json(&body);
    let (full_name, email) = match (input.full_name, input.email) {
        (Some(full_name), Some(email)) if !full_name.is_empty() => (full_name, email),
        _ => {
            return Err(ApiError::BadRequest(
                "Full name and email are required".to_owned(),
            ))
        }
    };

    let new = NewApplication {
        full_name,
        email,
        phone: input.phone.unwrap_or_default(),
        address: input.address.unwrap_or_default(),
        designation: input.designation.unwrap_or_default(),
        membership_type: input.membership_type.unwrap_or_else(|| "General".to_owned()),
        notes: input.notes.unwrap_or_default(),
        ip_address: auth::client_ip(&headers),
        ..NewApplication::default()
    };
    Ok(Json(MembershipApplication::create(&new, &state.pool).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ApplicationUpdateInput {
    application_id: Option<i64>,
    status: Option<ApplicationStatus>,
    notes: Option<String>,
    rejection_reason: Option<String>,
}

async fn update_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<MembershipApplication>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: ApplicationUpdateInput = lenient_json(&body);
    let application_id = input
        .application_id
        .ok_or_else(|| ApiError::BadRequest("Application ID is required".to_owned()))?;
    let status = input
        .status
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_owned()))?;

    let updated = MembershipApplication::update_status(
        application_id,
        status,
        input.notes.as_deref(),
        input.rejection_reason.as_deref(),
        &state.pool,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Application not found".to_owned()))?;

    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Updated application status to: {}", status),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(updated))
}

async fn list_banners(State(state): State<AppState>) -> ApiResult<Json<Vec<Banner>>> {
    Ok(Json(Banner::all(&state.pool).await?))
}

#[axum::debug_handler]
#[tracing::instrument(skip_all)]
async fn upload_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<Banner>> {
    let session = auth::require_session(&headers, &state.pool).await?;

    let mut title = "New Banner".to_owned();
    let mut status = BannerStatus::Inactive;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => {
                let text = field.text().await.map_err(bad_multipart)?;
                if !text.is_empty() {
                    title = text;
                }
            }
            Some("status") => {
                if field.text().await.map_err(bad_multipart)? == "active" {
                    status = BannerStatus::Active;
                }
            }
            Some("image") => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content = field.bytes().await.map_err(bad_multipart)?.to_vec();
                image = Some(UploadedFile { file_name, content });
            }
            _ => {}
        }
    }

    let image =
        image.ok_or_else(|| ApiError::BadRequest("No banner image uploaded".to_owned()))?;
    let image_path = image.save(&state.config, "banners")?;

    let banner = Banner::create(&title, &image_path, status, session.user_id, &state.pool).await?;
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Uploaded banner: {}", title),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(banner))
}

#[derive(Debug, Default, Deserialize)]
struct BannerUpdateInput {
    banner_id: Option<i64>,
    #[serde(flatten)]
    update: BannerUpdate,
}

async fn update_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Banner>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: BannerUpdateInput = lenient_json(&body);
    let banner_id = input
        .banner_id
        .ok_or_else(|| ApiError::BadRequest("Banner ID is required".to_owned()))?;

    let banner = Banner::update(banner_id, &input.update, &state.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Banner not found".to_owned()))?;

    let label = input
        .update
        .title
        .clone()
        .unwrap_or_else(|| format!("ID: {}", banner_id));
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Updated banner: {}", label),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(banner))
}

#[derive(Debug, Default, Deserialize)]
struct BannerDeleteInput {
    banner_id: Option<i64>,
}

async fn delete_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let session = auth::require_session(&headers, &state.pool).await?;
    let input: BannerDeleteInput = lenient_json(&body);
    let banner_id = input
        .banner_id
        .ok_or_else(|| ApiError::BadRequest("Banner ID is required".to_owned()))?;

    if !Banner::delete(banner_id, &state.pool).await? {
        return Err(ApiError::NotFound("Banner not found".to_owned()));
    }
    ActivityLog::record(
        &state.pool,
        Some(session.user_id),
        &format!("Deleted banner ID: {}", banner_id),
        &auth::client_ip(&headers),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Banner deleted successfully",
    })))
}

#[derive(Debug, Default, Deserialize)]
struct ActivityLogQuery {
    user_id: Option<i64>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_activity_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ActivityLogQuery>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    auth::require_session(&headers, &state.pool).await?;

    let logs = ActivityLog::list(
        query.user_id,
        query.limit.unwrap_or(100),
        query.offset.unwrap_or(0),
        &state.pool,
    )
    .await?;
    Ok(Json(logs))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err))
}
