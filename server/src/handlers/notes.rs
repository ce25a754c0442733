//! Note routes
//!
//! Browsing, upload, download, the owner's profile and deletion.

use super::auth::CurrentUser;
use crate::app::AppState;
use crate::config::LISTING_LIMIT;
use crate::database::{Note, NoteFilter, NoteId, SortOrder, User};
use crate::error::{AppError, Result};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sort: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingResponse {
    pub notes: Vec<Note>,
    pub categories: Vec<String>,
    pub q: String,
    pub category: String,
    pub sort: SortOrder,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub notes: Vec<Note>,
}

/// Browse and search the catalog
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>> {
    let q = params.q.trim().to_string();
    let category = params.category.trim().to_string();
    let sort = SortOrder::parse(&params.sort);

    let filter = NoteFilter {
        text: Some(q.clone()),
        category: Some(category.clone()),
    };
    let notes = state
        .listing
        .list(filter, sort, LISTING_LIMIT as usize)
        .await?;

    Ok(Json(ListingResponse {
        notes,
        categories: state.catalog.rules().categories().to_vec(),
        q,
        category,
        sort,
    }))
}

pub async fn notes_redirect() -> Redirect {
    Redirect::to("/")
}

/// Multipart upload with `title`, `description`, `category` and `file` fields
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let mut title = String::new();
    let mut description = String::new();
    let mut category = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "title" | "description" | "category" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                match name.as_str() {
                    "title" => title = text,
                    "description" => description = text,
                    _ => category = text,
                }
            }
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, data) = file.unwrap_or_default();

    state
        .catalog
        .create(
            user.user_id,
            &title,
            Some(description.as_str()),
            &category,
            &filename,
            &data,
        )
        .await?;

    Ok(Redirect::to("/"))
}

/// Serve a note's file as an attachment and count the download
pub async fn download(State(state): State<AppState>, Path(note_id): Path<NoteId>) -> Result<Response> {
    let download = state.catalog.record_download(note_id).await?;
    let filename = &download.note.original_filename;

    let content_type = mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.data,
    )
        .into_response())
}

/// The caller's own notes, newest first
pub async fn profile(State(state): State<AppState>, user: CurrentUser) -> Result<Json<ProfileResponse>> {
    let account = state
        .identity
        .get_user(user.user_id)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let notes = state.catalog.notes_owned_by(user.user_id).await?;

    Ok(Json(ProfileResponse { user: account, notes }))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(note_id): Path<NoteId>,
) -> Result<Redirect> {
    state.catalog.delete(note_id, user.user_id).await?;

    Ok(Redirect::to("/profile"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_state;
    use crate::handlers::auth::SESSION_COOKIE;
    use crate::handlers::router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "notehub-test-boundary";

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((filename, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn upload_request(token: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
            .body(Body::from(body))
            .unwrap()
    }

    async fn logged_in(state: &AppState, email: &str) -> (i64, String) {
        let user = state.identity.register("User", email, "pw").await.unwrap();
        let token = state.sessions.open(user.id).await;
        (user.id, token)
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_list_and_download() {
        let (state, _temp) = test_state().await;
        let (_, token) = logged_in(&state, "ada@x.com").await;
        let app = router(state.clone());

        let body = multipart_body(
            &[
                ("title", "Lecture 1"),
                ("description", "Limits and continuity"),
                ("category", "Mathematics"),
            ],
            Some(("slides.pdf", b"%PDF-1.4 content")),
        );
        let response = app.clone().oneshot(upload_request(&token, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/?category=Mathematics&sort=recent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listing: ListingResponse = json_body(response).await;
        assert_eq!(listing.notes.len(), 1);
        assert_eq!(listing.notes[0].title, "Lecture 1");
        assert_eq!(listing.category, "Mathematics");
        assert_eq!(listing.sort, SortOrder::Recent);
        let note_id = listing.notes[0].id;

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/download/{}", note_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"slides.pdf\""
        );
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4 content");

        assert_eq!(state.catalog.get(note_id).await.unwrap().download_count, 1);
    }

    #[tokio::test]
    async fn test_upload_requires_login() {
        let (state, _temp) = test_state().await;

        let body = multipart_body(
            &[("title", "T"), ("category", "Other")],
            Some(("a.txt", b"a")),
        );
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", BOUNDARY),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_extension() {
        let (state, _temp) = test_state().await;
        let (user_id, token) = logged_in(&state, "ada@x.com").await;

        let body = multipart_body(
            &[("title", "Free stuff"), ("category", "Other")],
            Some(("virus.exe", b"MZ")),
        );
        let response = router(state.clone())
            .oneshot(upload_request(&token, body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: serde_json::Value = json_body(response).await;
        assert_eq!(error["kind"], "invalid_extension");
        assert!(state.catalog.notes_owned_by(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_file_is_missing_field() {
        let (state, _temp) = test_state().await;
        let (_, token) = logged_in(&state, "ada@x.com").await;

        let body = multipart_body(&[("title", "No file"), ("category", "Other")], None);
        let response = router(state).oneshot(upload_request(&token, body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: serde_json::Value = json_body(response).await;
        assert_eq!(error["kind"], "missing_field");
    }

    #[tokio::test]
    async fn test_download_missing_and_broken() {
        let (state, _temp) = test_state().await;
        let (user_id, _) = logged_in(&state, "ada@x.com").await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/download/999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let note = state
            .catalog
            .create(user_id, "Lost", None, "Other", "lost.txt", b"gone")
            .await
            .unwrap();
        state
            .catalog
            .blob_store()
            .delete(&note.stored_filename)
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/download/{}", note.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        let error: serde_json::Value = json_body(response).await;
        assert_eq!(error["kind"], "broken_reference");
    }

    #[tokio::test]
    async fn test_delete_checks_ownership() {
        let (state, _temp) = test_state().await;
        let (owner_id, owner_token) = logged_in(&state, "ada@x.com").await;
        let (_, other_token) = logged_in(&state, "bob@x.com").await;
        let app = router(state.clone());

        let note = state
            .catalog
            .create(owner_id, "Mine", None, "Other", "mine.txt", b"mine")
            .await
            .unwrap();

        let delete_as = |token: &str| {
            Request::builder()
                .method("POST")
                .uri(format!("/delete/{}", note.id))
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete_as(&other_token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.catalog.get(note.id).await.is_ok());

        let response = app.clone().oneshot(delete_as(&owner_token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/profile");

        let response = app.oneshot(delete_as(&owner_token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_profile_lists_own_notes() {
        let (state, _temp) = test_state().await;
        let (owner_id, token) = logged_in(&state, "ada@x.com").await;
        let (other_id, _) = logged_in(&state, "bob@x.com").await;

        state
            .catalog
            .create(owner_id, "Mine", None, "Other", "mine.txt", b"m")
            .await
            .unwrap();
        state
            .catalog
            .create(other_id, "Theirs", None, "Other", "theirs.txt", b"t")
            .await
            .unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/profile")
                    .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let profile: serde_json::Value = json_body(response).await;
        assert_eq!(profile["user"]["email"], "ada@x.com");
        assert!(profile["user"].get("password_hash").is_none());
        assert_eq!(profile["notes"].as_array().unwrap().len(), 1);
        assert_eq!(profile["notes"][0]["title"], "Mine");
    }

    #[tokio::test]
    async fn test_listing_search_and_defaults() {
        let (state, _temp) = test_state().await;
        let (user_id, _) = logged_in(&state, "ada@x.com").await;
        state
            .catalog
            .create(user_id, "Thermodynamics", Some("heat engines"), "Physics", "t.pdf", b"t")
            .await
            .unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/?q=%20HEAT%20&sort=popular")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let listing: ListingResponse = json_body(response).await;
        assert_eq!(listing.q, "HEAT");
        assert_eq!(listing.sort, SortOrder::Popular);
        assert_eq!(listing.notes.len(), 1);
        assert_eq!(listing.categories.len(), crate::config::CATEGORIES.len());
    }

    #[tokio::test]
    async fn test_notes_route_redirects_home() {
        let (state, _temp) = test_state().await;

        let response = router(state)
            .oneshot(Request::builder().uri("/notes").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }
}
