use axum::{
    Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use cryptodash::{Error, ProfileUpdate, RepositoryProvider};
use cryptodash_core::error::ValidationError;

use crate::{
    error::{ApiError, Result},
    extractors::{AuthUser, BaseUrl},
    middleware::AppState,
    types::{AvatarResponse, UserResponse},
};

/// Multipart field carrying the image.
pub const AVATAR_FIELD: &str = "avatar";

pub async fn me_handler<R>(
    State(_state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    BaseUrl(base): BaseUrl,
) -> Json<UserResponse>
where
    R: RepositoryProvider,
{
    Json(UserResponse::new(&current.user, &base))
}

pub async fn update_me_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    BaseUrl(base): BaseUrl,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>>
where
    R: RepositoryProvider,
{
    let user = state.dash.update_profile(&current.user.id, &update).await?;
    Ok(Json(UserResponse::new(&user, &base)))
}

pub async fn upload_avatar_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    BaseUrl(base): BaseUrl,
    mut multipart: Multipart,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;

        let user = state
            .dash
            .upload_avatar(&current.user.id, file_name.as_deref(), &data)
            .await?;
        let avatar_url = UserResponse::new(&user, &base)
            .avatar_url
            .unwrap_or_default();

        return Ok(Json(AvatarResponse { avatar_url }));
    }

    Err(Error::Validation(ValidationError::NoFileUploaded).into())
}
