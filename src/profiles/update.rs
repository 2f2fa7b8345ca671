use std::{path::Path, sync::Arc};

use axum::{
    body::Bytes,
    debug_handler,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    AppResult, AppState,
    config::Config,
    db::users::{self, ProfileUpdate},
    forms::{self, ProfileForm},
    include_res,
    res::{escape, render},
    session::{self, AuthUser},
};

#[debug_handler(state = AppState)]
pub(crate) async fn update_user_page(auth: AuthUser) -> AppResult<Response> {
    let form = ProfileForm {
        name: auth.user.name.clone(),
        username: auth.user.username.clone(),
        email: auth.user.email.clone(),
        bio: auth.user.bio.clone().unwrap_or_default(),
    };
    show_profile_form(&auth, &form).await
}

#[debug_handler(state = AppState)]
pub(crate) async fn update_user(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut form = ProfileForm::default();
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "avatar" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                // an untouched file input still sends an empty part
                if !file_name.is_empty() && !data.is_empty() {
                    upload = Some((file_name, data));
                }
            }
            "name" => form.name = field.text().await?,
            "username" => form.username = field.text().await?,
            "email" => form.email = field.text().await?,
            "bio" => form.bio = field.text().await?,
            _ => {}
        }
    }

    let (form, mut errors) = match form.clean() {
        Ok(form) => {
            let errors = forms::unique_errors(&db_pool, &form.username, &form.email, Some(auth.user.id)).await?;
            (form, errors)
        }
        Err(invalid) => invalid,
    };

    let avatar = match upload {
        Some((file_name, data)) => {
            let checked = data.clone();
            match tokio::task::spawn_blocking(move || forms::avatar_format(&file_name, &checked)).await? {
                Ok(ext) => Some((ext, data)),
                Err(error) => {
                    errors.push(error);
                    None
                }
            }
        }
        None => None,
    };

    if !errors.is_empty() {
        for error in errors {
            session::flash(&auth.session, error.to_string()).await?;
        }
        return show_profile_form(&auth, &form).await;
    }

    let avatar = save_profile(&db_pool, &config.media_dir, auth.user.id, &form, avatar).await?;

    if let (Some(_), Some(old)) = (&avatar, &auth.user.avatar) {
        if let Err(e) = tokio::fs::remove_file(config.media_dir.join(old)).await {
            tracing::warn!(file = %old, error = %e, "couldn't remove old avatar");
        }
    }

    Ok(Redirect::to(&format!("/profile/{}/", auth.user.id)).into_response())
}

/// Stores the new avatar, if any, then the profile. Returns the avatar's file
/// name. The file is removed again when the profile can't be saved.
async fn save_profile(
    db_pool: &SqlitePool,
    media_dir: &Path,
    user_id: Uuid,
    form: &ProfileForm,
    avatar: Option<(&'static str, Bytes)>,
) -> AppResult<Option<String>> {
    let file = match avatar {
        Some((ext, data)) => {
            let file = format!("{}.{ext}", Uuid::now_v7().simple());
            tokio::fs::write(media_dir.join(&file), &data).await?;
            Some(file)
        }
        None => None,
    };

    let saved = users::update_profile(db_pool, user_id, ProfileUpdate {
        name: &form.name,
        username: &form.username,
        email: &form.email,
        bio: form.bio(),
        avatar: file.as_deref(),
    })
    .await;

    if let Err(err) = saved {
        if let Some(file) = &file {
            if let Err(e) = tokio::fs::remove_file(media_dir.join(file)).await {
                tracing::warn!(file = %file, error = %e, "couldn't remove unused avatar");
            }
        }
        return Err(err.into());
    }

    Ok(file)
}

async fn show_profile_form(auth: &AuthUser, form: &ProfileForm) -> AppResult<Response> {
    let content = render(include_res!(str, "/pages/update_user.html"), &[
        ("avatar", &escape(&auth.user.avatar_url())),
        ("name", &escape(&form.name)),
        ("username", &escape(&form.username)),
        ("email", &escape(&form.email)),
        ("bio", &escape(&form.bio)),
    ]);
    auth.page("Edit profile", &content).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, testing};

    #[tokio::test]
    async fn failed_save_leaves_no_avatar_behind() {
        let db_pool = connect_in_memory().await.unwrap();
        let media = tempfile::tempdir().unwrap();
        let alice = testing::user(&db_pool, "alice").await;
        testing::user(&db_pool, "bob").await;

        // bob's email slipped in after the uniqueness check
        let form = ProfileForm {
            name: "Alice".into(),
            username: "alice".into(),
            email: "bob@example.com".into(),
            bio: String::new(),
        };
        let avatar = Some(("png", Bytes::from_static(b"pixels")));
        assert!(save_profile(&db_pool, media.path(), alice, &form, avatar).await.is_err());

        assert_eq!(std::fs::read_dir(media.path()).unwrap().count(), 0);
        let user = users::find(&db_pool, alice).await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(user.avatar.is_none());
    }

    #[tokio::test]
    async fn save_stores_avatar() {
        let db_pool = connect_in_memory().await.unwrap();
        let media = tempfile::tempdir().unwrap();
        let alice = testing::user(&db_pool, "alice").await;

        let form = ProfileForm {
            name: "Alice".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            bio: "hi".into(),
        };
        let avatar = Some(("png", Bytes::from_static(b"pixels")));
        let file = save_profile(&db_pool, media.path(), alice, &form, avatar).await.unwrap().unwrap();

        assert_eq!(std::fs::read(media.path().join(&file)).unwrap(), b"pixels");
        let user = users::find(&db_pool, alice).await.unwrap().unwrap();
        assert_eq!(user.avatar.as_deref(), Some(file.as_str()));
    }
}
