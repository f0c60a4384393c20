use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_USER},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.clone()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(ROLE_USER.to_string()),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        phone: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::on_unique(e, "Email is already taken"))?;

    audit::record(
        &state.pool,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User created",
        user_from_entity(user),
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    payload.validate()?;
    let email = payload.email.trim().to_lowercase();

    let user = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    let token = issue_token(&state.config, user.id, &user.role)?;

    audit::record(
        &state.pool,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token },
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::ok(user_from_entity(model)))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: UserActive = model.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    let model = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Profile updated",
        user_from_entity(model),
        Some(Meta::empty()),
    ))
}

pub(crate) fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        email: model.email,
        role: model.role,
        first_name: model.first_name,
        last_name: model.last_name,
        phone: model.phone,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NovaPoshtaConfig;
    use crate::middleware::auth::decode_token;

    fn config() -> AppConfig {
        AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            upload_dir: "uploads".into(),
            max_upload_bytes: 1024,
            nova_poshta: NovaPoshtaConfig {
                api_url: String::new(),
                api_key: String::new(),
                cache_ttl_secs: 1,
            },
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").expect("hash");
        assert!(verify_password("hunter22", &hash).expect("verify"));
        assert!(!verify_password("hunter23", &hash).expect("verify"));
    }

    #[test]
    fn issued_token_decodes_to_same_user() {
        let config = config();
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, "admin").expect("token");
        let user = decode_token(&token, &config.jwt_secret).expect("decode");
        assert_eq!(user.user_id, id);
        assert_eq!(user.role, "admin");
    }
}
