use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    config::AppConfig,
    dto::auth::{
        AccessToken, AuthTokens, ChangePasswordRequest, Claims, LoginRequest, RefreshRequest,
        RegisterRequest, TokenInfo, TokenType, UpdateProfileRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, decode_token},
    models::{ROLE_CUSTOMER, User},
    response::{ApiResponse, Empty, Meta},
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(
    config: &AppConfig,
    user_id: Uuid,
    role: &str,
    token_type: TokenType,
) -> AppResult<String> {
    let ttl = match token_type {
        TokenType::Access => Duration::minutes(config.access_token_ttl_minutes),
        TokenType::Refresh => Duration::days(config.refresh_token_ttl_days),
    };
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        token_type,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn issue_pair(config: &AppConfig, user: UserModel) -> AppResult<AuthTokens> {
    Ok(AuthTokens {
        access_token: issue_token(config, user.id, &user.role, TokenType::Access)?,
        refresh_token: issue_token(config, user.id, &user.role, TokenType::Refresh)?,
        token_type: "bearer".into(),
        user: User::from(user),
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Treats blank optional profile fields as cleared.
fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthTokens>> {
    let email = normalize_email(&payload.email);
    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email is already taken".to_string()));
    }

    let password_hash = hash_password(&payload.password)?;
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        contact_number: Set(payload.contact_number.and_then(non_blank)),
        shipping_address: Set(payload.shipping_address.and_then(non_blank)),
        preference: Set(payload.preference.and_then(non_blank)),
        role: Set(ROLE_CUSTOMER.to_string()),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Email is already taken"))?;

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let tokens = issue_pair(&state.config, user)?;
    Ok(ApiResponse::success("User created", tokens, None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthTokens>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("Invalid email or password".into())),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("Account has been disabled".into()));
    }

    audit::record(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let tokens = issue_pair(&state.config, user)?;
    Ok(ApiResponse::success("Logged in", tokens, Some(Meta::empty())))
}

pub async fn refresh_token(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<AccessToken>> {
    let claims = decode_token(
        &state.config.jwt_secret,
        &payload.refresh_token,
        TokenType::Refresh,
    )?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or disabled".into()))?;

    // Role comes from the current row so promotions and demotions take effect on refresh.
    let access_token = issue_token(&state.config, user.id, &user.role, TokenType::Access)?;
    Ok(ApiResponse::success(
        "Token refreshed",
        AccessToken {
            access_token,
            token_type: "bearer".into(),
        },
        None,
    ))
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = find_user(state, user.user_id).await?;
    Ok(ApiResponse::success("Profile", User::from(model), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = find_user(state, user.user_id).await?;

    let mut active: UserActive = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(contact_number) = payload.contact_number {
        active.contact_number = Set(non_blank(contact_number));
    }
    if let Some(shipping_address) = payload.shipping_address {
        active.shipping_address = Set(non_blank(shipping_address));
    }
    if let Some(preference) = payload.preference {
        active.preference = Set(non_blank(preference));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "profile_update",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success("Profile updated", User::from(updated), None))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<Empty>> {
    let existing = find_user(state, user.user_id).await?;
    if !verify_password(&payload.current_password, &existing.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success("Password updated", Empty::default(), None))
}

/// Tokens are stateless; logging out only leaves an audit entry.
pub async fn logout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Empty>> {
    audit::record(
        state,
        Some(user.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;
    Ok(ApiResponse::success("Logged out", Empty::default(), None))
}

pub fn verify(user: &AuthUser) -> ApiResponse<TokenInfo> {
    ApiResponse::success(
        "Token valid",
        TokenInfo {
            user_id: user.user_id,
            role: user.role.clone(),
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingPolicy;

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/unused".into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_days: 7,
            pricing: PricingPolicy::default(),
            cors_allowed_origin: None,
        }
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn access_token_round_trip() {
        let config = config();
        let id = Uuid::new_v4();
        let token = issue_token(&config, id, ROLE_CUSTOMER, TokenType::Access).unwrap();
        let claims = decode_token(&config.jwt_secret, &token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.role, ROLE_CUSTOMER);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = config();
        let token =
            issue_token(&config, Uuid::new_v4(), ROLE_CUSTOMER, TokenType::Refresh).unwrap();
        assert!(matches!(
            decode_token(&config.jwt_secret, &token, TokenType::Access),
            Err(AppError::Unauthorized(_))
        ));
        assert!(decode_token(&config.jwt_secret, &token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = config();
        let token = issue_token(&config, Uuid::new_v4(), ROLE_CUSTOMER, TokenType::Access).unwrap();
        assert!(decode_token("another-secret", &token, TokenType::Access).is_err());
    }

    #[test]
    fn blank_optional_fields_are_cleared() {
        assert_eq!(non_blank("   ".into()), None);
        assert_eq!(non_blank(" 0400 000 000 ".into()), Some("0400 000 000".into()));
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }
}
