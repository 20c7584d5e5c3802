use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::CatalogService;
use crate::store::SharedStore;

/// Claims issued by the identity provider. `sub` is the profile id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
}

/// Shared-secret settings used to verify access tokens. Held in Rocket managed state.
pub struct AuthSettings {
    encoding: EncodingKey,
    decoding: DecodingKey,
    audience: String,
}

impl AuthSettings {
    pub fn new(secret: &str, audience: &str) -> Self {
        AuthSettings {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            audience: audience.to_string(),
        }
    }
}

/// The signed-in user making the request. Their profile row exists once the
/// guard succeeds, so owned rows can reference it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug)]
pub enum AuthError {
    Missing,
    Invalid,
    Unconfigured,
    Profile,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(settings) = request.rocket().state::<AuthSettings>() else {
            tracing::error!("auth settings are not managed by this instance");
            return Outcome::Error((Status::InternalServerError, AuthError::Unconfigured));
        };

        let user = match request.headers().get_one("Authorization") {
            Some(header) => match header.strip_prefix("Bearer ") {
                Some(token) => match validate_token(settings, token) {
                    Ok(claims) => AuthUser {
                        id: claims.sub,
                        email: claims.email,
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, "rejected access token");
                        return Outcome::Error((Status::Unauthorized, AuthError::Invalid));
                    }
                },
                None => return Outcome::Error((Status::Unauthorized, AuthError::Invalid)),
            },
            None => return Outcome::Error((Status::Unauthorized, AuthError::Missing)),
        };

        let Some(store) = request.rocket().state::<SharedStore>() else {
            tracing::error!("storage is not managed by this instance");
            return Outcome::Error((Status::InternalServerError, AuthError::Unconfigured));
        };
        match CatalogService::new(store.as_ref()).ensure_profile(&user).await {
            Ok(_) => Outcome::Success(user),
            Err(e) => {
                tracing::error!(user = %user.id, error = %e, "could not load profile");
                Outcome::Error((Status::InternalServerError, AuthError::Profile))
            }
        }
    }
}

/// Mints a token the way the identity provider does.
pub fn issue_token(
    settings: &AuthSettings,
    user_id: Uuid,
    email: Option<&str>,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        email: email.map(str::to_string),
        aud: settings.audience.clone(),
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
    };

    encode(&Header::new(Algorithm::HS256), &claims, &settings.encoding)
}

pub fn validate_token(
    settings: &AuthSettings,
    token: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[settings.audience.as_str()]);

    let token_data = decode::<Claims>(token, &settings.decoding, &validation)?;
    Ok(token_data.claims)
}
