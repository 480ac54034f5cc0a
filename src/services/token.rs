use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::error::{AppError, Result};
use crate::models::{Claims, TokenKind, TokenPair};

/// Mints and verifies signed access/refresh tokens
pub struct TokenService;

impl TokenService {
    /// Issue an access/refresh pair, signing both tokens concurrently
    pub async fn issue_pair(user_id: &str, email: &str, jwt: &JwtConfig) -> Result<TokenPair> {
        let access_claims = Self::claims_for(user_id, email, TokenKind::Access, jwt);
        let refresh_claims = Self::claims_for(user_id, email, TokenKind::Refresh, jwt);
        let access_secret = jwt.access_secret.clone();
        let refresh_secret = jwt.refresh_secret.clone();

        let access = tokio::task::spawn_blocking(move || Self::sign(&access_claims, &access_secret));
        let refresh =
            tokio::task::spawn_blocking(move || Self::sign(&refresh_claims, &refresh_secret));

        let (access_token, refresh_token) = tokio::try_join!(access, refresh)
            .map_err(|e| AppError::Internal(format!("Token signing task failed: {}", e)))?;

        Ok(TokenPair {
            access_token: access_token?,
            refresh_token: refresh_token?,
        })
    }

    /// Verify signature, expiry and token class
    pub fn verify(token: &str, kind: TokenKind, jwt: &JwtConfig) -> Result<Claims> {
        let secret = Self::secret_for(kind, jwt);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("Rejected {:?} token: {}", kind, e);
            AppError::Unauthorized("Invalid token".to_string())
        })?
        .claims;

        if claims.kind != kind {
            tracing::debug!("Rejected token of kind {:?}, expected {:?}", claims.kind, kind);
            return Err(AppError::Unauthorized("Invalid token".to_string()));
        }

        Ok(claims)
    }

    pub fn sign(claims: &Claims, secret: &str) -> Result<String> {
        let token = encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    fn claims_for(user_id: &str, email: &str, kind: TokenKind, jwt: &JwtConfig) -> Claims {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(jwt.access_token_expire_minutes as i64),
            TokenKind::Refresh => Duration::days(jwt.refresh_token_expire_days as i64),
        };

        Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            kind,
            jti: Uuid::new_v4().to_string(),
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    fn secret_for(kind: TokenKind, jwt: &JwtConfig) -> &str {
        match kind {
            TokenKind::Access => &jwt.access_secret,
            TokenKind::Refresh => &jwt.refresh_secret,
        }
    }
}
