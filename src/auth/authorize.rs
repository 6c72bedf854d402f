use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::{
    auth::BearerToken,
    database::{UserDatabase, UserRepository},
    models::User,
    EmporiumError, Result,
};

/// Resolves the `Authorization` header to the account holding that token
#[tracing::instrument(skip(header, pool))]
pub async fn authenticate<DB: UserRepository>(
    header: Option<String>,
    pool: &PgPool,
) -> Result<User> {
    let header = header.ok_or(EmporiumError::Unauthorized)?;
    let token = BearerToken::try_from(header)?;
    User::find_by_token::<DB>(&token, pool)
        .await
        .map_err(|e| match e {
            EmporiumError::NotFound => {
                warn!("bearer token did not match any account");
                EmporiumError::InvalidToken("Token did not match what was expected".to_string())
            }
            e => e,
        })
}

pub fn require_admin(user: User) -> Result<User> {
    if !user.is_admin() {
        warn!(user_id = %user.id, "non-admin attempted an admin action");
        return Err(EmporiumError::Forbidden);
    }
    Ok(user)
}

fn authorization_header(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn pool(req: &HttpRequest) -> Result<web::Data<PgPool>> {
    req.app_data::<web::Data<PgPool>>().cloned().ok_or_else(|| {
        error!("no database pool registered on the app");
        EmporiumError::ServerError("database pool missing".to_string())
    })
}

/// Any signed-in account
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = EmporiumError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = authorization_header(req);
        let pool = pool(req);
        Box::pin(async move {
            let pool = pool?;
            let user = authenticate::<UserDatabase>(header, pool.get_ref()).await?;
            Ok(Self(user))
        })
    }
}

/// A signed-in account with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = EmporiumError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = authorization_header(req);
        let pool = pool(req);
        Box::pin(async move {
            let pool = pool?;
            let user = authenticate::<UserDatabase>(header, pool.get_ref()).await?;
            Ok(Self(require_admin(user)?))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use claim::{assert_err, assert_ok};

    use crate::{
        models::Role,
        test_helpers::{lazy_pool, seed_user, set_role, MockUserDatabase, USERS},
    };

    fn token_for(id: uuid::Uuid) -> String {
        USERS.with(|users| users.borrow()[&id].token.clone().unwrap())
    }

    #[tokio::test]
    async fn resolves_a_valid_token() {
        let pool = lazy_pool();
        let id = seed_user("ada@example.com", "password1234");
        let header = format!("Bearer {}", token_for(id));
        let user = authenticate::<MockUserDatabase>(Some(header), &pool).await;
        assert_ok!(&user);
        assert_eq!(user.unwrap().id, id);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let pool = lazy_pool();
        let result = authenticate::<MockUserDatabase>(None, &pool).await;
        assert_eq!(result.unwrap_err(), EmporiumError::Unauthorized);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let pool = lazy_pool();
        let result =
            authenticate::<MockUserDatabase>(Some("Bearer not-a-real-token".into()), &pool).await;
        assert_eq!(
            result.unwrap_err(),
            EmporiumError::InvalidToken("Token did not match what was expected".to_string())
        );
    }

    #[tokio::test]
    async fn admin_check_uses_the_role_flag() {
        let pool = lazy_pool();
        let id = seed_user("grace@example.com", "password1234");
        let header = format!("Bearer {}", token_for(id));

        let user = authenticate::<MockUserDatabase>(Some(header.clone()), &pool)
            .await
            .unwrap();
        assert_eq!(require_admin(user).unwrap_err(), EmporiumError::Forbidden);

        set_role(id, Role::Admin);
        let admin = authenticate::<MockUserDatabase>(Some(header), &pool)
            .await
            .unwrap();
        assert_ok!(require_admin(admin));
    }

    #[tokio::test]
    async fn extractors_reject_a_missing_header_before_touching_the_database() {
        let req = TestRequest::default()
            .app_data(web::Data::new(lazy_pool()))
            .to_http_request();

        let user = AuthenticatedUser::extract(&req).await;
        assert_eq!(user.unwrap_err(), EmporiumError::Unauthorized);
        let admin = AdminUser::extract(&req).await;
        assert_eq!(admin.unwrap_err(), EmporiumError::Unauthorized);
    }

    #[tokio::test]
    async fn extractors_fail_without_a_registered_pool() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer abc123"))
            .to_http_request();

        let user = AuthenticatedUser::extract(&req).await;
        assert_eq!(
            user.unwrap_err(),
            EmporiumError::ServerError("database pool missing".to_string())
        );
        let admin = AdminUser::extract(&req).await;
        assert_err!(admin);
    }

    #[tokio::test]
    async fn extractors_reject_a_malformed_header() {
        let req = TestRequest::default()
            .app_data(web::Data::new(lazy_pool()))
            .insert_header((AUTHORIZATION, "Token abc123"))
            .to_http_request();

        let user = AuthenticatedUser::extract(&req).await;
        assert!(matches!(user.unwrap_err(), EmporiumError::InvalidToken(_)));
    }
}
