use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};

use crate::adapter::driver::rest_api::ApiError;
use crate::domain::model::{Actor, Role, UserId};

/// 利用者IDを受け取るヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";
/// ロールを受け取るヘッダー（省略時は member）
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// 認証済みの利用者
/// 認証そのものは前段のゲートウェイで行われ、結果がヘッダーで渡される
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let user_id = header(USER_ID_HEADER)
            .and_then(|raw| UserId::from_string(raw).ok())
            .ok_or_else(|| unauthorized("利用者IDが指定されていないか、形式が不正です"))?;

        let role = match header(USER_ROLE_HEADER) {
            None | Some("") => Role::Member,
            Some(raw) => Role::from_string(raw).map_err(|_| unauthorized("無効なロールです"))?,
        };

        Ok(Identity(Actor::new(user_id, role)))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: message.to_string(),
            code: "UNAUTHORIZED".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(headers: &[(&str, &str)]) -> Result<Identity, StatusCode> {
        let mut builder = Request::builder().uri("/bookings");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Identity::from_request_parts(&mut parts, &())
            .await
            .map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn test_role_defaults_to_member() {
        let user_id = UserId::new();
        let raw = user_id.to_string();
        let Identity(actor) = extract(&[(USER_ID_HEADER, raw.as_str())]).await.unwrap();

        assert_eq!(actor.user_id(), user_id);
        assert_eq!(actor.role(), Role::Member);
    }

    #[tokio::test]
    async fn test_admin_role_is_read_from_header() {
        let raw = UserId::new().to_string();
        let Identity(actor) = extract(&[(USER_ID_HEADER, raw.as_str()), (USER_ROLE_HEADER, "admin")])
        .await
        .unwrap();

        assert!(actor.is_staff());
    }

    #[tokio::test]
    async fn test_missing_or_invalid_identity_is_unauthorized() {
        let raw = UserId::new().to_string();
        assert_eq!(extract(&[]).await.unwrap_err(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            extract(&[(USER_ID_HEADER, "not-a-uuid")]).await.unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            extract(&[
                (USER_ID_HEADER, raw.as_str()),
                (USER_ROLE_HEADER, "owner"),
            ])
            .await
            .unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}
