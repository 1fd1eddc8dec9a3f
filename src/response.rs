use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success envelope: `{ success: true, message, ...payload }`.
pub struct ApiResponse<T> {
    status: StatusCode,
    message: String,
    payload: T,
}

/// Payload for responses that carry nothing beyond the envelope.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    success: bool,
    message: &'a str,
    #[serde(flatten)]
    payload: &'a T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            payload,
        }
    }

    pub fn created(message: impl Into<String>, payload: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            payload,
        }
    }
}

impl ApiResponse<Empty> {
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(message, Empty {})
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Envelope {
                success: true,
                message: &self.message,
                payload: &self.payload,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[derive(Serialize)]
    struct TokenBody {
        token: String,
    }

    #[tokio::test]
    async fn flattens_payload_into_envelope() {
        let res = ApiResponse::created(
            "done",
            TokenBody {
                token: "abc".into(),
            },
        )
        .into_response();
        assert_eq!(res.status(), StatusCode::CREATED);

        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "done");
        assert_eq!(json["token"], "abc");
    }

    #[tokio::test]
    async fn empty_payload_is_just_the_envelope() {
        let res = ApiResponse::message("Left club successfully").into_response();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
