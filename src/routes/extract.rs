//! Extractors whose rejections render as [`AppError`] JSON bodies

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `axum::Json` with malformed bodies reported as a 400 validation error
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

/// `axum::extract::Path` with unparseable ids reported as a 400 validation error
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ValidPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::NON_FIELD_ERRORS, models::ReviewInput};
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request},
    };

    fn json_request(body: &'static str) -> Request<Body> {
        Request::post("/api/v1/reviews")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_wrong_type_is_validation_error() {
        for body in [r#"{"rating":"five"}"#, r#"{"rating":4.5}"#, "{not json"] {
            let result = ValidJson::<ReviewInput>::from_request(json_request(body), &()).await;
            match result {
                Err(AppError::Validation(errors)) => {
                    assert!(errors.get(NON_FIELD_ERRORS).is_some(), "{}", body)
                }
                Err(other) => panic!("expected validation error for {}, got {:?}", body, other),
                Ok(_) => panic!("expected rejection for {}", body),
            }
        }
    }

    #[tokio::test]
    async fn test_well_formed_body_passes() {
        let request = json_request(r#"{"rating":3}"#);
        let ValidJson(input) = ValidJson::<ReviewInput>::from_request(request, &())
            .await
            .unwrap();
        assert_eq!(input.rating, Some(3));
    }
}
