use crate::core::errors::{ApiErrorKind, ErrorRecord, UpbitError};
use crate::core::kernel::rest::HttpResponse;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Error kinds grouped by the HTTP status they are reported with.
struct ClassificationTable {
    families: HashMap<u16, Vec<ApiErrorKind>>,
}

impl ClassificationTable {
    fn build() -> Self {
        let mut families: HashMap<u16, Vec<ApiErrorKind>> = HashMap::new();
        for kind in ApiErrorKind::ALL {
            families.entry(kind.code()).or_default().push(kind);
        }
        Self { families }
    }

    fn lookup(&self, status: u16, name: &str) -> Option<ApiErrorKind> {
        self.families
            .get(&status)?
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
    }
}

fn table() -> &'static ClassificationTable {
    static TABLE: OnceLock<ClassificationTable> = OnceLock::new();
    TABLE.get_or_init(ClassificationTable::build)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ServerError,
}

#[derive(Deserialize)]
struct ServerError {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    message: Option<String>,
}

fn name_text(name: Option<Value>) -> String {
    match name {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Pass successful responses through; turn failures into typed errors.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, UpbitError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(classify_failure(response.status, &response.body))
}

/// Map a failed response to [`UpbitError::Exchange`] when the table knows it,
/// otherwise to a generic [`UpbitError::Api`] carrying the server values.
pub fn classify_failure(status: u16, body: &str) -> UpbitError {
    if status == ApiErrorKind::TooManyRequests.code() {
        let text = body.trim();
        if let Some(kind) = table().lookup(status, text) {
            return UpbitError::Exchange(ErrorRecord::new(kind, text));
        }
    }

    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        debug!(status, "unstructured error body");
        return UpbitError::Api {
            name: String::new(),
            code: status,
            message: body.to_string(),
        };
    };

    let name = name_text(envelope.error.name);
    let message = envelope.error.message.unwrap_or_default();

    match table().lookup(status, &name) {
        Some(kind) => UpbitError::Exchange(ErrorRecord::new(kind, message)),
        None => UpbitError::Api {
            name,
            code: status,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(name: &str, message: &str) -> String {
        serde_json::json!({"error": {"name": name, "message": message}}).to_string()
    }

    #[test]
    fn test_every_kind_classifies() {
        for kind in ApiErrorKind::ALL {
            let body = if kind == ApiErrorKind::TooManyRequests {
                kind.name().to_string()
            } else {
                error_body(kind.name(), "server says no")
            };
            let err = classify_failure(kind.code(), &body);
            match err {
                UpbitError::Exchange(record) => {
                    assert_eq!(record.kind, kind);
                    assert_eq!(record.code, kind.code());
                    assert_ne!(record.to_string(), record.message);
                }
                other => panic!("{:?} classified as {:?}", kind, other),
            }
        }
    }

    #[test]
    fn test_insufficient_funds_bid() {
        let err = classify_failure(400, &error_body("insufficient_funds_bid", "잔고 부족"));
        assert_eq!(err.kind(), Some(ApiErrorKind::InsufficientFundsBid));
        assert_eq!(err.code(), Some(400));
    }

    #[test]
    fn test_rate_limit_text_with_whitespace() {
        let err = classify_failure(429, "  Too many API requests.\n");
        assert_eq!(err.kind(), Some(ApiErrorKind::TooManyRequests));
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_name_in_wrong_family_is_generic() {
        let err = classify_failure(401, &error_body("insufficient_funds_bid", "msg"));
        match err {
            UpbitError::Api {
                name,
                code,
                message,
            } => {
                assert_eq!(name, "insufficient_funds_bid");
                assert_eq!(code, 401);
                assert_eq!(message, "msg");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_and_raw_body() {
        let err = classify_failure(500, "<html>bad gateway</html>");
        assert!(matches!(
            err,
            UpbitError::Api { code: 500, ref message, .. } if message == "<html>bad gateway</html>"
        ));
    }

    #[test]
    fn test_numeric_error_name() {
        let err = classify_failure(404, r#"{"error":{"name":404,"message":"Code not found"}}"#);
        assert_eq!(err.name(), Some("404"));
    }

    #[test]
    fn test_success_passes_through() {
        let response = HttpResponse::new(200, "[]").with_remaining_req("group=default; sec=9");
        assert_eq!(classify(response.clone()).unwrap(), response);
    }
}
