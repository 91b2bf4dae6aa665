//! Unit tests for the error module.

use super::*;

#[test]
fn test_error_size() {
    // Boxed large variants keep the enum within one cache line.
    assert!(std::mem::size_of::<Error>() <= 56);
}

#[test]
fn test_http_error_display_shape() {
    let err = Error::http(500, "boom");
    assert_eq!(err.to_string(), "HTTP 500: boom");

    let err = Error::http(404, "");
    assert_eq!(err.to_string(), "HTTP 404: ");
}

#[test]
fn test_http_error_retriable_flag() {
    assert!(!Error::http(401, "Unauthorized").is_retryable());
    assert!(!Error::http(403, "Forbidden").is_retryable());
    assert!(!Error::http(404, "Not Found").is_retryable());

    assert!(Error::http(400, "Bad Request").is_retryable());
    assert!(Error::http(429, "Too Many Requests").is_retryable());
    assert!(Error::http(500, "Internal Server Error").is_retryable());
    assert!(Error::http(503, "Service Unavailable").is_retryable());
}

#[test]
fn test_http_error_no_substring_false_positive() {
    // A body echoing "404" must not affect classification; only the
    // structured status code counts.
    let err = Error::http(500, "user 404 not provisioned yet");
    assert!(err.is_retryable());
    assert_eq!(err.status(), Some(500));
}

#[test]
fn test_retryable_matrix() {
    assert!(Error::network("connection reset").is_retryable());
    assert!(Error::from(NetworkError::Timeout).is_retryable());
    assert!(Error::timeout("deadline elapsed").is_retryable());

    assert!(!Error::cancelled("aborted").is_retryable());
    assert!(!Error::superseded("replaced").is_retryable());
    assert!(!Error::invalid_request("bad params").is_retryable());
    assert!(!Error::from(ParseError::UnexpectedShape("not an object".into())).is_retryable());
}

#[test]
fn test_status_helper() {
    assert_eq!(Error::http(502, "Bad Gateway").status(), Some(502));
    assert_eq!(Error::timeout("deadline").status(), None);

    let wrapped = Error::http(503, "down").context("generate content failed");
    assert_eq!(wrapped.status(), Some(503));
}

#[test]
fn test_context_penetration() {
    let err = Error::cancelled("user abort")
        .context("image upload failed")
        .context("publishing flow failed");

    assert_eq!(err.as_cancelled(), Some("user abort"));
    assert!(matches!(err.root_cause(), Error::Cancelled(_)));
    assert!(err.to_string().contains("publishing flow failed"));
}

#[test]
fn test_superseded_helper() {
    let err = Error::superseded("request 'content-generate' superseded");
    assert!(err.as_superseded().is_some());
    assert!(err.as_cancelled().is_none());
}

#[test]
fn test_report_includes_chain() {
    let err = Error::network("Connection refused").context("Failed to fetch usage stats");
    let report = err.report();
    assert!(report.contains("Failed to fetch usage stats"));
    assert!(report.contains("Caused by"));
    assert!(report.contains("Connection refused"));
}

#[test]
fn test_truncate_long_http_body() {
    let body = "x".repeat(5000);
    let err = Error::http(500, body);
    let msg = err.to_string();
    assert!(msg.len() < 1200);
    assert!(msg.ends_with("... (truncated)"));
}

#[test]
fn test_network_error_conversion() {
    let err: Error = NetworkError::ConnectionFailed("dns failure".into()).into();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.to_string().contains("dns failure"));
}

#[test]
fn test_serde_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_config_validation_error() {
    let err = ConfigValidationError::too_high("retries", 15u32, 10);
    assert_eq!(err.field_name(), "retries");
    assert!(err.to_string().contains("exceeds maximum"));

    let err = ConfigValidationError::too_low("retry_delay_ms", 5u32, 10);
    assert_eq!(err.field_name(), "retry_delay_ms");

    let err: Error = err.into();
    assert!(matches!(err, Error::Config(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_http_details_retriable_override() {
    let details = HttpErrorDetails::with_retriable(500, "maintenance window", false);
    assert!(!details.retriable);
    let err = Error::Http(Box::new(details));
    assert!(!err.is_retryable());
}

#[test]
fn test_option_context_ext() {
    let value: Option<u32> = None;
    let err = value.context("missing field 'imageUrl'").unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[test]
fn test_result_context_ext() {
    let result: std::result::Result<(), NetworkError> = Err(NetworkError::Timeout);
    let err = result.with_context(|| "status patch failed").unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("status patch failed"));
}
