/*!
 * Tests for error types and conversions
 */

use subtitle_forge::errors::{AppError, ConversionError, ResultError, SubmitError};

#[test]
fn test_conversionError_toolFailed_shouldDisplayToolAndMessage() {
    let error = ConversionError::tool_failed("ffmpeg", "Invalid data found");
    let display = format!("{}", error);
    assert!(display.contains("ffmpeg"));
    assert!(display.contains("Invalid data found"));
    assert_eq!(error.kind(), "external_tool_failed");
}

#[test]
fn test_conversionError_noSpeech_shouldGiveActionableHint() {
    let display = ConversionError::NoSpeechDetected.to_string();
    assert!(display.contains("No speech detected"));
    assert!(display.contains("language hint"));
}

/// Test which failures invite a retry
#[test]
fn test_conversionError_isRetryable_shouldMatchFailureClass() {
    assert!(ConversionError::tool_unavailable("whisper").is_retryable());
    assert!(ConversionError::tool_failed("whisper", "exit 1").is_retryable());
    assert!(ConversionError::Internal("disk".to_string()).is_retryable());
    assert!(!ConversionError::InvalidInput("bad".to_string()).is_retryable());
    assert!(!ConversionError::NoSpeechDetected.is_retryable());
    assert!(!ConversionError::Cancelled("after normalization".to_string()).is_retryable());
}

#[test]
fn test_conversionError_fromIoError_shouldBeInternal() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = ConversionError::from(io);
    assert!(matches!(error, ConversionError::Internal(ref m) if m.contains("denied")));
}

#[test]
fn test_appError_fromDomainErrors_shouldWrapVariant() {
    let app: AppError = SubmitError::AccessDenied("quota".to_string()).into();
    assert!(matches!(app, AppError::Submit(_)));
    assert!(app.to_string().contains("quota"));

    let app: AppError = ResultError::NotFound.into();
    assert!(matches!(app, AppError::Result(ResultError::NotFound)));

    let app: AppError = ConversionError::NoSpeechDetected.into();
    assert!(matches!(app, AppError::Conversion(_)));

    let app: AppError = anyhow::anyhow!("boom").into();
    assert!(matches!(app, AppError::Unknown(ref m) if m == "boom"));
}
