//! Request classification.
//!
//! # Responsibilities
//! - Decide whether a request is a transcription (rewritten) or passthrough
//!
//! # Design Decisions
//! - Only `POST` can be a transcription
//! - Suffix match, so `/v1/audio/transcriptions` and `/audio/transcriptions` both qualify
//! - Path matching is case-sensitive; one trailing slash is tolerated

use axum::http::Method;

/// Classification result for one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Transcription upload subject to parameter overrides.
    Stt,
    /// Everything else, forwarded unmodified.
    Passthrough,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Stt => "stt",
            RequestKind::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable classifier built at startup.
#[derive(Debug, Clone)]
pub struct Classifier {
    transcription_suffix: String,
}

impl Classifier {
    pub fn new(transcription_suffix: impl Into<String>) -> Self {
        let suffix: String = transcription_suffix.into();
        Self {
            transcription_suffix: suffix.trim_end_matches('/').to_string(),
        }
    }

    pub fn classify(&self, method: &Method, path: &str) -> RequestKind {
        if method != Method::POST {
            return RequestKind::Passthrough;
        }

        let path = path.strip_suffix('/').unwrap_or(path);
        if path.ends_with(&self.transcription_suffix) {
            RequestKind::Stt
        } else {
            RequestKind::Passthrough
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("/audio/transcriptions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcription_routes() {
        let classifier = Classifier::default();

        assert_eq!(
            classifier.classify(&Method::POST, "/v1/audio/transcriptions"),
            RequestKind::Stt
        );
        assert_eq!(
            classifier.classify(&Method::POST, "/audio/transcriptions"),
            RequestKind::Stt
        );
        assert_eq!(
            classifier.classify(&Method::POST, "/v1/audio/transcriptions/"),
            RequestKind::Stt
        );
    }

    #[test]
    fn everything_else_passes_through() {
        let classifier = Classifier::default();

        assert_eq!(
            classifier.classify(&Method::GET, "/v1/audio/transcriptions"),
            RequestKind::Passthrough
        );
        assert_eq!(
            classifier.classify(&Method::POST, "/v1/audio/translations"),
            RequestKind::Passthrough
        );
        assert_eq!(
            classifier.classify(&Method::POST, "/v1/audio/transcriptions/extra"),
            RequestKind::Passthrough
        );
        assert_eq!(
            classifier.classify(&Method::POST, "/v1/AUDIO/transcriptions"),
            RequestKind::Passthrough
        );
        assert_eq!(classifier.classify(&Method::GET, "/v1/models"), RequestKind::Passthrough);
    }

    #[test]
    fn custom_suffix() {
        let classifier = Classifier::new("/transcribe/");
        assert_eq!(classifier.classify(&Method::POST, "/api/transcribe"), RequestKind::Stt);
    }
}
