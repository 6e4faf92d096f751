use cryptodash_core::error::DependencyError;
use thiserror::Error;

/// The microservices this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    TechnicalAnalysis,
    Sentiment,
    Lstm,
    Notification,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::TechnicalAnalysis => "Technical Analysis Service",
            Service::Sentiment => "Sentiment Analysis Service",
            Service::Lstm => "LSTM Service",
            Service::Notification => "Notification Service",
        }
    }

    /// Prefix put in front of a non-success response body.
    pub fn error_prefix(&self) -> &'static str {
        match self {
            Service::Sentiment => "Sentiment service error",
            Service::Notification => "Notification service error",
            Service::TechnicalAnalysis | Service::Lstm => "Microservice error",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced a usable response.
    #[error("{service} is unavailable: {source}")]
    Unavailable {
        service: Service,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{service} answered {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, UpstreamError::Unavailable { .. })
    }

    /// The client-facing form of this error.
    pub fn into_dependency_error(self, service: Service) -> DependencyError {
        match self {
            UpstreamError::Status { status, body, .. } => DependencyError::Upstream {
                status,
                message: format!("{}: {body}", service.error_prefix()),
            },
            _ => DependencyError::Unavailable(service.name().to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_upstream_message() {
        let err = UpstreamError::Status {
            service: Service::Sentiment,
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.status(), Some(502));
        match err.into_dependency_error(Service::Sentiment) {
            DependencyError::Upstream { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Sentiment service error: bad gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_service_names() {
        assert_eq!(Service::Lstm.to_string(), "LSTM Service");
        assert_eq!(
            Service::TechnicalAnalysis.name(),
            "Technical Analysis Service"
        );
    }
}
