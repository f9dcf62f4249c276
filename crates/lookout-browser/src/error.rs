use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// No browser context could be obtained, or a page could not be allocated.
    #[error("browser init failed: {0}")]
    Init(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("chromium error: {0}")]
    Chromium(String),

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("page already closed")]
    PageClosed,
}

impl BrowserError {
    /// Whether the error means the session can no longer be used at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Init(_) | Self::PageClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::Navigation("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_element_not_found_carries_selector() {
        let err = BrowserError::ElementNotFound("#loginUsername".to_string());
        assert!(err.to_string().contains("#loginUsername"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(BrowserError::PageClosed.is_fatal());
        assert!(BrowserError::Init("no browser".into()).is_fatal());
        assert!(!BrowserError::Timeout("slow".into()).is_fatal());
    }
}
