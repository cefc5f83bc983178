//! The capability boundary with the external analysis service.
//!
//! The session and the renderer only ever see [`CheckAnalyzer`]. The VLM
//! integration lives behind it in [`crate::pipeline::llm::VisionAnalyzer`],
//! and tests substitute a scripted implementation without touching the
//! workflow.

use crate::error::AnalysisError;
use crate::media::MediaType;
use crate::output::AnalysisResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Turn one encoded document into an [`AnalysisResult`].
///
/// Implementations make a single attempt: no retries, no caching, no local
/// scoring. Whatever risk score and label the service returns is passed
/// through as-is.
#[async_trait]
pub trait CheckAnalyzer: Send + Sync {
    /// `payload` is the raw base64 document, without any `data:` prefix.
    async fn analyze(
        &self,
        payload: &str,
        media_type: MediaType,
    ) -> Result<AnalysisResult, AnalysisError>;
}

#[async_trait]
impl<T: CheckAnalyzer + ?Sized> CheckAnalyzer for Arc<T> {
    async fn analyze(
        &self,
        payload: &str,
        media_type: MediaType,
    ) -> Result<AnalysisResult, AnalysisError> {
        (**self).analyze(payload, media_type).await
    }
}

#[async_trait]
impl<T: CheckAnalyzer + ?Sized> CheckAnalyzer for Box<T> {
    async fn analyze(
        &self,
        payload: &str,
        media_type: MediaType,
    ) -> Result<AnalysisResult, AnalysisError> {
        (**self).analyze(payload, media_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysEmpty;

    #[async_trait]
    impl CheckAnalyzer for AlwaysEmpty {
        async fn analyze(
            &self,
            _payload: &str,
            _media_type: MediaType,
        ) -> Result<AnalysisResult, AnalysisError> {
            Err(AnalysisError::EmptyResponse)
        }
    }

    #[test]
    fn trait_objects_delegate() {
        let boxed: Box<dyn CheckAnalyzer> = Box::new(AlwaysEmpty);
        let shared: Arc<dyn CheckAnalyzer> = Arc::new(AlwaysEmpty);
        assert_eq!(
            tokio_test::block_on(boxed.analyze("AAAA", MediaType::Png)),
            Err(AnalysisError::EmptyResponse)
        );
        assert_eq!(
            tokio_test::block_on(shared.analyze("AAAA", MediaType::Pdf)),
            Err(AnalysisError::EmptyResponse)
        );
    }
}
