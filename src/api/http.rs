use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use crate::api::client::LessonApi;
use crate::api::models::{
    AddLessonRequest, AddLessonResponse, DoneRequest, ErrorBody, LessonDetail, LessonSnapshot,
    StartLessonRequest,
};
use crate::config::Settings;
use crate::{FluencyError, Result};

/// reqwest-backed client for the lesson backend
pub struct HttpLessonApi {
    http: Client,
    base: Url,
}

impl HttpLessonApi {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base = Url::parse(settings.api_base()).map_err(|e| {
            FluencyError::Config(format!(
                "Invalid server.base_url '{}': {}",
                settings.server.base_url, e
            ))
        })?;

        if base.cannot_be_a_base() {
            return Err(FluencyError::Config(format!(
                "Invalid server.base_url '{}': not a base address",
                settings.server.base_url
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    /// Join path segments onto the base address, escaping each one
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    /// Turn a non-2xx response into `FluencyError::Rejected`
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };

        Err(FluencyError::Rejected {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl LessonApi for HttpLessonApi {
    async fn list_lessons(&self) -> Result<LessonSnapshot> {
        let response = self
            .http
            .get(self.endpoint(&["api", "lessons"]))
            .send()
            .await?;
        let snapshot = Self::check(response).await?.json().await?;
        Ok(snapshot)
    }

    async fn add_lesson(&self, request: &AddLessonRequest) -> Result<AddLessonResponse> {
        debug!("Submitting {} to category {}", request.url, request.category);
        let response = self
            .http
            .post(self.endpoint(&["api", "add-lesson"]))
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        // The acknowledgement body is informational only.
        Ok(response.json().await.unwrap_or_default())
    }

    async fn start_lesson(&self, request: &StartLessonRequest) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&["api", "start-lesson"]))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn lesson_detail(&self, category: &str, lesson_id: &str) -> Result<LessonDetail> {
        let response = self
            .http
            .get(self.endpoint(&["api", "lesson", category, lesson_id]))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(LessonDetail::not_found());
        }

        let detail = Self::check(response).await?.json().await?;
        Ok(detail)
    }

    async fn set_done(&self, request: &DoneRequest) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&["api", "done"]))
            .json(request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
