use async_trait::async_trait;
use std::sync::Arc;

use crate::api::http::HttpLessonApi;
use crate::api::models::{
    AddLessonRequest, AddLessonResponse, DoneRequest, LessonDetail, LessonSnapshot,
    StartLessonRequest,
};
use crate::config::Settings;
use crate::Result;

/// The lesson backend as seen by the client
#[async_trait]
pub trait LessonApi: Send + Sync {
    /// `GET /api/lessons`
    async fn list_lessons(&self) -> Result<LessonSnapshot>;

    /// `POST /api/add-lesson`
    async fn add_lesson(&self, request: &AddLessonRequest) -> Result<AddLessonResponse>;

    /// `POST /api/start-lesson`
    async fn start_lesson(&self, request: &StartLessonRequest) -> Result<()>;

    /// `GET /api/lesson/{category}/{id}`
    async fn lesson_detail(&self, category: &str, lesson_id: &str) -> Result<LessonDetail>;

    /// `POST /api/done`
    async fn set_done(&self, request: &DoneRequest) -> Result<()>;
}

/// Build the backend client from runtime settings.
pub fn build_api(settings: &Settings) -> Result<Arc<dyn LessonApi>> {
    Ok(Arc::new(HttpLessonApi::from_settings(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_base_url() {
        let mut settings = Settings::default();
        settings.server.base_url = "not a url".to_string();

        let err = match build_api(&settings) {
            Ok(_) => panic!("expected client creation to fail"),
            Err(e) => e.to_string(),
        };
        assert!(err.contains("Invalid server.base_url"));
    }

    #[test]
    fn accepts_default_settings() {
        assert!(build_api(&Settings::default()).is_ok());
    }
}
