//! Lesson backend client
//!
//! The backend downloads, transcribes and enriches lessons on its own
//! schedule; this module only speaks its HTTP/JSON contract.

mod client;
mod http;
pub mod models;

pub use client::{build_api, LessonApi};
pub use http::HttpLessonApi;
pub use models::{
    AddLessonRequest, AddLessonResponse, DoneRequest, Lesson, LessonDetail, LessonSnapshot,
    LessonStatus, LevelBand, StartLessonRequest, TranscriptSegment,
};
