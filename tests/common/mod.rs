use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use fluency::api::{
    AddLessonRequest, AddLessonResponse, DoneRequest, Lesson, LessonApi, LessonDetail,
    LessonSnapshot, LessonStatus, StartLessonRequest,
};
use fluency::FluencyError;

#[allow(dead_code)]
pub fn run_fluency(args: &[&str]) -> Output {
    TestEnv::new().run(args)
}

pub struct TestEnv {
    home: TempDir,
    config: TempDir,
    data: TempDir,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create temporary HOME dir"),
            config: tempfile::tempdir().expect("create temporary XDG config dir"),
            data: tempfile::tempdir().expect("create temporary XDG data dir"),
        }
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fluency"));
        cmd.args(args)
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.config.path())
            .env("XDG_DATA_HOME", self.data.path())
            .env_remove("FLUENCY_API_URL")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("failed to execute fluency binary")
    }

    pub fn config_path(&self) -> PathBuf {
        let output = self.run(&["config", "path"]);
        assert!(
            output.status.success(),
            "config path should succeed\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );

        let path = String::from_utf8_lossy(&output.stdout);
        PathBuf::from(path.trim())
    }

    pub fn write_config(&self, contents: &str) {
        let config_path = self.config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).expect("create config parent directory");
        }
        std::fs::write(&config_path, contents).expect("write config file");
    }
}

#[allow(dead_code)]
pub fn lesson(id: &str, title: &str, status: LessonStatus) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: title.to_string(),
        level: "B1".to_string(),
        duration: 185,
        source: "TED Talks".to_string(),
        url: None,
        done: false,
        status,
    }
}

/// Scripted in-memory backend that counts the requests it receives
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeApi {
    groups: Mutex<Vec<(String, Vec<Lesson>)>>,
    // `None` answers with a transport error
    details: Mutex<VecDeque<Option<LessonDetail>>>,
    add_rejection: Mutex<Option<String>>,
    delay: Duration,
    fail_add: bool,
    fail_start: bool,
    fail_done: bool,
    pub list_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
    pub done_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn with_lessons(groups: Vec<(&str, Vec<Lesson>)>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(category, lessons)| (category.to_string(), lessons))
            .collect();
        Self {
            groups: Mutex::new(groups),
            ..Self::default()
        }
    }

    /// Hold every command request for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Adds fail as if the server were unreachable
    pub fn failing_add(mut self) -> Self {
        self.fail_add = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Completion updates fail as if the server were unreachable
    pub fn failing_done(mut self) -> Self {
        self.fail_done = true;
        self
    }

    /// Detail responses in order; the last one repeats
    pub fn script_details(&self, details: Vec<LessonDetail>) {
        *self.details.lock().unwrap() = details.into_iter().map(Some).collect();
    }

    /// After the scripted details, every detail fetch fails
    pub fn then_drop_connection(&self) {
        self.details.lock().unwrap().push_back(None);
    }

    pub fn reject_adds(&self, detail: &str) {
        *self.add_rejection.lock().unwrap() = Some(detail.to_string());
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn update(&self, lesson_id: &str, f: impl Fn(&mut Lesson)) {
        let mut groups = self.groups.lock().unwrap();
        for (_, lessons) in groups.iter_mut() {
            for lesson in lessons.iter_mut().filter(|l| l.id == lesson_id) {
                f(lesson);
            }
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl LessonApi for FakeApi {
    async fn list_lessons(&self) -> fluency::Result<LessonSnapshot> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(LessonSnapshot::new(self.groups.lock().unwrap().clone()))
    }

    async fn add_lesson(&self, request: &AddLessonRequest) -> fluency::Result<AddLessonResponse> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_add {
            return Err(connection_refused());
        }

        if let Some(detail) = self.add_rejection.lock().unwrap().clone() {
            return Err(FluencyError::Rejected {
                status: 400,
                detail,
            });
        }

        let id = format!("custom_{}", self.add_calls.load(Ordering::SeqCst));
        let mut added = lesson(&id, &request.url, LessonStatus::Downloading);
        added.url = Some(request.url.clone());
        {
            let mut groups = self.groups.lock().unwrap();
            match groups.iter_mut().find(|(c, _)| *c == request.category) {
                Some((_, lessons)) => lessons.push(added),
                None => groups.push((request.category.clone(), vec![added])),
            }
        }

        Ok(AddLessonResponse {
            status: Some("success".to_string()),
            lesson_id: Some(id),
        })
    }

    async fn start_lesson(&self, request: &StartLessonRequest) -> fluency::Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_start {
            return Err(FluencyError::Rejected {
                status: 500,
                detail: "Internal Server Error".to_string(),
            });
        }

        self.update(&request.lesson_id, |l| l.status = LessonStatus::Downloading);
        Ok(())
    }

    async fn lesson_detail(&self, _category: &str, _lesson_id: &str) -> fluency::Result<LessonDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let mut details = self.details.lock().unwrap();
        let next = if details.len() > 1 {
            details.pop_front()
        } else {
            details.front().cloned()
        };
        match next {
            Some(Some(detail)) => Ok(detail),
            Some(None) => Err(connection_refused()),
            None => Ok(LessonDetail::not_found()),
        }
    }

    async fn set_done(&self, request: &DoneRequest) -> fluency::Result<()> {
        self.done_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if self.fail_done {
            return Err(connection_refused());
        }

        self.update(&request.lesson_id, |l| l.done = request.done);
        Ok(())
    }
}

fn connection_refused() -> FluencyError {
    FluencyError::Io(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))
}
