mod checklist;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::TimerConfig;
use crate::models::{Habit, HabitLog, NewStudySessionRequest, StudySession, Subject};

pub use checklist::HabitChecklist;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authorized, check API_TOKEN")]
    Unauthorized,

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// The parts of the backend the timer and habit checklist talk to.
#[async_trait]
pub trait StudyApi: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<Subject>, ClientError>;
    async fn create_study_session(
        &self,
        req: &NewStudySessionRequest,
    ) -> Result<StudySession, ClientError>;
    async fn list_habits(&self) -> Result<Vec<Habit>, ClientError>;
    async fn list_habit_logs(&self, habit_id: i64) -> Result<Vec<HabitLog>, ClientError>;
    async fn create_habit_log(
        &self,
        habit_id: i64,
        completed_date: &str,
    ) -> Result<HabitLog, ClientError>;
    async fn delete_habit_log(&self, log_id: i64) -> Result<(), ClientError>;
}

/// `StudyApi` over HTTP. Requests are never retried.
pub struct HttpStudyApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStudyApi {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &TimerConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.api_url,
            config.api_token.clone(),
            config.request_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorized(req).send().await?;
        let status = response.status();
        debug!("{} {}", status, response.url());

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl StudyApi for HttpStudyApi {
    async fn list_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        self.get_json("/subjects").await
    }

    async fn create_study_session(
        &self,
        req: &NewStudySessionRequest,
    ) -> Result<StudySession, ClientError> {
        let response = self
            .send(self.client.post(self.url("/study-sessions")).json(req))
            .await?;
        Ok(response.json().await?)
    }

    async fn list_habits(&self) -> Result<Vec<Habit>, ClientError> {
        self.get_json("/habits").await
    }

    async fn list_habit_logs(&self, habit_id: i64) -> Result<Vec<HabitLog>, ClientError> {
        self.get_json(&format!("/habits/{habit_id}/logs")).await
    }

    async fn create_habit_log(
        &self,
        habit_id: i64,
        completed_date: &str,
    ) -> Result<HabitLog, ClientError> {
        let body = json!({ "completed_date": completed_date });
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/habits/{habit_id}/logs")))
                    .json(&body),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_habit_log(&self, log_id: i64) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url(&format!("/habit-logs/{log_id}"))))
            .await?;
        Ok(())
    }
}
