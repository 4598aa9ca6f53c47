//! services/client/src/adapters/http_gateway.rs
//!
//! This module contains the HTTP adapter for the e-learning backend.
//! It implements the `BackendGateway` port from the `core` crate using `reqwest`.
//!
//! Every failure (transport, non-success status, undecodable body) is logged and
//! degraded to an empty result here; nothing propagates to the controllers.

use async_trait::async_trait;
use elearn_core::domain::{
    Category, CategoryId, Course, CourseDetail, CourseId, Order, SectionDetail, SectionId, UserId,
};
use elearn_core::ports::{BackendGateway, CourseVisibility, GatewayError, OnboardOutcome};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::adapters::wire::{
    CategoryRecord, CourseDetailRecord, CourseRecord, CreateOrderRequest, DataEnvelope,
    LibraryEnvelope, OnboardRecord, OnboardRequest, OrderEnvelope, SectionDetailRecord,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `BackendGateway` port over the REST API.
#[derive(Clone)]
pub struct HttpBackendGateway {
    client: Client,
    base_url: String,
}

impl HttpBackendGateway {
    /// Creates a new `HttpBackendGateway` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        decode(path, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        decode(path, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    debug!("{} -> {}", path, status);
    if !status.is_success() {
        return Err(GatewayError::Status(status.as_u16()));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Logs an absorbed failure and substitutes the empty value.
fn absorb<T>(operation: &str, result: Result<T, GatewayError>, empty: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            empty
        }
    }
}

//=========================================================================================
// `BackendGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl BackendGateway for HttpBackendGateway {
    /// Onboarding keeps non-success statuses as a reply: the backend signals
    /// "already exists" through them, and classification happens in the auth session.
    async fn onboard(&self, uid: &UserId) -> OnboardOutcome {
        let path = "/v1/user/onboard";
        let response = match self
            .client
            .post(self.url(path))
            .json(&OnboardRequest { uid: uid.as_str() })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Onboarding {} failed: {}", uid, e);
                return OnboardOutcome::Unreachable;
            }
        };

        let status = response.status();
        debug!("{} -> {}", path, status);
        let record = match response.bytes().await {
            Ok(body) if !body.is_empty() => {
                serde_json::from_slice::<OnboardRecord>(&body).unwrap_or_else(|e| {
                    warn!("Onboarding reply for {} was not JSON: {}", uid, e);
                    OnboardRecord::default()
                })
            }
            Ok(_) => OnboardRecord::default(),
            Err(e) => {
                warn!("Onboarding {} failed reading body: {}", uid, e);
                return OnboardOutcome::Unreachable;
            }
        };

        let mut reply = record.into_reply(status.as_u16());
        if !status.is_success() && reply.message.is_none() {
            reply.message = Some(format!("Failed to authenticate: {}", status_text(status)));
        }
        OnboardOutcome::Replied(reply)
    }

    async fn list_categories(&self, show_inactive: bool) -> Vec<Category> {
        let result = self
            .get_json::<DataEnvelope<Vec<CategoryRecord>>>(
                "/v1/categories",
                &[("show_inactive", show_inactive.to_string())],
            )
            .await
            .map(|env| env.data.into_iter().map(CategoryRecord::into_domain).collect());
        absorb("list_categories", result, Vec::new())
    }

    async fn list_courses(&self, category_id: &CategoryId) -> Vec<Course> {
        let path = format!("/v1/categories/{}/courses", category_id);
        let result = self
            .get_json::<DataEnvelope<Vec<CourseRecord>>>(&path, &[])
            .await
            .map(|env| env.data.into_iter().map(CourseRecord::into_domain).collect());
        absorb("list_courses", result, Vec::new())
    }

    async fn course_detail(
        &self,
        course_id: &CourseId,
        visibility: CourseVisibility,
    ) -> Option<CourseDetail> {
        let path = format!("/v1/course/{}", course_id);
        let query = [
            ("allow_unpublished", visibility.allow_unpublished.to_string()),
            ("allow_expired", visibility.allow_expired.to_string()),
        ];
        let result = self
            .get_json::<DataEnvelope<CourseDetailRecord>>(&path, &query)
            .await
            .map(|env| Some(env.data.into_domain()));
        absorb("course_detail", result, None)
    }

    async fn section_content(
        &self,
        course_id: &CourseId,
        section_id: &SectionId,
    ) -> Option<SectionDetail> {
        let path = format!("/v1/course/{}/section/{}", course_id, section_id);
        let result = self
            .get_json::<DataEnvelope<SectionDetailRecord>>(&path, &[])
            .await
            .map(|env| Some(env.data.into_domain()));
        absorb("section_content", result, None)
    }

    async fn create_order(&self, course_id: &CourseId, user_id: &UserId) -> Option<Order> {
        let path = format!("/v1/order/course/{}", course_id);
        let result = self
            .post_json::<_, OrderEnvelope>(
                &path,
                &CreateOrderRequest {
                    user_id: user_id.as_str(),
                },
            )
            .await;
        let envelope = absorb("create_order", result.map(Some), None)?;
        let message = envelope.message.clone();
        match envelope.into_order() {
            Some(record) => Some(record.into_domain(Some(course_id), Some(user_id))),
            None => {
                warn!(
                    "Order creation for course {} returned no order: {}",
                    course_id,
                    message.as_deref().unwrap_or("<no message>")
                );
                None
            }
        }
    }

    async fn library(&self, user_id: &UserId) -> Vec<Order> {
        let path = format!("/v1/user/{}/library/courses", user_id);
        let result = self
            .get_json::<LibraryEnvelope>(&path, &[])
            .await
            .map(|env| {
                env.into_orders()
                    .into_iter()
                    .map(|record| record.into_domain(None, Some(user_id)))
                    .collect()
            });
        absorb("library", result, Vec::new())
    }
}

fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}
