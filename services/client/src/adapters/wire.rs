//! services/client/src/adapters/wire.rs
//!
//! JSON records exchanged with the e-learning backend, and their mapping into
//! the core domain. Unknown fields are ignored everywhere; the historical
//! response envelopes are reconciled here, once.

use chrono::{DateTime, Utc};
use elearn_core::domain::{
    Category, CategoryId, ContentId, ContentItem, ContentPayload, Course, CourseDetail, CourseId,
    Order, OrderId, OrderStatus, Section, SectionDetail, SectionId, UserId, VideoSources,
};
use elearn_core::ports::OnboardingReply;
use serde::{Deserialize, Serialize};
use tracing::warn;

//=========================================================================================
// Envelopes
//=========================================================================================

/// `{ "data": ... }`, used by every listing and detail endpoint.
#[derive(Deserialize, Debug)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// The order creation response. Older backends put the order under `data`,
/// newer ones under `order`, and some send both.
#[derive(Deserialize, Debug, Default)]
pub struct OrderEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order: Option<OrderRecord>,
    #[serde(default)]
    pub data: Option<OrderRecord>,
}

impl OrderEnvelope {
    pub fn into_order(self) -> Option<OrderRecord> {
        self.order.or(self.data)
    }
}

/// The library response: `{ "userData": { "orders": [...] } }` or `{ "data": { "orders": [...] } }`.
#[derive(Deserialize, Debug, Default)]
pub struct LibraryEnvelope {
    #[serde(default, rename = "userData", alias = "user_data")]
    pub user_data: Option<LibraryUser>,
    #[serde(default)]
    pub data: Option<LibraryUser>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LibraryUser {
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

impl LibraryEnvelope {
    pub fn into_orders(self) -> Vec<OrderRecord> {
        self.user_data
            .or(self.data)
            .map(|user| user.orders)
            .unwrap_or_default()
    }
}

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Serialize, Debug)]
pub struct OnboardRequest<'a> {
    pub uid: &'a str,
}

#[derive(Serialize, Debug)]
pub struct CreateOrderRequest<'a> {
    pub user_id: &'a str,
}

//=========================================================================================
// Records
//=========================================================================================

#[derive(Deserialize, Debug, Default)]
pub struct OnboardRecord {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl OnboardRecord {
    /// A body without a `success` flag takes its success from the HTTP status.
    pub fn into_reply(self, http_status: u16) -> OnboardingReply {
        OnboardingReply {
            http_status,
            success: self
                .success
                .unwrap_or((200..300).contains(&http_status)),
            message: self.message,
            status: self.status,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CourseRef {
    pub course_id: String,
}

#[derive(Deserialize, Debug)]
pub struct CategoryRecord {
    pub category_id: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub category_description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub courses: Vec<CourseRef>,
}

impl CategoryRecord {
    pub fn into_domain(self) -> Category {
        Category {
            id: CategoryId::new(self.category_id),
            name: self.category_name,
            description: self.category_description,
            is_active: self.is_active,
            course_ids: self
                .courses
                .into_iter()
                .map(|c| CourseId::new(c.course_id))
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CourseRecord {
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub course_description: String,
    #[serde(default)]
    pub course_price: i64,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub head_img: Option<String>,
    #[serde(default)]
    pub allow_free_access: bool,
    #[serde(default)]
    pub can_be_purchased: bool,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl CourseRecord {
    /// `purchased` always starts false; it is joined in from the order list later.
    pub fn into_domain(self) -> Course {
        Course {
            id: CourseId::new(self.course_id),
            name: self.course_name,
            description: self.course_description,
            price: self.course_price,
            category_id: CategoryId::new(self.category_id),
            head_img: self.head_img.filter(|s| !s.is_empty()),
            allow_free_access: self.allow_free_access,
            can_be_purchased: self.can_be_purchased,
            is_published: self.is_published,
            expires_at: parse_timestamp(self.expires_at.as_deref()),
            purchased: false,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SectionRecord {
    pub section_id: String,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub section_description: String,
    #[serde(default)]
    pub section_index: i32,
}

impl SectionRecord {
    pub fn into_domain(self) -> Section {
        Section {
            id: SectionId::new(self.section_id),
            course_id: CourseId::new(self.course_id),
            name: self.section_name,
            description: self.section_description,
            index: self.section_index,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct CourseDetailRecord {
    #[serde(flatten)]
    pub course: CourseRecord,
    #[serde(default)]
    pub category: Option<CategoryRecord>,
    #[serde(default)]
    pub course_sections: Vec<SectionRecord>,
}

impl CourseDetailRecord {
    pub fn into_domain(self) -> CourseDetail {
        let mut sections: Vec<Section> = self
            .course_sections
            .into_iter()
            .map(SectionRecord::into_domain)
            .collect();
        sections.sort_by_key(|s| s.index);
        CourseDetail {
            course: self.course.into_domain(),
            category: self.category.map(CategoryRecord::into_domain),
            sections,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ContentRecord {
    pub content_id: String,
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub content_name: String,
    #[serde(default)]
    pub content_description: String,
    #[serde(default)]
    pub content_index: i32,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub pdf_uri: Option<String>,
    #[serde(default)]
    pub full_hd_video_uri: Option<String>,
    #[serde(default)]
    pub hd_video_uri: Option<String>,
    #[serde(default)]
    pub sd_video_uri: Option<String>,
    #[serde(default)]
    pub live_video_id: Option<String>,
}

impl ContentRecord {
    /// Maps the `content_type` tag to a payload. Items with an unknown tag are dropped.
    pub fn into_domain(self) -> Option<ContentItem> {
        let payload = match self.content_type.trim().to_ascii_lowercase().as_str() {
            "video" => ContentPayload::Video(VideoSources {
                full_hd: self.full_hd_video_uri.unwrap_or_default(),
                hd: self.hd_video_uri.unwrap_or_default(),
                sd: self.sd_video_uri.unwrap_or_default(),
            }),
            "pdf" => ContentPayload::Pdf {
                uri: self.pdf_uri.unwrap_or_default(),
            },
            "live_video" => ContentPayload::LiveVideo {
                stream_id: self.live_video_id.unwrap_or_default(),
            },
            other => {
                warn!(
                    "Dropping content {} with unknown content_type '{}'",
                    self.content_id, other
                );
                return None;
            }
        };
        Some(ContentItem {
            id: ContentId::new(self.content_id),
            section_id: SectionId::new(self.section_id),
            name: self.content_name,
            description: self.content_description,
            index: self.content_index,
            payload,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct SectionDetailRecord {
    #[serde(flatten)]
    pub section: SectionRecord,
    #[serde(default)]
    pub contents: Vec<ContentRecord>,
}

impl SectionDetailRecord {
    pub fn into_domain(self) -> SectionDetail {
        let mut contents: Vec<ContentItem> = self
            .contents
            .into_iter()
            .filter_map(ContentRecord::into_domain)
            .collect();
        contents.sort_by_key(|c| c.index);
        SectionDetail {
            section: self.section.into_domain(),
            contents,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct OrderRecord {
    pub order_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expiration_time: Option<String>,
    #[serde(default)]
    pub course: Option<CourseRecord>,
}

impl OrderRecord {
    /// Ids the record omits are taken from the request context; a missing
    /// status means the order was just created.
    pub fn into_domain(self, course_id: Option<&CourseId>, user_id: Option<&UserId>) -> Order {
        let course = self.course.map(CourseRecord::into_domain);
        let course_id = self
            .course_id
            .map(CourseId::new)
            .or_else(|| course.as_ref().map(|c| c.id.clone()))
            .or_else(|| course_id.cloned())
            .unwrap_or_else(|| CourseId::new(""));
        Order {
            id: OrderId::new(self.order_id),
            user_id: self
                .user_id
                .map(UserId::new)
                .or_else(|| user_id.cloned())
                .unwrap_or_else(|| UserId::new("")),
            course_id,
            amount: self.amount,
            status: self
                .status
                .as_deref()
                .map(OrderStatus::parse)
                .unwrap_or(OrderStatus::Created),
            expiration_time: parse_timestamp(self.expiration_time.as_deref()),
            course,
        }
    }
}

fn default_true() -> bool {
    true
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            warn!("Ignoring unparseable timestamp '{}': {}", raw, e);
            None
        }
    }
}
