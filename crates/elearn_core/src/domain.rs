//! crates/elearn_core/src/domain.rs
//!
//! Defines the pure, core data structures for the e-learning client.
//! These structs are independent of the backend's wire format; the gateway
//! adapter maps its JSON records into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Identifiers
//=========================================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// The external identity provider's user id, also used as the backend user id.
    UserId
);
string_id!(CategoryId);
string_id!(CourseId);
string_id!(SectionId);
string_id!(ContentId);
string_id!(OrderId);

//=========================================================================================
// Identity
//=========================================================================================

/// The signed-in user. Owned by the auth session; read-only everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub uid: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl AuthIdentity {
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }
}

/// A credential handed to the external identity provider at sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A Google ID token obtained from the platform credential manager.
    GoogleIdToken(String),
    /// Email and password for the demo account.
    EmailPassword { email: String, password: String },
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub course_ids: Vec<CourseId>,
}

/// A course as listed by the backend.
///
/// `purchased` is never sent by the server: it is a client-side join against
/// the user's paid orders and must be recomputed whenever the order list changes
/// (see [`mark_purchased`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub description: String,
    /// Price in minor currency units.
    pub price: i64,
    pub category_id: CategoryId,
    pub head_img: Option<String>,
    pub allow_free_access: bool,
    pub can_be_purchased: bool,
    pub is_published: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub purchased: bool,
}

impl Course {
    /// True when the user may open the course content.
    pub fn is_accessible(&self) -> bool {
        self.purchased || self.allow_free_access
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub course_id: CourseId,
    pub name: String,
    pub description: String,
    pub index: i32,
}

/// A course together with its category and ordered sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDetail {
    pub course: Course,
    pub category: Option<Category>,
    pub sections: Vec<Section>,
}

/// A section together with its ordered content items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDetail {
    pub section: Section,
    pub contents: Vec<ContentItem>,
}

//=========================================================================================
// Content
//=========================================================================================

/// One of the three predefined video resolutions of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityTier {
    #[default]
    #[serde(rename = "Full HD")]
    FullHd,
    #[serde(rename = "HD")]
    Hd,
    #[serde(rename = "SD")]
    Sd,
}

impl QualityTier {
    /// All tiers, best first.
    pub const ALL: [QualityTier; 3] = [QualityTier::FullHd, QualityTier::Hd, QualityTier::Sd];

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::FullHd => "Full HD",
            QualityTier::Hd => "HD",
            QualityTier::Sd => "SD",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality tier '{0}'")]
pub struct UnknownQualityTier(pub String);

impl FromStr for QualityTier {
    type Err = UnknownQualityTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full hd" | "full_hd" | "fullhd" | "1080p" => Ok(QualityTier::FullHd),
            "hd" | "720p" => Ok(QualityTier::Hd),
            "sd" | "480p" => Ok(QualityTier::Sd),
            _ => Err(UnknownQualityTier(s.to_string())),
        }
    }
}

/// The three quality URIs of a video item. A blank URI means the tier is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoSources {
    pub full_hd: String,
    pub hd: String,
    pub sd: String,
}

impl VideoSources {
    pub fn uri(&self, tier: QualityTier) -> &str {
        match tier {
            QualityTier::FullHd => &self.full_hd,
            QualityTier::Hd => &self.hd,
            QualityTier::Sd => &self.sd,
        }
    }

    /// Returns the URI for `tier` unless it is blank.
    pub fn playable_uri(&self, tier: QualityTier) -> Option<&str> {
        let uri = self.uri(tier);
        (!uri.trim().is_empty()).then_some(uri)
    }

    /// The best tier with a non-blank URI, if any.
    pub fn first_available(&self) -> Option<QualityTier> {
        QualityTier::ALL
            .into_iter()
            .find(|tier| self.playable_uri(*tier).is_some())
    }
}

/// The type-specific payload of a content item. Exactly one variant is
/// populated, which is what the backend's `content_type` tag promises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPayload {
    Video(VideoSources),
    Pdf { uri: String },
    LiveVideo { stream_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Video,
    Pdf,
    LiveVideo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub section_id: SectionId,
    pub name: String,
    pub description: String,
    pub index: i32,
    pub payload: ContentPayload,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self.payload {
            ContentPayload::Video(_) => ContentKind::Video,
            ContentPayload::Pdf { .. } => ContentKind::Pdf,
            ContentPayload::LiveVideo { .. } => ContentKind::LiveVideo,
        }
    }

    pub fn video_sources(&self) -> Option<&VideoSources> {
        match &self.payload {
            ContentPayload::Video(sources) => Some(sources),
            _ => None,
        }
    }
}

//=========================================================================================
// Orders & Entitlement
//=========================================================================================

/// Parsed from the backend's free-form status string by [`OrderStatus::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
    Expired,
    /// Any status this client does not know about. Never grants access.
    Unknown,
}

impl OrderStatus {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "created" => OrderStatus::Created,
            "paid" => OrderStatus::Paid,
            "failed" => OrderStatus::Failed,
            "expired" => OrderStatus::Expired,
            _ => OrderStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub course_id: CourseId,
    /// Amount in minor currency units.
    pub amount: i64,
    pub status: OrderStatus,
    pub expiration_time: Option<DateTime<Utc>>,
    /// The purchased course, when the backend nests it (library listing).
    pub course: Option<Course>,
}

/// Whether a paid order's `expiration_time` limits access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// Expiration is shown to the user but never enforced.
    #[default]
    Informational,
    /// A paid order whose expiration time has passed no longer grants access.
    Enforced,
}

impl Order {
    /// True when this order entitles its user to the course at `now`.
    pub fn grants_access(&self, policy: ExpiryPolicy, now: DateTime<Utc>) -> bool {
        if self.status != OrderStatus::Paid {
            return false;
        }
        match (policy, self.expiration_time) {
            (ExpiryPolicy::Enforced, Some(expires)) => expires > now,
            _ => true,
        }
    }
}

/// The set of course ids the given orders entitle the user to.
pub fn entitled_course_ids(
    orders: &[Order],
    policy: ExpiryPolicy,
    now: DateTime<Utc>,
) -> HashSet<CourseId> {
    orders
        .iter()
        .filter(|order| order.grants_access(policy, now))
        .map(|order| order.course_id.clone())
        .collect()
}

/// Recomputes the `purchased` flag of every course from the order list.
pub fn mark_purchased(
    courses: &mut [Course],
    orders: &[Order],
    policy: ExpiryPolicy,
    now: DateTime<Utc>,
) {
    let entitled = entitled_course_ids(orders, policy, now);
    for course in courses.iter_mut() {
        course.purchased = entitled.contains(&course.id);
    }
}
