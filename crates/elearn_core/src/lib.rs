pub mod domain;
pub mod ports;

pub use domain::{
    entitled_course_ids, mark_purchased, AuthIdentity, Category, CategoryId, ContentId,
    ContentItem, ContentKind, ContentPayload, Course, CourseDetail, CourseId, Credential,
    ExpiryPolicy, Order, OrderId, OrderStatus, QualityTier, Section, SectionDetail, SectionId,
    UserId, VideoSources,
};
pub use ports::{
    BackendGateway, CheckoutError, CheckoutRequest, CourseVisibility, GatewayError,
    IdentityError, IdentityProvider, MediaPlayer, OnboardOutcome, OnboardingReply,
    PaymentGateway, PaymentOutcome, PaymentReply,
};
