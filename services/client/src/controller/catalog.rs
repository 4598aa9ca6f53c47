//! services/client/src/controller/catalog.rs
//!
//! Browsing: categories, the courses of a category with their `purchased`
//! flags, course details and section contents.

use elearn_core::domain::{
    Category, CategoryId, ContentItem, ContentKind, Course, CourseDetail, CourseId, SectionId,
    UserId,
};
use elearn_core::ports::{BackendGateway, CourseVisibility};
use std::sync::Arc;
use tracing::debug;

use super::library::Library;

pub const UNKNOWN_CATEGORY: &str = "Unknown Category";

pub struct Catalog {
    gateway: Arc<dyn BackendGateway>,
    library: Arc<Library>,
    show_inactive: bool,
}

impl Catalog {
    pub fn new(gateway: Arc<dyn BackendGateway>, library: Arc<Library>, show_inactive: bool) -> Self {
        Self {
            gateway,
            library,
            show_inactive,
        }
    }

    pub async fn categories(&self) -> Vec<Category> {
        let mut categories = self.gateway.list_categories(self.show_inactive).await;
        if !self.show_inactive {
            categories.retain(|category| category.is_active);
        }
        categories
    }

    pub fn category_name<'a>(categories: &'a [Category], id: &CategoryId) -> &'a str {
        categories
            .iter()
            .find(|category| &category.id == id)
            .map(|category| category.name.as_str())
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Fetches the courses and the user's library together, then joins them.
    pub async fn courses_for(&self, category_id: &CategoryId, user_id: &UserId) -> Vec<Course> {
        let (mut courses, _) = tokio::join!(
            self.gateway.list_courses(category_id),
            self.library.refresh(user_id)
        );
        self.library.annotate(&mut courses);
        debug!("{} course(s) in category {}", courses.len(), category_id);
        courses
    }

    pub async fn course_detail(&self, course_id: &CourseId) -> Option<CourseDetail> {
        let mut detail = self
            .gateway
            .course_detail(course_id, CourseVisibility::default())
            .await?;
        self.library
            .annotate(std::slice::from_mut(&mut detail.course));
        Some(detail)
    }

    pub async fn section_contents(
        &self,
        course_id: &CourseId,
        section_id: &SectionId,
    ) -> Vec<ContentItem> {
        self.gateway
            .section_content(course_id, section_id)
            .await
            .map(|detail| detail.contents)
            .unwrap_or_default()
    }

    /// The items of one tab (videos, PDFs or live sessions), in order.
    pub fn contents_of_kind(contents: &[ContentItem], kind: ContentKind) -> Vec<&ContentItem> {
        contents.iter().filter(|item| item.kind() == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::library::tests::{course, order};
    use elearn_core::domain::{ContentId, ContentPayload, ExpiryPolicy, OrderStatus};
    use elearn_core::ports::MockBackendGateway;

    fn category(id: &str, active: bool) -> Category {
        Category {
            id: CategoryId::from(id),
            name: format!("Category {id}"),
            description: String::new(),
            is_active: active,
            course_ids: Vec::new(),
        }
    }

    fn catalog(gateway: MockBackendGateway, show_inactive: bool) -> Catalog {
        let gateway: Arc<dyn BackendGateway> = Arc::new(gateway);
        let library = Arc::new(Library::new(gateway.clone(), ExpiryPolicy::Informational));
        Catalog::new(gateway, library, show_inactive)
    }

    #[tokio::test]
    async fn inactive_categories_are_hidden_by_default() {
        let mut gateway = MockBackendGateway::new();
        gateway
            .expect_list_categories()
            .withf(|show_inactive| !*show_inactive)
            .returning(|_| vec![category("a", true), category("b", false)]);

        let categories = catalog(gateway, false).categories().await;

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id.as_str(), "a");
    }

    #[test]
    fn category_name_falls_back() {
        let categories = vec![category("a", true)];
        assert_eq!(
            Catalog::category_name(&categories, &CategoryId::from("a")),
            "Category a"
        );
        assert_eq!(
            Catalog::category_name(&categories, &CategoryId::from("zz")),
            UNKNOWN_CATEGORY
        );
    }

    #[tokio::test]
    async fn courses_carry_purchased_flags_from_library() {
        let mut gateway = MockBackendGateway::new();
        gateway
            .expect_list_courses()
            .withf(|category| category.as_str() == "cat")
            .returning(|_| vec![course("k1"), course("k2")]);
        gateway
            .expect_library()
            .withf(|uid| uid.as_str() == "u1")
            .times(1)
            .returning(|_| vec![order("k2", OrderStatus::Paid)]);

        let courses = catalog(gateway, false)
            .courses_for(&CategoryId::from("cat"), &UserId::from("u1"))
            .await;

        let purchased: Vec<&str> = courses
            .iter()
            .filter(|c| c.purchased)
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(purchased, vec!["k2"]);
    }

    #[tokio::test]
    async fn course_detail_requests_unpublished_and_expired() {
        let mut gateway = MockBackendGateway::new();
        gateway
            .expect_course_detail()
            .withf(|id, visibility| {
                id.as_str() == "k1" && visibility.allow_unpublished && visibility.allow_expired
            })
            .returning(|_, _| {
                Some(CourseDetail {
                    course: course("k1"),
                    category: None,
                    sections: Vec::new(),
                })
            });

        let detail = catalog(gateway, false)
            .course_detail(&CourseId::from("k1"))
            .await
            .unwrap();

        assert_eq!(detail.course.id.as_str(), "k1");
        assert!(!detail.course.purchased);
    }

    #[tokio::test]
    async fn missing_section_yields_no_contents() {
        let mut gateway = MockBackendGateway::new();
        gateway.expect_section_content().returning(|_, _| None);

        let contents = catalog(gateway, false)
            .section_contents(&CourseId::from("k1"), &SectionId::from("s1"))
            .await;

        assert!(contents.is_empty());
    }

    #[test]
    fn contents_split_into_tabs() {
        let item = |id: &str, payload: ContentPayload| ContentItem {
            id: ContentId::from(id),
            section_id: SectionId::from("s1"),
            name: id.to_string(),
            description: String::new(),
            index: 0,
            payload,
        };
        let contents = vec![
            item("p1", ContentPayload::Pdf { uri: "a.pdf".to_string() }),
            item(
                "l1",
                ContentPayload::LiveVideo {
                    stream_id: "yt".to_string(),
                },
            ),
            item("p2", ContentPayload::Pdf { uri: "b.pdf".to_string() }),
        ];

        let pdfs: Vec<&str> = Catalog::contents_of_kind(&contents, ContentKind::Pdf)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(pdfs, vec!["p1", "p2"]);
        assert!(Catalog::contents_of_kind(&contents, ContentKind::Video).is_empty());
    }
}
