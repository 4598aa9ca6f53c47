//! services/client/src/controller/library.rs
//!
//! The user's purchased orders. `refresh` is the only writer; everything that
//! shows a `purchased` flag derives it from the current snapshot.
//!
//! Every `refresh` and `clear` starts a new generation. A refresh only
//! publishes if no newer generation has started while it was waiting on the
//! backend, so a late reply never overwrites a cleared or fresher snapshot.

use chrono::Utc;
use elearn_core::domain::{
    entitled_course_ids, mark_purchased, Course, CourseId, ExpiryPolicy, Order, UserId,
};
use elearn_core::ports::BackendGateway;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct Library {
    gateway: Arc<dyn BackendGateway>,
    policy: ExpiryPolicy,
    orders: watch::Sender<Arc<Vec<Order>>>,
    generation: AtomicU64,
}

impl Library {
    pub fn new(gateway: Arc<dyn BackendGateway>, policy: ExpiryPolicy) -> Self {
        let (orders, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            gateway,
            policy,
            orders,
            generation: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Re-queries the backend and publishes the result, unless `clear` or a
    /// later `refresh` started in the meantime. Returns the current snapshot
    /// either way.
    pub async fn refresh(&self, user_id: &UserId) -> Arc<Vec<Order>> {
        let generation = self.next_generation();
        let orders = Arc::new(self.gateway.library(user_id).await);

        let published = self.orders.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = orders.clone();
            true
        });
        if published {
            info!("Library for {} holds {} order(s)", user_id, orders.len());
        } else {
            debug!("Discarding stale library reply for {}", user_id);
        }
        self.orders()
    }

    pub fn clear(&self) {
        self.next_generation();
        self.orders.send_replace(Arc::new(Vec::new()));
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn orders(&self) -> Arc<Vec<Order>> {
        self.orders.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Order>>> {
        self.orders.subscribe()
    }

    pub fn entitled_ids(&self) -> HashSet<CourseId> {
        entitled_course_ids(&self.orders(), self.policy, Utc::now())
    }

    /// Courses of the orders that currently grant access, one per course.
    pub fn purchased_courses(&self) -> Vec<Course> {
        let now = Utc::now();
        let mut seen = HashSet::new();
        self.orders()
            .iter()
            .filter(|order| order.grants_access(self.policy, now))
            .filter_map(|order| order.course.clone())
            .filter(|course| seen.insert(course.id.clone()))
            .map(|mut course| {
                course.purchased = true;
                course
            })
            .collect()
    }

    /// Sets `purchased` on each course from the current snapshot.
    pub fn annotate(&self, courses: &mut [Course]) {
        mark_purchased(courses, &self.orders(), self.policy, Utc::now());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;
    use elearn_core::domain::{CategoryId, OrderId, OrderStatus};
    use async_trait::async_trait;
    use elearn_core::domain::{Category, CourseDetail, SectionDetail, SectionId};
    use elearn_core::ports::{CourseVisibility, MockBackendGateway, OnboardOutcome};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    pub(crate) fn course(id: &str) -> Course {
        Course {
            id: CourseId::from(id),
            name: format!("Course {id}"),
            description: String::new(),
            price: 49900,
            category_id: CategoryId::from("cat"),
            head_img: None,
            allow_free_access: false,
            can_be_purchased: true,
            is_published: true,
            expires_at: None,
            purchased: false,
        }
    }

    pub(crate) fn order(course_id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::from(format!("o-{course_id}")),
            user_id: UserId::from("u1"),
            course_id: CourseId::from(course_id),
            amount: 49900,
            status,
            expiration_time: None,
            course: Some(course(course_id)),
        }
    }

    /// Serves each `library` call from the next queued channel, so a test
    /// decides when the backend replies.
    struct HeldGateway {
        replies: Mutex<VecDeque<oneshot::Receiver<Vec<Order>>>>,
    }

    impl HeldGateway {
        fn new(replies: Vec<oneshot::Receiver<Vec<Order>>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl BackendGateway for HeldGateway {
        async fn onboard(&self, _uid: &UserId) -> OnboardOutcome {
            unimplemented!()
        }
        async fn list_categories(&self, _show_inactive: bool) -> Vec<Category> {
            unimplemented!()
        }
        async fn list_courses(&self, _category_id: &CategoryId) -> Vec<Course> {
            unimplemented!()
        }
        async fn course_detail(
            &self,
            _course_id: &CourseId,
            _visibility: CourseVisibility,
        ) -> Option<CourseDetail> {
            unimplemented!()
        }
        async fn section_content(
            &self,
            _course_id: &CourseId,
            _section_id: &SectionId,
        ) -> Option<SectionDetail> {
            unimplemented!()
        }
        async fn create_order(&self, _course_id: &CourseId, _user_id: &UserId) -> Option<Order> {
            unimplemented!()
        }
        async fn library(&self, _user_id: &UserId) -> Vec<Order> {
            let reply = self.replies.lock().unwrap().pop_front().unwrap();
            reply.await.unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn refresh_publishes_snapshot_and_recomputes_flags() {
        let mut gateway = MockBackendGateway::new();
        gateway
            .expect_library()
            .withf(|uid| uid.as_str() == "u1")
            .times(1)
            .returning(|_| vec![order("k1", OrderStatus::Paid), order("k2", OrderStatus::Created)]);

        let library = Library::new(Arc::new(gateway), ExpiryPolicy::Informational);
        let mut rx = library.subscribe();
        let mut courses = vec![course("k1"), course("k2"), course("k3")];
        library.annotate(&mut courses);
        assert!(courses.iter().all(|c| !c.purchased));

        library.refresh(&UserId::from("u1")).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
        library.annotate(&mut courses);
        let flags: Vec<bool> = courses.iter().map(|c| c.purchased).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[tokio::test]
    async fn purchased_courses_lists_each_paid_course_once() {
        let mut gateway = MockBackendGateway::new();
        gateway.expect_library().returning(|_| {
            vec![
                order("k1", OrderStatus::Paid),
                order("k1", OrderStatus::Paid),
                order("k2", OrderStatus::Failed),
            ]
        });

        let library = Library::new(Arc::new(gateway), ExpiryPolicy::Informational);
        library.refresh(&UserId::from("u1")).await;

        let purchased = library.purchased_courses();
        assert_eq!(purchased.len(), 1);
        assert_eq!(purchased[0].id.as_str(), "k1");
        assert!(purchased[0].purchased);
    }

    #[tokio::test]
    async fn enforced_policy_drops_expired_orders() {
        let mut gateway = MockBackendGateway::new();
        gateway.expect_library().returning(|_| {
            let mut expired = order("k1", OrderStatus::Paid);
            expired.expiration_time = Some(Utc::now() - Duration::days(1));
            vec![expired]
        });

        let library = Library::new(Arc::new(gateway), ExpiryPolicy::Enforced);
        library.refresh(&UserId::from("u1")).await;

        assert!(library.entitled_ids().is_empty());
        assert!(library.purchased_courses().is_empty());
    }

    #[tokio::test]
    async fn refresh_finishing_after_clear_is_discarded() {
        let (reply, held) = oneshot::channel();
        let library = Library::new(
            Arc::new(HeldGateway::new(vec![held])),
            ExpiryPolicy::Informational,
        );

        let user = UserId::from("u1");
        let refresh = library.refresh(&user);
        let sign_out = async {
            library.clear();
            reply.send(vec![order("k1", OrderStatus::Paid)]).unwrap();
        };
        let (snapshot, ()) = tokio::join!(refresh, sign_out);

        assert!(snapshot.is_empty());
        assert!(library.orders().is_empty());
        assert!(library.entitled_ids().is_empty());
    }

    #[tokio::test]
    async fn older_refresh_does_not_overwrite_newer_one() {
        let (older_reply, older_held) = oneshot::channel();
        let (newer_reply, newer_held) = oneshot::channel();
        let library = Library::new(
            Arc::new(HeldGateway::new(vec![older_held, newer_held])),
            ExpiryPolicy::Informational,
        );
        let uid = UserId::from("u1");

        let older = library.refresh(&uid);
        let newer = async {
            newer_reply
                .send(vec![order("k1", OrderStatus::Paid), order("k2", OrderStatus::Paid)])
                .unwrap();
            let snapshot = library.refresh(&uid).await;
            older_reply.send(vec![order("k1", OrderStatus::Paid)]).unwrap();
            snapshot
        };
        let (from_older, from_newer) = tokio::join!(older, newer);

        assert_eq!(from_newer.len(), 2);
        assert_eq!(from_older.len(), 2);
        assert_eq!(
            library.entitled_ids(),
            HashSet::from([CourseId::from("k1"), CourseId::from("k2")])
        );
    }

    #[test]
    fn clear_empties_snapshot() {
        let library = Library::new(Arc::new(MockBackendGateway::new()), ExpiryPolicy::default());
        library.orders.send_replace(Arc::new(vec![order("k1", OrderStatus::Paid)]));

        library.clear();

        assert!(library.orders().is_empty());
    }
}
