//! services/client/src/controller/navigation.rs
//!
//! The screen stack. Which root it sits on follows the auth session: signed
//! out it is `GetStarted`, signed in it is `Home`, and every transition between
//! the two discards the whole history.

use elearn_core::domain::{
    CategoryId, ContentId, ContentItem, ContentPayload, CourseId, SectionId, UserId,
};
use std::fmt;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::auth::{AuthSession, AuthState};
use super::playback::MediaHandoff;
use super::scope::ScreenScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPhase {
    Unauthenticated,
    Authenticated,
}

impl AuthPhase {
    pub fn of(state: &AuthState) -> Self {
        match state {
            AuthState::SignedIn(_) => AuthPhase::Authenticated,
            AuthState::SignedOut => AuthPhase::Unauthenticated,
        }
    }

    pub fn root(self) -> Route {
        match self {
            AuthPhase::Unauthenticated => Route::GetStarted,
            AuthPhase::Authenticated => Route::Home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    GetStarted,
    Home,
    Cart,
    Library,
    Profile,
    AboutUs,
    ContactUs,
    Terms,
    Courses {
        category_id: CategoryId,
        user_id: UserId,
    },
    Sections {
        course_id: CourseId,
    },
    Content {
        course_id: CourseId,
        section_id: SectionId,
    },
    VideoPlayer {
        content_id: ContentId,
    },
    PdfViewer {
        uri: String,
    },
    LivePlayer {
        video_id: String,
    },
}

impl Route {
    /// Informational pages stay reachable while signed out.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Route::GetStarted | Route::AboutUs | Route::ContactUs | Route::Terms
        )
    }

    pub fn template(&self) -> &'static str {
        match self {
            Route::GetStarted => "get_started",
            Route::Home => "home",
            Route::Cart => "cart",
            Route::Library => "library",
            Route::Profile => "profile",
            Route::AboutUs => "about_us",
            Route::ContactUs => "contact_us",
            Route::Terms => "terms",
            Route::Courses { .. } => "courses/{category_id}/{user_id}",
            Route::Sections { .. } => "sections/{course_id}",
            Route::Content { .. } => "content/{course_id}/{section_id}",
            Route::VideoPlayer { .. } => "video_player/{content_id}",
            Route::PdfViewer { .. } => "pdf_viewer?uri={uri}",
            Route::LivePlayer { .. } => "live_player?video_id={video_id}",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Courses {
                category_id,
                user_id,
            } => write!(f, "courses/{}/{}", category_id, user_id),
            Route::Sections { course_id } => write!(f, "sections/{}", course_id),
            Route::Content {
                course_id,
                section_id,
            } => write!(f, "content/{}/{}", course_id, section_id),
            Route::VideoPlayer { content_id } => write!(f, "video_player/{}", content_id),
            Route::PdfViewer { uri } => write!(f, "pdf_viewer?uri={}", uri),
            Route::LivePlayer { video_id } => write!(f, "live_player?video_id={}", video_id),
            other => f.write_str(other.template()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("{0} requires a signed-in user")]
    AuthenticationRequired(Route),
    #[error("{0} is not reachable while signed in")]
    NotReachable(Route),
    #[error("The media handoff does not belong to this route")]
    HandoffMismatch,
}

/// One entry of the back stack.
#[derive(Debug)]
pub struct Screen {
    id: Uuid,
    route: Route,
    handoff: Option<MediaHandoff>,
    scope: ScreenScope,
}

impl Screen {
    fn new(route: Route, handoff: Option<MediaHandoff>) -> Self {
        Self {
            id: Uuid::new_v4(),
            route,
            handoff,
            scope: ScreenScope::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn scope(&self) -> &ScreenScope {
        &self.scope
    }

    pub fn has_handoff(&self) -> bool {
        self.handoff.is_some()
    }

    /// Moves the handoff out. Later calls return `None`.
    pub fn take_handoff(&mut self) -> Option<MediaHandoff> {
        self.handoff.take()
    }

    fn discard(self) {
        debug!("Closing screen {} ({})", self.route, self.id);
        self.scope.close();
    }
}

pub struct NavigationRouter {
    auth: watch::Receiver<AuthState>,
    applied: AuthState,
    root: Screen,
    stack: Vec<Screen>,
}

impl NavigationRouter {
    pub fn new(session: &AuthSession) -> Self {
        Self::with_auth(session.subscribe())
    }

    pub fn with_auth(mut auth: watch::Receiver<AuthState>) -> Self {
        let applied = auth.borrow_and_update().clone();
        let root = Screen::new(AuthPhase::of(&applied).root(), None);
        info!("Navigation starts at {}", root.route);
        Self {
            auth,
            applied,
            root,
            stack: Vec::new(),
        }
    }

    pub fn phase(&self) -> AuthPhase {
        AuthPhase::of(&self.applied)
    }

    /// The top screen, after applying any pending auth change.
    pub fn current(&mut self) -> &Screen {
        self.sync_auth();
        self.top()
    }

    pub fn current_mut(&mut self) -> &mut Screen {
        self.sync_auth();
        match self.stack.last_mut() {
            Some(screen) => screen,
            None => &mut self.root,
        }
    }

    /// Routes from the root to the top of the stack, after applying any
    /// pending auth change.
    pub fn history(&mut self) -> Vec<&Route> {
        self.sync_auth();
        std::iter::once(&self.root.route)
            .chain(self.stack.iter().map(|screen| &screen.route))
            .collect()
    }

    /// Applies an auth change that arrived since the last call.
    /// Returns whether the history was reset.
    pub fn sync_auth(&mut self) -> bool {
        let state = self.auth.borrow_and_update().clone();
        self.apply_auth(state)
    }

    /// Waits for the next auth change and applies it. Returns `false` once the
    /// session is gone.
    pub async fn auth_changed(&mut self) -> bool {
        if self.auth.changed().await.is_err() {
            return false;
        }
        let state = self.auth.borrow_and_update().clone();
        self.apply_auth(state);
        true
    }

    pub fn navigate(&mut self, route: Route) -> Result<&Screen, NavigationError> {
        self.push(route, None)
    }

    /// Opens a player screen that will receive `handoff`.
    pub fn navigate_with_handoff(
        &mut self,
        route: Route,
        handoff: MediaHandoff,
    ) -> Result<&Screen, NavigationError> {
        let belongs = matches!(
            &route,
            Route::VideoPlayer { content_id } if *content_id == handoff.current().id
        );
        if !belongs {
            return Err(NavigationError::HandoffMismatch);
        }
        self.push(route, Some(handoff))
    }

    /// Routes a content item to the screen that presents it.
    pub fn open_content(
        &mut self,
        item: &ContentItem,
        section_contents: &[ContentItem],
    ) -> Result<&Screen, NavigationError> {
        match &item.payload {
            ContentPayload::Video(_) => {
                let handoff = MediaHandoff::for_selection(section_contents, &item.id)
                    .ok_or(NavigationError::HandoffMismatch)?;
                let route = Route::VideoPlayer {
                    content_id: item.id.clone(),
                };
                self.navigate_with_handoff(route, handoff)
            }
            ContentPayload::Pdf { uri } => self.navigate(Route::PdfViewer { uri: uri.clone() }),
            ContentPayload::LiveVideo { stream_id } => self.navigate(Route::LivePlayer {
                video_id: stream_id.clone(),
            }),
        }
    }

    /// Pops the top screen. The root is never popped, and nothing is popped
    /// when a pending auth change has just reset the history.
    pub fn back(&mut self) -> bool {
        if self.sync_auth() {
            return false;
        }
        match self.stack.pop() {
            Some(screen) => {
                screen.discard();
                true
            }
            None => false,
        }
    }

    fn push(
        &mut self,
        route: Route,
        handoff: Option<MediaHandoff>,
    ) -> Result<&Screen, NavigationError> {
        self.sync_auth();
        let phase = self.phase();

        if route.requires_auth() && phase == AuthPhase::Unauthenticated {
            return Err(NavigationError::AuthenticationRequired(route));
        }
        if route == Route::GetStarted && phase == AuthPhase::Authenticated {
            return Err(NavigationError::NotReachable(route));
        }

        if route == phase.root() {
            self.clear_stack();
        } else {
            debug!("Navigating to {}", route);
            self.stack.push(Screen::new(route, handoff));
        }
        Ok(self.top())
    }

    fn top(&self) -> &Screen {
        self.stack.last().unwrap_or(&self.root)
    }

    fn apply_auth(&mut self, state: AuthState) -> bool {
        if state == self.applied {
            return false;
        }
        self.applied = state;
        let root = self.phase().root();
        info!("Auth changed; resetting navigation to {}", root);

        self.clear_stack();
        let previous = std::mem::replace(&mut self.root, Screen::new(root, None));
        previous.discard();
        true
    }

    fn clear_stack(&mut self) {
        for screen in self.stack.drain(..).rev() {
            screen.discard();
        }
    }
}
