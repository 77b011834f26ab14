pub mod config;
pub mod error;
pub mod extractors;
pub mod grace;
pub mod guards;
pub mod roles;
pub mod routes;
pub mod session;

pub use config::GuardConfig;
pub use error::{AuthError, AuthResult, RoleParseError};
pub use extractors::{RequireSession, SessionContext};
pub use grace::{spawn_authenticated_guard, GuardHandle};
pub use guards::{AdminGuard, AuthenticatedGuard, GuardDecision, RoleGuard, TermsGate};
pub use roles::{has_any_role, primary_role, Role, ROLE_PRIORITY};
pub use routes::{dashboard_route, login_route, ADMIN_LOGIN_ROUTE};
pub use session::{SessionState, SessionUser, UserProfile};
