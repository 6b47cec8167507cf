//! Login, SMS second factor and session refresh for wholesaler integrations.
//!
//! Every state change goes through a [`wsproxy_db::SessionStore`], so the
//! flows here hold nothing between calls.

mod error;
mod login;
mod refresh;
mod temp_id;

pub use error::AuthError;
pub use login::{LoginFlow, LoginRequest, LoginResult};
pub use refresh::{
    resolve_session, session_status, ResolvedSession, SessionPolicy, SessionSource, SessionStatus,
};
pub use temp_id::new_temp_id;
