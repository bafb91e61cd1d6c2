//! Client core for the project hub: session management against the identity
//! provider, the GraphQL project data boundary, and the project list screen
//! controller that front ends drive.

pub mod app;
pub mod cognito;
pub mod config;
pub mod error;
pub mod graphql;
pub mod identity;
pub mod navigation;
pub mod screen;
pub mod session;

pub use app::AppContext;
pub use cognito::CognitoIdentityProvider;
pub use config::{load_settings, load_settings_from, ClientSettings};
pub use error::{error_to_string, AuthenticationError, DataRequestError};
pub use graphql::{GraphqlClient, GraphqlProjectRepository, ProjectRepository};
pub use identity::{IdentityProvider, MissingIdentityProvider, NoToken, TokenSource};
pub use navigation::{Navigator, Route, TracingNavigator};
pub use screen::{EditorState, ProjectScreen, ScreenView, ScreenViewState};
pub use session::{SessionEvent, SessionManager, SessionPhase, SessionSnapshot};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
