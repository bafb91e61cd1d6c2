//! Navigation hand-off to screens outside this crate.

use shared::protocol::ProjectRouteState;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ProjectPeriods(ProjectRouteState),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::ProjectPeriods(_) => "/proyecto/periodo",
        }
    }
}

/// Fire-and-forget: implementations must not block and have nothing to report
/// back.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        match &route {
            Route::ProjectPeriods(state) => info!(
                path = route.path(),
                period_project_id = %state.period_project_id,
                project_name = %state.project_name,
                "navigating"
            ),
        }
    }
}
