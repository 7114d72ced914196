use std::sync::Arc;

use crate::config::Config;
use crate::recordings::RecordingStore;
use crate::session::SessionCoordinator;
use crate::websocket::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    pub connections: ConnectionRegistry,
    pub config: Arc<Config>,
    /// `None` when no recording bucket is configured; the upload route
    /// answers 503 in that case.
    pub recordings: Option<Arc<dyn RecordingStore>>,
}
