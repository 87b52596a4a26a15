use std::sync::Arc;

use breathalyzer_core::Breathalyzer;
use tokio::task::spawn_blocking;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub station: Arc<Breathalyzer>,
}

impl AppState {
    pub fn new(station: Breathalyzer) -> Self {
        Self {
            station: Arc::new(station),
        }
    }

    /// Run `f` against the station off the async runtime; the store does
    /// synchronous file I/O under its lock.
    pub async fn blocking<T, E, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        E: Into<AppError> + Send + 'static,
        F: FnOnce(&Breathalyzer) -> Result<T, E> + Send + 'static,
    {
        let station = Arc::clone(&self.station);
        spawn_blocking(move || f(&station))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?
            .map_err(Into::into)
    }
}
