//! Shared application state for all model routes.

use crate::config::ApiConfig;
use crate::driver::Driver;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub driver: Arc<dyn Driver>,
    pub config: Arc<ApiConfig>,
}

impl ApiState {
    pub fn new(driver: Arc<dyn Driver>, config: ApiConfig) -> Self {
        ApiState {
            driver,
            config: Arc::new(config),
        }
    }
}
