use std::sync::Arc;

use crate::application::catalog::CatalogService;
use crate::application::integrations::IntegrationService;
use crate::application::targets::PublishTargetService;

#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<CatalogService>,
    pub integrations: Arc<IntegrationService>,
    pub targets: Arc<PublishTargetService>,
}
