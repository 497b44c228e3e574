pub mod leads;
pub mod session;

use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::crm::DynamicsClient;
use crate::identity::GroupResolver;
use crate::services::LeadQueryService;

#[derive(Clone)]
pub struct AppState {
    pub leads: Arc<LeadQueryService<DynamicsClient>>,
    pub resolver: Arc<GroupResolver>,
    pub audit: AuditLogger,
}
