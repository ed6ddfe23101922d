use atithi_core::repository::GuestStore;
use atithi_registration::SessionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub expiration: u64,
    pub admin_email: String,
    pub admin_password: String,
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub guests: Arc<dyn GuestStore>,
    pub auth: AuthSettings,
}
