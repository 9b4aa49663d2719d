//! Policy-to-action routing: turns a [`ices_core::Verdict`] into a batched
//! tag/delete request or a synchronous quarantine call, using a per-tenant
//! OAuth2 token cache to authenticate against the Graph API.

mod actions;
mod batch_client;
mod dispatcher;
mod error;
mod token_manager;

pub use actions::{bec_risk_level, build_delete_request, build_quarantine_body, build_tag_request, risk_label, BatchSubRequest};
pub use batch_client::{BatchClient, BatchClientConfig};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, Result};
pub use token_manager::{TenantCredentials, TokenManager};
