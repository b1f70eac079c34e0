//! CRM Leads: role resolution, organisation scoping and the lead,
//! agent and category lifecycles.
//!
//! Every operation takes the authenticated [`Principal`] explicitly and
//! re-derives its [`Role`] from stored data before touching anything.

pub mod accounts;
pub mod agents;
pub mod categories;
pub mod config;
pub mod error;
pub mod leads;
pub mod notify;
pub mod role;
pub mod scope;

pub use accounts::{AccountService, SignupForm};
pub use agents::{AgentForm, AgentService};
pub use categories::CategoryService;
pub use config::{CrmConfig, NotificationConfig};
pub use error::AccessError;
pub use leads::{LeadForm, LeadService};
pub use notify::{LogNotifier, Notification, Notifier, NotifyError, SmtpConfig, SmtpNotifier};
pub use role::{Principal, Role, resolve_role};
pub use scope::{CategoryDetail, CategoryListing, LeadListing, ScopedQueryService};
