//! CRM Server: wires configuration, the SurrealDB store and the CRM
//! services into one in-process handle for the presentation layer.

pub mod config;

use std::sync::Arc;

use crm_db::SurrealRepositories;
use crm_leads::{
    AccountService, AgentService, CategoryService, CrmConfig, LeadService, Notifier,
    ScopedQueryService,
};
use surrealdb::{Connection, Surreal};

/// Every CRM service, sharing one store and one notifier.
pub struct Crm<C: Connection, N> {
    pub queries: ScopedQueryService<SurrealRepositories<C>>,
    pub leads: LeadService<SurrealRepositories<C>, N>,
    pub agents: AgentService<SurrealRepositories<C>, N>,
    pub categories: CategoryService<SurrealRepositories<C>>,
    pub accounts: AccountService<SurrealRepositories<C>>,
}

impl<C: Connection + Clone, N: Notifier + 'static> Crm<C, N> {
    pub fn new(
        db: Surreal<C>,
        pepper: Option<String>,
        notifier: Arc<N>,
        config: CrmConfig,
    ) -> Self {
        let store = match pepper {
            Some(pepper) => SurrealRepositories::with_pepper(db, pepper),
            None => SurrealRepositories::new(db),
        };

        Self {
            queries: ScopedQueryService::new(store.clone()),
            leads: LeadService::new(
                store.clone(),
                Arc::clone(&notifier),
                config.notification.clone(),
            ),
            agents: AgentService::new(store.clone(), notifier, config.clone()),
            categories: CategoryService::new(store.clone()),
            accounts: AccountService::new(store, config),
        }
    }
}
