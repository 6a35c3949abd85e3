//! Business logic services

pub mod catalog;
pub mod loans;
pub mod users;

use std::sync::Arc;

use mockable::Clock;

use crate::repository::Repository;

/// Time source shared by every service
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services over the given repositories and clock
    pub fn new(repository: Repository, clock: SharedClock) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone(), clock.clone()),
            loans: loans::LoansService::new(repository, clock),
        }
    }

    /// Services reading the system clock
    pub fn with_system_clock(repository: Repository) -> Self {
        Self::new(repository, Arc::new(mockable::DefaultClock))
    }
}
