//! Service layer - business rules over the storage contract.
//!
//! Each entity gets a service trait plus its `Manager` implementation; the
//! traits are mockable so callers can be tested without storage. Guards
//! authorize, the saga keeps entity rows and assets consistent, and the
//! search facade fans queries out across collections.

pub mod categories;
pub mod guards;
pub mod products;
pub mod roles;
pub mod saga;
pub mod search;
pub mod users;

pub use categories::{CategoryManager, CategoryService};
pub use guards::{owner_guard, role_guard, run_guards, GuardOutcome};
pub use products::{ProductManager, ProductService};
pub use roles::{RoleManager, RoleService};
pub use saga::{AssetLinkSaga, SagaState};
pub use search::SearchFacade;
pub use users::{UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use categories::MockCategoryService;
#[cfg(any(test, feature = "test-utils"))]
pub use products::MockProductService;
#[cfg(any(test, feature = "test-utils"))]
pub use roles::MockRoleService;
#[cfg(any(test, feature = "test-utils"))]
pub use users::MockUserService;
