mod cmd;
mod layers;
mod shutdown;
mod site;
mod validators;

pub mod auth;
pub mod conf;
pub mod errors;
pub mod forms;
pub mod logging;
pub mod passwords;
pub mod roles;
pub mod store;
pub mod testing;
pub mod validation;
pub mod views;

pub use auth::{AuthConf, AuthError, AuthUser, Authenticator};
pub use conf::{LogConf, SiteConf};
pub use errors::{ApiError, ApiResult};
pub use roles::{AdminOnly, Permit, Role};
pub use site::{Site, SiteBuilder, SiteError, run};
pub use validation::{Validate, ValidationError, ValidationReport};
