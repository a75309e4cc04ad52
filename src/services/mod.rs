pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{
    AuthError, IdentityProvider, IssuedCredentials, LoginOutcome, Subject, Validated, require_role,
};
pub use auth_service_impl::TokenIdentity;

pub mod hub;
pub use hub::Hub;

pub mod movement_service;
pub mod movement_service_impl;
pub use movement_service::{MovementError, MovementService, NewEquipment};
pub use movement_service_impl::SeaOrmMovementService;

pub mod notifier;
pub use notifier::{LogNotifier, Notifier};

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserInput, UserService};
pub use user_service_impl::SeaOrmUserService;
