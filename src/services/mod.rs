pub mod password;
pub use password::Passwords;

pub mod authenticator;
pub mod authenticator_impl;
pub use authenticator::{AuthContext, AuthError, Authenticator, Credentials};
pub use authenticator_impl::UsernameAuthenticator;

pub mod user_manager;
pub use user_manager::UserManager;

pub mod user_builder;
pub use user_builder::{UserBuilder, UserBuilderError};

pub mod user_data;
pub use user_data::{Attachment, UserDataProvider, UserDataRegistry};

pub mod addresses_data;
pub use addresses_data::{AddressExport, AddressesUserDataProvider};

pub mod logs;
pub use logs::LogService;
