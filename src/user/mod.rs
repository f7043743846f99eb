mod credentials;
mod models;
mod pending;
mod sqlite_user_store;
pub mod tokens;
mod user_manager;
mod user_store;

pub use credentials::CredentialHasher;
pub use models::{
    AccountUpdate, ContentQuantities, NewUser, User, UserCollection, UserSummary,
};
pub use pending::{ConfirmationIntent, PendingAction, PendingRejection};
pub use sqlite_user_store::{SqliteUserStore, USER_VERSIONED_SCHEMAS};
pub use tokens::{IssuedToken, TokenIssuer};
pub use user_manager::{normalize_email, UserManager};
pub use user_store::UserStore;
