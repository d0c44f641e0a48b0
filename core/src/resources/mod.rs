//! Resource clients: one per REST resource, each a table of `Route`s plus
//! thin typed methods over `RestClient::execute`.

mod app;
mod app_config;
mod role;
mod user;

pub use app::AppClient;
pub use app_config::AppConfigClient;
pub use role::RoleClient;
pub use user::UserClient;
