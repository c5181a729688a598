mod auth;
mod health_check;
mod servers;
mod users;

pub use auth::{login, logout, logout_all, refresh, signup};
pub use health_check::health_check;
pub use servers::{
    accept_invite, create_invite, create_server, get_server, get_server_members, list_servers,
};
pub use users::{delete_current_user, get_current_user, list_users, update_current_user};
