pub mod login;
pub mod orgs;
pub mod users;
