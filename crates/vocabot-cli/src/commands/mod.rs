pub mod check_login;
pub mod init;
pub mod list_models;
pub mod run;
pub mod status;
