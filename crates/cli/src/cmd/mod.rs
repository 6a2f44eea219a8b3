mod build;
mod env;
mod info;
mod run;

pub use build::cmd_build;
pub use env::cmd_env;
pub use info::cmd_info;
pub use run::cmd_run;
