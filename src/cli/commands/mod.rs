mod backlog;
mod search;
mod status;
mod wanted;

pub use backlog::{cmd_backlog, cmd_force_backlog};
pub use search::{cmd_retry, cmd_search};
pub use status::cmd_status;
pub use wanted::cmd_wanted;
