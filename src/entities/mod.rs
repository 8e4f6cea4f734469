pub mod prelude;

pub mod failed;
pub mod history;
pub mod info;
pub mod tv_episodes;
pub mod tv_shows;
