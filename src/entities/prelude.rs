pub use super::failed::Entity as Failed;
pub use super::history::Entity as History;
pub use super::info::Entity as Info;
pub use super::tv_episodes::Entity as TvEpisodes;
pub use super::tv_shows::Entity as TvShows;
