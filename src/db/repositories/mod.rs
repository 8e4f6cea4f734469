pub mod episode;
pub mod history;
pub mod info;
pub mod show;
