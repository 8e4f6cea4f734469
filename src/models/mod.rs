pub mod episode;
pub mod release;
pub mod show;

pub use episode::{Episode, Segment};
pub use release::SearchResult;
pub use show::Show;
