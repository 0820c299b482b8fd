pub mod cursor;
pub mod discover;
pub mod ranker;
pub mod scorer;

pub use discover::{DiscoverService, FeedPage};
