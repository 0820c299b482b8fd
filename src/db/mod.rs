pub mod catalog;
pub mod favourites;
pub mod postgres;
pub mod profiles;

pub use catalog::{CatalogStore, PgCatalogStore};
pub use favourites::{FavouritesStore, PgFavouritesStore};
pub use postgres::create_pool;
pub use profiles::{PgProfileStore, ProfileStore};
