pub mod places;
pub mod routing;

pub use places::{PlaceLocator, PlaceSearch, PlacesConfig};
pub use routing::{duration_to_minutes, RoutePlanner, RoutePlanning, RoutingConfig};
