pub mod color;
pub mod context;
pub mod feed;
pub mod geo;
pub mod graph;
pub mod join;
pub mod locations;
pub mod marker;
pub mod query;
pub mod search;
pub mod surface;
pub mod visibility;

pub use color::{Color, color_for, edge_color};
pub use context::{MapContext, MarkerAction};
pub use feed::*;
pub use geo::LatLng;
pub use graph::*;
pub use join::{IntegrityError, JoinOutcome, JoinSummary, join};
pub use locations::{LocationOverride, LocationOverrides, OverrideReport};
pub use marker::{MarkerStyle, TeamTier};
pub use query::{FIRST_SEASON, LATEST_SEASON, MapQuery};
pub use search::SearchError;
pub use surface::{LineHandle, MapSurface, MarkerHandle, MarkerSpec, Scene};
pub use visibility::*;
