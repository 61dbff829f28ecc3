//! Generation graph: nodes, the container that prunes them, and the grid specialization.

mod cell;
mod connectivity;
mod container;
mod grid;

pub use cell::{GenCell, NodeId};
pub use connectivity::{ConnectivityTest, Edge};
pub use container::GenCellContainer;
pub use grid::{GridContainer, ReserveError};
