//! Bot core: turn handling, state access, and the surfaces that feed it.

pub mod router;
pub mod routes;
pub mod runner;
pub mod state;
pub mod turn;

pub use router::{BotDeps, ConnectHubBot};
pub use routes::activity_routes;
pub use runner::run;
pub use turn::TurnContext;
