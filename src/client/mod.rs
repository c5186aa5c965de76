//! Client side of the catalogue: the HTTP client the web frontend talks
//! through, and the frontend's route table with its navigation guard.

pub mod remote;
pub mod routes;

pub use remote::{
    unwrap_envelope, ClientError, IdentifyDto, ListIdentifiersDto, Notifications, OaiHeaderDto, RemoteServices,
    Session,
};
pub use routes::{guard, resolve, Navigation, RequiredAuth, Route, RouteMatch, ROUTES};
