mod dispatch;
mod roster;
mod store;

pub use dispatch::{DispatchStats, Dispatched, EventDispatcher};
pub use roster::{LatLon, Roster, ScenarioUnit, UnitSide, can_control_unit};
pub use store::{GameOutcome, SessionReady, SessionStore, StoreChange, SubscriptionId};
