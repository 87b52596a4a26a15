mod cooldown;
mod gate;

pub use cooldown::{latest_timestamp, CooldownPolicy, CooldownStatus};
pub use gate::{Session, SessionGate, SessionHandle, SessionState};
