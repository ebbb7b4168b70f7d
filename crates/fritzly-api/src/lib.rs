// fritzly-api: Async Rust client for the FRITZ!Box home automation (AHA) HTTP interface

pub mod auth;
pub mod client;
pub mod devicelist;
pub mod error;
pub mod login;
pub mod models;
pub mod switch;
pub mod transport;

pub use auth::{Credentials, Session, SessionState, UNAUTHENTICATED_SID, challenge_response};
pub use client::{LOGIN_PATH, Params, SWITCH_PATH, SessionClient};
pub use devicelist::{Inventory, parse_inventory};
pub use error::Error;
pub use models::{
    RawDevice, RawGroup, RawHkr, RawNextChange, RawPowerMeter, RawSwitch, RawTemperature,
};
pub use switch::{HKR_OFF, HKR_ON};
pub use transport::{TlsMode, TransportConfig};
