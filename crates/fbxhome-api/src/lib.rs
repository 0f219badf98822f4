// fbxhome-api: Async Rust client for the Freebox local API and player remote control

pub mod auth;
pub mod call;
pub mod client;
pub mod error;
pub mod home;
pub mod models;
pub mod network;
pub mod remote;
pub mod storage;
pub mod system;
pub mod transport;

pub use auth::{AppIdentity, ChallengeSigner};
pub use client::FreeboxClient;
pub use error::Error;
pub use remote::RemoteControlClient;
pub use transport::{TlsMode, TransportConfig};
