#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod config;
pub mod error;
pub mod events;
pub mod hub;
pub mod manager;
pub mod socket;
pub mod status;
pub mod transport;
pub mod types;

pub use config::Config;
pub use error::Error;
pub use events::{AppEvent, EventDispatcher};
pub use manager::ConnectionManager;
pub use status::{AuctionRoomGuard, StatusWatcher};
pub use types::{
    AuctionStatusEvent, BidData, ConnectionStatus, NotificationEvent, ParticipantCount,
    UserIdentity,
};

pub type Result<T> = std::result::Result<T, Error>;
