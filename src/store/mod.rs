//! Hosted row-store boundary
//!
//! The hub persists device connections, automation rules, voice command logs
//! and the audio library as rows in a hosted Postgres service exposed over a
//! generic REST table API. The core treats the store purely as a row-store
//! collaborator: CRUD verbs, no server-side logic.
//!
//! Calls are single-attempt. A failure is logged, surfaced once as a
//! notification by the caller, and the operation is abandoned - there is no
//! retry or backoff anywhere on this boundary.

mod client;
mod rows;

pub use client::{SharedStore, StoreClient, StoreError, TableQuery};
pub use rows::{
    AudioTrackRow, AutomationRuleRow, ConnectionStampPatch, DeviceConnectionRow, VoiceCommandRow,
};
