// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical partition identity and the external storage boundaries
//!
//! The core never talks to the network directly; the remote object store,
//! the shared key-value store, the pub/sub channel and the analytical
//! engine are constructor-injected trait objects. In-memory
//! implementations of the store and channel traits ship here for
//! embedding and tests; the engine stays a consumer-provided black box.

pub mod engine;
pub mod kv;
pub mod partition;
pub mod pubsub;
pub mod remote;

pub use engine::{AnalyticalEngine, EngineError};
pub use kv::{KeyValueStoreError, MemoryKeyValueStore, SharedKeyValueStore};
pub use partition::{
    time_point_prefix, PhysicalTableRef, METRIC_ID_COLUMN, TIME_POINT_COLUMN, VALUE_COLUMN,
};
pub use pubsub::{LocalPubSub, PubSubChannel, PubSubError};
pub use remote::{MemoryObjectStore, ObjectStoreError, RemoteObjectStore};
