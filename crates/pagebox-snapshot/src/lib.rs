//! Read-only handoff of laid-out pagebox pages.
//!
//! A [`PageSnapshot`] is a flat, serializable copy of one logical page box:
//! JSON for inspection, postcard for caching. [`PageSnapshot::split_pages`]
//! assigns the captured nodes to the physical pages of a [`PageGrid`].
//!
//! [`PageGrid`]: pagebox::PageGrid

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod error;
mod snapshot;
mod store;

pub use error::SnapshotError;
pub use snapshot::{
    PageItem, PageSnapshot, PhysicalPage, SnapshotBoxType, SnapshotKind, SnapshotNode,
    SNAPSHOT_SCHEMA_VERSION,
};
pub use store::FileSnapshotStore;
