//! Engine Variants
//!
//! Every variant implements [`crate::engine::Engine`]. Which variants exist is
//! decided at build time by cargo features; `blackhole` is always present.
//!
//! | name        | feature          | backing                          |
//! |-------------|------------------|----------------------------------|
//! | `blackhole` | -                | none                             |
//! | `caching`   | `engine-caching` | another variant plus expiry      |
//! | `cmap`      | `engine-cmap`    | pool file, hash index            |
//! | `stree`     | `engine-stree`   | pool file, sorted index          |
//! | `tree3`     | `engine-tree3`   | pool file, sorted index          |
//! | `vsmap`     | `engine-vsmap`   | memory, sorted index; needs dir  |
//! | `vcmap`     | `engine-vcmap`   | memory, hash index; needs dir    |

mod blackhole;
#[cfg(feature = "engine-caching")]
mod caching;
#[cfg(any(
    feature = "engine-cmap",
    feature = "engine-stree",
    feature = "engine-tree3",
    feature = "engine-vsmap",
    feature = "engine-vcmap"
))]
mod index;
#[cfg(any(feature = "engine-cmap", feature = "engine-stree", feature = "engine-tree3"))]
mod pool;
#[cfg(any(feature = "engine-vsmap", feature = "engine-vcmap"))]
mod volatile;

pub use blackhole::Blackhole;
#[cfg(feature = "engine-caching")]
pub use caching::Caching;
#[cfg(any(feature = "engine-cmap", feature = "engine-stree", feature = "engine-tree3"))]
pub use pool::{CMap, Layout, PoolEngine, STree, Tree3};
#[cfg(any(feature = "engine-vsmap", feature = "engine-vcmap"))]
pub use volatile::{VCMap, VSMap, VolatileEngine};
