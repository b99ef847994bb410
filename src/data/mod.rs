/// Data layer: upload ingestion, statistics, display normalization and
/// the session comment log.
///
/// Architecture:
/// ```text
///  Upload (name + bytes)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  FitsFile → first image-bearing HDU → ImageBlock
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  stats    │  replace NaN/±inf with 0, mean brightness
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  linear or percentile stretch → Array2<u8>
///   └───────────┘
/// ```

pub mod comments;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod stats;
