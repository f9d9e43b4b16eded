//! Files produced by a run.
//!
//! - [`artifact`]: the downloaded map, saved under a dated and a canonical name
//!
//! ```text
//! output_dir/
//! ├── estofex_latest_20240501.png
//! └── estofex_latest.png
//! ```

pub mod artifact;
