//! Command-line configuration for the node-numbering binary.

use clap::Parser;

/// Builds a distributed node numbering for a 2:1-balanced quadtree forest.
#[derive(Parser, Debug)]
#[command(name = "meshnum", version, about)]
pub struct Cli {
    /// Use full-style triangulation (center and element-face midpoints are
    /// always corner-codim) instead of half-style for every non-root leaf.
    #[arg(long, default_value_t = false)]
    pub full_style: bool,

    /// Also number the nine triangle-face midpoint positions per leaf.
    #[arg(long, default_value_t = false)]
    pub with_faces: bool,

    /// tracing-subscriber env-filter directive, e.g. "info" or "meshnum=debug".
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Default for Cli {
    fn default() -> Self {
        Cli {
            full_style: false,
            with_faces: false,
            log_level: "info".to_string(),
        }
    }
}
