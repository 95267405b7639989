use crate::classifier::Category;
use crate::item::ItemType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Find default config path with priority:
/// 1. /etc/dropflow/config.yaml (system-wide, preferred)
/// 2. ~/.config/dropflow/config.yaml (user-specific)
/// 3. Fallback to /etc even if doesn't exist
pub fn default_config_path() -> PathBuf {
    let etc_path = PathBuf::from("/etc/dropflow/config.yaml");

    if etc_path.exists() {
        return etc_path;
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_path = config_dir.join("dropflow/config.yaml");
        if user_path.exists() {
            return user_path;
        }
    }

    // Fallback to /etc (will show clear error if missing)
    etc_path
}

#[derive(Parser)]
#[command(name = "dropflow")]
#[command(version)]
#[command(about = "Move finished downloads from a drop folder into a Movies/Shows library", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process a single item (exit 0 = filed, 1 = failed, 2 = quarantined)
    Process {
        /// What kind of item this is
        #[arg(value_enum)]
        item_type: ItemType,

        /// File or directory inside the drop folder
        item_path: PathBuf,

        /// Movies or Shows; overrides the hint implied by ITEM_TYPE
        category_hint: Option<Category>,
    },

    /// Process every entry currently in the drop folder
    Scan,

    /// Scan the drop folder periodically until interrupted
    Daemon {
        /// Interval between scans (in seconds)
        #[arg(short, long, value_name = "SECONDS", default_value = "60")]
        interval: u64,
    },

    /// Show how a name would be classified, without touching any files
    Classify {
        /// Release name of a file or folder
        name: String,

        /// Force Movies or Shows
        #[arg(long)]
        hint: Option<Category>,
    },
}
