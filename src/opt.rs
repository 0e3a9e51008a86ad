use std::path::PathBuf;

use log::LevelFilter;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "emojoid", about = "Bulk-upload custom emoji images to a Slack team.")]
pub struct Opt {
    /// Entry index to start with (inclusive)
    #[structopt(short, long, default_value = "0")]
    pub start: u32,

    /// Entry index to finish with (inclusive)
    #[structopt(short, long, default_value = "0")]
    pub finish: u32,

    /// Settings profile to load
    #[structopt(short, long, default_value = "default")]
    pub profile: String,

    /// Configuration file to use [default: ~/.emojoid/config]
    #[structopt(short, long)]
    pub config: Option<PathBuf>,

    /// Base folder for relative image paths
    #[structopt(long = "upload-folder", default_value = ".")]
    pub upload_folder: PathBuf,

    /// Actually upload; without this flag only report what would be uploaded
    #[structopt(short, long)]
    pub upload: bool,

    /// Output debug information while running
    #[structopt(short, long)]
    pub debug: bool,
}

impl Opt {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_default()
                .join(".emojoid")
                .join("config")
        })
    }

    pub fn level_filter(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
