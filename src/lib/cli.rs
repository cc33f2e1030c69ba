use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use url::Url;

use crate::api::{DEFAULT_ORIGIN, Sort};

#[derive(Parser, Debug)]
#[command(
    version,
    name = "pocket",
    about = "A Pocket <getpocket.com> client on the command line"
)]
pub struct Cli {
    /// More log output; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Where the consumer key and access token are kept [default: ~/.config/pocket]
    #[arg(long, env = "POCKET_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Base URL of the Pocket service.
    #[arg(long, env = "POCKET_ORIGIN", default_value = DEFAULT_ORIGIN, global = true)]
    pub origin: String,

    /// Seconds to wait for the browser to come back during authorization.
    #[arg(long, value_name = "SECS", default_value_t = 300, global = true)]
    pub auth_timeout: u64,

    /// Command used to open links, e.g. "firefox --new-tab".
    #[arg(long, env = "POCKET_BROWSER", global = true)]
    pub browser: Option<String>,

    #[command(subcommand)]
    pub subcommand: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List saved items, optionally culling dead and duplicate ones.
    List(ListArgs),
    /// Archive an item.
    Archive {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        item_id: u64,
    },
    /// Delete an item.
    Delete {
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        item_id: u64,
    },
    /// Save a URL.
    Add {
        url: Url,
        /// A manually specified title for the article.
        #[arg(long)]
        title: Option<String>,
        /// A comma-separated list of tags.
        #[arg(long)]
        tags: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// A MiniJinja template to show items with.
    #[arg(short, long, value_name = "TEMPLATE")]
    pub format: Option<String>,
    /// Only items from this domain.
    #[arg(short, long)]
    pub domain: Option<String>,
    /// Only items with this tag.
    #[arg(short, long)]
    pub tag: Option<String>,
    /// Search query.
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,
    #[arg(short = 'o', long, value_enum)]
    pub sort: Option<Sort>,
    /// Probe items one by one and prompt to delete each one.
    #[arg(long, conflicts_with = "delete")]
    pub cull: bool,
    /// Delete every item retrieved.
    #[arg(long)]
    pub delete: bool,
}
