use crate::args::{CommonArgs, JsonOutputArg};
use datastash::{import, Result};
use std::path::PathBuf;

/// Import dataset dump files from a data directory into the document store.
#[derive(clap::Args, Clone, Debug)]
pub struct Args {
    #[clap(flatten)]
    common: CommonArgs,

    /// The directory to scan for dataset dump files.
    ///
    /// If not present tries to read the environment variable
    /// `DATASTASH_DATA_DIR`, finally uses `./data` as a default.
    #[arg(long, default_value = "./data", env = "DATASTASH_DATA_DIR")]
    data_dir: PathBuf,

    /// Import a dataset even when its file record count equals the
    /// collection's document count.
    #[arg(long, default_value_t = false)]
    no_skip_on_count: bool,

    /// Hide per-record progress bars.
    #[arg(long, default_value_t = false)]
    quiet: bool,

    #[clap(flatten)]
    json: JsonOutputArg,
}

#[tracing::instrument(level = "trace")]
pub async fn main(args: Args) -> Result<()> {
    let store = args.common.store_options().build()?;
    tracing::info!(uri = store.uri(), "document store ready");

    let import_opts = import::Options {
        data_dir: args.data_dir.clone(),
        skip_on_count: !args.no_skip_on_count,
        progress: !args.quiet,
    };

    let res = import::import_dir(&store, &import_opts);

    // Release the connection before checking `res` for an Error.
    let close_res = store.close();
    let res = res?;
    close_res?;

    if args.json.value {
        println!("{summary}", summary = serde_json::to_string_pretty(&res)?);
    }

    Ok(())
}
