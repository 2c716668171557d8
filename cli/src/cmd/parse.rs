use std::path::PathBuf;

use anyhow::Context as _;
use kyotest_core::{action, print_success};

use crate::util;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Problem page markup file; reads stdin when omitted or `-`
    #[arg()] // positional argument
    pub markup: Option<PathBuf>,

    /// Print the extracted problem as JSON
    #[arg(long)]
    pub json: bool,

    /// Save the samples into this directory (for `kyotest test --dir`)
    #[arg(short = 'o', long)]
    pub save_dir: Option<PathBuf>,
}

pub fn exec(args: &Args, _: &GlobalArgs) -> SubcmdResult {
    let markup = action::read_markup(args.markup.as_deref())?;
    let descriptor = action::load_problem(&markup);

    if args.json {
        let json = serde_json::to_string_pretty(&descriptor).context("Failed to serialize")?;
        println!("{}", json);
    } else {
        action::print_problem(&descriptor);
    }

    if let Some(dir) = &args.save_dir {
        let saved = action::save_problem(&descriptor, dir)?;
        let location = util::replace_homedir_to_tilde(saved.dir());
        if args.json {
            log::info!("Saved samples to {:?}", location);
        } else {
            print_success!(
                "Saved {} samples to {}",
                descriptor.samples.len(),
                location.to_string_lossy()
            );
        }
    }
    Ok(())
}
