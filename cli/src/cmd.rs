pub mod init;
pub mod parse;

use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Config file to use instead of the nearest kyotest.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    #[command(alias("p"))]
    Parse(parse::Args),

    #[command(alias("t"))]
    Test(test::Args),

    Init(init::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Parse(args) => parse::exec(args, self),
            Test(args) => test::exec(args, self).await,
            Init(args) => init::exec(args, self),
        }
    }
}
