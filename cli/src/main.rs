use std::io::Write as _;

use clap::Parser;
use colored::Colorize as _;
use kyotest_cli::cmd::GlobalArgs;
use kyotest_core::style::ColorTheme as _;

fn init_logger() {
    let env = env_logger::Env::default().filter_or("KYOTEST_LOG", "warn");
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "[{}] {}",
                level.to_string().color(level.color()),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() {
    init_logger();
    let app = GlobalArgs::parse();
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    });
}
