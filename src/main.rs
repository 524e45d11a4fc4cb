use clap::Parser;

use clipfeed_lib::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    clipfeed_lib::run(Config::parse()).await
}
