use clap::Parser;
use log::debug;
use roomstamp::Opts;
use roomstamp::cli::SubCommandExtend;
use roomstamp::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    debug!("配置目录: {}", opts.conf_dir.path().display());

    match &opts.subcmd {
        SubCommand::Extract(config) => config.run(&opts).await,
        SubCommand::Generate(config) => config.run(&opts).await,
        SubCommand::Train(config) => config.run(&opts).await,
        SubCommand::Verify(config) => config.run(&opts).await,
        SubCommand::Compare(config) => config.run(&opts).await,
        SubCommand::Enroll(config) => config.run(&opts).await,
        SubCommand::Recognize(config) => config.run(&opts).await,
        SubCommand::Attend(config) => config.run(&opts).await,
        SubCommand::ClearEncodings(config) => config.run(&opts).await,
    }
}
