use super::args::*;

pub mod aggregate;
pub(crate) mod run;
pub mod validate;

use crate::exit_codes;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Validate(args) => validate::run(args),
        Command::Aggregate(args) => Ok(aggregate::run(args)),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::SUCCESS)
        }
    }
}
