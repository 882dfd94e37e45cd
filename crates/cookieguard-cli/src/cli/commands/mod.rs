use super::args::*;

pub mod check;
pub mod consent;
pub mod enforce;
pub mod policy;
pub(crate) mod session;

use crate::exit_codes::EXIT_SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.cmd {
        Command::Policy(args) => policy::run(args, &global),
        Command::Status(args) => consent::status(args, &global),
        Command::AcceptAll(args) => consent::accept_all(args, &global).await,
        Command::RejectAll(args) => consent::reject_all(args, &global).await,
        Command::Customize(args) => consent::customize(args, &global).await,
        Command::Withdraw => consent::withdraw(&global),
        Command::Check(args) => check::run(args, &global),
        Command::Enforce(args) => enforce::run(args, &global),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(EXIT_SUCCESS)
        }
    }
}
