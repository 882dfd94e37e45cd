use anyhow::Result;

use super::session::Session;
use crate::cli::args::{CheckArgs, DecisionArgs, GlobalArgs};
use crate::exit_codes::{EXIT_BLOCKED, EXIT_SUCCESS};

pub fn run(args: CheckArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::open(global, &DecisionArgs::default())?;
    let manager = &session.manager;

    let Some(category) = manager.registry().category_of(&args.cookie) else {
        println!("{}: blocked (not in the cookie policy)", args.cookie);
        return Ok(EXIT_BLOCKED);
    };

    if manager.is_cookie_allowed(&args.cookie) {
        println!("{}: allowed ({})", args.cookie, category.id);
        Ok(EXIT_SUCCESS)
    } else {
        println!("{}: blocked ({} not consented)", args.cookie, category.id);
        Ok(EXIT_BLOCKED)
    }
}
