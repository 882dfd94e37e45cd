use anyhow::Result;
use serde_json::json;

use super::session::Session;
use crate::cli::args::{DecisionArgs, EnforceArgs, GlobalArgs};
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: EnforceArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::open(global, &DecisionArgs::default())?;
    // Mounting already enforced once; only report this run.
    session.jar.take_headers();

    let report = session.manager.enforce();
    let headers = session.jar.take_headers();

    if args.json {
        let out = json!({
            "blocked": report.blocked,
            "deletions": report.deletions,
            "set_cookie": headers,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(EXIT_SUCCESS);
    }

    for header in headers {
        println!("Set-Cookie: {header}");
    }
    Ok(EXIT_SUCCESS)
}
