use anyhow::Result;
use cookieguard_core::{ConsentCategories, ConsentRecord, ConsentResult};
use serde_json::json;

use super::session::Session;
use crate::cli::args::{CustomizeArgs, DecisionArgs, GlobalArgs, StatusArgs};
use crate::exit_codes::EXIT_SUCCESS;

pub fn status(args: StatusArgs, global: &GlobalArgs) -> Result<i32> {
    let session = Session::open(global, &DecisionArgs::default())?;
    let manager = &session.manager;
    let store = manager.store();
    let record = manager.current_record();
    let expires_at = record.and_then(|r| r.expires_at(store.expiry_days()));

    if args.json {
        let out = json!({
            "policy_version": store.version(),
            "state": manager.state(),
            "consent_required": manager.consent_required(),
            "categories": manager.categories(),
            "record": record,
            "expires_at": expires_at,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("Policy version:   {}", store.version());
    println!("State:            {}", manager.state());
    println!(
        "Consent required: {}",
        if manager.consent_required() { "yes" } else { "no" }
    );
    if let (Some(record), Some(expires_at)) = (record, expires_at) {
        println!("Consent id:       {}", record.consent_id);
        println!("Recorded:         {}", record.timestamp.to_rfc3339());
        println!("Expires:          {}", expires_at.to_rfc3339());
    }
    println!("Categories:");
    for (id, granted) in manager.categories().iter() {
        let decision = if granted { "granted" } else { "refused" };
        println!("  {:<16} {}", id.as_str(), decision);
    }
    Ok(EXIT_SUCCESS)
}

pub async fn accept_all(args: DecisionArgs, global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::open(global, &args)?;
    let saved = session.manager.accept_all();
    conclude(session, saved).await
}

pub async fn reject_all(args: DecisionArgs, global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::open(global, &args)?;
    let saved = session.manager.reject_all();
    conclude(session, saved).await
}

pub async fn customize(args: CustomizeArgs, global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::open(global, &args.client)?;
    let saved = session
        .manager
        .save_custom(ConsentCategories::granting(args.allow));
    conclude(session, saved).await
}

/// Drain pending audit submissions, then report the save result.
async fn conclude(session: Session, saved: ConsentResult<ConsentRecord>) -> Result<i32> {
    session.finish().await;
    let record = saved?;
    println!("Consent saved: {}", record.consent_id);
    println!("Granted: {}", record.categories);
    Ok(EXIT_SUCCESS)
}

pub fn withdraw(global: &GlobalArgs) -> Result<i32> {
    let mut session = Session::open(global, &DecisionArgs::default())?;
    session.manager.withdraw();
    println!("Consent withdrawn. Optional cookies are blocked.");
    Ok(EXIT_SUCCESS)
}
