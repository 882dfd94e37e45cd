use anyhow::{Context, Result};
use cookieguard_policy::PolicyRegistry;

use super::session::load_registry;
use crate::cli::args::{GlobalArgs, PolicyArgs, PolicyCommand, PolicyShowArgs, PolicyValidateArgs};
use crate::exit_codes::EXIT_SUCCESS;

pub fn run(args: PolicyArgs, global: &GlobalArgs) -> Result<i32> {
    match args.cmd {
        PolicyCommand::Show(a) => show(a, global),
        PolicyCommand::Validate(a) => validate(a),
    }
}

fn show(args: PolicyShowArgs, global: &GlobalArgs) -> Result<i32> {
    let registry = load_registry(global)?;
    let policy = registry.policy();

    if args.json {
        println!("{}", serde_json::to_string_pretty(policy)?);
        return Ok(EXIT_SUCCESS);
    }

    println!(
        "Cookie policy {} (last updated {})",
        policy.version, policy.last_updated
    );
    println!(
        "Controller: {} <{}>",
        policy.contact_info.controller, policy.contact_info.email
    );
    for category in &policy.categories {
        let marker = if category.essential { " [always on]" } else { "" };
        println!();
        println!("{} ({}){}", category.name, category.id, marker);
        println!("  {}", category.description);
        println!("  legal basis: {}", category.legal_basis);
        for cookie in &category.cookies {
            println!(
                "  - {:<20} {:<12} {}",
                cookie.name, cookie.duration, cookie.purpose
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn validate(args: PolicyValidateArgs) -> Result<i32> {
    let registry = PolicyRegistry::from_path(&args.input)
        .with_context(|| format!("failed to load cookie policy {}", args.input.display()))?;

    let cookies: usize = registry.categories().iter().map(|c| c.cookies.len()).sum();
    eprintln!(
        "✔ Policy OK: {} (version {}, {} categories, {} cookies)",
        args.input.display(),
        registry.version(),
        registry.categories().len(),
        cookies
    );
    Ok(EXIT_SUCCESS)
}
