use anyhow::Result;
use colored::Colorize;

use crate::cli::RewriteIdArgs;
use crate::output::{print_error, print_success};

pub fn rewrite_ids(args: &RewriteIdArgs) -> Result<()> {
    println!("Using suffix '{}'", args.suffix.cyan());
    let mut failures = 0;
    for file in &args.files {
        match octofhir_upload::id::rewrite_id_in_file(file, &args.suffix) {
            Ok(Some((old, new))) => print_success(&format!(
                "{}: {} -> {} (length {})",
                file.display(),
                old,
                new.cyan(),
                new.chars().count()
            )),
            Ok(None) => println!("  {}: no id in resource", file.display()),
            Err(e) => {
                failures += 1;
                print_error(&format!("{}: {e}", file.display()));
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} file(s) could not be rewritten");
    }
    Ok(())
}
