//! Verify command implementation.

use ledgersync_server::{verify_digest, DigestReport};
use ledgersync_storage::{FileRegistry, GroupStore};

/// Runs the verify command. Returns whether the digest is consistent.
pub fn run<S>(storage: &S, file_id: &str, format: &str) -> Result<bool, Box<dyn std::error::Error>>
where
    S: GroupStore + FileRegistry,
{
    let report = verify_digest(storage, file_id)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => print_result(&report),
    }

    Ok(report.is_consistent())
}

fn print_result(report: &DigestReport) {
    println!("Verifying digest of {} (group {})", report.file_id, report.group_id);
    println!();
    println!("  Changes in log:  {}", report.change_count);
    match report.stored_hash {
        Some(hash) => println!("  Stored hash:     {hash}"),
        None => println!("  Stored hash:     (none)"),
    }
    println!("  Rebuilt hash:    {}", report.rebuilt_hash);
    println!();

    match report.diverges_at {
        _ if report.is_consistent() => println!("✓ Digest matches change log"),
        Some(millis) => println!("✗ Digest diverges from change log at {millis} ms"),
        None => println!("✗ No digest stored for a non-empty change log"),
    }
}
