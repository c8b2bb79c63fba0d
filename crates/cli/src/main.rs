//! # CLI - VendorVault Interactive Shell
//!
//! A REPL over the vendor catalog. Reads commands from stdin, dispatches them
//! through [`Catalog::invoke`], and prints responses to stdout. Logs go to
//! stderr, so piping commands in and reading stdout works for scripted tests.
//!
//! ## Commands
//!
//! ```text
//! PUT <json>           Create or replace a vendor from a JSON document
//! GET name             Qualification record of a vendor
//! PRICE name           Priced record of a vendor
//! RANGE start end      Vendor collection entries in [start, end)
//! STATUS status        Vendors whose current status is `status`
//! CALL fn [args..]     Invoke any function by name, without transient input
//! CHECKPOINT           Rewrite the WAL from live state
//! STATS                Print store summary
//! EXIT / QUIT          Shut down gracefully
//! ```
//!
//! Successful calls print their payload, or `OK` when it is empty. Failures
//! print `ERR <message>`.
//!
//! ## Configuration
//!
//! See the `config` crate: `VAULT_WAL_PATH`, `VAULT_WAL_SYNC`, `VAULT_LOG`.
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! VendorVault started (seq=0, store=wal=vendor.wal sync=true)
//! > PUT {"Name":"test0","Project":"supplychain","Status":"yes","Expiry":"2020-05-01","Price":6666}
//! OK
//! > GET test0
//! {"Name":"test0","Project":"supplychain","Status":"yes","Expiry":"2020-05-01"}
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use catalog::{Catalog, Invocation, Response, TRANSIENT_VENDOR_KEY};
use config::{Config, Durability};
use std::io::{self, BufRead, Write};
use store::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn open_store(durability: &Durability) -> Result<Store> {
    match durability {
        Durability::InMemory => Ok(Store::in_memory()),
        Durability::Wal { path, sync } => Store::open(path, *sync),
    }
}

fn print_response(response: &Response) {
    match response {
        Response::Success(payload) if payload.is_empty() => println!("OK"),
        Response::Success(payload) => println!("{}", String::from_utf8_lossy(payload)),
        Response::Error(message) => println!("ERR {}", message),
    }
}

/// Builds the invocation for a shell command, or `None` when the command is
/// not a catalog call.
fn to_invocation(cmd: &str, rest: &str) -> Option<Invocation> {
    let args = rest.split_whitespace();
    let invocation = match cmd {
        "PUT" => Invocation::new("putVendor").transient(TRANSIENT_VENDOR_KEY, rest.trim()),
        "GET" => args.fold(Invocation::new("getVendor"), |inv, a| inv.arg(a)),
        "PRICE" => args.fold(Invocation::new("getVendorPrice"), |inv, a| inv.arg(a)),
        "RANGE" => args.fold(Invocation::new("getVendorByRange"), |inv, a| inv.arg(a)),
        "STATUS" => args.fold(Invocation::new("getVendorByStatus"), |inv, a| inv.arg(a)),
        "CALL" => {
            let mut args = args;
            let function = args.next()?;
            args.fold(Invocation::new(function), |inv, a| inv.arg(a))
        }
        _ => return None,
    };
    Some(invocation)
}

fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let store = open_store(&config.durability)?;
    println!(
        "VendorVault started (seq={}, store={})",
        store.seq(),
        config.durability
    );
    info!(store = %config.durability, seq = store.seq(), "shell started");
    let mut catalog = Catalog::new(store);

    println!("Commands: PUT json | GET name | PRICE name | RANGE start end | STATUS status");
    println!("          CALL fn [args..] | CHECKPOINT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim_start();
        let (cmd, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));

        if !cmd.is_empty() {
            let cmd = cmd.to_uppercase();
            match cmd.as_str() {
                "CHECKPOINT" => match catalog.store_mut().checkpoint() {
                    Ok(()) => println!("OK (seq={})", catalog.store().seq()),
                    Err(e) => println!("ERR checkpoint failed: {:#}", e),
                },
                "STATS" => {
                    let store = catalog.store();
                    println!("{:?}", store);
                    for name in store.collections() {
                        println!("{} -> {} entries", name, store.len(name));
                    }
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                "CALL" if rest.trim().is_empty() => println!("ERR usage: CALL fn [args..]"),
                other => match to_invocation(other, rest) {
                    Some(invocation) => print_response(&catalog.invoke(&invocation)),
                    None => println!("unknown command: {}", other),
                },
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    info!(seq = catalog.store().seq(), "shell stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_carries_whole_line_as_transient() {
        let json = r#"{"Name":"a b","Price":1}"#;
        let inv = to_invocation("PUT", &format!("  {json} ")).unwrap();
        assert_eq!(inv.function, "putVendor");
        assert!(inv.args.is_empty());
        assert_eq!(inv.transient.get(TRANSIENT_VENDOR_KEY), Some(json.as_bytes()));
    }

    #[test]
    fn lookups_split_arguments() {
        let inv = to_invocation("RANGE", "test0  test2").unwrap();
        assert_eq!(inv.function, "getVendorByRange");
        assert_eq!(inv.args, vec!["test0", "test2"]);
        assert!(inv.transient.is_empty());

        let inv = to_invocation("STATUS", "yes").unwrap();
        assert_eq!(inv.function, "getVendorByStatus");
        assert_eq!(inv.args, vec!["yes"]);
    }

    #[test]
    fn call_uses_first_word_as_function() {
        let inv = to_invocation("CALL", "getVendor test0").unwrap();
        assert_eq!(inv.function, "getVendor");
        assert_eq!(inv.args, vec!["test0"]);
        assert!(to_invocation("CALL", "").is_none());
    }

    #[test]
    fn other_commands_are_not_invocations() {
        assert!(to_invocation("SET", "a b").is_none());
    }

    #[test]
    fn in_memory_store_opens() {
        let store = open_store(&Durability::InMemory).unwrap();
        assert!(!store.is_durable());
    }

    #[test]
    fn wal_store_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vendor.wal");
        let store = open_store(&Durability::Wal {
            path: path.clone(),
            sync: true,
        })
        .unwrap();
        assert!(store.is_durable());
        assert!(path.parent().unwrap().exists());
    }
}
