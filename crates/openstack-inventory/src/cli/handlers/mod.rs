use anyhow::Result;
use clap::ArgMatches;
use openstack_inventory_core::{ComputeService, Credentials, Error};

use super::Invocation;
use crate::{commands, openstack::NovaClient};

/// Load credentials, connect, and run whatever the command line asked for
///
/// Arguments are interpreted before the environment is read and nothing
/// touches the network until the credentials are complete.
pub async fn dispatch(matches: &ArgMatches) -> Result<()> {
    let invocation = Invocation::from_matches(matches);
    let credentials = Credentials::from_env()?;
    tracing::debug!(?credentials, "loaded credentials");

    let client = NovaClient::connect(&credentials).await?;
    if let Some(output) = execute(&client, &invocation).await? {
        println!("{output}");
    }
    Ok(())
}

/// Run an invocation against a compute service, returning text for stdout
pub async fn execute(
    service: &dyn ComputeService,
    invocation: &Invocation,
) -> Result<Option<String>> {
    match invocation {
        Invocation::List => commands::list::run(service).await.map(Some),
        Invocation::Host(address) => commands::host::run(service, address).await.map(Some),
        Invocation::Tag { servers, options } => {
            commands::tag::run(service, servers, options).await.map(|()| None)
        }
    }
}

/// Print an error the way callers expect and return the exit status
///
/// An unknown server goes to stdout as `Server <id> not found`; missing
/// configuration goes to stderr as `ERROR: ...`.
pub fn report_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(core @ Error::ServerNotFound(_)) => {
            println!("{core}");
            core.exit_code()
        }
        Some(core) if core.is_config() => {
            eprintln!("ERROR: {core}");
            core.exit_code()
        }
        Some(core) => {
            eprintln!("Error: {err:#}");
            core.exit_code()
        }
        None => {
            eprintln!("Error: {err:#}");
            1
        }
    }
}
