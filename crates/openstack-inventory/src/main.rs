//! openstack-inventory CLI
//!
//! Binary name: `openstack-inventory`

use std::process;

use openstack_inventory::cli::{build_cli, handlers, setup};

#[tokio::main]
async fn main() {
    if let Err(e) = setup::init_tracing() {
        eprintln!("Warning: {e}");
    }

    let matches = build_cli().get_matches();

    if let Err(err) = handlers::dispatch(&matches).await {
        let code = handlers::report_error(&err);
        process::exit(code);
    }
}
