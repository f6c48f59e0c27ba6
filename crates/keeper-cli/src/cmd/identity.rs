use crate::output::{print_fields, print_json};
use crate::setup;

/// Validate the credential and print the account it signs as. No network.
pub fn run(json: bool) -> anyhow::Result<()> {
    let wallet = setup::load_wallet()?;
    if json {
        print_json(&serde_json::json!({ "identity": wallet.identity() }))?;
    } else {
        print_fields(&[("identity", wallet.identity().to_string())]);
    }
    Ok(())
}
