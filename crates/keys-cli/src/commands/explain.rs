//! Explain command implementation

use keys_provider::{AuthorizedKeysProvider, Provider};

use crate::error::Result;
use crate::output;

/// Print the attribute schema of the resource type.
pub fn run_explain(provider: &AuthorizedKeysProvider, json: bool) -> Result<()> {
    let spec = provider.describe();
    if json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
    } else {
        print!("{}", output::explain(&spec));
    }
    Ok(())
}
