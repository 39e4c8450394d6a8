//! Command-line entry point for the `wamcp` gateway.
//!
//! All behavior lives in the `wamcp-server` library; this binary only hands
//! control to it.

fn main() -> anyhow::Result<()> {
    wamcp_server::run()
}
