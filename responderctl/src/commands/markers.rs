//! Commands related to map markers
use crate::{
    cli::OutputOptions,
    config::Config,
    output::rows::MarkerRow,
};
use anyhow::{Result, anyhow};
use libresponder::{
    backend::{HttpBackend, MarkerApi},
    identity::{Identity, IdentityStore},
};

/// Handle the `responderctl markers` command
pub(crate) async fn list(
    cfg: &Config,
    store: &dyn IdentityStore,
    all: bool,
    output: OutputOptions,
) -> Result<()> {
    let identity = Identity::load(store)
        .await?
        .ok_or_else(|| anyhow!("Not logged in, run 'responderctl login' first"))?;
    let backend = HttpBackend::new(&cfg.server, cfg.timeout())?;
    let markers = backend
        .list_markers(&identity.username)
        .await?
        .ok_or_else(|| anyhow!("The server did not return a list of markers"))?;
    let str = output.format.render(
        markers
            .iter()
            .filter(|m| all || m.is_displayable())
            .map(MarkerRow::new),
    )?;
    println!("{str}");
    Ok(())
}
