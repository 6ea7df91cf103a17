//! Point-in-time view of a session, for rendering and status output.

use super::WalletSession;
use crate::adapter::Capability;
use crate::registry::WalletDescriptor;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub selected_provider: Option<String>,
    pub wallet: Option<WalletDescriptor>,
    /// Base58 account address
    pub public_key: Option<String>,
    pub ready: bool,
    pub connected: bool,
    pub connecting: bool,
    pub disconnecting: bool,
    /// Optional operations the active adapter implements
    pub capabilities: Vec<Capability>,
}

impl SessionSnapshot {
    pub(super) fn capture(session: &WalletSession) -> Self {
        let capabilities = session
            .adapter()
            .map(|adapter| {
                Capability::all()
                    .iter()
                    .copied()
                    .filter(|capability| adapter.supports(*capability))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            selected_provider: session.selected_provider(),
            wallet: session.wallet(),
            public_key: session.public_key().map(|key| key.to_string()),
            ready: session.ready(),
            connected: session.connected(),
            connecting: session.connecting(),
            disconnecting: session.disconnecting(),
            capabilities,
        }
    }
}
