/// Markup and script served next to the relay.
///
/// The relay never calls into the shell; it only backs the non-websocket
/// routes.
pub trait RenderShell: Send + Sync {
    fn page(&self) -> &str;
    fn script(&self) -> &str;
    fn not_found(&self) -> &str;
}

/// Assets compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticShell;

impl RenderShell for StaticShell {
    fn page(&self) -> &str {
        include_str!("../../assets/index.html")
    }

    fn script(&self) -> &str {
        include_str!("../../assets/script.js")
    }

    fn not_found(&self) -> &str {
        include_str!("../../assets/not_found.html")
    }
}
