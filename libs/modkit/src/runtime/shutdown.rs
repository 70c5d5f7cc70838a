use anyhow::Result;

/// Resolves on the first termination request and names it: SIGTERM/SIGINT on
/// unix, any console control event on Windows.
pub async fn wait_for_shutdown() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;
        let name = tokio::select! {
            _ = term.recv() => "SIGTERM",
            _ = int.recv() => "SIGINT",
        };
        Ok(name)
    }

    #[cfg(windows)]
    {
        use tokio::signal::windows;

        let mut c = windows::ctrl_c()?;
        let mut brk = windows::ctrl_break()?;
        let mut close = windows::ctrl_close()?;
        let mut shutdown = windows::ctrl_shutdown()?;
        let name = tokio::select! {
            _ = c.recv() => "ctrl-c",
            _ = brk.recv() => "ctrl-break",
            _ = close.recv() => "ctrl-close",
            _ = shutdown.recv() => "ctrl-shutdown",
        };
        Ok(name)
    }
}
