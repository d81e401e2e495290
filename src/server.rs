//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Both entry points build one [`Companion`] and share it across every MCP
//! session the transport opens.

use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use sahara::config::SaharaConfig;
use sahara::Companion;

use crate::tools::SaharaTools;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: SaharaConfig) -> Result<()> {
    tracing::info!("starting Sahara MCP server on stdio");

    let companion = Arc::new(Companion::from_config(config)?);
    let tools = SaharaTools::new(companion);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP, mounted at `/mcp`.
pub async fn serve_http(config: SaharaConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting Sahara MCP server on HTTP");

    let companion = Arc::new(Companion::from_config(config)?);

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(SaharaTools::new(Arc::clone(&companion))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
