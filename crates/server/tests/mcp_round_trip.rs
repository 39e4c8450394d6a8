//! End-to-end MCP test: a real rmcp client talks to `WhatsappService` over an
//! in-memory duplex pipe, with the bridge mocked by wiremock.

use rmcp::model::CallToolRequestParam;
use rmcp::service::{serve_client, serve_server};
use serde_json::json;
use std::time::Duration;
use wamcp_server::{BridgeConfig, WhatsappService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn tools_round_trip_over_mcp() -> anyhow::Result<()> {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chats": [{ "jid": "111@s.whatsapp.net", "name": "Alice", "unread_count": 1 }]
        })))
        .expect(1)
        .mount(&bridge)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status"))
        .respond_with(ResponseTemplate::new(503).set_body_string("bridge starting"))
        .expect(1)
        .mount(&bridge)
        .await;

    let config = BridgeConfig::new(&bridge.uri(), Duration::from_secs(5))?;
    let service = WhatsappService::new(&config)?;

    let (server_io, client_io) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(async move {
        let running = serve_server(service, server_io).await?;
        running.waiting().await?;
        anyhow::Ok(())
    });

    let client = serve_client((), client_io).await?;
    let peer = client.peer().clone();

    let tools = peer.list_all_tools().await?;
    assert_eq!(tools.len(), 10);
    assert!(tools.iter().any(|t| t.name == "get_chat_history"));

    // Second call is a cache hit; the mock only allows one bridge request.
    for _ in 0..2 {
        let chats = peer
            .call_tool(CallToolRequestParam {
                name: "get-whatsapp-chats".into(),
                arguments: None,
            })
            .await?;
        assert_eq!(chats.is_error, Some(false));
        let payload = chats
            .structured_content
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("expected structured_content"))?;
        assert_eq!(payload["count"], json!(1));
        assert_eq!(payload["chats"][0]["unread"], json!(1));
    }

    let status = peer
        .call_tool(CallToolRequestParam {
            name: "get_whatsapp_status".into(),
            arguments: None,
        })
        .await?;
    assert_eq!(status.is_error, Some(true));
    assert_eq!(
        status.structured_content,
        Some(json!({ "status": "error", "error": "bridge returned 503: bridge starting" }))
    );

    let unknown = peer
        .call_tool(CallToolRequestParam {
            name: "delete_all_chats".into(),
            arguments: None,
        })
        .await;
    assert!(unknown.is_err());

    client.cancel().await?;
    server.abort();
    Ok(())
}
