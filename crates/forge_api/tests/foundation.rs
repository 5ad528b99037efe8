use forge_api::{ForgeApiClient, ForgeApiConfig, ForgeApiError, StreamRequest};

#[test]
fn smoke_client_constructs_from_config() {
    let config = ForgeApiConfig::new("http://localhost:3000")
        .with_user_agent("forge-tests")
        .with_max_retries(2);

    let client = ForgeApiClient::new(config).expect("client creation should succeed");
    assert_eq!(client.config().retry.max_retries, Some(2));
    assert_eq!(
        client
            .headers()
            .get("user-agent")
            .and_then(|value| value.to_str().ok()),
        Some("forge-tests")
    );

    let url = client
        .stream_url(&StreamRequest::new("hi", "0x1", "http://rpc"))
        .expect("stream url");
    assert!(url.as_str().starts_with("http://localhost:3000/forge/stream?"));
}

#[test]
fn client_rejects_invalid_base_url() {
    let error = ForgeApiClient::new(ForgeApiConfig::new("::not-a-url"))
        .err()
        .expect("invalid base must fail");
    assert!(matches!(error, ForgeApiError::InvalidBaseUrl(_)));
}

#[test]
fn client_rejects_invalid_extra_header() {
    let config = ForgeApiConfig::default().insert_header("bad header", "value");
    let error = ForgeApiClient::new(config)
        .err()
        .expect("invalid header must fail");
    assert!(matches!(error, ForgeApiError::InvalidHeader { .. }));
}
