use std::sync::Arc;

use atlassian_connector_api::oauth::parse_private_key;
use atlassian_connector_api::{
    AccessToken, ConnectorError, CredentialContext, HandshakeState, JiraClient, OAuthCredentials,
    Session,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("fixtures/consumer_key.pem");
const TEST_KEY_PKCS1: &str = include_str!("fixtures/consumer_key_pkcs1.pem");

fn oauth_client(server: &MockServer, key_pem: &str) -> JiraClient {
    let creds = OAuthCredentials::new("atlassian-connector", parse_private_key(key_pem).unwrap());
    let context = CredentialContext::oauth(server.uri(), creds).unwrap();
    JiraClient::new(Arc::new(Session::new(context).unwrap()))
}

fn form_reply(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/x-www-form-urlencoded")
        .set_body_string(body)
}

fn authorization_of(request: &wiremock::Request) -> String {
    request
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_full_handshake_installs_access_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply(
            "oauth_token=req123&oauth_token_secret=reqsecret&oauth_callback_confirmed=true",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/access-token"))
        .respond_with(form_reply("oauth_token=acc456&oauth_token_secret=accsecret"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/latest/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "jane"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = oauth_client(&mock_server, TEST_KEY);
    let mut handshake = client.handshake().await;
    assert_eq!(handshake.state(), HandshakeState::Unauthenticated);

    let request_token = handshake.request_token().await.unwrap();
    assert_eq!(request_token.token(), "req123");
    assert_eq!(handshake.state(), HandshakeState::RequestTokenObtained);

    let url = handshake.authorization_url(&request_token).await.unwrap();
    assert_eq!(
        url.as_str(),
        format!(
            "{}/plugins/servlet/oauth/authorize?oauth_token=req123",
            mock_server.uri()
        )
    );

    let access_token = handshake.exchange(&request_token, "verif-789").await.unwrap();
    assert_eq!(access_token, AccessToken::new("acc456", "accsecret"));
    assert_eq!(handshake.state(), HandshakeState::AccessTokenObtained);
    assert_eq!(client.session().access_token().await, Some(access_token));

    let me: serde_json::Value = client.get("myself").await.unwrap();
    assert_eq!(me["name"], "jane");

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let first = authorization_of(&requests[0]);
    assert!(first.contains("oauth_callback=\"oob\""));
    assert!(!first.contains("oauth_token="));

    let second = authorization_of(&requests[1]);
    assert!(second.contains("oauth_token=\"req123\""));
    assert!(second.contains("oauth_verifier=\"verif-789\""));

    let third = authorization_of(&requests[2]);
    assert!(third.contains("oauth_token=\"acc456\""));
    assert!(!third.contains("oauth_verifier"));
}

#[tokio::test]
async fn test_request_token_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("oauth_problem=consumer_key_unknown"))
        .mount(&mock_server)
        .await;

    let client = oauth_client(&mock_server, TEST_KEY_PKCS1);
    let mut handshake = client.handshake().await;

    let err = handshake.request_token().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(handshake.state(), HandshakeState::Unauthenticated);
    assert!(client.session().access_token().await.is_none());
}

#[tokio::test]
async fn test_exchange_with_superseded_request_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply("oauth_token=first&oauth_token_secret=s1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply("oauth_token=second&oauth_token_secret=s2"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/access-token"))
        .respond_with(form_reply("oauth_token=acc&oauth_token_secret=sec"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = oauth_client(&mock_server, TEST_KEY);
    let mut handshake = client.handshake().await;

    let stale = handshake.request_token().await.unwrap();
    let fresh = handshake.request_token().await.unwrap();
    assert_eq!(stale.token(), "first");
    assert_eq!(fresh.token(), "second");

    let err = handshake.exchange(&stale, "verifier").await.unwrap_err();

    assert!(matches!(err, ConnectorError::Handshake(_)));
    assert_eq!(handshake.state(), HandshakeState::RequestTokenObtained);
}

#[tokio::test]
async fn test_denied_verifier_keeps_session_unauthenticated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply("oauth_token=req&oauth_token_secret=s"))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/access-token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("oauth_problem=token_rejected"))
        .mount(&mock_server)
        .await;

    let client = oauth_client(&mock_server, TEST_KEY);
    let mut handshake = client.handshake().await;
    let request_token = handshake.request_token().await.unwrap();

    let err = handshake.exchange(&request_token, "wrong").await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(handshake.state(), HandshakeState::RequestTokenObtained);
    assert!(client.session().access_token().await.is_none());
}

#[tokio::test]
async fn test_confluence_handshake_uses_wiki_endpoints() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wiki/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply("oauth_token=wreq&oauth_token_secret=ws"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let creds = OAuthCredentials::new("atlassian-connector", parse_private_key(TEST_KEY).unwrap());
    let context = CredentialContext::oauth(mock_server.uri(), creds).unwrap();
    let client =
        atlassian_connector_api::ConfluenceClient::new(Arc::new(Session::new(context).unwrap()));

    let mut handshake = client.handshake().await;
    let request_token = handshake.request_token().await.unwrap();
    let url = handshake.authorization_url(&request_token).await.unwrap();

    assert_eq!(url.path(), "/wiki/plugins/servlet/oauth/authorize");
}

#[tokio::test]
async fn test_custom_callback_is_signed_into_request_token_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/plugins/servlet/oauth/request-token"))
        .respond_with(form_reply("oauth_token=req123&oauth_token_secret=reqsecret"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = oauth_client(&mock_server, TEST_KEY);
    let mut handshake = client.handshake().await.with_callback("https://app/cb");
    handshake.request_token().await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let authorization = authorization_of(&requests[0]);
    assert!(authorization.contains(r#"oauth_callback="https%3A%2F%2Fapp%2Fcb""#));
    assert!(!authorization.contains(r#"oauth_callback="oob""#));
}
