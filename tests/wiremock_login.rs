#![cfg(feature = "session-reqwest-0_12")]

use serde::Deserialize;
use vkauth::{
    IntoEndpointUrl as _,
    api::Api,
    http::ReqwestSession,
    login::{Credentials, LoginErrorKind, LoginFlow, LoginRequest, Provider},
    secrecy::ExposeSecret as _,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path, query_param},
};

fn provider(server: &MockServer) -> Provider {
    Provider::builder()
        .authorize_endpoint(
            format!("{}/authorize", server.uri())
                .into_endpoint_url()
                .unwrap(),
        )
        .build()
}

fn request(server: &MockServer) -> LoginRequest {
    LoginRequest::builder()
        .client_id(42)
        .scopes(["friends", "offline"])
        .redirect_uri(
            format!("{}/blank.html", server.uri())
                .into_endpoint_url()
                .unwrap(),
        )
        .build()
}

async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("client_id", "42"))
        .and(query_param("response_type", "token"))
        .and(query_param("scope", "friends,offline"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "remixlhk=s1; Path=/")
                .set_body_string(
                    r#"<html><body><form method="post" action="/login.php?act=login">
                         <input type="hidden" name="ip_h" value="9f1c">
                         <input type="hidden" name="_origin" value="https://oauth.vk.com">
                         <input type="text" name="email">
                         <input type="password" name="pass">
                       </form></body></html>"#,
                ),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_ceremony_with_consent() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(header("cookie", "remixlhk=s1"))
        .and(body_string_contains("ip_h=9f1c"))
        .and(body_string_contains("email=user%40example.com"))
        .and(body_string_contains("pass=hunter2"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/authorize?act=consent"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("act", "consent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><form method="post" action="/grant?hash=77">
                 <input type="hidden" name="token_type" value="0">
               </form></body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/grant"))
        .and(header("cookie", "remixlhk=s1"))
        .and(body_string_contains("token_type=0"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            format!(
                "{}/blank.html#access_token=533bacf01e11f55b536a565b57531ac114461ae8736d6506a3&expires_in=0&user_id=8492",
                server.uri()
            ),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blank.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let session = ReqwestSession::builder().build().unwrap();
    let bundle = LoginFlow::new(provider(&server))
        .authenticate(
            session,
            &Credentials::new("user@example.com", "hunter2"),
            &request(&server),
        )
        .await
        .unwrap();

    assert_eq!(
        bundle.access_token.expose_secret(),
        "533bacf01e11f55b536a565b57531ac114461ae8736d6506a3"
    );
    assert_eq!(bundle.user_id, 8492);
    assert_eq!(bundle.expires_in, 0);
    assert_eq!(bundle.expires_at(), None);
}

#[tokio::test]
async fn test_wrong_password_over_http() {
    let server = MockServer::start().await;
    mount_login_page(&server).await;

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(302).insert_header(
            "location",
            "/authorize?act=login&email=user%40example.com&m=1",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/authorize"))
        .and(query_param("m", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                 <div class="service_msg service_msg_warning">Invalid login or password.</div>
                 <form method="post" action="/login.php?act=login">
                   <input type="password" name="pass">
                 </form></body></html>"#,
        ))
        .mount(&server)
        .await;

    let err = LoginFlow::new(provider(&server))
        .authenticate(
            ReqwestSession::builder().build().unwrap(),
            &Credentials::new("user@example.com", "wrong"),
            &request(&server),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), LoginErrorKind::CredentialsRejected);
    assert!(err.to_string().contains("Invalid login or password."));
}

#[tokio::test]
async fn test_api_call_with_issued_token() {
    #[derive(Debug, Deserialize)]
    struct User {
        id: u64,
        first_name: String,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/method/users.get"))
        .and(query_param("user_ids", "1"))
        .and(query_param("v", "5.131"))
        .and(query_param("access_token", "tok"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"response":[{"id":1,"first_name":"Pavel","last_name":"Durov"}]}"#,
        ))
        .mount(&server)
        .await;

    let api = Api::builder()
        .session(ReqwestSession::builder().build().unwrap())
        .access_token("tok")
        .base_url(
            format!("{}/method/", server.uri())
                .into_endpoint_url()
                .unwrap(),
        )
        .build();

    let users: Vec<User> = api.call("users.get", &[("user_ids", "1")]).await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 1);
    assert_eq!(users[0].first_name, "Pavel");
}
