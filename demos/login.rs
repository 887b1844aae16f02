use serde::Deserialize;
use snafu::prelude::*;
use tracing_subscriber::EnvFilter;
use vkauth::{
    api::Api,
    http::ReqwestSession,
    login::{Credentials, LoginFlow, LoginRequest, Provider},
    observe::TracingObserver,
};

#[derive(Debug, Deserialize)]
struct User {
    id: u64,
    first_name: String,
    last_name: String,
}

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client_id = std::env::var("VK_CLIENT_ID")
        .whatever_context("Failed to get VK_CLIENT_ID")?
        .parse::<u64>()
        .whatever_context("VK_CLIENT_ID is not a number")?;
    let credentials = Credentials::from_env("VK_LOGIN", "VK_PASSWORD", Some("VK_AUTH_CODE"))
        .whatever_context("Failed to read credentials")?;

    let session = ReqwestSession::builder()
        .build()
        .whatever_context("Failed to build HTTP session")?;

    let bundle = LoginFlow::new(Provider::vk())
        .with_observer(TracingObserver)
        .authenticate(
            &session,
            &credentials,
            &LoginRequest::new(client_id, ["friends", "offline"]),
        )
        .await
        .whatever_context("Failed to log in")?;

    println!("Logged in as user {}", bundle.user_id);

    let api = Api::from_bundle(session, &bundle);
    let user_ids = bundle.user_id.to_string();
    let users: Vec<User> = api
        .call("users.get", &[("user_ids", user_ids.as_str())])
        .await
        .whatever_context("Failed to call users.get")?;

    for user in users {
        println!("{} {} (id {})", user.first_name, user.last_name, user.id);
    }

    Ok(())
}
