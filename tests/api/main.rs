mod helpers;
mod resources;
mod store;

use helpers::spawn_app;

#[tokio::test]
async fn health_check() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.anonymous().health_check().await?;

    Ok(())
}

#[tokio::test]
async fn me_reports_token_subject() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let token = app.token_for("fiscal-7");

    let body: serde_json::Value = app
        .http()
        .get(app.url("/me"))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    assert_eq!(body["user_id"], "fiscal-7");
    assert_eq!(body["role"], "manager");
    Ok(())
}

#[tokio::test]
async fn rejected_token_echoes_request_id() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let response = app
        .http()
        .get(app.url("/me"))
        .header("authorization", "Token abc")
        .header("x-request-id", "req-401")
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(response.headers()["x-request-id"], "req-401");
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["request_id"], "req-401");
    Ok(())
}
