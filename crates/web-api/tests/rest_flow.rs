mod support;

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tokio::{net::TcpListener, sync::oneshot, time::sleep};

use support::build_router;

#[tokio::test]
async fn register_login_chat_lifecycle() {
    let router = build_router().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(100)).await;

    let base = format!("http://{}", addr);
    let client = Client::new();

    // 健康检查
    let health = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("health");
    assert_eq!(health.status(), 200);

    // 注册
    let register = client
        .post(format!("{}/register", base))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .expect("register alice");
    assert_eq!(register.status(), 201);
    let alice = register.json::<serde_json::Value>().await.expect("json");
    let alice_id = alice["id"].as_i64().expect("alice id");
    assert_eq!(alice["username"], "alice");
    assert!(alice.get("passwordHash").is_none());
    assert!(alice.get("password_hash").is_none());

    // 重复用户名
    let duplicate = client
        .post(format!("{}/register", base))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .expect("register duplicate");
    assert_eq!(duplicate.status(), 409);

    // 密码太短
    let weak = client
        .post(format!("{}/register", base))
        .json(&json!({"username": "weakling", "password": "abc"}))
        .send()
        .await
        .expect("register weak");
    assert_eq!(weak.status(), 400);

    client
        .post(format!("{}/register", base))
        .json(&json!({"username": "bob", "password": "secret"}))
        .send()
        .await
        .expect("register bob");

    // 登录
    let login = client
        .post(format!("{}/login", base))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .expect("login alice");
    assert_eq!(login.status(), 200);
    let login = login.json::<serde_json::Value>().await.expect("json");
    let token = login["token"].as_str().expect("token").to_string();
    assert_eq!(login["user"]["id"], alice_id);

    // 错误密码
    let bad_login = client
        .post(format!("{}/login", base))
        .json(&json!({"username": "alice", "password": "wrong!"}))
        .send()
        .await
        .expect("bad login");
    assert_eq!(bad_login.status(), 401);

    // 未认证请求被拒绝
    let no_auth = client
        .post(format!("{}/chats", base))
        .json(&json!({"name": "general"}))
        .send()
        .await
        .expect("no auth");
    assert_eq!(no_auth.status(), 401);

    // 创建聊天室，创建者自动成为成员
    let chat = client
        .post(format!("{}/chats", base))
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"name": "general"}))
        .send()
        .await
        .expect("create chat");
    assert_eq!(chat.status(), 201);
    let chat = chat.json::<serde_json::Value>().await.expect("json");
    let chat_id = chat["id"].as_i64().expect("chat id");
    assert_eq!(chat["name"], "general");

    // 列出自己的聊天室
    let chats = client
        .get(format!("{}/chats", base))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("list chats")
        .json::<Vec<serde_json::Value>>()
        .await
        .expect("json");
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["id"], chat_id);

    // 邀请 bob
    let invite = client
        .post(format!("{}/chats/{}/invite", base, chat_id))
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"username": "bob"}))
        .send()
        .await
        .expect("invite bob");
    assert_eq!(invite.status(), 204);

    // 邀请不存在的用户
    let invite_missing = client
        .post(format!("{}/chats/{}/invite", base, chat_id))
        .header("authorization", format!("Bearer {}", token))
        .json(&json!({"username": "nobody"}))
        .send()
        .await
        .expect("invite nobody");
    assert_eq!(invite_missing.status(), 404);

    // 聊天室详情含成员名单和历史
    let detail = client
        .get(format!("{}/chats/{}", base, chat_id))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("get chat")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let usernames: Vec<&str> = detail["users"]
        .as_array()
        .expect("users")
        .iter()
        .map(|user| user["username"].as_str().expect("username"))
        .collect();
    assert!(usernames.contains(&"alice"));
    assert!(usernames.contains(&"bob"));
    assert_eq!(detail["messages"].as_array().expect("messages").len(), 0);

    // 不存在的聊天室
    let missing = client
        .get(format!("{}/chats/999999", base))
        .header("authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("get missing chat");
    assert_eq!(missing.status(), 404);

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn non_member_cannot_invite() {
    let router = build_router().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    sleep(Duration::from_millis(100)).await;

    let base = format!("http://{}", addr);
    let client = Client::new();

    for name in ["alice", "bob", "carol"] {
        client
            .post(format!("{}/register", base))
            .json(&json!({"username": name, "password": "secret"}))
            .send()
            .await
            .expect("register");
    }

    let alice_login = client
        .post(format!("{}/login", base))
        .json(&json!({"username": "alice", "password": "secret"}))
        .send()
        .await
        .expect("login alice")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let alice_token = alice_login["token"].as_str().expect("token");

    let bob_login = client
        .post(format!("{}/login", base))
        .json(&json!({"username": "bob", "password": "secret"}))
        .send()
        .await
        .expect("login bob")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let bob_token = bob_login["token"].as_str().expect("token");

    let chat = client
        .post(format!("{}/chats", base))
        .header("authorization", format!("Bearer {}", alice_token))
        .json(&json!({"name": "private"}))
        .send()
        .await
        .expect("create chat")
        .json::<serde_json::Value>()
        .await
        .expect("json");
    let chat_id = chat["id"].as_i64().expect("chat id");

    // bob 不是成员，无权邀请 carol
    let invite = client
        .post(format!("{}/chats/{}/invite", base, chat_id))
        .header("authorization", format!("Bearer {}", bob_token))
        .json(&json!({"username": "carol"}))
        .send()
        .await
        .expect("invite as outsider");
    assert_eq!(invite.status(), 403);

    let _ = shutdown_tx.send(());
}
