//! Page facades and environment helpers against scripted sessions

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use studio_e2e::components::{ConfirmDialog, ContextMenu, FileGrid};
use studio_e2e::env::{Credentials, Mailbox};
use studio_e2e::pages::{HistoryPage, LoginPage, WorkspacePage};
use studio_e2e::save::SAVE_STATUS_ATTRIBUTE;
use studio_e2e::{Command, E2eError, MockDriver};

#[tokio::test]
async fn login_fills_credentials_and_waits_for_redirect() {
    let mock = MockDriver::new();
    let page = LoginPage::new(mock.session_with_timeouts(500));
    let (email, password, submit) = (
        page.email_input().to_string(),
        page.password_input().to_string(),
        page.submit_button().to_string(),
    );
    mock.on_goto({
        let (email, password, submit) = (email.clone(), password.clone(), submit.clone());
        move |dom, _| {
            dom.set_count(&email, 1);
            dom.set_count(&password, 1);
            dom.set_count(&submit, 1);
        }
    });
    mock.on_action(&submit, "click", {
        let email = email.clone();
        move |dom, _| dom.remove(&email)
    });

    let credentials = Credentials::from_lookup(2, |key| match key {
        "STUDIO_E2E_USER2_EMAIL" => Some("editor@example.com".into()),
        "STUDIO_E2E_USER2_PASSWORD" => Some("hunter22".into()),
        _ => None,
    })
    .unwrap();
    page.open().await.unwrap();
    page.login(&credentials).await.unwrap();

    mock.with_dom(|dom| assert_eq!(dom.value(&password), Some("hunter22")));
    assert_eq!(mock.actions_on(&submit), vec!["click"]);
}

#[tokio::test]
async fn rejected_login_shows_the_banner() {
    let mock = MockDriver::new();
    let page = LoginPage::new(mock.session_with_timeouts(200));
    mock.set_text(&page.error_banner().to_string(), "Email or password is incorrect");

    page.expect_error("incorrect").await.unwrap();
    let err = page.expect_error("locked").await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed { .. }), "{err}");
}

#[tokio::test]
async fn login_as_missing_slot_reports_the_variable() {
    let mock = MockDriver::new();
    let page = LoginPage::new(mock.session_with_timeouts(200));
    let err = page.login_as(250).await.unwrap_err();
    match err {
        E2eError::MissingEnv(var) => assert_eq!(var, "STUDIO_E2E_USER250_EMAIL"),
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn undo_waits_for_save_then_for_the_shorter_history() {
    let mock = MockDriver::new();
    let session = mock.session_with_timeouts(500);
    let page = HistoryPage::new(WorkspacePage::new(session.clone()));

    let entries = page.history.entries().to_string();
    mock.set_count(&page.history.panel().to_string(), 1);
    mock.set_count(&entries, 3);
    mock.set_attribute(
        &page.workspace.save_sync().indicator().to_string(),
        SAVE_STATUS_ATTRIBUTE,
        "saved",
    );
    let undo = session.shortcut(Command::Undo).to_string();
    mock.on_key(&undo, move |dom| dom.set_count(&entries, 2));

    page.open_panel().await.unwrap();
    page.undo_to(2).await.unwrap();
    assert_eq!(mock.keys_pressed(), vec![undo]);
}

#[tokio::test]
async fn deleted_file_card_disappears() {
    let mock = MockDriver::new();
    let session = mock.session_with_timeouts(500);
    let menu = ContextMenu::new(session.clone());
    let grid = FileGrid::new(session.clone(), menu.clone());

    let (card, menu_key, delete) = (
        grid.card("Old draft").to_string(),
        menu.menu().to_string(),
        menu.item("Delete").to_string(),
    );
    mock.set_count(&card, 1);
    mock.on_action(&card, "right_click", {
        let (menu_key, delete) = (menu_key.clone(), delete.clone());
        move |dom, _| {
            dom.set_count(&menu_key, 1);
            dom.set_count(&delete, 1);
        }
    });
    mock.on_action(&delete, "click", move |dom, _| {
        dom.remove(&menu_key);
        dom.remove(&card);
    });

    grid.delete_file("Old draft").await.unwrap();
    grid.expect_no_file("Old draft").await.unwrap();
}

#[tokio::test]
async fn confirm_dialog_message_and_cancel() {
    let mock = MockDriver::new();
    let confirm = ConfirmDialog::new(mock.session_with_timeouts(300));
    let dialog = confirm.dialog().to_string();
    mock.set_count(&dialog, 1);
    mock.set_text(
        &confirm.message().to_string(),
        "Are you sure you want to delete this team?",
    );
    mock.set_count(&confirm.cancel_button().to_string(), 1);
    mock.on_action(&confirm.cancel_button().to_string(), "click", move |dom, _| {
        dom.remove(&dialog)
    });

    confirm.expect_message("delete this team").await.unwrap();
    confirm.cancel().await.unwrap();
}

#[tokio::test]
async fn open_url_waits_for_the_editor() {
    let mock = MockDriver::new();
    let page = WorkspacePage::new(mock.session_with_timeouts(500));
    let viewport = page.viewport.root().to_string();
    mock.on_goto(move |dom, url| {
        if url.contains("/workspace/") {
            dom.set_count(&viewport, 1);
        }
    });

    page.open_url("http://localhost:3449/#/workspace/7").await.unwrap();
    assert_eq!(
        page.session().current_url().await.unwrap(),
        "http://localhost:3449/#/workspace/7"
    );
}

/// Minimal mailbox: one message listed, its plain body served by id
async fn serve_mailbox() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 2048];
            let n = socket.read(&mut buf).await.unwrap_or(0);
            let request = String::from_utf8_lossy(&buf[..n]);
            let (content_type, body) = if request.starts_with("GET /messages/1.plain") {
                (
                    "text/plain",
                    "Join the team: https://studio.test/#/invite?token=abc123.".to_string(),
                )
            } else {
                (
                    "application/json",
                    r#"[{"id":1,"recipients":["<guest@example.com>"],"subject":"You are invited to alpha"}]"#
                        .to_string(),
                )
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn mailbox_returns_matching_message_with_links() {
    let mailbox = Mailbox::new(&serve_mailbox().await).unwrap();

    let mail = mailbox
        .wait_for_message("guest@example.com", "invited", Duration::from_secs(3))
        .await
        .unwrap();
    assert_eq!(mail.message.id, 1);
    assert_eq!(
        mail.links,
        vec!["https://studio.test/#/invite?token=abc123".to_string()]
    );

    let err = mailbox
        .wait_for_message("nobody@example.com", "invited", Duration::from_millis(600))
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::Timeout(_)), "{err}");
}
