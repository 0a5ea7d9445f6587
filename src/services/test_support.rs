//! Fixtures shared by the service tests.

use crate::config::WhatsAppConfig;
use crate::entities::{
    QueueStatus, TopupStatus, WaLogKind, credit_log_entity as credit_logs,
    queue_entity as queues, topup_entity as topups, umkm_entity as umkm,
    wa_log_entity as wa_logs,
};
use crate::external::WhatsAppService;
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, MockExecResult, Statement, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

/// A single-column row as returned by `into_tuple`.
pub fn cell(column: &'static str, value: Value) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([(column, value)])
}

pub fn balance_row(balance: i64) -> BTreeMap<&'static str, Value> {
    cell("credit_balance", Value::BigInt(Some(balance)))
}

pub fn business(credit_balance: i64) -> umkm::Model {
    umkm::Model {
        id: 1,
        user_id: 9,
        name: "Warung Budi".into(),
        slug: "warung-budi".into(),
        owner_whatsapp: Some("081234567890".into()),
        credit_balance,
        qr_path: None,
        display_ticker: None,
        display_images: None,
        display_videos: None,
        created_at: None,
        updated_at: None,
    }
}

/// Ticket `number` of business 1 with id `100 + number`.
pub fn ticket(number: i32, status: QueueStatus) -> queues::Model {
    queues::Model {
        id: number as i64 + 100,
        umkm_id: 1,
        queue_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        queue_number: number,
        customer_name: Some(format!("Pelanggan {number}")),
        customer_phone: Some(format!("08123450000{number}")),
        status,
        created_at: None,
        called_at: None,
        finished_at: None,
        canceled_at: None,
    }
}

pub fn wa_log(kind: WaLogKind, queue_id: Option<i64>) -> wa_logs::Model {
    wa_logs::Model {
        id: 1,
        umkm_id: 1,
        queue_id,
        kind,
        phone_number: "6281234567890".into(),
        message: "halo".into(),
        status: "200".into(),
        response_raw: None,
        success: true,
        created_at: None,
    }
}

pub fn ledger_row(change: i64) -> credit_logs::Model {
    credit_logs::Model {
        id: 1,
        umkm_id: 1,
        change,
        description: None,
        created_at: None,
    }
}

pub fn topup(status: TopupStatus) -> topups::Model {
    topups::Model {
        id: 31,
        umkm_id: 1,
        user_id: 9,
        package_name: "Paket Rame".into(),
        credits: 100,
        amount: Some(50000),
        qris_image: Some("img/qris_rame.jpg".into()),
        proof_image: None,
        status,
        sender_name: None,
        note: None,
        admin_note: None,
        created_at: None,
        confirmed_at: None,
        updated_at: None,
    }
}

pub fn whatsapp(gateway_url: &str) -> WhatsAppService {
    WhatsAppService::new(WhatsAppConfig {
        gateway_url: gateway_url.to_string(),
        timeout_secs: 2,
        admin_number: "6280000000".into(),
    })
}

/// Nothing listens here, so every send ends with status `error`.
pub const DEAD_GATEWAY: &str = "http://127.0.0.1:9/send-message";

/// Local gateway that answers every request with `status_line`.
pub async fn gateway(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let body = r#"{"status":true}"#;
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/send-message")
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= end + 4 + body_len {
            return;
        }
    }
}

/// Every statement the mock connection saw, once all services holding it are dropped.
pub fn statements(db: Arc<DatabaseConnection>) -> Vec<Statement> {
    let db = Arc::try_unwrap(db)
        .ok()
        .expect("connection still shared");
    db.into_transaction_log()
        .iter()
        .flat_map(|t| t.statements().to_vec())
        .collect()
}

pub fn count_starting_with(statements: &[Statement], prefix: &str) -> usize {
    statements.iter().filter(|s| s.sql.starts_with(prefix)).count()
}

pub fn binds(statement: &Statement, value: &Value) -> bool {
    statement
        .values
        .as_ref()
        .is_some_and(|v| v.0.contains(value))
}
