use crate::entities::{
    WaLogKind, queue_entity as queues, topup_entity as topups, umkm_entity as umkm,
    wa_log_entity as wa_logs,
};
use crate::error::{AppError, AppResult};
use crate::external::{SendOutcome, WhatsAppService};
use crate::models::{ListQuery, NotifyResponse, PaginatedResponse, PaginationParams, WaLogResponse};
use crate::services::credit_service::{current_balance, debit_one};
use crate::services::queue_service::{current_called, owned_ticket, waiting_list};
use crate::services::{owner_umkm, today};
use crate::utils::{normalize_wa_number, ticket_url};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use std::sync::Arc;

/// How many places ahead of the called ticket still get an automatic reminder
const REMINDER_WINDOW: i32 = 2;

/// One logged gateway attempt.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub outcome: SendOutcome,
    /// A credit was taken for this message
    pub charged: bool,
}

impl Delivery {
    pub fn sent(&self) -> bool {
        self.outcome.success()
    }
}

/// Everything needed to send and bill one message.
pub struct Outgoing<'a> {
    pub umkm_id: i64,
    pub queue_id: Option<i64>,
    pub kind: WaLogKind,
    pub phone: &'a str,
    pub message: String,
    /// Ledger description used when the message is billed
    pub charge_description: String,
}

#[derive(Clone)]
pub struct NotificationService {
    pool: Arc<DatabaseConnection>,
    whatsapp: WhatsAppService,
}

impl NotificationService {
    pub fn new(pool: Arc<DatabaseConnection>, whatsapp: WhatsAppService) -> Self {
        Self { pool, whatsapp }
    }

    pub fn admin_number(&self) -> &str {
        self.whatsapp.admin_number()
    }

    /// Sends, appends the attempt to `wa_logs`, and for billable kinds takes
    /// one credit when the gateway accepted the message.
    pub async fn send_and_record(&self, out: Outgoing<'_>) -> AppResult<Delivery> {
        let number = normalize_wa_number(out.phone);
        let outcome = self.whatsapp.send(&number, &out.message).await;

        wa_logs::ActiveModel {
            umkm_id: Set(out.umkm_id),
            queue_id: Set(out.queue_id),
            kind: Set(out.kind),
            phone_number: Set(number),
            message: Set(out.message),
            status: Set(outcome.status.clone()),
            response_raw: Set(Some(outcome.raw.clone())),
            success: Set(outcome.success()),
            created_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        let mut charged = false;
        if out.kind.is_billable() && outcome.success() {
            charged = debit_one(self.pool.as_ref(), out.umkm_id, &out.charge_description).await?;
            if !charged {
                log::warn!(
                    "UMKM {} ran out of credit before a delivered {:?} message could be billed",
                    out.umkm_id,
                    out.kind
                );
            }
        }

        Ok(Delivery { outcome, charged })
    }

    /// Owner-triggered "please get ready" message for one ticket
    pub async fn send_manual(
        &self,
        user_id: i64,
        ticket_id: i64,
        base_url: &str,
    ) -> AppResult<NotifyResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let ticket = owned_ticket(self.pool.as_ref(), owner.id, ticket_id).await?;

        if !owner.has_credit() {
            return Err(AppError::InsufficientCredit);
        }
        let Some(phone) = ticket.phone() else {
            return Err(AppError::ValidationError(
                "Nomor pelanggan tidak tersedia.".to_string(),
            ));
        };

        let url = ticket_url(base_url, &owner.slug, ticket.id);
        let delivery = self
            .send_and_record(Outgoing {
                umkm_id: owner.id,
                queue_id: Some(ticket.id),
                kind: WaLogKind::Manual,
                phone,
                message: manual_message(
                    ticket.customer_name.as_deref(),
                    &owner.name,
                    ticket.queue_number,
                    &url,
                ),
                charge_description: format!("Kirim WA manual ke #{}", ticket.queue_number),
            })
            .await?;

        let credit_balance = current_balance(self.pool.as_ref(), owner.id).await?;

        Ok(NotifyResponse {
            sent: delivery.sent(),
            gateway_status: delivery.outcome.status,
            credit_balance,
        })
    }

    /// Reminds waiting customers who are at most three places from the front.
    /// Each ticket is reminded once. Returns how many reminders were delivered.
    pub async fn send_auto_reminders(&self, owner: &umkm::Model, base_url: &str) -> AppResult<u32> {
        let day = today();
        let Some(current) = current_called(self.pool.as_ref(), owner.id, day).await? else {
            return Ok(0);
        };

        let candidates: Vec<(queues::Model, i32)> = waiting_list(self.pool.as_ref(), owner.id, day)
            .await?
            .into_iter()
            .filter(|w| w.phone().is_some())
            .filter_map(|w| reminder_ahead(current.queue_number, w.queue_number).map(|a| (w, a)))
            .collect();

        if candidates.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i64> = candidates.iter().map(|(w, _)| w.id).collect();
        let reminded: HashSet<i64> = wa_logs::Entity::find()
            .select_only()
            .column(wa_logs::Column::QueueId)
            .filter(wa_logs::Column::QueueId.is_in(ids))
            .filter(wa_logs::Column::Kind.eq(WaLogKind::AutoReminder))
            .into_tuple::<Option<i64>>()
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .flatten()
            .collect();

        let mut balance = current_balance(self.pool.as_ref(), owner.id).await?;
        let mut delivered = 0u32;

        for (ticket, ahead) in candidates {
            if reminded.contains(&ticket.id) {
                continue;
            }
            if balance <= 0 {
                log::info!("Auto reminders for {} stopped: no credit left", owner.slug);
                break;
            }
            let Some(phone) = ticket.phone() else {
                continue;
            };

            let url = ticket_url(base_url, &owner.slug, ticket.id);
            let delivery = self
                .send_and_record(Outgoing {
                    umkm_id: owner.id,
                    queue_id: Some(ticket.id),
                    kind: WaLogKind::AutoReminder,
                    phone,
                    message: auto_reminder_message(
                        ticket.customer_name.as_deref(),
                        &owner.name,
                        ticket.queue_number,
                        ahead,
                        &url,
                    ),
                    charge_description: format!("Auto reminder ke #{}", ticket.queue_number),
                })
                .await?;

            if delivery.charged {
                balance -= 1;
            }
            if delivery.sent() {
                delivered += 1;
            }
        }

        Ok(delivered)
    }

    /// Free notice to the operator that a transfer is waiting for review
    pub async fn notify_topup_admin(
        &self,
        owner: &umkm::Model,
        tx: &topups::Model,
        admin_link: &str,
    ) -> AppResult<Delivery> {
        let admin_number = self.admin_number().to_string();
        self.send_and_record(Outgoing {
            umkm_id: owner.id,
            queue_id: None,
            kind: WaLogKind::TopupAdmin,
            phone: &admin_number,
            message: topup_admin_message(&owner.name, tx, admin_link),
            charge_description: String::new(),
        })
        .await
    }

    /// Free notice to the owner after an approved top-up
    pub async fn notify_topup_owner(
        &self,
        owner: &umkm::Model,
        tx: &topups::Model,
        credit_balance: i64,
    ) -> AppResult<Option<Delivery>> {
        let Some(phone) = owner.owner_whatsapp.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Ok(None);
        };
        let delivery = self
            .send_and_record(Outgoing {
                umkm_id: owner.id,
                queue_id: None,
                kind: WaLogKind::TopupOwner,
                phone,
                message: topup_success_message(&owner.name, tx, credit_balance),
                charge_description: String::new(),
            })
            .await?;
        Ok(Some(delivery))
    }

    pub async fn message_logs(
        &self,
        user_id: i64,
        query: &ListQuery,
    ) -> AppResult<PaginatedResponse<WaLogResponse>> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query = wa_logs::Entity::find().filter(wa_logs::Column::UmkmId.eq(owner.id));
        let total = base_query.clone().count(self.pool.as_ref()).await? as i64;

        let rows = base_query
            .order_by_desc(wa_logs::Column::CreatedAt)
            .order_by_desc(wa_logs::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(self.pool.as_ref())
            .await?;

        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            &params,
            total,
        ))
    }
}

/// Number of people between the called ticket and `candidate`, if that
/// ticket is close enough to be reminded.
pub fn reminder_ahead(current_number: i32, candidate_number: i32) -> Option<i32> {
    let ahead = candidate_number - current_number - 1;
    (0..=REMINDER_WINDOW).contains(&ahead).then_some(ahead)
}

fn greeting_name(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Pelanggan")
}

pub fn new_ticket_message(customer: Option<&str>, umkm_name: &str, number: i32, url: &str) -> String {
    format!(
        "[NEW_TICKET] Halo {}, ini dari {}. \n\
         Terima kasih telah mengambil nomor antrian. \n\
         Nomor Anda adalah *#{}*. \n\
         Cek status antrian Anda di sini: {}\n",
        greeting_name(customer),
        umkm_name,
        number,
        url
    )
}

pub fn auto_reminder_message(
    customer: Option<&str>,
    umkm_name: &str,
    number: i32,
    ahead: i32,
    url: &str,
) -> String {
    let status_text = if ahead <= 0 {
        "giliran Anda hampir tiba (berikutnya).".to_string()
    } else {
        format!("tinggal {ahead} orang di depan Anda.")
    };
    format!(
        "[AUTO_REMINDER] Halo {}, ini dari {}. Antrian Anda #{} {} Cek status antrian di sini: {}",
        greeting_name(customer),
        umkm_name,
        number,
        status_text,
        url
    )
}

pub fn manual_message(customer: Option<&str>, umkm_name: &str, number: i32, url: &str) -> String {
    format!(
        "Halo {}, ini dari {}. Antrian Anda #{} akan segera dipanggil. Mohon bersiap ke lokasi. \
         Cek status antrian di sini: {}",
        greeting_name(customer),
        umkm_name,
        number,
        url
    )
}

pub fn topup_admin_message(umkm_name: &str, tx: &topups::Model, admin_link: &str) -> String {
    let mut message = format!(
        "[TOPUP KONFIRMASI]\nUMKM: {}\nPaket: {}\nKredit: {}\n",
        umkm_name, tx.package_name, tx.credits
    );
    if let Some(amount) = tx.amount.filter(|a| *a > 0) {
        message.push_str(&format!("Perkiraan Rp: {amount}\n"));
    }
    if let Some(sender) = tx.sender_name.as_deref().filter(|s| !s.is_empty()) {
        message.push_str(&format!("Pengirim: {sender}\n"));
    }
    if let Some(note) = tx.note.as_deref().filter(|n| !n.is_empty()) {
        message.push_str(&format!("Catatan: {note}\n"));
    }
    message.push_str(&format!("\nID Transaksi: {}\nPanel Admin: {}", tx.id, admin_link));
    message
}

pub fn topup_success_message(umkm_name: &str, tx: &topups::Model, credit_balance: i64) -> String {
    format!(
        "[TOPUP BERHASIL]\nUMKM: {}\nPaket: {}\nKredit: {}\nSaldo kredit saat ini: {}.\n\n\
         Terima kasih, top-up Anda sudah kami proses. 🙏",
        umkm_name, tx.package_name, tx.credits, credit_balance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TopupStatus;

    fn topup(amount: Option<i64>, sender: Option<&str>, note: Option<&str>) -> topups::Model {
        topups::Model {
            id: 31,
            umkm_id: 4,
            user_id: 9,
            package_name: "Paket Rame".into(),
            credits: 100,
            amount,
            qris_image: Some("img/qris_rame.jpg".into()),
            proof_image: None,
            status: TopupStatus::WaitingAdmin,
            sender_name: sender.map(Into::into),
            note: note.map(Into::into),
            admin_note: None,
            created_at: None,
            confirmed_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_reminder_window() {
        // called #5: #6 is next, #7 and #8 have one and two people ahead
        assert_eq!(reminder_ahead(5, 6), Some(0));
        assert_eq!(reminder_ahead(5, 7), Some(1));
        assert_eq!(reminder_ahead(5, 8), Some(2));
        assert_eq!(reminder_ahead(5, 9), None);
        assert_eq!(reminder_ahead(5, 5), None);
        assert_eq!(reminder_ahead(5, 3), None);
    }

    #[test]
    fn test_auto_reminder_text() {
        let next = auto_reminder_message(Some("Budi"), "Warung Budi", 6, 0, "http://x/w?ticket_id=1");
        assert!(next.starts_with("[AUTO_REMINDER] Halo Budi, ini dari Warung Budi."));
        assert!(next.contains("#6 giliran Anda hampir tiba (berikutnya)."));
        assert!(next.ends_with("http://x/w?ticket_id=1"));

        let later = auto_reminder_message(None, "Warung Budi", 8, 2, "u");
        assert!(later.contains("Halo Pelanggan"));
        assert!(later.contains("#8 tinggal 2 orang di depan Anda."));
    }

    #[test]
    fn test_new_ticket_and_manual_text() {
        let msg = new_ticket_message(Some("  "), "Salon Sari", 3, "http://x/salon-sari?ticket_id=9");
        assert!(msg.starts_with("[NEW_TICKET] Halo Pelanggan, ini dari Salon Sari."));
        assert!(msg.contains("Nomor Anda adalah *#3*."));

        let manual = manual_message(Some("Ani"), "Salon Sari", 3, "u");
        assert!(manual.contains("Antrian Anda #3 akan segera dipanggil."));
        assert!(!manual.contains('['));
    }

    #[test]
    fn test_topup_admin_text_includes_optional_lines() {
        let full = topup_admin_message("Warung Budi", &topup(Some(50000), Some("Budi"), Some("BCA")), "http://x/admin");
        assert!(full.starts_with("[TOPUP KONFIRMASI]\nUMKM: Warung Budi\nPaket: Paket Rame\nKredit: 100\n"));
        assert!(full.contains("Perkiraan Rp: 50000\n"));
        assert!(full.contains("Pengirim: Budi\n"));
        assert!(full.contains("Catatan: BCA\n"));
        assert!(full.ends_with("\nID Transaksi: 31\nPanel Admin: http://x/admin"));

        let bare = topup_admin_message("Warung Budi", &topup(None, None, None), "l");
        assert!(!bare.contains("Perkiraan"));
        assert!(!bare.contains("Pengirim"));
    }

    #[test]
    fn test_topup_success_text() {
        let msg = topup_success_message("Warung Budi", &topup(None, None, None), 110);
        assert!(msg.starts_with("[TOPUP BERHASIL]\n"));
        assert!(msg.contains("Saldo kredit saat ini: 110."));
    }

    mod delivery {
        use super::super::*;
        use crate::entities::{QueueStatus, TopupStatus};
        use crate::services::test_support::*;
        use sea_orm::{DatabaseBackend, MockDatabase, Value};
        use std::collections::BTreeMap;

        const WA_INSERT: &str = r#"INSERT INTO "wa_logs""#;
        const BALANCE_UPDATE: &str = r#"UPDATE "umkm""#;

        fn reminder_to(number: i32) -> Outgoing<'static> {
            Outgoing {
                umkm_id: 1,
                queue_id: Some(number as i64 + 100),
                kind: WaLogKind::AutoReminder,
                phone: "081234567890",
                message: "halo".into(),
                charge_description: format!("Auto reminder ke #{number}"),
            }
        }

        #[tokio::test]
        async fn test_billable_message_is_charged_on_200() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![wa_log(WaLogKind::AutoReminder, Some(106))]])
                    .append_exec_results([exec(1)])
                    .append_query_results([vec![ledger_row(-1)]])
                    .into_connection(),
            );
            let service = NotificationService::new(db.clone(), whatsapp(&gateway("HTTP/1.1 200 OK").await));

            let delivery = service.send_and_record(reminder_to(6)).await.unwrap();
            assert!(delivery.sent());
            assert!(delivery.charged);

            drop(service);
            let log = statements(db);
            assert_eq!(count_starting_with(&log, WA_INSERT), 1);
            assert_eq!(count_starting_with(&log, BALANCE_UPDATE), 1);
        }

        #[tokio::test]
        async fn test_rejected_message_is_logged_but_free() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![wa_log(WaLogKind::AutoReminder, Some(106))]])
                    .into_connection(),
            );
            let url = gateway("HTTP/1.1 500 Internal Server Error").await;
            let service = NotificationService::new(db.clone(), whatsapp(&url));

            let delivery = service.send_and_record(reminder_to(6)).await.unwrap();
            assert_eq!(delivery.outcome.status, "500");
            assert!(!delivery.charged);

            drop(service);
            let log = statements(db);
            assert_eq!(count_starting_with(&log, WA_INSERT), 1);
            assert_eq!(count_starting_with(&log, BALANCE_UPDATE), 0);
        }

        #[tokio::test]
        async fn test_topup_notice_is_free_even_when_delivered() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![wa_log(WaLogKind::TopupAdmin, None)]])
                    .into_connection(),
            );
            let service = NotificationService::new(db.clone(), whatsapp(&gateway("HTTP/1.1 200 OK").await));

            let delivery = service
                .notify_topup_admin(&business(0), &topup(TopupStatus::WaitingAdmin), "http://x/admin")
                .await
                .unwrap();
            assert!(delivery.sent());
            assert!(!delivery.charged);

            drop(service);
            assert_eq!(count_starting_with(&statements(db), BALANCE_UPDATE), 0);
        }

        #[tokio::test]
        async fn test_auto_reminders_skip_already_reminded_tickets() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![ticket(5, QueueStatus::Called)]])
                    .append_query_results([vec![
                        ticket(6, QueueStatus::Waiting),
                        ticket(7, QueueStatus::Waiting),
                        ticket(9, QueueStatus::Waiting),
                    ]])
                    .append_query_results([vec![cell("queue_id", Value::BigInt(Some(106)))]])
                    .append_query_results([vec![balance_row(5)]])
                    .append_query_results([vec![wa_log(WaLogKind::AutoReminder, Some(107))]])
                    .append_exec_results([exec(1)])
                    .append_query_results([vec![ledger_row(-1)]])
                    .into_connection(),
            );
            let service = NotificationService::new(db.clone(), whatsapp(&gateway("HTTP/1.1 200 OK").await));

            let delivered = service
                .send_auto_reminders(&business(5), "http://x")
                .await
                .unwrap();
            assert_eq!(delivered, 1);

            drop(service);
            let log = statements(db);
            let sent: Vec<_> = log.iter().filter(|s| s.sql.starts_with(WA_INSERT)).collect();
            assert_eq!(sent.len(), 1);
            assert!(binds(sent[0], &Value::BigInt(Some(107))));
        }

        #[tokio::test]
        async fn test_auto_reminders_stop_when_credit_runs_out() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![ticket(5, QueueStatus::Called)]])
                    .append_query_results([vec![
                        ticket(6, QueueStatus::Waiting),
                        ticket(7, QueueStatus::Waiting),
                    ]])
                    .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                    .append_query_results([vec![balance_row(1)]])
                    .append_query_results([vec![wa_log(WaLogKind::AutoReminder, Some(106))]])
                    .append_exec_results([exec(1)])
                    .append_query_results([vec![ledger_row(-1)]])
                    .into_connection(),
            );
            let service = NotificationService::new(db.clone(), whatsapp(&gateway("HTTP/1.1 200 OK").await));

            let delivered = service
                .send_auto_reminders(&business(1), "http://x")
                .await
                .unwrap();
            assert_eq!(delivered, 1);

            drop(service);
            let log = statements(db);
            let sent: Vec<_> = log.iter().filter(|s| s.sql.starts_with(WA_INSERT)).collect();
            assert_eq!(sent.len(), 1);
            assert!(binds(sent[0], &Value::BigInt(Some(106))));
        }

        #[tokio::test]
        async fn test_auto_reminders_send_nothing_at_zero_balance() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![ticket(5, QueueStatus::Called)]])
                    .append_query_results([vec![ticket(6, QueueStatus::Waiting)]])
                    .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
                    .append_query_results([vec![balance_row(0)]])
                    .into_connection(),
            );
            let service = NotificationService::new(db.clone(), whatsapp(DEAD_GATEWAY));

            let delivered = service
                .send_auto_reminders(&business(0), "http://x")
                .await
                .unwrap();
            assert_eq!(delivered, 0);

            drop(service);
            assert_eq!(count_starting_with(&statements(db), WA_INSERT), 0);
        }
    }
}
