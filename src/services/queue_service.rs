use crate::entities::{QueueStatus, WaLogKind, queue_entity as queues, umkm_entity as umkm};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdvanceResponse, DashboardView, PublicQueueView, PublicTicket, PublicUmkm, QueueEntry,
    QueueSnapshot, TakeTicketRequest, TakeTicketResponse, TicketResponse,
};
use crate::realtime::DisplayHub;
use crate::services::notification_service::{NotificationService, Outgoing, new_ticket_message};
use crate::services::{owner_umkm, today, umkm_by_slug};
use crate::utils::{non_blank, ticket_url, validate_wa_number};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;

/// Attempts at claiming a number before giving up on a busy queue
const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// `max(queue_number) + 1` for the business and day, or 1 for the first ticket.
pub async fn next_queue_number<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    day: NaiveDate,
) -> Result<i32, DbErr> {
    let last = queues::Entity::find()
        .filter(queues::Column::UmkmId.eq(umkm_id))
        .filter(queues::Column::QueueDate.eq(day))
        .order_by_desc(queues::Column::QueueNumber)
        .one(db)
        .await?;
    Ok(last.map(|q| q.queue_number + 1).unwrap_or(1))
}

/// The ticket on screen: most recently called one of the day.
pub(crate) async fn current_called<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    day: NaiveDate,
) -> Result<Option<queues::Model>, DbErr> {
    queues::Entity::find()
        .filter(queues::Column::UmkmId.eq(umkm_id))
        .filter(queues::Column::QueueDate.eq(day))
        .filter(queues::Column::Status.eq(QueueStatus::Called))
        .order_by_desc(queues::Column::CalledAt)
        .one(db)
        .await
}

pub(crate) async fn waiting_list<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    day: NaiveDate,
) -> Result<Vec<queues::Model>, DbErr> {
    queues::Entity::find()
        .filter(queues::Column::UmkmId.eq(umkm_id))
        .filter(queues::Column::QueueDate.eq(day))
        .filter(queues::Column::Status.eq(QueueStatus::Waiting))
        .order_by_asc(queues::Column::QueueNumber)
        .all(db)
        .await
}

async fn count_for_day<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    day: NaiveDate,
) -> Result<u64, DbErr> {
    queues::Entity::find()
        .filter(queues::Column::UmkmId.eq(umkm_id))
        .filter(queues::Column::QueueDate.eq(day))
        .count(db)
        .await
}

/// Loads a ticket, treating tickets of other businesses as missing.
pub(crate) async fn owned_ticket<C: ConnectionTrait>(
    db: &C,
    umkm_id: i64,
    ticket_id: i64,
) -> AppResult<queues::Model> {
    queues::Entity::find_by_id(ticket_id)
        .filter(queues::Column::UmkmId.eq(umkm_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Antrian tidak ditemukan".to_string()))
}

fn is_number_taken(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Runs `insert` again while `collided` says the number it picked was taken
/// by a concurrent request. Gives up with a conflict after
/// `MAX_NUMBER_ATTEMPTS` collisions.
async fn claim_number<T, F, Fut>(
    slug: &str,
    collided: fn(&DbErr) -> bool,
    mut insert: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match insert().await {
            Ok(row) => return Ok(row),
            Err(e) if collided(&e) && attempt < MAX_NUMBER_ATTEMPTS => {
                log::warn!(
                    "Queue number for {} taken concurrently, retrying ({}/{})",
                    slug,
                    attempt,
                    MAX_NUMBER_ATTEMPTS
                );
            }
            Err(e) if collided(&e) => {
                return Err(AppError::Conflict(
                    "Antrian sedang ramai, silakan coba lagi".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct QueueService {
    pool: Arc<DatabaseConnection>,
    notifier: NotificationService,
    hub: DisplayHub,
}

impl QueueService {
    pub fn new(pool: Arc<DatabaseConnection>, notifier: NotificationService, hub: DisplayHub) -> Self {
        Self {
            pool,
            notifier,
            hub,
        }
    }

    pub fn hub(&self) -> &DisplayHub {
        &self.hub
    }

    /// Customer takes a number from the public page.
    pub async fn take_ticket(
        &self,
        slug: &str,
        request: TakeTicketRequest,
        base_url: &str,
    ) -> AppResult<TakeTicketResponse> {
        let business = umkm_by_slug(self.pool.as_ref(), slug).await?;

        let customer_name = non_blank(request.customer_name.as_deref());
        let customer_phone = match non_blank(request.customer_phone.as_deref()) {
            Some(phone) => Some(validate_wa_number(&phone)?),
            None => None,
        };

        let day = today();
        let db = self.pool.as_ref();
        let business_id = business.id;
        let ticket = claim_number(&business.slug, is_number_taken, move || {
            let customer_name = customer_name.clone();
            let customer_phone = customer_phone.clone();
            async move {
                let number = next_queue_number(db, business_id, day).await?;
                queues::ActiveModel {
                    umkm_id: Set(business_id),
                    queue_date: Set(day),
                    queue_number: Set(number),
                    customer_name: Set(customer_name),
                    customer_phone: Set(customer_phone),
                    status: Set(QueueStatus::Waiting),
                    created_at: Set(Some(Utc::now())),
                    ..Default::default()
                }
                .insert(db)
                .await
            }
        })
        .await?;

        log::info!(
            "Ticket #{} taken at {} ({})",
            ticket.queue_number,
            business.slug,
            day
        );

        let url = ticket_url(base_url, &business.slug, ticket.id);

        let mut whatsapp_sent = false;
        if let Some(phone) = ticket.phone()
            && business.has_credit()
        {
            let delivery = self
                .notifier
                .send_and_record(Outgoing {
                    umkm_id: business.id,
                    queue_id: Some(ticket.id),
                    kind: WaLogKind::NewTicket,
                    phone,
                    message: new_ticket_message(
                        ticket.customer_name.as_deref(),
                        &business.name,
                        ticket.queue_number,
                        &url,
                    ),
                    charge_description: format!("Konfirmasi tiket #{}", ticket.queue_number),
                })
                .await?;
            whatsapp_sent = delivery.sent();
        }

        self.broadcast(&business).await;

        let position_ahead = self.position_ahead(&ticket).await?;
        Ok(TakeTicketResponse {
            ticket: public_ticket(&ticket, position_ahead),
            ticket_url: url,
            whatsapp_sent,
        })
    }

    /// Public status page, optionally focused on one ticket.
    pub async fn public_view(&self, slug: &str, ticket_id: Option<i64>) -> AppResult<PublicQueueView> {
        let business = umkm_by_slug(self.pool.as_ref(), slug).await?;
        let day = today();

        let current = current_called(self.pool.as_ref(), business.id, day).await?;
        let waiting = waiting_list(self.pool.as_ref(), business.id, day).await?;
        let count_today = count_for_day(self.pool.as_ref(), business.id, day).await?;

        let ticket = match ticket_id {
            Some(id) => match owned_ticket(self.pool.as_ref(), business.id, id).await {
                Ok(t) => {
                    let ahead = self.position_ahead(&t).await?;
                    Some(public_ticket(&t, ahead))
                }
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(PublicQueueView {
            umkm: PublicUmkm::from(&business),
            current_called: current.as_ref().map(QueueEntry::from),
            waiting: waiting.iter().map(QueueEntry::from).collect(),
            count_today,
            ticket,
        })
    }

    pub async fn dashboard(&self, user_id: i64) -> AppResult<DashboardView> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let day = today();

        let current = current_called(self.pool.as_ref(), owner.id, day).await?;
        let waiting = waiting_list(self.pool.as_ref(), owner.id, day).await?;
        let count_today = count_for_day(self.pool.as_ref(), owner.id, day).await?;
        let history = queues::Entity::find()
            .filter(queues::Column::UmkmId.eq(owner.id))
            .filter(queues::Column::QueueDate.eq(day))
            .filter(queues::Column::Status.is_in([
                QueueStatus::Done,
                QueueStatus::Canceled,
                QueueStatus::NoShow,
            ]))
            .order_by_asc(queues::Column::QueueNumber)
            .all(self.pool.as_ref())
            .await?;

        Ok(DashboardView {
            credit_balance: owner.credit_balance,
            current_called: current.map(Into::into),
            waiting: waiting.into_iter().map(Into::into).collect(),
            history: history.into_iter().map(Into::into).collect(),
            count_today,
        })
    }

    /// Serves the called customer and calls the next one.
    pub async fn call_next(&self, user_id: i64, base_url: &str) -> AppResult<AdvanceResponse> {
        self.advance(user_id, QueueStatus::Done, base_url).await
    }

    /// Marks the called customer absent and calls the next one.
    pub async fn skip(&self, user_id: i64, base_url: &str) -> AppResult<AdvanceResponse> {
        self.advance(user_id, QueueStatus::NoShow, base_url).await
    }

    async fn advance(
        &self,
        user_id: i64,
        closing: QueueStatus,
        base_url: &str,
    ) -> AppResult<AdvanceResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let day = today();
        let now = Utc::now();

        let txn = self.pool.begin().await?;

        // normally one ticket; older rows can linger after a concurrent advance
        let active = queues::Entity::find()
            .filter(queues::Column::UmkmId.eq(owner.id))
            .filter(queues::Column::QueueDate.eq(day))
            .filter(queues::Column::Status.eq(QueueStatus::Called))
            .order_by_asc(queues::Column::CalledAt)
            .all(&txn)
            .await?;

        let mut closed = None;
        for ticket in active {
            let result = queues::Entity::update_many()
                .col_expr(queues::Column::Status, Expr::value(closing))
                .col_expr(queues::Column::FinishedAt, Expr::value(now))
                .filter(queues::Column::Id.eq(ticket.id))
                .filter(queues::Column::Status.eq(QueueStatus::Called))
                .exec(&txn)
                .await?;
            if result.rows_affected == 1 {
                closed = Some(queues::Model {
                    status: closing,
                    finished_at: Some(now),
                    ..ticket
                });
            }
        }

        let mut called = None;
        for candidate in waiting_list(&txn, owner.id, day).await? {
            let result = queues::Entity::update_many()
                .col_expr(queues::Column::Status, Expr::value(QueueStatus::Called))
                .col_expr(queues::Column::CalledAt, Expr::value(now))
                .filter(queues::Column::Id.eq(candidate.id))
                .filter(queues::Column::Status.eq(QueueStatus::Waiting))
                .exec(&txn)
                .await?;
            if result.rows_affected == 1 {
                called = Some(queues::Model {
                    status: QueueStatus::Called,
                    called_at: Some(now),
                    ..candidate
                });
                break;
            }
        }

        txn.commit().await?;

        match (&closed, &called) {
            (_, Some(c)) => log::info!("{} calls #{}", owner.slug, c.queue_number),
            (Some(_), None) => log::info!("{} finished its last ticket, nobody waiting", owner.slug),
            (None, None) => log::info!("{} has no active queue", owner.slug),
        }

        let mut reminders_sent = 0;
        if called.is_some() {
            match self.notifier.send_auto_reminders(&owner, base_url).await {
                Ok(n) => reminders_sent = n,
                Err(e) => log::error!("Auto reminders for {} failed: {}", owner.slug, e),
            }
        }

        self.broadcast(&owner).await;

        Ok(AdvanceResponse {
            closed: closed.map(Into::into),
            called: called.map(Into::into),
            reminders_sent,
        })
    }

    pub async fn finish(&self, user_id: i64, ticket_id: i64) -> AppResult<TicketResponse> {
        self.transition(user_id, ticket_id, QueueStatus::Done).await
    }

    pub async fn cancel(&self, user_id: i64, ticket_id: i64) -> AppResult<TicketResponse> {
        self.transition(user_id, ticket_id, QueueStatus::Canceled).await
    }

    async fn transition(
        &self,
        user_id: i64,
        ticket_id: i64,
        next: QueueStatus,
    ) -> AppResult<TicketResponse> {
        let owner = owner_umkm(self.pool.as_ref(), user_id).await?;
        let ticket = owned_ticket(self.pool.as_ref(), owner.id, ticket_id).await?;

        if !ticket.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Antrian #{} berstatus {}, tidak bisa menjadi {}",
                ticket.queue_number, ticket.status, next
            )));
        }

        let now = Utc::now();
        let stamp_column = match next {
            QueueStatus::Canceled => queues::Column::CanceledAt,
            QueueStatus::Called => queues::Column::CalledAt,
            _ => queues::Column::FinishedAt,
        };

        let result = queues::Entity::update_many()
            .col_expr(queues::Column::Status, Expr::value(next))
            .col_expr(stamp_column, Expr::value(now))
            .filter(queues::Column::Id.eq(ticket.id))
            .filter(queues::Column::Status.eq(ticket.status))
            .exec(self.pool.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Status antrian berubah, silakan muat ulang".to_string(),
            ));
        }

        let mut updated = ticket;
        updated.status = next;
        match next {
            QueueStatus::Canceled => updated.canceled_at = Some(now),
            QueueStatus::Called => updated.called_at = Some(now),
            _ => updated.finished_at = Some(now),
        }

        self.broadcast(&owner).await;
        Ok(updated.into())
    }

    /// What the kiosk shows right now
    pub async fn snapshot(&self, umkm_id: i64) -> AppResult<QueueSnapshot> {
        let day = today();
        let current = current_called(self.pool.as_ref(), umkm_id, day).await?;
        let waiting = waiting_list(self.pool.as_ref(), umkm_id, day).await?;
        Ok(QueueSnapshot::build(current.as_ref(), &waiting))
    }

    pub async fn business_id(&self, slug: &str) -> AppResult<i64> {
        Ok(umkm_by_slug(self.pool.as_ref(), slug).await?.id)
    }

    /// Pushes the current snapshot to the business's displays. Failures are logged only.
    pub async fn broadcast(&self, business: &umkm::Model) {
        match self.snapshot(business.id).await {
            Ok(snapshot) => {
                self.hub.publish(&business.slug, snapshot).await;
            }
            Err(e) => log::error!("Queue snapshot for {} failed: {}", business.slug, e),
        }
    }

    async fn position_ahead(&self, ticket: &queues::Model) -> AppResult<Option<i64>> {
        if ticket.status != QueueStatus::Waiting {
            return Ok(None);
        }
        let ahead = queues::Entity::find()
            .filter(queues::Column::UmkmId.eq(ticket.umkm_id))
            .filter(queues::Column::QueueDate.eq(ticket.queue_date))
            .filter(queues::Column::Status.eq(QueueStatus::Waiting))
            .filter(queues::Column::QueueNumber.lt(ticket.queue_number))
            .count(self.pool.as_ref())
            .await?;
        Ok(Some(ahead as i64))
    }
}

fn public_ticket(ticket: &queues::Model, position_ahead: Option<i64>) -> PublicTicket {
    PublicTicket {
        id: ticket.id,
        queue_number: ticket.queue_number,
        name: ticket.display_name(),
        status: ticket.status,
        position_ahead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn ticket(number: i32, status: QueueStatus) -> queues::Model {
        queues::Model {
            id: number as i64 + 100,
            umkm_id: 1,
            queue_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
            queue_number: number,
            customer_name: None,
            customer_phone: None,
            status,
            created_at: None,
            called_at: None,
            finished_at: None,
            canceled_at: None,
        }
    }

    #[tokio::test]
    async fn test_next_queue_number_starts_at_one() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<queues::Model>::new()])
            .into_connection();
        let day = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(next_queue_number(&db, 1, day).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_queue_number_follows_highest() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ticket(7, QueueStatus::Done)]])
            .into_connection();
        let day = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert_eq!(next_queue_number(&db, 1, day).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_owned_ticket_of_other_business_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<queues::Model>::new()])
            .into_connection();
        let err = owned_ticket(&db, 2, 101).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_waiting_list_keeps_query_order() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                ticket(2, QueueStatus::Waiting),
                ticket(3, QueueStatus::Waiting),
            ]])
            .into_connection();
        let day = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let list = waiting_list(&db, 1, day).await.unwrap();
        let numbers: Vec<i32> = list.iter().map(|t| t.queue_number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn test_other_errors_are_not_number_collisions() {
        assert!(!is_number_taken(&DbErr::Custom("boom".into())));
        assert!(!is_number_taken(&DbErr::RecordNotInserted));
    }

    #[test]
    fn test_public_ticket_hides_phone() {
        let mut t = ticket(4, QueueStatus::Waiting);
        t.customer_phone = Some("6281234567890".into());
        let public = public_ticket(&t, Some(2));
        assert_eq!(public.name, "Tanpa nama");
        assert_eq!(public.position_ahead, Some(2));
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("6281234567890"));
    }

    fn collision(err: &DbErr) -> bool {
        matches!(err, DbErr::RecordNotInserted)
    }

    #[tokio::test]
    async fn test_claim_number_retries_collisions() {
        let mut calls = 0;
        let claimed = claim_number("warung-budi", collision, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 3 {
                    Err(DbErr::RecordNotInserted)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(claimed, 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_claim_number_gives_up_with_conflict() {
        let mut calls = 0;
        let err = claim_number("warung-budi", collision, || {
            calls += 1;
            async { Err::<i32, _>(DbErr::RecordNotInserted) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(calls, MAX_NUMBER_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_claim_number_passes_other_errors_through() {
        let mut calls = 0;
        let err = claim_number("warung-budi", collision, || {
            calls += 1;
            async { Err::<i32, _>(DbErr::Custom("boom".into())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(calls, 1);
    }

    mod advance {
        use super::*;
        use crate::services::test_support::{DEAD_GATEWAY, business, exec, whatsapp};

        fn service(db: &Arc<DatabaseConnection>) -> QueueService {
            let notifier = NotificationService::new(db.clone(), whatsapp(DEAD_GATEWAY));
            QueueService::new(db.clone(), notifier, DisplayHub::new())
        }

        fn empty() -> Vec<queues::Model> {
            Vec::new()
        }

        #[tokio::test]
        async fn test_skip_marks_no_show_and_calls_lowest_waiting() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(3)]])
                    .append_query_results([vec![ticket(5, QueueStatus::Called)]])
                    .append_query_results([vec![
                        ticket(6, QueueStatus::Waiting),
                        ticket(7, QueueStatus::Waiting),
                    ]])
                    // reminders, then the display snapshot
                    .append_query_results([empty(), empty(), empty()])
                    .append_exec_results([exec(1), exec(1)])
                    .into_connection(),
            );

            let result = service(&db).skip(9, "http://x").await.unwrap();

            let closed = result.closed.unwrap();
            assert_eq!(closed.queue_number, 5);
            assert_eq!(closed.status, QueueStatus::NoShow);
            assert!(closed.finished_at.is_some());

            let called = result.called.unwrap();
            assert_eq!(called.queue_number, 6);
            assert_eq!(called.status, QueueStatus::Called);
            assert!(called.called_at.is_some());
            assert_eq!(result.reminders_sent, 0);
        }

        #[tokio::test]
        async fn test_call_next_marks_done() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(3)]])
                    .append_query_results([vec![ticket(5, QueueStatus::Called)]])
                    .append_query_results([empty(), empty(), empty()])
                    .append_exec_results([exec(1)])
                    .into_connection(),
            );

            let result = service(&db).call_next(9, "http://x").await.unwrap();

            assert_eq!(result.closed.unwrap().status, QueueStatus::Done);
            assert!(result.called.is_none());
        }

        #[tokio::test]
        async fn test_candidate_taken_concurrently_moves_to_next() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(3)]])
                    .append_query_results([empty()])
                    .append_query_results([vec![
                        ticket(6, QueueStatus::Waiting),
                        ticket(7, QueueStatus::Waiting),
                    ]])
                    .append_query_results([empty(), empty(), empty()])
                    .append_exec_results([exec(0), exec(1)])
                    .into_connection(),
            );

            let result = service(&db).call_next(9, "http://x").await.unwrap();

            assert!(result.closed.is_none());
            assert_eq!(result.called.unwrap().queue_number, 7);
        }

        #[tokio::test]
        async fn test_empty_queue_changes_nothing() {
            let db = Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres)
                    .append_query_results([vec![business(3)]])
                    .append_query_results([empty(), empty(), empty(), empty()])
                    .into_connection(),
            );

            let result = service(&db).call_next(9, "http://x").await.unwrap();

            assert!(result.closed.is_none());
            assert!(result.called.is_none());
        }
    }
}
