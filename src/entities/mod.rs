pub mod credit_logs;
pub mod queues;
pub mod topup_transactions;
pub mod umkm;
pub mod users;
pub mod wa_logs;

pub use credit_logs as credit_log_entity;
pub use queues as queue_entity;
pub use topup_transactions as topup_entity;
pub use umkm as umkm_entity;
pub use users as user_entity;
pub use wa_logs as wa_log_entity;

pub use queues::QueueStatus;
pub use topup_transactions::TopupStatus;
pub use wa_logs::WaLogKind;
