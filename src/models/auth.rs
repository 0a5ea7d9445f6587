use crate::entities::{umkm_entity, user_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Andi")]
    pub name: Option<String>,
    #[schema(example = "andi@example.com")]
    pub email: String,
    #[schema(example = "rahasia123")]
    pub password: String,
    #[schema(example = "Barbershop Andi")]
    pub umkm_name: String,
    #[schema(example = "barbershop-andi")]
    pub slug: String,
    #[schema(example = "081234567890")]
    pub owner_whatsapp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "andi@example.com")]
    pub email: String,
    #[schema(example = "rahasia123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub is_admin: bool,
    pub umkm_id: Option<i64>,
    pub umkm_slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: user_entity::Model, umkm: Option<&umkm_entity::Model>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            umkm_id: umkm.map(|u| u.id),
            umkm_slug: umkm.map(|u| u.slug.clone()),
            created_at: user.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}
