use actix_web::HttpResponse;

use super::middleware::AuthenticatedUser;

pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    log::info!("/api/auth/me called for user ID: {}", user.0.id);
    HttpResponse::Ok().json(user.0)
}
