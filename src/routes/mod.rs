use actix_web::HttpResponse;

pub mod recordings;
pub mod wsroute;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}
