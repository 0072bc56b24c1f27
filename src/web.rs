use std::sync::Mutex;

use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calendar::resolve_range;
use crate::config::AppConfig;
use crate::display::{schedule_rows, ScheduleRow};
use crate::parser::{read_roster, IngestReport};
use crate::schedule::{generate_schedule, GeneratedSchedule};

/// Shared state: the configuration and the last generated schedule
pub struct AppState {
    pub config: AppConfig,
    pub schedule: Mutex<Option<GeneratedSchedule>>,
}

impl AppState {
    pub fn new(config: AppConfig, schedule: Option<GeneratedSchedule>) -> Self {
        Self {
            config,
            schedule: Mutex::new(schedule),
        }
    }
}

#[derive(Deserialize)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    start: NaiveDate,
    end: NaiveDate,
    rows: Vec<ScheduleRow>,
}

#[derive(Serialize)]
struct UploadResponse<'a> {
    success: bool,
    staff: usize,
    days: usize,
    report: &'a IngestReport,
}

fn lock_poisoned<T>(_: T) -> actix_web::Error {
    actix_web::error::ErrorInternalServerError("schedule state unavailable")
}

fn not_generated() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"error": "Schedule not available"}))
}

fn rejected(error: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest()
        .json(serde_json::json!({"success": false, "error": error.to_string()}))
}

// Schedule rows endpoint
async fn get_schedule(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = state.schedule.lock().map_err(lock_poisoned)?;
    match schedule.as_ref() {
        Some(schedule) => Ok(HttpResponse::Ok().json(ScheduleResponse {
            start: schedule.start,
            end: schedule.end,
            rows: schedule_rows(&schedule.days),
        })),
        None => Ok(not_generated()),
    }
}

// Hours per staff and what balancing did
async fn get_workload(state: web::Data<AppState>) -> Result<HttpResponse> {
    let schedule = state.schedule.lock().map_err(lock_poisoned)?;
    match schedule.as_ref() {
        Some(schedule) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "workload": &schedule.ledger,
            "mean_hours": schedule.ledger.mean_hours(),
            "variance": schedule.ledger.variance(),
            "balance": &schedule.balance,
        }))),
        None => Ok(not_generated()),
    }
}

// Availability upload: replaces the roster and regenerates
async fn upload_availability(
    req: HttpRequest,
    query: web::Query<RangeQuery>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let password = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if password != state.config.web.admin_password {
        return Ok(HttpResponse::Unauthorized()
            .json(serde_json::json!({"success": false, "error": "Unauthorized"})));
    }

    let today = Local::now().date_naive();
    let (start, end) = match resolve_range(query.start.as_deref(), query.end.as_deref(), today) {
        Ok(range) => range,
        Err(e) => return Ok(rejected(e)),
    };

    let strict = state.config.input.strict_labels;
    let loaded = read_roster(body.as_ref(), strict).and_then(|(mut roster, report)| {
        state.config.apply_overrides(&mut roster)?;
        Ok((roster, report))
    });
    let (roster, report) = match loaded {
        Ok((roster, _)) if roster.is_empty() => {
            return Ok(rejected("No usable staff rows in upload"));
        }
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(error = %e, "rejected availability upload");
            return Ok(rejected(format!("Failed to process CSV: {}", e)));
        }
    };

    let generated = generate_schedule(&roster, start, end, &state.config.balance);
    let days = generated.days.len();
    *state.schedule.lock().map_err(lock_poisoned)? = Some(generated);
    info!(staff = roster.len(), days, "schedule regenerated from upload");

    Ok(HttpResponse::Ok().json(UploadResponse {
        success: true,
        staff: roster.len(),
        days,
        report: &report,
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/schedule", web::get().to(get_schedule))
        .route("/api/workload", web::get().to(get_workload))
        .route("/api/upload", web::post().to(upload_availability));
}

pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let port = state.config.web.port;
    let app_state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    const CSV: &str = "Timestamp,Name,Mon,Tue,Wed,Thu,Fri\n\
                       t1,An,Ca 9h - 12h;Ca 13h30 - 16h,,,,\n\
                       t2,Binh,Ca 9h - 12h,,,,\n";

    #[actix_web::test]
    async fn test_schedule_missing_until_upload() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::get().uri("/api/schedule").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/upload?start=2024-06-03&end=2024-06-03")
            .insert_header(("X-Admin-Password", "admin123"))
            .set_payload(CSV)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/schedule").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["labs"][0], "An");
        assert_eq!(rows[0]["labs"][1], "Binh");
        assert_eq!(rows[1]["labs"][0], "An");
    }

    #[actix_web::test]
    async fn test_upload_requires_password() {
        let state = web::Data::new(AppState::new(AppConfig::default(), None));
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header(("X-Admin-Password", "wrong"))
            .set_payload(CSV)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(state.schedule.lock().unwrap().is_none());
    }
}
