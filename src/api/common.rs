use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::HttpResponse;
use serde::Serialize;

/// The fixed response shape of every POST endpoint. `msg` is omitted where
/// the caller has nothing useful to show.
#[derive(Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

pub fn success(msg: &str) -> StatusMessage {
    StatusMessage {
        status: "success",
        msg: Some(msg.to_owned()),
    }
}

pub fn simple_success() -> StatusMessage {
    StatusMessage {
        status: "success",
        msg: None,
    }
}

pub fn fail(msg: &str) -> StatusMessage {
    StatusMessage {
        status: "fail",
        msg: Some(msg.to_owned()),
    }
}

pub fn success_response(msg: &str) -> HttpResponse {
    HttpResponse::Ok().json(success(msg))
}

pub fn simple_success_response() -> HttpResponse {
    HttpResponse::Ok().json(simple_success())
}

pub fn fail_response(msg: &str) -> HttpResponse {
    HttpResponse::Ok().json(fail(msg))
}

pub fn get_current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis().try_into().expect("Hello future")
}

/// Requested page numbers below 1 (or absent) fall back to the first page,
/// like the original paginator did for unusable input.
pub fn page_number(page: Option<i64>) -> i64 {
    match page {
        Some(page) if page >= 1 => page,
        _ => 1,
    }
}

pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1) * per_page
}

pub fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}

#[derive(Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub num_pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, per_page: i64) -> Paginated<T> {
        Paginated {
            items,
            total,
            page,
            num_pages: num_pages(total, per_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number_falls_back_to_first() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(-3)), 1);
        assert_eq!(page_number(Some(7)), 7);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 6), 0);
        assert_eq!(page_offset(3, 6), 12);
    }

    #[test]
    fn test_num_pages_rounds_up() {
        assert_eq!(num_pages(0, 5), 1);
        assert_eq!(num_pages(5, 5), 1);
        assert_eq!(num_pages(6, 5), 2);
        assert_eq!(num_pages(11, 5), 3);
    }

    #[test]
    fn test_timestamp_is_millis() {
        // Anything after 2020 and strictly increasing is good enough here.
        let first = get_current_timestamp();
        assert!(first > 1_577_836_800_000);
        assert!(get_current_timestamp() >= first);
    }
}
