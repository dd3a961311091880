use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::dsl::count_star;
use diesel::insert_into;
use diesel::pg::Pg;
use diesel::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::common::Paginated;
use crate::api::favorites::{has_favorite, FavTarget};
use crate::api::{auth, common};
use crate::error::LightenError;
use crate::models::{City, Course, CourseOrg, Teacher};
use crate::schema::{cities, course_orgs, courses, teachers, user_asks};
use crate::{AppState, DbConnection};

const ORGANIZATIONS_PER_PAGE: i64 = 5;
const ORG_COURSES_PER_PAGE: i64 = 6;
const HOT_ORGS_AMOUNT: i64 = 3;
const HOME_COURSES_AMOUNT: i64 = 3;
const HOME_TEACHERS_AMOUNT: i64 = 1;

const MAX_ASK_NAME_BYTES: usize = 20;
const MAX_ASK_COURSE_NAME_BYTES: usize = 50;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum OrgSort {
    Students,
    Courses,
}

impl OrgSort {
    fn parse(value: &str) -> Option<OrgSort> {
        match value {
            "students" => Some(OrgSort::Students),
            "courses" => Some(OrgSort::Courses),
            _ => None,
        }
    }
}

struct OrgFilters {
    keywords: Option<String>,
    city_id: Option<i32>,
    category: Option<String>,
}

/// Applies the keyword/city/category filters to an already boxed query so
/// the same conditions drive both the page load and the total count.
fn apply_org_filters<'a, ST>(
    mut query: course_orgs::BoxedQuery<'a, Pg, ST>,
    filters: &OrgFilters,
) -> course_orgs::BoxedQuery<'a, Pg, ST> {
    if let Some(keywords) = &filters.keywords {
        let pattern = format!("%{}%", keywords);
        query = query.filter(
            course_orgs::name
                .ilike(pattern.clone())
                .or(course_orgs::description.ilike(pattern.clone()))
                .or(course_orgs::category.ilike(pattern.clone()))
                .or(course_orgs::address.ilike(pattern)),
        );
    }
    if let Some(city_id) = filters.city_id {
        query = query.filter(course_orgs::city_id.eq(city_id));
    }
    if let Some(category) = &filters.category {
        query = query.filter(course_orgs::category.eq(category.clone()));
    }
    query
}

#[derive(Deserialize)]
struct OrgListQuery {
    page: Option<i64>,
    city: Option<String>,
    ct: Option<String>,
    sort: Option<String>,
    keywords: Option<String>,
}

#[derive(Serialize)]
struct OrgListResponse {
    organizations: Paginated<CourseOrg>,
    all_cities: Vec<City>,
    hot_orgs: Vec<CourseOrg>,
}

fn list_organizations(
    connection: &mut DbConnection,
    filters: OrgFilters,
    sort: Option<OrgSort>,
    page: i64,
) -> Result<OrgListResponse, LightenError> {
    let total: i64 = apply_org_filters(
        course_orgs::table.select(count_star()).into_boxed(),
        &filters,
    )
    .get_result(connection)?;
    let mut query = apply_org_filters(course_orgs::table.into_boxed(), &filters);
    query = match sort {
        None => query.order(course_orgs::add_time.desc()),
        Some(OrgSort::Students) => query.order(course_orgs::students.desc()),
        Some(OrgSort::Courses) => query.order(course_orgs::course_nums.desc()),
    };
    let page_orgs = query
        .offset(common::page_offset(page, ORGANIZATIONS_PER_PAGE))
        .limit(ORGANIZATIONS_PER_PAGE)
        .load::<CourseOrg>(connection)?;
    let all_cities = cities::table.load::<City>(connection)?;
    let hot_orgs = course_orgs::table
        .order(course_orgs::click_nums.desc())
        .limit(HOT_ORGS_AMOUNT)
        .load::<CourseOrg>(connection)?;
    Ok(OrgListResponse {
        organizations: Paginated::new(page_orgs, total, page, ORGANIZATIONS_PER_PAGE),
        all_cities,
        hot_orgs,
    })
}

#[get("")]
async fn list_handler(
    state: web::Data<AppState>,
    query: web::Query<OrgListQuery>,
) -> Result<impl Responder, LightenError> {
    let query = query.into_inner();
    let sort = match query.sort.as_deref().filter(|sort| !sort.is_empty()) {
        None => None,
        Some(raw) => match OrgSort::parse(raw) {
            Some(sort) => Some(sort),
            None => return Ok(common::fail_response("unknown sort key")),
        },
    };
    let city_id = match query.city.as_deref().filter(|city| !city.is_empty()) {
        None => None,
        Some(raw) => match raw.parse::<i32>() {
            Ok(city_id) => Some(city_id),
            Err(_) => return Ok(common::fail_response("invalid city id")),
        },
    };
    let filters = OrgFilters {
        keywords: query.keywords.filter(|keywords| !keywords.is_empty()),
        city_id,
        category: query.ct.filter(|category| !category.is_empty()),
    };
    let page = common::page_number(query.page);
    let mut connection = state.db_pool.get()?;
    let response =
        web::block(move || list_organizations(&mut connection, filters, sort, page)).await??;
    Ok(HttpResponse::Ok().json(response))
}

fn validate_ask(name: &str, mobile: &str, course_name: &str) -> Option<&'static str> {
    if name.is_empty() || name.len() > MAX_ASK_NAME_BYTES {
        return Some("invalid name");
    }
    lazy_static! {
        static ref MOBILE_REGEX: Regex =
            Regex::new("^1[358]\\d{9}$|^147\\d{8}$|^176\\d{8}$").unwrap();
    }
    if !MOBILE_REGEX.is_match(mobile) {
        return Some("invalid mobile number");
    }
    if course_name.is_empty() || course_name.len() > MAX_ASK_COURSE_NAME_BYTES {
        return Some("invalid course name");
    }
    None
}

#[derive(Deserialize)]
struct AskForm {
    name: String,
    mobile: String,
    course_name: String,
}

fn add_ask(connection: &mut DbConnection, form: AskForm) -> Result<(), LightenError> {
    insert_into(user_asks::table)
        .values((
            user_asks::name.eq(&form.name),
            user_asks::mobile.eq(&form.mobile),
            user_asks::course_name.eq(&form.course_name),
            user_asks::add_time.eq(common::get_current_timestamp()),
        ))
        .execute(connection)?;
    Ok(())
}

#[post("/ask")]
async fn add_ask_handler(
    state: web::Data<AppState>,
    form: web::Form<AskForm>,
) -> Result<impl Responder, LightenError> {
    let form = form.into_inner();
    if let Some(msg) = validate_ask(&form.name, &form.mobile, &form.course_name) {
        return Ok(common::fail_response(msg));
    }
    let mut connection = state.db_pool.get()?;
    web::block(move || add_ask(&mut connection, form)).await??;
    Ok(common::simple_success_response())
}

#[derive(Deserialize)]
struct OrgDetailQuery {
    token: Option<String>,
    page: Option<i64>,
}

fn org_with_fav(
    connection: &mut DbConnection,
    org_id: i32,
    token: Option<&str>,
) -> Result<(CourseOrg, bool), LightenError> {
    let org: CourseOrg = course_orgs::table.find(org_id).first(connection)?;
    let has_fav = match auth::resolve_viewer(connection, token)? {
        Some(user_id) => has_favorite(connection, user_id, org.id, FavTarget::Organization)?,
        None => false,
    };
    Ok((org, has_fav))
}

#[derive(Serialize)]
struct OrgHomeResponse {
    course_org: CourseOrg,
    all_courses: Vec<Course>,
    all_teachers: Vec<Teacher>,
    has_fav: bool,
}

fn get_org_home(
    connection: &mut DbConnection,
    org_id: i32,
    token: Option<String>,
) -> Result<OrgHomeResponse, LightenError> {
    let (org, has_fav) = org_with_fav(connection, org_id, token.as_deref())?;
    let all_courses = courses::table
        .filter(courses::org_id.eq(org.id))
        .order(courses::students.desc())
        .limit(HOME_COURSES_AMOUNT)
        .load::<Course>(connection)?;
    let all_teachers = teachers::table
        .filter(teachers::org_id.eq(org.id))
        .limit(HOME_TEACHERS_AMOUNT)
        .load::<Teacher>(connection)?;
    Ok(OrgHomeResponse {
        course_org: org,
        all_courses,
        all_teachers,
        has_fav,
    })
}

#[get("/{id}/home")]
async fn home_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<OrgDetailQuery>,
) -> Result<impl Responder, LightenError> {
    let org_id = path.into_inner();
    let token = query.into_inner().token;
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || get_org_home(&mut connection, org_id, token)).await??;
    Ok(web::Json(response))
}

#[derive(Serialize)]
struct OrgCoursesResponse {
    course_org: CourseOrg,
    courses: Paginated<Course>,
    has_fav: bool,
}

fn get_org_courses(
    connection: &mut DbConnection,
    org_id: i32,
    token: Option<String>,
    page: i64,
) -> Result<OrgCoursesResponse, LightenError> {
    let (org, has_fav) = org_with_fav(connection, org_id, token.as_deref())?;
    let total: i64 = courses::table
        .filter(courses::org_id.eq(org.id))
        .count()
        .get_result(connection)?;
    let page_courses = courses::table
        .filter(courses::org_id.eq(org.id))
        .order(courses::add_time.desc())
        .offset(common::page_offset(page, ORG_COURSES_PER_PAGE))
        .limit(ORG_COURSES_PER_PAGE)
        .load::<Course>(connection)?;
    Ok(OrgCoursesResponse {
        course_org: org,
        courses: Paginated::new(page_courses, total, page, ORG_COURSES_PER_PAGE),
        has_fav,
    })
}

#[get("/{id}/courses")]
async fn courses_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<OrgDetailQuery>,
) -> Result<impl Responder, LightenError> {
    let org_id = path.into_inner();
    let query = query.into_inner();
    let page = common::page_number(query.page);
    let mut connection = state.db_pool.get()?;
    let response =
        web::block(move || get_org_courses(&mut connection, org_id, query.token, page)).await??;
    Ok(web::Json(response))
}

#[derive(Serialize)]
struct OrgDescResponse {
    course_org: CourseOrg,
    has_fav: bool,
}

#[get("/{id}/desc")]
async fn desc_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<OrgDetailQuery>,
) -> Result<impl Responder, LightenError> {
    let org_id = path.into_inner();
    let token = query.into_inner().token;
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || {
        let (org, has_fav) = org_with_fav(&mut connection, org_id, token.as_deref())?;
        Ok::<_, LightenError>(OrgDescResponse {
            course_org: org,
            has_fav,
        })
    })
    .await??;
    Ok(web::Json(response))
}

#[derive(Serialize)]
struct OrgTeachersResponse {
    course_org: CourseOrg,
    all_teachers: Vec<Teacher>,
    has_fav: bool,
}

fn get_org_teachers(
    connection: &mut DbConnection,
    org_id: i32,
    token: Option<String>,
) -> Result<OrgTeachersResponse, LightenError> {
    let (org, has_fav) = org_with_fav(connection, org_id, token.as_deref())?;
    let all_teachers = teachers::table
        .filter(teachers::org_id.eq(org.id))
        .load::<Teacher>(connection)?;
    Ok(OrgTeachersResponse {
        course_org: org,
        all_teachers,
        has_fav,
    })
}

#[get("/{id}/teachers")]
async fn teachers_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<OrgDetailQuery>,
) -> Result<impl Responder, LightenError> {
    let org_id = path.into_inner();
    let token = query.into_inner().token;
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || get_org_teachers(&mut connection, org_id, token)).await??;
    Ok(web::Json(response))
}

pub fn get_service() -> impl HttpServiceFactory {
    web::scope("/organizations")
        .service(list_handler)
        .service(add_ask_handler)
        .service(home_handler)
        .service(courses_handler)
        .service(desc_handler)
        .service(teachers_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_parse_closed() {
        assert_eq!(OrgSort::parse("students"), Some(OrgSort::Students));
        assert_eq!(OrgSort::parse("courses"), Some(OrgSort::Courses));
        assert_eq!(OrgSort::parse("hot"), None);
        assert_eq!(OrgSort::parse("name"), None);
    }

    #[test]
    fn test_ask_validation() {
        assert_eq!(validate_ask("Zhang San", "13812345678", "Python"), None);
        assert!(validate_ask("", "13812345678", "Python").is_some());
        assert!(validate_ask("Zhang San", "12345", "Python").is_some());
        assert!(validate_ask("Zhang San", "13812345678", "").is_some());
    }

    #[test]
    fn test_mobile_prefixes() {
        assert_eq!(validate_ask("a", "14712345678", "b"), None);
        assert_eq!(validate_ask("a", "17612345678", "b"), None);
        assert!(validate_ask("a", "19912345678", "b").is_some());
    }
}
