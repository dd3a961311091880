use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse, Responder};
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::api::common::Paginated;
use crate::api::favorites::{has_favorite, FavTarget};
use crate::api::{auth, common};
use crate::error::LightenError;
use crate::models::{Course, Teacher};
use crate::schema::{course_orgs, courses, teachers};
use crate::{AppState, DbConnection};

const TEACHERS_PER_PAGE: i64 = 10;
const HOT_TEACHERS_AMOUNT: i64 = 5;
const TYPICAL_COURSES_AMOUNT: i64 = 2;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum TeacherSort {
    Hot,
}

impl TeacherSort {
    fn parse(value: &str) -> Option<TeacherSort> {
        match value {
            "hot" => Some(TeacherSort::Hot),
            _ => None,
        }
    }
}

/// Keyword search over the teacher's own columns plus the owning
/// organization's name, the latter through an id subquery.
fn apply_teacher_filters<'a, ST>(
    mut query: teachers::BoxedQuery<'a, Pg, ST>,
    keywords: &Option<String>,
) -> teachers::BoxedQuery<'a, Pg, ST> {
    if let Some(keywords) = keywords {
        let pattern = format!("%{}%", keywords);
        let org_ids = course_orgs::table
            .filter(course_orgs::name.ilike(pattern.clone()))
            .select(course_orgs::id);
        query = query.filter(
            teachers::name
                .ilike(pattern.clone())
                .or(teachers::academic_degree.ilike(pattern.clone()))
                .or(teachers::work_company.ilike(pattern.clone()))
                .or(teachers::work_position.ilike(pattern))
                .or(teachers::org_id.eq_any(org_ids)),
        );
    }
    query
}

fn hot_teachers(connection: &mut DbConnection) -> Result<Vec<Teacher>, diesel::result::Error> {
    teachers::table
        .order(teachers::fav_nums.desc())
        .limit(HOT_TEACHERS_AMOUNT)
        .load::<Teacher>(connection)
}

#[derive(Deserialize)]
struct TeacherListQuery {
    page: Option<i64>,
    sort: Option<String>,
    keywords: Option<String>,
}

#[derive(Serialize)]
struct TeacherListResponse {
    teachers: Paginated<Teacher>,
    hot_teachers: Vec<Teacher>,
}

fn list_teachers(
    connection: &mut DbConnection,
    keywords: Option<String>,
    sort: Option<TeacherSort>,
    page: i64,
) -> Result<TeacherListResponse, LightenError> {
    let total: i64 = apply_teacher_filters(
        teachers::table.select(count_star()).into_boxed(),
        &keywords,
    )
    .get_result(connection)?;
    let mut query = apply_teacher_filters(teachers::table.into_boxed(), &keywords);
    query = match sort {
        None => query.order(teachers::add_time.desc()),
        Some(TeacherSort::Hot) => query.order(teachers::click_nums.desc()),
    };
    let page_teachers = query
        .offset(common::page_offset(page, TEACHERS_PER_PAGE))
        .limit(TEACHERS_PER_PAGE)
        .load::<Teacher>(connection)?;
    Ok(TeacherListResponse {
        teachers: Paginated::new(page_teachers, total, page, TEACHERS_PER_PAGE),
        hot_teachers: hot_teachers(connection)?,
    })
}

#[get("")]
async fn list_handler(
    state: web::Data<AppState>,
    query: web::Query<TeacherListQuery>,
) -> Result<impl Responder, LightenError> {
    let query = query.into_inner();
    let sort = match query.sort.as_deref().filter(|sort| !sort.is_empty()) {
        None => None,
        Some(raw) => match TeacherSort::parse(raw) {
            Some(sort) => Some(sort),
            None => return Ok(common::fail_response("unknown sort key")),
        },
    };
    let keywords = query.keywords.filter(|keywords| !keywords.is_empty());
    let page = common::page_number(query.page);
    let mut connection = state.db_pool.get()?;
    let response =
        web::block(move || list_teachers(&mut connection, keywords, sort, page)).await??;
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Deserialize)]
struct ViewerQuery {
    token: Option<String>,
}

#[derive(Serialize)]
struct TeacherDetailResponse {
    teacher: Teacher,
    teacher_has_fav: bool,
    org_has_fav: bool,
    hot_teachers: Vec<Teacher>,
    teacher_courses: Vec<Course>,
    typical_courses: Vec<Course>,
}

fn get_teacher_detail(
    connection: &mut DbConnection,
    teacher_id: i32,
    token: Option<String>,
) -> Result<TeacherDetailResponse, LightenError> {
    let teacher: Teacher = teachers::table.find(teacher_id).first(connection)?;
    let viewer = auth::resolve_viewer(connection, token.as_deref())?;
    let (teacher_has_fav, org_has_fav) = match viewer {
        Some(user_id) => (
            has_favorite(connection, user_id, teacher.id, FavTarget::Teacher)?,
            has_favorite(connection, user_id, teacher.org_id, FavTarget::Organization)?,
        ),
        None => (false, false),
    };
    let teacher_courses = courses::table
        .filter(courses::teacher_id.eq(teacher.id))
        .order(courses::students.desc())
        .load::<Course>(connection)?;
    let typical_courses = courses::table
        .filter(courses::teacher_id.eq(teacher.id))
        .order(courses::students.desc())
        .limit(TYPICAL_COURSES_AMOUNT)
        .load::<Course>(connection)?;
    Ok(TeacherDetailResponse {
        teacher_has_fav,
        org_has_fav,
        hot_teachers: hot_teachers(connection)?,
        teacher_courses,
        typical_courses,
        teacher,
    })
}

#[get("/{id}")]
async fn detail_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<ViewerQuery>,
) -> Result<impl Responder, LightenError> {
    let teacher_id = path.into_inner();
    let token = query.into_inner().token;
    let mut connection = state.db_pool.get()?;
    let response =
        web::block(move || get_teacher_detail(&mut connection, teacher_id, token)).await??;
    Ok(web::Json(response))
}

pub fn get_service() -> impl HttpServiceFactory {
    web::scope("/teachers")
        .service(list_handler)
        .service(detail_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_parse_closed() {
        assert_eq!(TeacherSort::parse("hot"), Some(TeacherSort::Hot));
        assert_eq!(TeacherSort::parse("students"), None);
        assert_eq!(TeacherSort::parse(""), None);
    }
}
