use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};
use diesel::insert_into;
use diesel::prelude::*;
use percent_encoding::NON_ALPHANUMERIC;
use serde::{Deserialize, Serialize};

use crate::api::favorites::{has_favorite, FavTarget};
use crate::api::{auth, common};
use crate::api::common::Paginated;
use crate::dark_colors::DARK_COLORS;
use crate::error::LightenError;
use crate::models::{Course, CourseComment, CourseResource, User};
use crate::schema::{course_comments, course_resources, courses, users};
use crate::{AppState, DbConnection};

const COURSES_PER_PAGE: i64 = 6;
const HOT_COURSES_AMOUNT: i64 = 3;
const RELATED_COURSES_AMOUNT: i64 = 1;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum CourseSort {
    Students,
    Hot,
}

impl CourseSort {
    fn parse(value: &str) -> Option<CourseSort> {
        match value {
            "students" => Some(CourseSort::Students),
            "hot" => Some(CourseSort::Hot),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct CourseListQuery {
    page: Option<i64>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct CourseListResponse {
    courses: Paginated<Course>,
    hot_courses: Vec<Course>,
}

fn list_courses(
    connection: &mut DbConnection,
    sort: Option<CourseSort>,
    page: i64,
) -> Result<CourseListResponse, LightenError> {
    let total: i64 = courses::table.count().get_result(connection)?;
    let mut query = courses::table.into_boxed();
    query = match sort {
        // Newest first unless the caller picked a recognized sort key.
        None => query.order(courses::add_time.desc()),
        Some(CourseSort::Students) => query.order(courses::students.desc()),
        Some(CourseSort::Hot) => query.order(courses::click_nums.desc()),
    };
    let page_courses = query
        .offset(common::page_offset(page, COURSES_PER_PAGE))
        .limit(COURSES_PER_PAGE)
        .load::<Course>(connection)?;
    let hot_courses = courses::table
        .order(courses::click_nums.desc())
        .limit(HOT_COURSES_AMOUNT)
        .load::<Course>(connection)?;
    Ok(CourseListResponse {
        courses: Paginated::new(page_courses, total, page, COURSES_PER_PAGE),
        hot_courses,
    })
}

#[get("")]
async fn list_handler(
    state: web::Data<AppState>,
    query: web::Query<CourseListQuery>,
) -> Result<impl Responder, LightenError> {
    let sort = match query.sort.as_deref().filter(|sort| !sort.is_empty()) {
        None => None,
        Some(raw) => match CourseSort::parse(raw) {
            Some(sort) => Some(sort),
            None => return Ok(common::fail_response("unknown sort key")),
        },
    };
    let page = common::page_number(query.page);
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || list_courses(&mut connection, sort, page)).await??;
    Ok(HttpResponse::Ok().json(response))
}

#[derive(Deserialize)]
struct ViewerQuery {
    token: Option<String>,
}

#[derive(Serialize)]
struct CourseDetailResponse {
    course: Course,
    relate_courses: Vec<Course>,
    course_has_fav: bool,
    org_has_fav: bool,
}

fn get_course_detail(
    connection: &mut DbConnection,
    course_id: i32,
    token: Option<String>,
) -> Result<CourseDetailResponse, LightenError> {
    let mut course: Course = courses::table.find(course_id).first(connection)?;
    // View counter is read-modify-write, exactly like the original; two
    // concurrent views can lose one click.
    course.click_nums += 1;
    diesel::update(&course)
        .set(courses::click_nums.eq(course.click_nums))
        .execute(connection)?;
    let viewer = auth::resolve_viewer(connection, token.as_deref())?;
    let (course_has_fav, org_has_fav) = match viewer {
        Some(user_id) => (
            has_favorite(connection, user_id, course.id, FavTarget::Course)?,
            has_favorite(connection, user_id, course.org_id, FavTarget::Organization)?,
        ),
        None => (false, false),
    };
    let relate_courses = if course.tag.is_empty() {
        Vec::new()
    } else {
        courses::table
            .filter(courses::tag.eq(&course.tag))
            .filter(courses::id.ne(course.id))
            .order(courses::click_nums.desc())
            .limit(RELATED_COURSES_AMOUNT)
            .load::<Course>(connection)?
    };
    Ok(CourseDetailResponse {
        course,
        relate_courses,
        course_has_fav,
        org_has_fav,
    })
}

#[get("/{id}")]
async fn detail_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    query: web::Query<ViewerQuery>,
) -> Result<impl Responder, LightenError> {
    let course_id = path.into_inner();
    let token = query.into_inner().token;
    let mut connection = state.db_pool.get()?;
    let response =
        web::block(move || get_course_detail(&mut connection, course_id, token)).await??;
    Ok(web::Json(response))
}

#[derive(Serialize)]
struct CourseVideoResponse {
    course: Course,
    course_resources: Vec<CourseResource>,
}

fn get_course_video(
    connection: &mut DbConnection,
    course_id: i32,
) -> Result<CourseVideoResponse, LightenError> {
    let course: Course = courses::table.find(course_id).first(connection)?;
    let resources = course_resources::table
        .filter(course_resources::course_id.eq(course_id))
        .load::<CourseResource>(connection)?;
    Ok(CourseVideoResponse {
        course,
        course_resources: resources,
    })
}

#[get("/{id}/video")]
async fn video_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<impl Responder, LightenError> {
    let course_id = path.into_inner();
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || get_course_video(&mut connection, course_id)).await??;
    Ok(web::Json(response))
}

#[derive(Serialize)]
struct CommentUserResponse {
    user_name: String,
    avatar_url: String,
}

#[derive(Serialize)]
struct SingleCommentResponse {
    id: i64,
    comments: String,
    add_time: i64,
    user: CommentUserResponse,
}

#[derive(Serialize)]
struct CourseCommentsResponse {
    course: Course,
    course_resources: Vec<CourseResource>,
    course_comments: Vec<SingleCommentResponse>,
}

fn get_user_avatar_url(user: &User) -> String {
    let user_name_encoded =
        percent_encoding::utf8_percent_encode(&user.user_name, NON_ALPHANUMERIC).to_string();
    let color = DARK_COLORS
        [(seahash::hash(user.user_name.as_bytes()) % (DARK_COLORS.len() as u64)) as usize];
    if let Some(email) = &user.email {
        // Due to weird interaction between gravatar and ui-avatars, we have to encode user_name again
        // However, since all special characters except % are gone, we can do a simple replace from % to %25
        let user_name_encoded = user_name_encoded.replace('%', "%25");
        format!("https://www.gravatar.com/avatar/{:x}?d=https%3A%2F%2Fui-avatars.com%2Fapi%2F{}%2F128%2F{}%2Fffffff", md5::compute(email), user_name_encoded, color)
    } else {
        format!(
            "https://ui-avatars.com/api/{}/128/{}/ffffff",
            user_name_encoded, color
        )
    }
}

fn get_course_comments(
    connection: &mut DbConnection,
    course_id: i32,
) -> Result<CourseCommentsResponse, LightenError> {
    let course: Course = courses::table.find(course_id).first(connection)?;
    let resources = course_resources::table
        .filter(course_resources::course_id.eq(course_id))
        .load::<CourseResource>(connection)?;
    let rows: Vec<(CourseComment, User)> = course_comments::table
        .inner_join(users::table)
        .filter(course_comments::course_id.eq(course_id))
        .order(course_comments::id.desc())
        .load(connection)?;
    let comments = rows
        .into_iter()
        .map(|(comment, user)| SingleCommentResponse {
            id: comment.id,
            comments: comment.comments,
            add_time: comment.add_time,
            user: CommentUserResponse {
                avatar_url: get_user_avatar_url(&user),
                user_name: user.user_name,
            },
        })
        .collect();
    Ok(CourseCommentsResponse {
        course,
        course_resources: resources,
        course_comments: comments,
    })
}

#[get("/{id}/comment")]
async fn comment_page_handler(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<impl Responder, LightenError> {
    let course_id = path.into_inner();
    let mut connection = state.db_pool.get()?;
    let response = web::block(move || get_course_comments(&mut connection, course_id)).await??;
    Ok(web::Json(response))
}

fn is_valid_comment(course_id: i32, comment: &str) -> bool {
    course_id > 0 && !comment.is_empty()
}

#[derive(Deserialize)]
struct AddCommentForm {
    token: String,
    course_id: i32,
    comment: String,
}

enum CommentOutcome {
    Added,
    NotLoggedIn,
}

fn add_comment(
    connection: &mut DbConnection,
    token: String,
    course_id: i32,
    comment: String,
) -> Result<CommentOutcome, LightenError> {
    let user_id = match auth::get_user_id(connection, &token)? {
        Some(user_id) => user_id,
        None => return Ok(CommentOutcome::NotLoggedIn),
    };
    // A dangling course id fails loudly, same as the detail pages.
    let course: Course = courses::table.find(course_id).first(connection)?;
    insert_into(course_comments::table)
        .values((
            course_comments::course_id.eq(course.id),
            course_comments::user_id.eq(user_id),
            course_comments::comments.eq(&comment),
            course_comments::add_time.eq(common::get_current_timestamp()),
        ))
        .execute(connection)?;
    Ok(CommentOutcome::Added)
}

#[post("/comment/add")]
async fn add_comment_handler(
    state: web::Data<AppState>,
    form: web::Form<AddCommentForm>,
) -> Result<impl Responder, LightenError> {
    let form = form.into_inner();
    if !is_valid_comment(form.course_id, &form.comment) {
        return Ok(common::fail_response("failed to add comment"));
    }
    let mut connection = state.db_pool.get()?;
    let outcome =
        web::block(move || add_comment(&mut connection, form.token, form.course_id, form.comment))
            .await??;
    Ok(match outcome {
        CommentOutcome::Added => common::success_response("comment added"),
        CommentOutcome::NotLoggedIn => common::fail_response("user not logged in"),
    })
}

pub fn get_service() -> impl HttpServiceFactory {
    web::scope("/courses")
        .service(list_handler)
        .service(add_comment_handler)
        .service(detail_handler)
        .service(video_handler)
        .service(comment_page_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_keys_parse_closed() {
        assert_eq!(CourseSort::parse("students"), Some(CourseSort::Students));
        assert_eq!(CourseSort::parse("hot"), Some(CourseSort::Hot));
        assert_eq!(CourseSort::parse("clicks"), None);
        assert_eq!(CourseSort::parse("HOT"), None);
    }

    #[test]
    fn test_empty_comment_is_rejected_regardless_of_auth() {
        assert!(!is_valid_comment(1, ""));
        assert!(!is_valid_comment(0, "nice course"));
        assert!(!is_valid_comment(-5, "nice course"));
        assert!(is_valid_comment(1, "nice course"));
    }

    #[test]
    fn test_avatar_url_without_email_uses_initials_service() {
        let user = User {
            id: 1,
            user_name: "jane_doe".to_owned(),
            email: None,
            token: "x".repeat(32),
            add_time: 0,
        };
        let url = get_user_avatar_url(&user);
        assert!(url.starts_with("https://ui-avatars.com/api/jane"));
    }

    #[test]
    fn test_avatar_url_with_email_goes_through_gravatar() {
        let user = User {
            id: 1,
            user_name: "jane_doe".to_owned(),
            email: Some("jane@example.com".to_owned()),
            token: "x".repeat(32),
            add_time: 0,
        };
        let url = get_user_avatar_url(&user);
        assert!(url.starts_with("https://www.gravatar.com/avatar/"));
        assert!(url.contains("ui-avatars.com"));
    }
}
