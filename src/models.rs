use diesel::prelude::*;
use serde::Serialize;

use crate::schema::cities;
use crate::schema::course_comments;
use crate::schema::course_orgs;
use crate::schema::course_resources;
use crate::schema::courses;
use crate::schema::email_verify_records;
use crate::schema::teachers;
use crate::schema::user_asks;
use crate::schema::user_favorites;
use crate::schema::users;

#[derive(Identifiable, Queryable, Serialize)]
#[diesel(table_name = cities)]
pub struct City {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable, Serialize)]
#[diesel(table_name = course_orgs)]
pub struct CourseOrg {
    pub id: i32,
    pub city_id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    pub address: String,
    pub click_nums: i32,
    pub fav_nums: i32,
    pub students: i32,
    pub course_nums: i32,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable, Serialize)]
#[diesel(table_name = courses)]
pub struct Course {
    pub id: i32,
    pub org_id: i32,
    pub teacher_id: Option<i32>,
    pub name: String,
    pub description: String,
    pub detail: String,
    pub degree: String,
    pub learn_times: i32,
    pub tag: String,
    pub students: i32,
    pub fav_nums: i32,
    pub click_nums: i32,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable, Serialize)]
#[diesel(table_name = course_resources)]
pub struct CourseResource {
    pub id: i32,
    pub course_id: i32,
    pub name: String,
    pub download: String,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable, Serialize)]
#[diesel(table_name = teachers)]
pub struct Teacher {
    pub id: i32,
    pub org_id: i32,
    pub name: String,
    pub work_years: i32,
    pub work_company: String,
    pub work_position: String,
    pub academic_degree: String,
    pub click_nums: i32,
    pub fav_nums: i32,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub email: Option<String>,
    pub token: String,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable)]
#[diesel(table_name = user_favorites)]
pub struct UserFavorite {
    pub id: i64,
    pub user_id: i64,
    pub fav_id: i32,
    pub fav_type: i16,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable)]
#[diesel(table_name = course_comments)]
pub struct CourseComment {
    pub id: i64,
    pub course_id: i32,
    pub user_id: i64,
    pub comments: String,
    pub add_time: i64,
}

#[derive(Identifiable, Queryable)]
#[diesel(table_name = email_verify_records)]
pub struct EmailVerifyRecord {
    pub id: i64,
    pub code: String,
    pub email: String,
    pub send_type: String,
    pub send_time: i64,
}

#[derive(Identifiable, Queryable)]
#[diesel(table_name = user_asks)]
pub struct UserAsk {
    pub id: i64,
    pub name: String,
    pub mobile: String,
    pub course_name: String,
    pub add_time: i64,
}
