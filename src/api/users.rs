use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, HttpResponse, Responder};
use diesel::insert_into;
use diesel::prelude::*;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{auth, common};
use crate::error::LightenError;
use crate::mail::Mailer;
use crate::schema::users;
use crate::utils::email::{issue_verification_email, SendType};
use crate::{AppState, DbConnection};

const MAX_USER_NAME_BYTES: usize = 64;
const MIN_USER_NAME_BYTES: usize = 3;
const MAX_EMAIL_BYTES: usize = 128;

fn validate_user_name(user_name: &str) -> Option<&'static str> {
    if user_name.len() > MAX_USER_NAME_BYTES {
        return Some("user name too long");
    }
    if user_name.len() < MIN_USER_NAME_BYTES {
        return Some("user name too short");
    }
    None
}

fn validate_email(email: &str) -> Option<&'static str> {
    if email.len() > MAX_EMAIL_BYTES {
        return Some("email too long");
    }
    lazy_static! {
        static ref EMAIL_REGEX: Regex =
            Regex::new("^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+.[a-zA-Z0-9-.]+$").unwrap();
    }
    if !EMAIL_REGEX.is_match(email) {
        return Some("invalid email");
    }
    None
}

#[derive(Deserialize)]
struct RegisterForm {
    user_name: String,
    email: String,
}

enum RegisterOutcome {
    Created { token: String },
    DuplicatedName,
    DuplicatedEmail,
}

fn register(
    connection: &mut DbConnection,
    mailer: Arc<dyn Mailer>,
    site_url: String,
    code_length: usize,
    user_name: String,
    email: String,
    token: String,
) -> Result<RegisterOutcome, LightenError> {
    if diesel::select(diesel::dsl::exists(
        users::table.filter(users::user_name.eq(&user_name)),
    ))
    .get_result(connection)?
    {
        return Ok(RegisterOutcome::DuplicatedName);
    }
    if diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(&email)),
    ))
    .get_result(connection)?
    {
        return Ok(RegisterOutcome::DuplicatedEmail);
    }
    insert_into(users::table)
        .values((
            users::user_name.eq(&user_name),
            users::email.eq(&email),
            users::token.eq(&token),
            users::add_time.eq(common::get_current_timestamp()),
        ))
        .execute(connection)?;
    issue_verification_email(
        connection,
        mailer,
        &site_url,
        code_length,
        &email,
        SendType::Register,
    )?;
    Ok(RegisterOutcome::Created { token })
}

#[derive(Serialize)]
struct RegisterResponse {
    status: &'static str,
    msg: &'static str,
    token: String,
}

#[post("/register")]
async fn register_handler(
    state: web::Data<AppState>,
    form: web::Form<RegisterForm>,
) -> Result<impl Responder, LightenError> {
    let form = form.into_inner();
    if let Some(msg) = validate_user_name(&form.user_name) {
        return Ok(common::fail_response(msg));
    }
    if let Some(msg) = validate_email(&form.email) {
        return Ok(common::fail_response(msg));
    }
    let token: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(auth::TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let mailer = state.mailer.clone();
    let site_url = state.config.site_url.clone();
    let code_length = state.config.verify_code_length;
    let mut connection = state.db_pool.get()?;
    let outcome = web::block(move || {
        register(
            &mut connection,
            mailer,
            site_url,
            code_length,
            form.user_name,
            form.email,
            token,
        )
    })
    .await??;
    Ok(match outcome {
        RegisterOutcome::Created { token } => HttpResponse::Ok().json(RegisterResponse {
            status: "success",
            msg: "verification email sent",
            token,
        }),
        RegisterOutcome::DuplicatedName => common::fail_response("user name already taken"),
        RegisterOutcome::DuplicatedEmail => common::fail_response("email already registered"),
    })
}

#[derive(Deserialize)]
struct ForgetForm {
    email: String,
}

fn forget_password(
    connection: &mut DbConnection,
    mailer: Arc<dyn Mailer>,
    site_url: String,
    code_length: usize,
    email: String,
) -> Result<bool, LightenError> {
    if !diesel::select(diesel::dsl::exists(
        users::table.filter(users::email.eq(&email)),
    ))
    .get_result::<bool>(connection)?
    {
        return Ok(false);
    }
    issue_verification_email(
        connection,
        mailer,
        &site_url,
        code_length,
        &email,
        SendType::Forget,
    )?;
    Ok(true)
}

#[post("/forget")]
async fn forget_handler(
    state: web::Data<AppState>,
    form: web::Form<ForgetForm>,
) -> Result<impl Responder, LightenError> {
    let form = form.into_inner();
    if let Some(msg) = validate_email(&form.email) {
        return Ok(common::fail_response(msg));
    }
    let mailer = state.mailer.clone();
    let site_url = state.config.site_url.clone();
    let code_length = state.config.verify_code_length;
    let mut connection = state.db_pool.get()?;
    let sent =
        web::block(move || forget_password(&mut connection, mailer, site_url, code_length, form.email))
            .await??;
    Ok(if sent {
        common::success_response("reset email sent")
    } else {
        common::fail_response("email not registered")
    })
}

pub fn get_service() -> impl HttpServiceFactory {
    web::scope("/users")
        .service(register_handler)
        .service(forget_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_bounds() {
        assert_eq!(validate_user_name("jane"), None);
        assert!(validate_user_name("ab").is_some());
        assert!(validate_user_name(&"a".repeat(65)).is_some());
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email("jane@example.com"), None);
        assert!(validate_email("jane").is_some());
        assert!(validate_email("@example.com").is_some());
        let long = format!("{}@example.com", "a".repeat(128));
        assert!(validate_email(&long).is_some());
    }
}
