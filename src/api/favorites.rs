use actix_web::dev::HttpServiceFactory;
use actix_web::{post, web, Responder};
use diesel::prelude::*;
use diesel::{delete, insert_into};
use serde::Deserialize;
use tracing::info;

use crate::api::{auth, common};
use crate::error::LightenError;
use crate::schema::{course_orgs, courses, teachers, user_favorites};
use crate::{AppState, DbConnection};

/// What a favorite row points at. The numeric codes are part of the wire
/// format and of the stored rows.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FavTarget {
    Course,
    Organization,
    Teacher,
}

impl FavTarget {
    pub fn from_code(code: i16) -> Option<FavTarget> {
        match code {
            1 => Some(FavTarget::Course),
            2 => Some(FavTarget::Organization),
            3 => Some(FavTarget::Teacher),
            _ => None,
        }
    }

    pub fn code(self) -> i16 {
        match self {
            FavTarget::Course => 1,
            FavTarget::Organization => 2,
            FavTarget::Teacher => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FavTarget::Course => "course",
            FavTarget::Organization => "organization",
            FavTarget::Teacher => "teacher",
        }
    }
}

pub fn has_favorite(
    connection: &mut DbConnection,
    user_id: i64,
    fav_id: i32,
    target: FavTarget,
) -> Result<bool, diesel::result::Error> {
    diesel::select(diesel::dsl::exists(
        user_favorites::table
            .filter(user_favorites::user_id.eq(user_id))
            .filter(user_favorites::fav_id.eq(fav_id))
            .filter(user_favorites::fav_type.eq(target.code())),
    ))
    .get_result(connection)
}

fn entity_name(
    connection: &mut DbConnection,
    fav_id: i32,
    target: FavTarget,
) -> Result<Option<String>, diesel::result::Error> {
    match target {
        FavTarget::Course => courses::table
            .find(fav_id)
            .select(courses::name)
            .first(connection)
            .optional(),
        FavTarget::Organization => course_orgs::table
            .find(fav_id)
            .select(course_orgs::name)
            .first(connection)
            .optional(),
        FavTarget::Teacher => teachers::table
            .find(fav_id)
            .select(teachers::name)
            .first(connection)
            .optional(),
    }
}

enum ToggleOutcome {
    NotLoggedIn,
    InvalidTarget,
    TargetMissing,
    Added,
    Removed,
}

// Check-then-act on purpose: the original never guarded this with a unique
// constraint or a transaction, so two concurrent identical requests can
// both insert. Kept as documented behavior.
fn toggle(
    connection: &mut DbConnection,
    token: &str,
    fav_id: i32,
    fav_type: i16,
) -> Result<ToggleOutcome, LightenError> {
    let user_id = match auth::get_user_id(connection, token)? {
        Some(user_id) => user_id,
        None => return Ok(ToggleOutcome::NotLoggedIn),
    };
    let target = match FavTarget::from_code(fav_type) {
        Some(target) if fav_id > 0 => target,
        _ => return Ok(ToggleOutcome::InvalidTarget),
    };
    let name = match entity_name(connection, fav_id, target)? {
        Some(name) => name,
        None => return Ok(ToggleOutcome::TargetMissing),
    };
    if has_favorite(connection, user_id, fav_id, target)? {
        delete(
            user_favorites::table
                .filter(user_favorites::user_id.eq(user_id))
                .filter(user_favorites::fav_id.eq(fav_id))
                .filter(user_favorites::fav_type.eq(target.code())),
        )
        .execute(connection)?;
        info!(user_id, kind = target.label(), name = %name, "favorite removed");
        Ok(ToggleOutcome::Removed)
    } else {
        insert_into(user_favorites::table)
            .values((
                user_favorites::user_id.eq(user_id),
                user_favorites::fav_id.eq(fav_id),
                user_favorites::fav_type.eq(target.code()),
                user_favorites::add_time.eq(common::get_current_timestamp()),
            ))
            .execute(connection)?;
        info!(user_id, kind = target.label(), name = %name, "favorite added");
        Ok(ToggleOutcome::Added)
    }
}

#[derive(Deserialize)]
struct FavPayload {
    token: String,
    fav_id: i32,
    fav_type: i16,
}

#[post("/add")]
async fn add_fav_handler(
    state: web::Data<AppState>,
    payload: web::Form<FavPayload>,
) -> Result<impl Responder, LightenError> {
    let payload = payload.into_inner();
    let mut connection = state.db_pool.get()?;
    let outcome = web::block(move || {
        toggle(
            &mut connection,
            &payload.token,
            payload.fav_id,
            payload.fav_type,
        )
    })
    .await??;
    Ok(match outcome {
        ToggleOutcome::NotLoggedIn => common::fail_response("user not logged in"),
        ToggleOutcome::InvalidTarget => common::fail_response("unknown favorite target"),
        ToggleOutcome::TargetMissing => common::fail_response("favorite target not found"),
        ToggleOutcome::Added => common::success_response("favorited"),
        ToggleOutcome::Removed => common::success_response("favorite canceled"),
    })
}

pub fn get_service() -> impl HttpServiceFactory {
    web::scope("/favorites").service(add_fav_handler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_codes_round_trip() {
        for target in [FavTarget::Course, FavTarget::Organization, FavTarget::Teacher] {
            assert_eq!(FavTarget::from_code(target.code()), Some(target));
        }
    }

    #[test]
    fn test_unknown_codes_fail_closed() {
        assert_eq!(FavTarget::from_code(0), None);
        assert_eq!(FavTarget::from_code(4), None);
        assert_eq!(FavTarget::from_code(-1), None);
    }

    #[test]
    fn test_labels_name_the_entity_kind() {
        assert_eq!(FavTarget::Course.label(), "course");
        assert_eq!(FavTarget::Organization.label(), "organization");
        assert_eq!(FavTarget::Teacher.label(), "teacher");
    }
}
