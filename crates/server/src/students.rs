//! Student API endpoints.

use api_types::student::{StudentLink, StudentNew, StudentView, StudentsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};
use ledger::Student;

fn view(student: Student) -> StudentView {
    StudentView {
        id: student.id,
        parent_id: student.parent_id,
        name: student.name,
        grade: student.grade,
        dietary_notes: student.dietary_notes,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<StudentNew>,
) -> Result<Json<StudentView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins manage students".to_string(),
        ));
    }

    let mut student = Student::new(payload.name, payload.grade, payload.dietary_notes);
    student.parent_id = payload.parent_id;
    state.ledger.add_student(&student).await?;
    Ok(Json(view(student)))
}

/// Admins see every student; parents their own children.
pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<StudentsResponse>, ServerError> {
    let parent_id = if user.is_admin() {
        None
    } else {
        Some(user.username.as_str())
    };
    let students = state.ledger.list_students(parent_id).await?;
    Ok(Json(StudentsResponse {
        students: students.into_iter().map(view).collect(),
    }))
}

/// Move a student to a parent wallet (or unlink with `parent_id: null`).
pub async fn link(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentLink>,
) -> Result<Json<StudentView>, ServerError> {
    if !user.is_admin() {
        return Err(ServerError::Forbidden(
            "only admins manage students".to_string(),
        ));
    }

    let student = state
        .ledger
        .link_student(id, payload.parent_id.as_deref())
        .await?;
    Ok(Json(view(student)))
}
