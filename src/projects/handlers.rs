use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::PublicUser,
        session::{CurrentUser, Flash, RequireUser, SessionToken},
    },
    error::AppError,
    projects::dto::{AboutPage, IndexPage, ListQuery, ProjectForm},
    projects::repo::{Project, ProjectFilter},
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/add_project", get(add_project_page).post(add_project))
        .route(
            "/admin/edit_project/:id",
            get(edit_project_page).post(edit_project),
        )
        .route("/admin/delete_project/:id", post(delete_project))
}

#[derive(Debug, Serialize)]
struct FormPage {
    title: String,
    flash: Vec<Flash>,
}

/// Listing page; anonymous-accessible, an empty result is still a page.
#[instrument(skip(state, user))]
async fn index(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<IndexPage>, AppError> {
    let filter = ProjectFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        category: query.category.filter(|c| !c.trim().is_empty()),
    };
    let projects = Project::list(&state.db, &filter).await?;
    let flash = token
        .map(|t| state.sessions.take_flash(t))
        .unwrap_or_default();
    Ok(Json(IndexPage {
        title: "Home",
        projects,
        user: user.as_ref().map(PublicUser::from),
        flash,
    }))
}

#[instrument]
async fn about() -> Json<AboutPage> {
    Json(AboutPage { title: "About Me" })
}

#[instrument(skip(state))]
async fn add_project_page(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    SessionToken(token): SessionToken,
) -> Json<FormPage> {
    let flash = token
        .map(|t| state.sessions.take_flash(t))
        .unwrap_or_default();
    Json(FormPage {
        title: "Add Project".into(),
        flash,
    })
}

#[instrument(skip(state, user, form))]
async fn add_project(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    SessionToken(token): SessionToken,
    Form(form): Form<ProjectForm>,
) -> Result<impl IntoResponse, AppError> {
    let valid = form
        .validate(&state.config.limits)
        .map_err(AppError::Validation)?;
    let project = Project::create(&state.db, &valid.into()).await?;

    if let Some(token) = token {
        state.sessions.push_flash(
            token,
            Flash::success(format!("Project '{}' added successfully!", project.title)),
        );
    }
    info!(project_id = project.id, user_id = user.id, "project added");
    Ok(Redirect::to("/"))
}

/// Pre-populates the edit form; 404 when the id is unknown.
#[instrument(skip(state))]
async fn edit_project_page(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Path(id): Path<i64>,
) -> Result<Json<Project>, AppError> {
    let project = Project::get(&state.db, id).await?;
    Ok(Json(project))
}

#[instrument(skip(state, user, form))]
async fn edit_project(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
    Form(form): Form<ProjectForm>,
) -> Result<impl IntoResponse, AppError> {
    let valid = form
        .validate(&state.config.limits)
        .map_err(AppError::Validation)?;
    let project = Project::update(&state.db, id, &valid.into()).await?;

    if let Some(token) = token {
        state.sessions.push_flash(
            token,
            Flash::success(format!(
                "Project '{}' updated successfully!",
                project.title
            )),
        );
    }
    info!(project_id = project.id, user_id = user.id, "project updated");
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, user))]
async fn delete_project(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    SessionToken(token): SessionToken,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = Project::get(&state.db, id).await?;
    Project::delete(&state.db, id).await?;

    if let Some(token) = token {
        state.sessions.push_flash(
            token,
            Flash::success(format!("Project {} has been deleted!", project.title)),
        );
    }
    info!(project_id = id, user_id = user.id, "project deleted");
    Ok(Redirect::to("/"))
}
