use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use super::owned_trip;
use crate::{
    AppState,
    auth::AuthUser,
    chart::BarChart,
    error::{ApiError, ApiResult},
    models::{Activity, BudgetSummary, CategoryTotal, CreateExpenseRequest, Expense, Trip},
};

/// summarize_budget
///
/// Totals `expenses` per category (sorted by category name) and renders them
/// as a bar chart. Planned activity costs are reported separately and do not
/// count as spent.
pub fn summarize_budget(trip: &Trip, expenses: &[Expense], activities: &[Activity]) -> BudgetSummary {
    let mut per_category: BTreeMap<&str, f64> = BTreeMap::new();
    for expense in expenses {
        *per_category.entry(expense.category.as_str()).or_default() += expense.amount;
    }

    let categories: Vec<CategoryTotal> = per_category
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();

    let total_spent: f64 = categories.iter().map(|c| c.total).sum();
    let planned_activity_cost: f64 = activities.iter().map(|a| a.cost).sum();
    let chart = BarChart::from_values(categories.iter().map(|c| (c.category.clone(), c.total)));

    BudgetSummary {
        trip_id: trip.id,
        budget: trip.budget,
        total_spent,
        planned_activity_cost,
        remaining: trip.budget.map(|budget| budget - total_spent),
        categories,
        chart,
    }
}

/// list_expenses
///
/// [Authenticated Route] Expenses of one of the caller's trips, in date order.
#[utoipa::path(
    get,
    path = "/api/trips/{id}/expenses",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses((status = 200, description = "Expenses", body = [Expense]))
)]
pub async fn list_expenses(
    user: AuthUser,
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Expense>>> {
    owned_trip(&state, &user, trip_id).await?;
    Ok(Json(state.repo.list_expenses(trip_id).await?))
}

/// create_expense
///
/// [Authenticated Route]
#[utoipa::path(
    post,
    path = "/api/trips/{id}/expenses",
    params(("id" = Uuid, Path, description = "Trip ID")),
    request_body = CreateExpenseRequest,
    responses(
        (status = 201, description = "Recorded", body = Expense),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody)
    )
)]
pub async fn create_expense(
    user: AuthUser,
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<CreateExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    payload.validate()?;
    owned_trip(&state, &user, trip_id).await?;

    let expense = state.repo.create_expense(trip_id, payload).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// delete_expense
///
/// [Authenticated Route]
#[utoipa::path(
    delete,
    path = "/api/trips/{id}/expenses/{expense_id}",
    params(
        ("id" = Uuid, Path, description = "Trip ID"),
        ("expense_id" = Uuid, Path, description = "Expense ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_expense(
    user: AuthUser,
    State(state): State<AppState>,
    Path((trip_id, expense_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    owned_trip(&state, &user, trip_id).await?;

    if state.repo.delete_expense(trip_id, expense_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Expense"))
    }
}

/// get_budget
///
/// [Authenticated Route] Spending breakdown against the trip budget.
#[utoipa::path(
    get,
    path = "/api/trips/{id}/budget",
    params(("id" = Uuid, Path, description = "Trip ID")),
    responses((status = 200, description = "Budget summary", body = BudgetSummary))
)]
pub async fn get_budget(
    user: AuthUser,
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> ApiResult<Json<BudgetSummary>> {
    let trip = owned_trip(&state, &user, trip_id).await?;
    let expenses = state.repo.list_expenses(trip_id).await?;
    let activities = state.repo.get_trip_activities(trip_id).await?;

    Ok(Json(summarize_budget(&trip, &expenses, &activities)))
}
