use crate::models::{
    Activity, AdminStats, Attraction, AuditLog, City, CreateAttractionRequest, CreateCityRequest,
    CreateExpenseRequest, CreateRoleRequest, CreateTripRequest, Expense, NewAuditEntry, Role,
    StopInput, Trip, TripStop, UpdateCityRequest, UpdatePreferencesRequest, UpdateTripRequest,
    User, UserPreferences,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// RepositoryError
///
/// Persistence failures. Constraint violations the client can fix are split out
/// so handlers can answer 400 instead of 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("referenced {0} does not exist")]
    MissingReference(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Classifies a sqlx error raised while writing `what`.
    fn on_write(err: sqlx::Error, what: &'static str) -> Self {
        let violation = err
            .as_database_error()
            .map(|db| (db.is_unique_violation(), db.is_foreign_key_violation()));
        match violation {
            Some((true, _)) => RepositoryError::Conflict(what),
            Some((_, true)) => RepositoryError::MissingReference(what),
            _ => RepositoryError::Database(err),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// NewUser
///
/// Insert payload for the local mirror of a freshly signed-up account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role_name: String,
}

/// CityQuery
#[derive(Debug, Clone, Default)]
pub struct CityQuery {
    pub search: Option<String>,
    pub country: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// AuditQuery
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Repository Trait
///
/// Abstract contract for every persistence operation. Handlers only see this
/// trait, so tests can swap in an in-memory implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & roles ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_saved_destinations(&self, user_id: Uuid) -> RepoResult<Vec<Uuid>>;
    async fn set_saved_destinations(&self, user_id: Uuid, city_ids: &[Uuid]) -> RepoResult<()>;
    async fn get_preferences(&self, user_id: Uuid) -> RepoResult<Option<UserPreferences>>;
    // Insert-or-update keyed on user_id, so a user never has two rows.
    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> RepoResult<UserPreferences>;
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>>;
    async fn create_role(&self, req: CreateRoleRequest) -> RepoResult<Role>;
    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<Option<User>>;
    async fn get_stats(&self) -> RepoResult<AdminStats>;

    // --- Cities ---
    async fn list_cities(&self, query: CityQuery) -> RepoResult<Vec<City>>;
    async fn get_city(&self, id: Uuid) -> RepoResult<Option<City>>;
    async fn get_cities_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<City>>;
    async fn create_city(&self, req: CreateCityRequest) -> RepoResult<City>;
    async fn update_city(&self, id: Uuid, req: UpdateCityRequest) -> RepoResult<Option<City>>;
    // Also removes the city from every user's saved destinations.
    async fn delete_city(&self, id: Uuid) -> RepoResult<bool>;
    async fn list_attractions(&self, city_id: Uuid) -> RepoResult<Vec<Attraction>>;
    async fn create_attraction(
        &self,
        city_id: Uuid,
        req: CreateAttractionRequest,
    ) -> RepoResult<Attraction>;

    // --- Trips ---
    async fn list_trips(&self, user_id: Uuid) -> RepoResult<Vec<Trip>>;
    async fn get_trip(&self, id: Uuid) -> RepoResult<Option<Trip>>;
    async fn create_trip(&self, user_id: Uuid, req: CreateTripRequest) -> RepoResult<Trip>;
    // Owner-only: affects nothing unless user_id owns the trip.
    async fn update_trip(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateTripRequest,
    ) -> RepoResult<Option<Trip>>;
    async fn delete_trip(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
    async fn set_trip_public(&self, id: Uuid, is_public: bool) -> RepoResult<Option<Trip>>;
    async fn get_trip_stops(&self, trip_id: Uuid) -> RepoResult<Vec<TripStop>>;
    async fn get_trip_activities(&self, trip_id: Uuid) -> RepoResult<Vec<Activity>>;
    // Deletes every stop (and, by cascade, activity) of the trip and recreates
    // them from `stops`, atomically.
    async fn replace_trip_stops(&self, trip_id: Uuid, stops: Vec<StopInput>) -> RepoResult<()>;

    // --- Expenses ---
    async fn list_expenses(&self, trip_id: Uuid) -> RepoResult<Vec<Expense>>;
    async fn create_expense(&self, trip_id: Uuid, req: CreateExpenseRequest)
    -> RepoResult<Expense>;
    async fn delete_expense(&self, trip_id: Uuid, expense_id: Uuid) -> RepoResult<bool>;

    // --- Audit log ---
    async fn record_audit(&self, entry: NewAuditEntry) -> RepoResult<()>;
    async fn list_audit_logs(&self, query: AuditQuery) -> RepoResult<Vec<AuditLog>>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.role_id, r.name AS role_name,
           u.is_admin, u.saved_destinations, u.created_at
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

const CITY_COLUMNS: &str = "id, name, country, region, description, image_url, cost_index, \
     popularity, latitude, longitude, created_at";

const TRIP_COLUMNS: &str = "id, user_id, name, description, start_date, end_date, cover_image, \
     budget, is_public, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE lower(u.email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts the local mirror, resolving the role by name in the same statement.
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            WITH inserted AS (
                INSERT INTO users (id, email, name, role_id, is_admin, saved_destinations, created_at)
                VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = $4), false, '{}', NOW())
                RETURNING id, email, name, role_id, is_admin, saved_destinations, created_at
            )
            SELECT i.id, i.email, i.name, i.role_id, r.name AS role_name,
                   i.is_admin, i.saved_destinations, i.created_at
            FROM inserted i
            LEFT JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.role_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "User"))?;
        Ok(created)
    }

    async fn get_saved_destinations(&self, user_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let ids: Option<Vec<Uuid>> =
            sqlx::query_scalar("SELECT saved_destinations FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(ids.unwrap_or_default())
    }

    async fn set_saved_destinations(&self, user_id: Uuid, city_ids: &[Uuid]) -> RepoResult<()> {
        sqlx::query("UPDATE users SET saved_destinations = $2 WHERE id = $1")
            .bind(user_id)
            .bind(city_ids.to_vec())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_preferences(&self, user_id: Uuid) -> RepoResult<Option<UserPreferences>> {
        let prefs = sqlx::query_as::<_, UserPreferences>(
            "SELECT id, user_id, currency, language, notifications_enabled, theme, updated_at \
             FROM user_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prefs)
    }

    /// upsert_preferences
    ///
    /// `ON CONFLICT (user_id)` keeps the one-row-per-user rule; `COALESCE` keeps
    /// stored values for fields the request leaves out.
    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> RepoResult<UserPreferences> {
        let prefs = sqlx::query_as::<_, UserPreferences>(
            r#"
            INSERT INTO user_preferences
                (id, user_id, currency, language, notifications_enabled, theme, updated_at)
            VALUES ($1, $2, COALESCE($3, 'USD'), COALESCE($4, 'en'),
                    COALESCE($5, TRUE), COALESCE($6, 'system'), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                currency = COALESCE($3, user_preferences.currency),
                language = COALESCE($4, user_preferences.language),
                notifications_enabled = COALESCE($5, user_preferences.notifications_enabled),
                theme = COALESCE($6, user_preferences.theme),
                updated_at = NOW()
            RETURNING id, user_id, currency, language, notifications_enabled, theme, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.currency)
        .bind(req.language)
        .bind(req.notifications_enabled)
        .bind(req.theme)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "User"))?;
        Ok(prefs)
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn create_role(&self, req: CreateRoleRequest) -> RepoResult<Role> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name, description, created_at) VALUES ($1, $2, $3, NOW()) \
             RETURNING id, name, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "Role"))?;
        Ok(role)
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<Option<User>> {
        let updated = sqlx::query("UPDATE users SET role_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::on_write(e, "Role"))?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(user_id).await
    }

    /// get_stats
    ///
    /// All dashboard counters in one round trip.
    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let stats = sqlx::query_as::<_, AdminStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM trips) AS total_trips,
                (SELECT COUNT(*) FROM cities) AS total_cities,
                (SELECT COUNT(*) FROM trips WHERE is_public) AS public_trips,
                (SELECT COALESCE(SUM(amount), 0)::float8 FROM expenses) AS total_expenses
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// list_cities
    ///
    /// Optional filters are appended with `QueryBuilder` so every value is bound.
    async fn list_cities(&self, query: CityQuery) -> RepoResult<Vec<City>> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {CITY_COLUMNS} FROM cities WHERE 1 = 1"));

        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR country ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR region ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(country) = query.country.filter(|c| !c.trim().is_empty()) {
            builder.push(" AND country ILIKE ");
            builder.push_bind(country.trim().to_string());
        }

        builder.push(" ORDER BY popularity DESC, name ASC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        let cities = builder
            .build_query_as::<City>()
            .fetch_all(&self.pool)
            .await?;
        Ok(cities)
    }

    async fn get_city(&self, id: Uuid) -> RepoResult<Option<City>> {
        let sql = format!("SELECT {CITY_COLUMNS} FROM cities WHERE id = $1");
        let city = sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(city)
    }

    async fn get_cities_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<City>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!("SELECT {CITY_COLUMNS} FROM cities WHERE id = ANY($1)");
        let cities = sqlx::query_as::<_, City>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(cities)
    }

    async fn create_city(&self, req: CreateCityRequest) -> RepoResult<City> {
        let sql = format!(
            "INSERT INTO cities (id, name, country, region, description, image_url, cost_index, \
             popularity, latitude, longitude, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) RETURNING {CITY_COLUMNS}"
        );
        let city = sqlx::query_as::<_, City>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.name.trim())
            .bind(req.country.trim())
            .bind(req.region)
            .bind(req.description)
            .bind(req.image_url)
            .bind(req.cost_index)
            .bind(req.popularity.unwrap_or(0))
            .bind(req.latitude)
            .bind(req.longitude)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::on_write(e, "City"))?;
        Ok(city)
    }

    /// update_city
    ///
    /// Partial update via `COALESCE`: only fields present in `req` change.
    async fn update_city(&self, id: Uuid, req: UpdateCityRequest) -> RepoResult<Option<City>> {
        let sql = format!(
            r#"
            UPDATE cities
            SET name = COALESCE($2, name),
                country = COALESCE($3, country),
                region = COALESCE($4, region),
                description = COALESCE($5, description),
                image_url = COALESCE($6, image_url),
                cost_index = COALESCE($7, cost_index),
                popularity = COALESCE($8, popularity)
            WHERE id = $1
            RETURNING {CITY_COLUMNS}
            "#
        );
        let city = sqlx::query_as::<_, City>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.country)
            .bind(req.region)
            .bind(req.description)
            .bind(req.image_url)
            .bind(req.cost_index)
            .bind(req.popularity)
            .fetch_optional(&self.pool)
            .await?;
        Ok(city)
    }

    /// delete_city
    ///
    /// Stops and attractions go by cascade; saved-destination lists hold plain
    /// ids, so the city is pulled out of them in the same transaction.
    async fn delete_city(&self, id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE users SET saved_destinations = array_remove(saved_destinations, $1) \
             WHERE $1 = ANY(saved_destinations)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let res = sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_attractions(&self, city_id: Uuid) -> RepoResult<Vec<Attraction>> {
        let attractions = sqlx::query_as::<_, Attraction>(
            "SELECT id, city_id, name, description, category, estimated_cost, duration_minutes \
             FROM attractions WHERE city_id = $1 ORDER BY name ASC",
        )
        .bind(city_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attractions)
    }

    async fn create_attraction(
        &self,
        city_id: Uuid,
        req: CreateAttractionRequest,
    ) -> RepoResult<Attraction> {
        let attraction = sqlx::query_as::<_, Attraction>(
            "INSERT INTO attractions \
             (id, city_id, name, description, category, estimated_cost, duration_minutes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, city_id, name, description, category, estimated_cost, duration_minutes",
        )
        .bind(Uuid::new_v4())
        .bind(city_id)
        .bind(req.name.trim())
        .bind(req.description)
        .bind(req.category.trim())
        .bind(req.estimated_cost)
        .bind(req.duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "City"))?;
        Ok(attraction)
    }

    async fn list_trips(&self, user_id: Uuid) -> RepoResult<Vec<Trip>> {
        let sql =
            format!("SELECT {TRIP_COLUMNS} FROM trips WHERE user_id = $1 ORDER BY created_at DESC");
        let trips = sqlx::query_as::<_, Trip>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(trips)
    }

    async fn get_trip(&self, id: Uuid) -> RepoResult<Option<Trip>> {
        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1");
        let trip = sqlx::query_as::<_, Trip>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    /// create_trip
    ///
    /// New trips start private; sharing is an explicit action.
    async fn create_trip(&self, user_id: Uuid, req: CreateTripRequest) -> RepoResult<Trip> {
        let sql = format!(
            "INSERT INTO trips (id, user_id, name, description, start_date, end_date, \
             cover_image, budget, is_public, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, NOW(), NOW()) RETURNING {TRIP_COLUMNS}"
        );
        let trip = sqlx::query_as::<_, Trip>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(req.name.trim())
            .bind(req.description)
            .bind(req.start_date)
            .bind(req.end_date)
            .bind(req.cover_image)
            .bind(req.budget)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::on_write(e, "User"))?;
        Ok(trip)
    }

    async fn update_trip(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateTripRequest,
    ) -> RepoResult<Option<Trip>> {
        let sql = format!(
            r#"
            UPDATE trips
            SET name = COALESCE($3, name),
                description = COALESCE($4, description),
                start_date = COALESCE($5, start_date),
                end_date = COALESCE($6, end_date),
                cover_image = COALESCE($7, cover_image),
                budget = COALESCE($8, budget),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TRIP_COLUMNS}
            "#
        );
        let trip = sqlx::query_as::<_, Trip>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(req.name)
            .bind(req.description)
            .bind(req.start_date)
            .bind(req.end_date)
            .bind(req.cover_image)
            .bind(req.budget)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    async fn delete_trip(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM trips WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_trip_public(&self, id: Uuid, is_public: bool) -> RepoResult<Option<Trip>> {
        let sql = format!(
            "UPDATE trips SET is_public = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {TRIP_COLUMNS}"
        );
        let trip = sqlx::query_as::<_, Trip>(&sql)
            .bind(id)
            .bind(is_public)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    async fn get_trip_stops(&self, trip_id: Uuid) -> RepoResult<Vec<TripStop>> {
        let stops = sqlx::query_as::<_, TripStop>(
            r#"
            SELECT s.id, s.trip_id, s.city_id, s.position, s.start_date, s.end_date, s.notes,
                   c.name AS city_name
            FROM trip_stops s
            JOIN cities c ON c.id = s.city_id
            WHERE s.trip_id = $1
            ORDER BY s.position ASC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stops)
    }

    async fn get_trip_activities(&self, trip_id: Uuid) -> RepoResult<Vec<Activity>> {
        let activities = sqlx::query_as::<_, Activity>(
            r#"
            SELECT a.id, a.stop_id, a.attraction_id, a.name, a.cost, a.duration_minutes,
                   a.scheduled_date, a.notes
            FROM activities a
            JOIN trip_stops s ON s.id = a.stop_id
            WHERE s.trip_id = $1
            ORDER BY s.position ASC, a.scheduled_date ASC NULLS LAST, a.name ASC
            "#,
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }

    /// replace_trip_stops
    ///
    /// Delete-then-recreate inside one transaction. Activities go with their stops
    /// through `ON DELETE CASCADE`, so each save replaces them wholesale.
    async fn replace_trip_stops(&self, trip_id: Uuid, stops: Vec<StopInput>) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM trip_stops WHERE trip_id = $1")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;

        for (position, stop) in stops.into_iter().enumerate() {
            let stop_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO trip_stops (id, trip_id, city_id, position, start_date, end_date, notes) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(stop_id)
            .bind(trip_id)
            .bind(stop.city_id)
            .bind(position as i32)
            .bind(stop.start_date)
            .bind(stop.end_date)
            .bind(stop.notes)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::on_write(e, "City"))?;

            for activity in stop.activities {
                sqlx::query(
                    "INSERT INTO activities (id, stop_id, attraction_id, name, cost, \
                     duration_minutes, scheduled_date, notes) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                )
                .bind(Uuid::new_v4())
                .bind(stop_id)
                .bind(activity.attraction_id)
                .bind(activity.name.trim())
                .bind(activity.cost)
                .bind(activity.duration_minutes)
                .bind(activity.scheduled_date)
                .bind(activity.notes)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::on_write(e, "Attraction"))?;
            }
        }

        sqlx::query("UPDATE trips SET updated_at = NOW() WHERE id = $1")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_expenses(&self, trip_id: Uuid) -> RepoResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT id, trip_id, category, amount, currency, description, incurred_on, created_at \
             FROM expenses WHERE trip_id = $1 ORDER BY incurred_on ASC, created_at ASC",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }

    async fn create_expense(
        &self,
        trip_id: Uuid,
        req: CreateExpenseRequest,
    ) -> RepoResult<Expense> {
        let expense = sqlx::query_as::<_, Expense>(
            "INSERT INTO expenses \
             (id, trip_id, category, amount, currency, description, incurred_on, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW()) \
             RETURNING id, trip_id, category, amount, currency, description, incurred_on, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(trip_id)
        .bind(req.category.trim().to_lowercase())
        .bind(req.amount)
        .bind(req.currency.to_uppercase())
        .bind(req.description)
        .bind(req.incurred_on)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_write(e, "Trip"))?;
        Ok(expense)
    }

    async fn delete_expense(&self, trip_id: Uuid, expense_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM expenses WHERE id = $1 AND trip_id = $2")
            .bind(expense_id)
            .bind(trip_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn record_audit(&self, entry: NewAuditEntry) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit_logs(&self, query: AuditQuery) -> RepoResult<Vec<AuditLog>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT a.id, a.actor_id, u.email AS actor_email, a.action, a.entity_type,
                   a.entity_id, a.details, a.created_at
            FROM audit_logs a
            LEFT JOIN users u ON u.id = a.actor_id
            WHERE 1 = 1
            "#,
        );

        if let Some(action) = query.action {
            builder.push(" AND a.action = ");
            builder.push_bind(action);
        }
        if let Some(entity_type) = query.entity_type {
            builder.push(" AND a.entity_type = ");
            builder.push_bind(entity_type);
        }

        builder.push(" ORDER BY a.created_at DESC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.offset);

        let logs = builder
            .build_query_as::<AuditLog>()
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }
}
