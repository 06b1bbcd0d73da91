use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use globetrotter::{
    AppConfig, AppState, MockAuthProvider, MockStorageService,
    auth::Claims,
    models::{
        Activity, AdminStats, Attraction, AuditLog, City, CreateAttractionRequest,
        CreateCityRequest, CreateExpenseRequest, CreateRoleRequest, CreateTripRequest, Expense,
        NewAuditEntry, Role, StopInput, Trip, TripStop, UpdateCityRequest,
        UpdatePreferencesRequest, UpdateTripRequest, User, UserPreferences,
    },
    repository::{
        AuditQuery, CityQuery, NewUser, RepoResult, Repository, RepositoryError, RepositoryState,
    },
    storage::StorageState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Seeded by the initial migration.
pub const ADMIN_ROLE_ID: Uuid = Uuid::from_u128(1);
pub const USER_ROLE_ID: Uuid = Uuid::from_u128(2);

#[derive(Default)]
pub struct Store {
    pub roles: Vec<Role>,
    pub users: Vec<User>,
    pub preferences: Vec<UserPreferences>,
    pub cities: Vec<City>,
    pub attractions: Vec<Attraction>,
    pub trips: Vec<Trip>,
    pub stops: Vec<TripStop>,
    pub activities: Vec<Activity>,
    pub expenses: Vec<Expense>,
    pub audit: Vec<AuditLog>,
}

impl Store {
    fn role_name(&self, role_id: Option<Uuid>) -> Option<String> {
        role_id.and_then(|id| self.roles.iter().find(|r| r.id == id).map(|r| r.name.clone()))
    }

    fn user_view(&self, user: &User) -> User {
        User {
            role_name: self.role_name(user.role_id),
            ..user.clone()
        }
    }
}

/// InMemoryRepository
///
/// `Repository` backed by vectors behind a mutex. Mirrors the constraint
/// behaviour of the Postgres schema that handlers depend on: unique emails and
/// role names, foreign keys on trip stops, and cascading deletes.
pub struct InMemoryRepository {
    pub store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let now = Utc::now();
        let roles = vec![
            Role {
                id: ADMIN_ROLE_ID,
                name: "admin".into(),
                description: Some("Platform administrator".into()),
                created_at: now,
            },
            Role {
                id: USER_ROLE_ID,
                name: "user".into(),
                description: Some("Traveller".into()),
                created_at: now,
            },
        ];
        Self {
            store: Mutex::new(Store {
                roles,
                ..Store::default()
            }),
        }
    }

    #[allow(dead_code)]
    pub fn audit_actions(&self) -> Vec<String> {
        let store = self.store.lock().unwrap();
        store.audit.iter().map(|a| a.action.clone()).collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.id == id).map(|u| store.user_view(u)))
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| store.user_view(u)))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.email == user.email || u.id == user.id) {
            return Err(RepositoryError::Conflict("User"));
        }
        let role_id = store
            .roles
            .iter()
            .find(|r| r.name == user.role_name)
            .map(|r| r.id);
        let created = User {
            id: user.id,
            email: user.email,
            name: user.name,
            role_id,
            role_name: None,
            is_admin: false,
            saved_destinations: vec![],
            created_at: Utc::now(),
        };
        store.users.push(created.clone());
        Ok(store.user_view(&created))
    }

    async fn get_saved_destinations(&self, user_id: Uuid) -> RepoResult<Vec<Uuid>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.saved_destinations.clone())
            .unwrap_or_default())
    }

    async fn set_saved_destinations(&self, user_id: Uuid, city_ids: &[Uuid]) -> RepoResult<()> {
        let mut store = self.store.lock().unwrap();
        if let Some(user) = store.users.iter_mut().find(|u| u.id == user_id) {
            user.saved_destinations = city_ids.to_vec();
        }
        Ok(())
    }

    async fn get_preferences(&self, user_id: Uuid) -> RepoResult<Option<UserPreferences>> {
        let store = self.store.lock().unwrap();
        Ok(store.preferences.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> RepoResult<UserPreferences> {
        let mut store = self.store.lock().unwrap();
        let index = match store.preferences.iter().position(|p| p.user_id == user_id) {
            Some(index) => index,
            None => {
                let mut fresh = UserPreferences::defaults_for(user_id);
                fresh.id = Uuid::new_v4();
                store.preferences.push(fresh);
                store.preferences.len() - 1
            }
        };
        let prefs = &mut store.preferences[index];
        if let Some(currency) = req.currency {
            prefs.currency = currency;
        }
        if let Some(language) = req.language {
            prefs.language = language;
        }
        if let Some(enabled) = req.notifications_enabled {
            prefs.notifications_enabled = enabled;
        }
        if let Some(theme) = req.theme {
            prefs.theme = theme;
        }
        prefs.updated_at = Utc::now();
        Ok(prefs.clone())
    }

    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        let store = self.store.lock().unwrap();
        let mut roles = store.roles.clone();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn get_role(&self, id: Uuid) -> RepoResult<Option<Role>> {
        let store = self.store.lock().unwrap();
        Ok(store.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn create_role(&self, req: CreateRoleRequest) -> RepoResult<Role> {
        let mut store = self.store.lock().unwrap();
        let name = req.name.trim().to_string();
        if store.roles.iter().any(|r| r.name == name) {
            return Err(RepositoryError::Conflict("Role"));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            created_at: Utc::now(),
        };
        store.roles.push(role.clone());
        Ok(role)
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<Option<User>> {
        let mut store = self.store.lock().unwrap();
        let Some(user) = store.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        user.role_id = Some(role_id);
        let updated = user.clone();
        Ok(Some(store.user_view(&updated)))
    }

    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let store = self.store.lock().unwrap();
        Ok(AdminStats {
            total_users: store.users.len() as i64,
            total_trips: store.trips.len() as i64,
            total_cities: store.cities.len() as i64,
            public_trips: store.trips.iter().filter(|t| t.is_public).count() as i64,
            total_expenses: store.expenses.iter().map(|e| e.amount).sum(),
        })
    }

    async fn list_cities(&self, query: CityQuery) -> RepoResult<Vec<City>> {
        let store = self.store.lock().unwrap();
        let search = query.search.map(|s| s.trim().to_lowercase());
        let country = query.country.map(|c| c.trim().to_lowercase());

        let mut cities: Vec<City> = store
            .cities
            .iter()
            .filter(|c| match &search {
                Some(term) if !term.is_empty() => {
                    c.name.to_lowercase().contains(term)
                        || c.country.to_lowercase().contains(term)
                        || c.region
                            .as_deref()
                            .is_some_and(|r| r.to_lowercase().contains(term))
                }
                _ => true,
            })
            .filter(|c| match &country {
                Some(wanted) if !wanted.is_empty() => c.country.to_lowercase() == *wanted,
                _ => true,
            })
            .cloned()
            .collect();

        cities.sort_by(|a, b| b.popularity.cmp(&a.popularity).then(a.name.cmp(&b.name)));
        Ok(cities
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn get_city(&self, id: Uuid) -> RepoResult<Option<City>> {
        let store = self.store.lock().unwrap();
        Ok(store.cities.iter().find(|c| c.id == id).cloned())
    }

    async fn get_cities_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<City>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .cities
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn create_city(&self, req: CreateCityRequest) -> RepoResult<City> {
        let mut store = self.store.lock().unwrap();
        let city = City {
            id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            country: req.country.trim().to_string(),
            region: req.region,
            description: req.description,
            image_url: req.image_url,
            cost_index: req.cost_index,
            popularity: req.popularity.unwrap_or(0),
            latitude: req.latitude,
            longitude: req.longitude,
            created_at: Utc::now(),
        };
        store.cities.push(city.clone());
        Ok(city)
    }

    async fn update_city(&self, id: Uuid, req: UpdateCityRequest) -> RepoResult<Option<City>> {
        let mut store = self.store.lock().unwrap();
        let Some(city) = store.cities.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            city.name = name;
        }
        if let Some(country) = req.country {
            city.country = country;
        }
        if req.region.is_some() {
            city.region = req.region;
        }
        if req.description.is_some() {
            city.description = req.description;
        }
        if req.image_url.is_some() {
            city.image_url = req.image_url;
        }
        if req.cost_index.is_some() {
            city.cost_index = req.cost_index;
        }
        if let Some(popularity) = req.popularity {
            city.popularity = popularity;
        }
        Ok(Some(city.clone()))
    }

    async fn delete_city(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.cities.len();
        store.cities.retain(|c| c.id != id);
        if store.cities.len() == before {
            return Ok(false);
        }
        store.attractions.retain(|a| a.city_id != id);
        let removed: Vec<Uuid> = store
            .stops
            .iter()
            .filter(|s| s.city_id == id)
            .map(|s| s.id)
            .collect();
        store.stops.retain(|s| s.city_id != id);
        store.activities.retain(|a| !removed.contains(&a.stop_id));
        for user in store.users.iter_mut() {
            user.saved_destinations.retain(|saved| *saved != id);
        }
        Ok(true)
    }

    async fn list_attractions(&self, city_id: Uuid) -> RepoResult<Vec<Attraction>> {
        let store = self.store.lock().unwrap();
        let mut attractions: Vec<Attraction> = store
            .attractions
            .iter()
            .filter(|a| a.city_id == city_id)
            .cloned()
            .collect();
        attractions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(attractions)
    }

    async fn create_attraction(
        &self,
        city_id: Uuid,
        req: CreateAttractionRequest,
    ) -> RepoResult<Attraction> {
        let mut store = self.store.lock().unwrap();
        if !store.cities.iter().any(|c| c.id == city_id) {
            return Err(RepositoryError::MissingReference("City"));
        }
        let attraction = Attraction {
            id: Uuid::new_v4(),
            city_id,
            name: req.name.trim().to_string(),
            description: req.description,
            category: req.category.trim().to_string(),
            estimated_cost: req.estimated_cost,
            duration_minutes: req.duration_minutes,
        };
        store.attractions.push(attraction.clone());
        Ok(attraction)
    }

    async fn list_trips(&self, user_id: Uuid) -> RepoResult<Vec<Trip>> {
        let store = self.store.lock().unwrap();
        let mut trips: Vec<Trip> = store
            .trips
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trips)
    }

    async fn get_trip(&self, id: Uuid) -> RepoResult<Option<Trip>> {
        let store = self.store.lock().unwrap();
        Ok(store.trips.iter().find(|t| t.id == id).cloned())
    }

    async fn create_trip(&self, user_id: Uuid, req: CreateTripRequest) -> RepoResult<Trip> {
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        let trip = Trip {
            id: Uuid::new_v4(),
            user_id,
            name: req.name.trim().to_string(),
            description: req.description,
            start_date: req.start_date,
            end_date: req.end_date,
            cover_image: req.cover_image,
            budget: req.budget,
            is_public: false,
            created_at: now,
            updated_at: now,
        };
        store.trips.push(trip.clone());
        Ok(trip)
    }

    async fn update_trip(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateTripRequest,
    ) -> RepoResult<Option<Trip>> {
        let mut store = self.store.lock().unwrap();
        let Some(trip) = store
            .trips
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            trip.name = name;
        }
        if req.description.is_some() {
            trip.description = req.description;
        }
        if let Some(start) = req.start_date {
            trip.start_date = start;
        }
        if let Some(end) = req.end_date {
            trip.end_date = end;
        }
        if req.cover_image.is_some() {
            trip.cover_image = req.cover_image;
        }
        if req.budget.is_some() {
            trip.budget = req.budget;
        }
        trip.updated_at = Utc::now();
        Ok(Some(trip.clone()))
    }

    async fn delete_trip(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.trips.len();
        store.trips.retain(|t| !(t.id == id && t.user_id == user_id));
        if store.trips.len() == before {
            return Ok(false);
        }
        let removed: Vec<Uuid> = store
            .stops
            .iter()
            .filter(|s| s.trip_id == id)
            .map(|s| s.id)
            .collect();
        store.stops.retain(|s| s.trip_id != id);
        store.activities.retain(|a| !removed.contains(&a.stop_id));
        store.expenses.retain(|e| e.trip_id != id);
        Ok(true)
    }

    async fn set_trip_public(&self, id: Uuid, is_public: bool) -> RepoResult<Option<Trip>> {
        let mut store = self.store.lock().unwrap();
        let Some(trip) = store.trips.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        trip.is_public = is_public;
        trip.updated_at = Utc::now();
        Ok(Some(trip.clone()))
    }

    async fn get_trip_stops(&self, trip_id: Uuid) -> RepoResult<Vec<TripStop>> {
        let store = self.store.lock().unwrap();
        let mut stops: Vec<TripStop> = store
            .stops
            .iter()
            .filter(|s| s.trip_id == trip_id)
            .map(|s| TripStop {
                city_name: store
                    .cities
                    .iter()
                    .find(|c| c.id == s.city_id)
                    .map(|c| c.name.clone()),
                ..s.clone()
            })
            .collect();
        stops.sort_by_key(|s| s.position);
        Ok(stops)
    }

    async fn get_trip_activities(&self, trip_id: Uuid) -> RepoResult<Vec<Activity>> {
        let store = self.store.lock().unwrap();
        let mut stops: Vec<&TripStop> = store.stops.iter().filter(|s| s.trip_id == trip_id).collect();
        stops.sort_by_key(|s| s.position);
        Ok(stops
            .iter()
            .flat_map(|stop| {
                let stop_id = stop.id;
                store.activities.iter().filter(move |a| a.stop_id == stop_id)
            })
            .cloned()
            .collect())
    }

    async fn replace_trip_stops(&self, trip_id: Uuid, stops: Vec<StopInput>) -> RepoResult<()> {
        let mut store = self.store.lock().unwrap();

        // Check every reference up front so a failure leaves the old itinerary intact.
        for stop in &stops {
            if !store.cities.iter().any(|c| c.id == stop.city_id) {
                return Err(RepositoryError::MissingReference("City"));
            }
            for activity in &stop.activities {
                if let Some(attraction_id) = activity.attraction_id {
                    if !store.attractions.iter().any(|a| a.id == attraction_id) {
                        return Err(RepositoryError::MissingReference("Attraction"));
                    }
                }
            }
        }

        let removed: Vec<Uuid> = store
            .stops
            .iter()
            .filter(|s| s.trip_id == trip_id)
            .map(|s| s.id)
            .collect();
        store.stops.retain(|s| s.trip_id != trip_id);
        store.activities.retain(|a| !removed.contains(&a.stop_id));

        for (position, stop) in stops.into_iter().enumerate() {
            let stop_id = Uuid::new_v4();
            store.stops.push(TripStop {
                id: stop_id,
                trip_id,
                city_id: stop.city_id,
                position: position as i32,
                start_date: stop.start_date,
                end_date: stop.end_date,
                notes: stop.notes,
                city_name: None,
            });
            for activity in stop.activities {
                store.activities.push(Activity {
                    id: Uuid::new_v4(),
                    stop_id,
                    attraction_id: activity.attraction_id,
                    name: activity.name.trim().to_string(),
                    cost: activity.cost,
                    duration_minutes: activity.duration_minutes,
                    scheduled_date: activity.scheduled_date,
                    notes: activity.notes,
                });
            }
        }
        if let Some(trip) = store.trips.iter_mut().find(|t| t.id == trip_id) {
            trip.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_expenses(&self, trip_id: Uuid) -> RepoResult<Vec<Expense>> {
        let store = self.store.lock().unwrap();
        let mut expenses: Vec<Expense> = store
            .expenses
            .iter()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| a.incurred_on.cmp(&b.incurred_on));
        Ok(expenses)
    }

    async fn create_expense(
        &self,
        trip_id: Uuid,
        req: CreateExpenseRequest,
    ) -> RepoResult<Expense> {
        let mut store = self.store.lock().unwrap();
        let expense = Expense {
            id: Uuid::new_v4(),
            trip_id,
            category: req.category.trim().to_lowercase(),
            amount: req.amount,
            currency: req.currency.to_uppercase(),
            description: req.description,
            incurred_on: req.incurred_on,
            created_at: Utc::now(),
        };
        store.expenses.push(expense.clone());
        Ok(expense)
    }

    async fn delete_expense(&self, trip_id: Uuid, expense_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.expenses.len();
        store
            .expenses
            .retain(|e| !(e.id == expense_id && e.trip_id == trip_id));
        Ok(store.expenses.len() < before)
    }

    async fn record_audit(&self, entry: NewAuditEntry) -> RepoResult<()> {
        let mut store = self.store.lock().unwrap();
        store.audit.push(AuditLog {
            id: Uuid::new_v4(),
            actor_id: entry.actor_id,
            actor_email: None,
            action: entry.action.to_string(),
            entity_type: entry.entity_type.to_string(),
            entity_id: entry.entity_id,
            details: entry.details,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_audit_logs(&self, query: AuditQuery) -> RepoResult<Vec<AuditLog>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .audit
            .iter()
            .rev()
            .filter(|a| query.action.as_ref().is_none_or(|wanted| a.action == *wanted))
            .filter(|a| {
                query
                    .entity_type
                    .as_ref()
                    .is_none_or(|wanted| a.entity_type == *wanted)
            })
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|a| AuditLog {
                actor_email: store
                    .users
                    .iter()
                    .find(|u| u.id == a.actor_id)
                    .map(|u| u.email.clone()),
                ..a.clone()
            })
            .collect())
    }
}

// --- State & fixtures ---

/// Builds an `AppState` around `repo` with mock storage and auth provider.
#[allow(dead_code)]
pub fn test_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        auth_provider: Arc::new(MockAuthProvider::new()),
        config: AppConfig::default(),
    }
}

/// Inserts a user directly, bypassing signup.
#[allow(dead_code)]
pub fn seed_user(repo: &InMemoryRepository, email: &str, admin: bool) -> User {
    let mut store = repo.store.lock().unwrap();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: Some(email.split('@').next().unwrap_or(email).to_string()),
        role_id: Some(if admin { ADMIN_ROLE_ID } else { USER_ROLE_ID }),
        role_name: None,
        is_admin: false,
        saved_destinations: vec![],
        created_at: Utc::now(),
    };
    store.users.push(user.clone());
    store.user_view(&user)
}

#[allow(dead_code)]
pub fn seed_city(repo: &InMemoryRepository, name: &str, country: &str, popularity: i32) -> City {
    let mut store = repo.store.lock().unwrap();
    let city = City {
        id: Uuid::new_v4(),
        name: name.to_string(),
        country: country.to_string(),
        popularity,
        created_at: Utc::now(),
        ..City::default()
    };
    store.cities.push(city.clone());
    city
}

#[allow(dead_code)]
pub fn seed_trip(repo: &InMemoryRepository, owner: Uuid, budget: Option<f64>) -> Trip {
    let mut store = repo.store.lock().unwrap();
    let now = Utc::now();
    let trip = Trip {
        id: Uuid::new_v4(),
        user_id: owner,
        name: "Iberian loop".to_string(),
        start_date: date(2025, 6, 1),
        end_date: date(2025, 6, 14),
        budget,
        created_at: now,
        updated_at: now,
        ..Trip::default()
    };
    store.trips.push(trip.clone());
    trip
}

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Signs a session token the way the auth provider does.
#[allow(dead_code)]
pub fn mint_token(user_id: Uuid, secret: &str, ttl_secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Bearer header value for `user` signed with the default test secret.
#[allow(dead_code)]
pub fn bearer_for(user: &User) -> String {
    format!(
        "Bearer {}",
        mint_token(user.id, &AppConfig::default().jwt_secret, 3600)
    )
}
