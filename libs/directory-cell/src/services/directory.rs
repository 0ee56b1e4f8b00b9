// libs/directory-cell/src/services/directory.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::{
    CreateParentRequest, CreateTeacherRequest, CreateUserRequest, DirectoryError, Parent, Teacher,
    UpdateParentRequest, UpdateTeacherRequest, UpdateUserRequest, User,
};

pub struct DirectoryService {
    db: PostgrestClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    // ==============================================================================
    // USERS
    // ==============================================================================

    pub async fn list_users(&self, limit: i32, skip: i32) -> Result<Vec<User>, DirectoryError> {
        let path = format!(
            "/rest/v1/users?order=created_at.desc&limit={}&offset={}",
            limit, skip
        );
        self.fetch_list(&path, "users").await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User, DirectoryError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        self.fetch_one(&path, "User").await
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, DirectoryError> {
        debug!("Creating user: {}", request.email);

        let existing_path = format!(
            "/rest/v1/users?email=eq.{}",
            urlencoding::encode(&request.email)
        );
        let existing: Vec<Value> = self
            .db
            .request(Method::GET, &existing_path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DirectoryError::EmailTaken(request.email));
        }

        let now = Utc::now();
        let user_data = json!({
            "id": Uuid::new_v4(),
            "email": request.email,
            "full_name": request.full_name,
            "role": request.role.to_string(),
            "is_active": true,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let created = self.insert("/rest/v1/users", user_data).await?;
        info!("User created: {}", created["id"]);
        self.parse(created)
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<User, DirectoryError> {
        let mut update_data = serde_json::Map::new();
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(full_name) = request.full_name {
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(is_active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(is_active));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        let updated = self.patch(&path, Value::Object(update_data), "User").await?;
        self.parse(updated)
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), DirectoryError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);
        self.delete(&path).await
    }

    // ==============================================================================
    // TEACHERS
    // ==============================================================================

    pub async fn list_teachers(
        &self,
        limit: i32,
        skip: i32,
    ) -> Result<Vec<Teacher>, DirectoryError> {
        let path = format!(
            "/rest/v1/teachers?order=created_at.desc&limit={}&offset={}",
            limit, skip
        );
        self.fetch_list(&path, "teachers").await
    }

    pub async fn get_teacher(&self, teacher_id: Uuid) -> Result<Teacher, DirectoryError> {
        let path = format!("/rest/v1/teachers?id=eq.{}", teacher_id);
        self.fetch_one(&path, "Teacher").await
    }

    pub async fn create_teacher(
        &self,
        request: CreateTeacherRequest,
    ) -> Result<Teacher, DirectoryError> {
        self.verify_profile_free("teachers", request.user_id).await?;

        let now = Utc::now();
        let teacher_data = json!({
            "id": Uuid::new_v4(),
            "user_id": request.user_id,
            "branch": request.branch,
            "subject": request.subject,
            "bio": request.bio,
            "phone": request.phone,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let created = self.insert("/rest/v1/teachers", teacher_data).await?;
        info!("Teacher profile created: {}", created["id"]);
        self.parse(created)
    }

    pub async fn update_teacher(
        &self,
        teacher_id: Uuid,
        request: UpdateTeacherRequest,
    ) -> Result<Teacher, DirectoryError> {
        let mut update_data = serde_json::Map::new();
        if let Some(branch) = request.branch {
            update_data.insert("branch".to_string(), json!(branch));
        }
        if let Some(subject) = request.subject {
            update_data.insert("subject".to_string(), json!(subject));
        }
        if let Some(bio) = request.bio {
            update_data.insert("bio".to_string(), json!(bio));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/teachers?id=eq.{}", teacher_id);
        let updated = self
            .patch(&path, Value::Object(update_data), "Teacher")
            .await?;
        self.parse(updated)
    }

    pub async fn delete_teacher(&self, teacher_id: Uuid) -> Result<(), DirectoryError> {
        let path = format!("/rest/v1/teachers?id=eq.{}", teacher_id);
        self.delete(&path).await
    }

    // ==============================================================================
    // PARENTS
    // ==============================================================================

    pub async fn list_parents(&self, limit: i32, skip: i32) -> Result<Vec<Parent>, DirectoryError> {
        let path = format!(
            "/rest/v1/parents?order=created_at.desc&limit={}&offset={}",
            limit, skip
        );
        self.fetch_list(&path, "parents").await
    }

    pub async fn get_parent(&self, parent_id: Uuid) -> Result<Parent, DirectoryError> {
        let path = format!("/rest/v1/parents?id=eq.{}", parent_id);
        self.fetch_one(&path, "Parent").await
    }

    pub async fn create_parent(
        &self,
        request: CreateParentRequest,
    ) -> Result<Parent, DirectoryError> {
        self.verify_profile_free("parents", request.user_id).await?;

        let now = Utc::now();
        let parent_data = json!({
            "id": Uuid::new_v4(),
            "user_id": request.user_id,
            "student_name": request.student_name,
            "student_class": request.student_class,
            "phone": request.phone,
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let created = self.insert("/rest/v1/parents", parent_data).await?;
        info!("Parent profile created: {}", created["id"]);
        self.parse(created)
    }

    pub async fn update_parent(
        &self,
        parent_id: Uuid,
        request: UpdateParentRequest,
    ) -> Result<Parent, DirectoryError> {
        let mut update_data = serde_json::Map::new();
        if let Some(student_name) = request.student_name {
            update_data.insert("student_name".to_string(), json!(student_name));
        }
        if let Some(student_class) = request.student_class {
            update_data.insert("student_class".to_string(), json!(student_class));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(notes) = request.notes {
            update_data.insert("notes".to_string(), json!(notes));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/parents?id=eq.{}", parent_id);
        let updated = self
            .patch(&path, Value::Object(update_data), "Parent")
            .await?;
        self.parse(updated)
    }

    pub async fn delete_parent(&self, parent_id: Uuid) -> Result<(), DirectoryError> {
        let path = format!("/rest/v1/parents?id=eq.{}", parent_id);
        self.delete(&path).await
    }

    // ==============================================================================
    // SHARED HELPERS
    // ==============================================================================

    async fn verify_profile_free(
        &self,
        table: &str,
        user_id: Uuid,
    ) -> Result<(), DirectoryError> {
        let path = format!("/rest/v1/{}?user_id=eq.{}", table, user_id);
        let existing: Vec<Value> = self
            .db
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            return Err(DirectoryError::ProfileExists(user_id));
        }
        Ok(())
    }

    async fn fetch_list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<Vec<T>, DirectoryError> {
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse {}: {}", what, e)))
    }

    async fn fetch_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &'static str,
    ) -> Result<T, DirectoryError> {
        let rows: Vec<Value> = self
            .db
            .request(Method::GET, path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Err(DirectoryError::NotFound(what));
        };

        serde_json::from_value(row)
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse {}: {}", what, e)))
    }

    async fn insert(&self, path: &str, body: Value) -> Result<Value, DirectoryError> {
        let rows = self
            .db
            .request_returning(Method::POST, path, Some(body))
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or_else(|| DirectoryError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn patch(
        &self,
        path: &str,
        body: Value,
        what: &'static str,
    ) -> Result<Value, DirectoryError> {
        let rows = self
            .db
            .request_returning(Method::PATCH, path, Some(body))
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(DirectoryError::NotFound(what))
    }

    async fn delete(&self, path: &str) -> Result<(), DirectoryError> {
        let _: Vec<Value> = self
            .db
            .request(Method::DELETE, path, None)
            .await
            .map_err(|e| DirectoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    fn parse<T: serde::de::DeserializeOwned>(&self, row: Value) -> Result<T, DirectoryError> {
        serde_json::from_value(row)
            .map_err(|e| DirectoryError::DatabaseError(format!("Failed to parse row: {}", e)))
    }
}
