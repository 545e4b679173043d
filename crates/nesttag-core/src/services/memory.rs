/// In-memory implementations of the service traits for tests and local runs
use super::box_ids::{BoxIdRegistry, check_batch_size};
use super::boxes::BoxStore;
use super::identity::IdentityProvider;
use super::labels::LabelStore;
use super::storage::{ObjectStorage, object_url};
use crate::error::BoxError;
use crate::models::label::normalize_color;
use crate::models::{
    AdminUser, AuthTokens, BoxDraft, BoxIdRecord, BoxRecord, Label, UserProfile, timestamp,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

/// In-memory box store for testing
pub struct InMemoryBoxStore {
    store: AsyncMutex<HashMap<String, BoxRecord>>,
}

impl InMemoryBoxStore {
    pub fn new() -> Self {
        Self {
            store: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBoxStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoxStore for InMemoryBoxStore {
    async fn get(&self, id: &str) -> Result<Option<BoxRecord>, BoxError> {
        Ok(self.store.lock().await.get(id).cloned())
    }

    async fn put(&self, record: &BoxRecord) -> Result<(), BoxError> {
        self.store
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        draft: &BoxDraft,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError> {
        let mut store = self.store.lock().await;
        let record = store
            .get_mut(id)
            .ok_or_else(|| BoxError::NotFound(format!("Box {}", id)))?;
        record.apply(draft, now);
        Ok(record.clone())
    }

    async fn set_favorite(
        &self,
        id: &str,
        is_favorite: bool,
        now: DateTime<Utc>,
    ) -> Result<BoxRecord, BoxError> {
        let mut store = self.store.lock().await;
        let record = store
            .get_mut(id)
            .ok_or_else(|| BoxError::NotFound(format!("Box {}", id)))?;
        record.is_favorite = is_favorite;
        record.updated_at = timestamp(now);
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        self.store.lock().await.remove(id);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<BoxRecord>, BoxError> {
        let mut boxes: Vec<_> = self.store.lock().await.values().cloned().collect();
        boxes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(boxes)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BoxRecord>, BoxError> {
        let mut boxes: Vec<_> = self
            .store
            .lock()
            .await
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        boxes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(boxes)
    }
}

/// In-memory label store for testing
pub struct InMemoryLabelStore {
    store: AsyncMutex<HashMap<String, Label>>,
}

impl InMemoryLabelStore {
    pub fn new() -> Self {
        Self {
            store: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryLabelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelStore for InMemoryLabelStore {
    async fn put(&self, label: &Label) -> Result<(), BoxError> {
        self.store
            .lock()
            .await
            .insert(label.id.clone(), label.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Label, BoxError> {
        let mut store = self.store.lock().await;
        let label = store
            .get_mut(id)
            .ok_or_else(|| BoxError::NotFound(format!("Label {}", id)))?;
        label.name = name.to_string();
        label.color = normalize_color(color);
        label.description = description.filter(|d| !d.is_empty()).map(str::to_string);
        label.updated_at = timestamp(now);
        Ok(label.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        self.store.lock().await.remove(id);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Label>, BoxError> {
        let mut labels: Vec<_> = self
            .store
            .lock()
            .await
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        labels.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(labels)
    }
}

/// In-memory registry for testing
pub struct InMemoryBoxIdRegistry {
    store: AsyncMutex<HashMap<String, BoxIdRecord>>,
}

impl InMemoryBoxIdRegistry {
    pub fn new() -> Self {
        Self {
            store: AsyncMutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBoxIdRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BoxIdRegistry for InMemoryBoxIdRegistry {
    async fn get(&self, box_id: &str) -> Result<Option<BoxIdRecord>, BoxError> {
        Ok(self.store.lock().await.get(box_id).cloned())
    }

    async fn put(&self, record: &BoxIdRecord) -> Result<(), BoxError> {
        self.store
            .lock()
            .await
            .insert(record.box_id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BoxIdRecord>, BoxError> {
        let mut records: Vec<_> = self.store.lock().await.values().cloned().collect();
        records.sort_by(|a, b| a.box_id.cmp(&b.box_id));
        Ok(records)
    }

    async fn delete(&self, box_id: &str) -> Result<(), BoxError> {
        self.store.lock().await.remove(box_id);
        Ok(())
    }

    async fn put_batch(&self, records: &[BoxIdRecord]) -> Result<usize, BoxError> {
        check_batch_size(records)?;
        let mut store = self.store.lock().await;
        for record in records {
            store.insert(record.box_id.clone(), record.clone());
        }
        Ok(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// Parameters a presigned upload URL was issued with
#[derive(Debug, Clone, PartialEq)]
pub struct PresignedUpload {
    pub key: String,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// In-memory storage for testing; presigned URLs are fake but deterministic
pub struct InMemoryObjectStorage {
    objects: AsyncMutex<HashMap<(String, String), StoredObject>>,
    presigned: AsyncMutex<Vec<PresignedUpload>>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self {
            objects: AsyncMutex::new(HashMap::new()),
            presigned: AsyncMutex::new(Vec::new()),
        }
    }

    pub async fn presigned_uploads(&self) -> Vec<PresignedUpload> {
        self.presigned.lock().await.clone()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

impl Default for InMemoryObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn presign_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
        expiration: Duration,
    ) -> Result<String, BoxError> {
        self.presigned.lock().await.push(PresignedUpload {
            key: key.to_string(),
            content_type: content_type.to_string(),
            metadata,
        });
        Ok(format!(
            "{}?X-Amz-Expires={}&x-id=PutObject",
            object_url(bucket, "local", key),
            expiration.as_secs()
        ))
    }

    async fn presign_download(
        &self,
        bucket: &str,
        key: &str,
        expiration: Duration,
    ) -> Result<String, BoxError> {
        Ok(format!(
            "{}?X-Amz-Expires={}&x-id=GetObject",
            object_url(bucket, "local", key),
            expiration.as_secs()
        ))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, BoxError> {
        self.objects.lock().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata,
            },
        );
        Ok(object_url(bucket, "local", key))
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), BoxError> {
        let mut objects = self.objects.lock().await;
        for key in keys {
            objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(())
    }
}

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone)]
struct PoolUser {
    password: String,
    status: String,
    enabled: bool,
    groups: Vec<String>,
    attributes: HashMap<String, String>,
}

#[derive(Default)]
struct PoolState {
    users: HashMap<String, PoolUser>,
    groups: HashSet<String>,
    tokens: HashMap<String, String>,
    reset_codes: HashMap<String, String>,
    issued: usize,
}

impl PoolState {
    fn user(&self, username: &str) -> Result<&PoolUser, BoxError> {
        self.users
            .get(username)
            .ok_or_else(|| BoxError::UserNotFound(format!("User {} does not exist", username)))
    }

    fn user_mut(&mut self, username: &str) -> Result<&mut PoolUser, BoxError> {
        self.users
            .get_mut(username)
            .ok_or_else(|| BoxError::UserNotFound(format!("User {} does not exist", username)))
    }

    fn profile(&self, username: &str) -> Result<UserProfile, BoxError> {
        let user = self.user(username)?;
        Ok(UserProfile {
            username: username.to_string(),
            name: user.attributes.get("name").cloned(),
            email: user.attributes.get("email").cloned(),
        })
    }
}

fn check_password(password: &str) -> Result<(), BoxError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(BoxError::InvalidPassword(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// In-memory user pool for testing
pub struct InMemoryIdentityProvider {
    state: Mutex<PoolState>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
        }
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, PoolState>, BoxError> {
        self.state
            .lock()
            .map_err(|_| BoxError::Identity("User pool state is poisoned".to_string()))
    }

    /// Adds a confirmed user
    pub fn add_user(&self, username: &str, email: &str, password: &str) {
        if let Ok(mut state) = self.state() {
            state.users.insert(
                username.to_string(),
                PoolUser {
                    password: password.to_string(),
                    status: "CONFIRMED".to_string(),
                    enabled: true,
                    groups: Vec::new(),
                    attributes: HashMap::from([("email".to_string(), email.to_string())]),
                },
            );
        }
    }

    pub fn add_group(&self, group: &str) {
        if let Ok(mut state) = self.state() {
            state.groups.insert(group.to_string());
        }
    }

    /// Creates the group if needed and adds the user to it
    pub fn add_to_group(&self, username: &str, group: &str) {
        if let Ok(mut state) = self.state() {
            state.groups.insert(group.to_string());
            if let Some(user) = state.users.get_mut(username)
                && !user.groups.iter().any(|g| g == group)
            {
                user.groups.push(group.to_string());
            }
        }
    }

    pub fn set_status(&self, username: &str, status: &str) {
        if let Ok(mut state) = self.state()
            && let Some(user) = state.users.get_mut(username)
        {
            user.status = status.to_string();
        }
    }

    pub fn set_attribute(&self, username: &str, name: &str, value: &str) {
        if let Ok(mut state) = self.state()
            && let Some(user) = state.users.get_mut(username)
        {
            user.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Registers an opaque access token for `username`
    pub fn issue_access_token(&self, token: &str, username: &str) {
        if let Ok(mut state) = self.state() {
            state
                .tokens
                .insert(token.to_string(), username.to_string());
        }
    }

    /// Starts a password reset with a known confirmation code
    pub fn start_password_reset(&self, username: &str, code: &str) {
        if let Ok(mut state) = self.state() {
            state
                .reset_codes
                .insert(username.to_string(), code.to_string());
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.state()
            .map(|state| state.users.contains_key(username))
            .unwrap_or(false)
    }

    pub fn groups_of(&self, username: &str) -> Vec<String> {
        self.state()
            .ok()
            .and_then(|state| state.users.get(username).map(|u| u.groups.clone()))
            .unwrap_or_default()
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.state()
            .ok()
            .and_then(|state| state.users.get(username).map(|u| u.password.clone()))
    }

    pub fn attribute_of(&self, username: &str, name: &str) -> Option<String> {
        self.state()
            .ok()
            .and_then(|state| state.users.get(username)?.attributes.get(name).cloned())
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn admin_initiate_auth(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthTokens>, BoxError> {
        let mut state = self.state()?;
        let user = state.user(username)?;
        if user.password != password {
            return Err(BoxError::NotAuthorized(
                "Incorrect username or password".to_string(),
            ));
        }
        if user.status == "UNCONFIRMED" {
            return Err(BoxError::UserNotConfirmed(format!(
                "User {} is not confirmed",
                username
            )));
        }

        state.issued += 1;
        let id_token = format!("id-token-{}-{}", username, state.issued);
        let access_token = format!("access-token-{}-{}", username, state.issued);
        state.tokens.insert(id_token.clone(), username.to_string());
        state
            .tokens
            .insert(access_token.clone(), username.to_string());

        Ok(Some(AuthTokens {
            id_token: Some(id_token),
            access_token: Some(access_token),
        }))
    }

    async fn admin_get_user(&self, username: &str) -> Result<UserProfile, BoxError> {
        self.state()?.profile(username)
    }

    async fn admin_list_groups_for_user(&self, username: &str) -> Result<Vec<String>, BoxError> {
        Ok(self.state()?.user(username)?.groups.clone())
    }

    async fn admin_create_user(
        &self,
        username: &str,
        email: &str,
        temporary_password: &str,
    ) -> Result<(), BoxError> {
        let mut state = self.state()?;
        if state.users.contains_key(username) {
            return Err(BoxError::UsernameExists(format!(
                "User {} already exists",
                username
            )));
        }
        check_password(temporary_password)?;

        state.users.insert(
            username.to_string(),
            PoolUser {
                password: temporary_password.to_string(),
                status: "FORCE_CHANGE_PASSWORD".to_string(),
                enabled: true,
                groups: Vec::new(),
                attributes: HashMap::from([
                    ("email".to_string(), email.to_string()),
                    ("email_verified".to_string(), "true".to_string()),
                ]),
            },
        );
        Ok(())
    }

    async fn admin_set_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(), BoxError> {
        check_password(password)?;
        let mut state = self.state()?;
        let user = state.user_mut(username)?;
        user.password = password.to_string();
        user.status = "CONFIRMED".to_string();
        Ok(())
    }

    async fn admin_add_user_to_group(&self, username: &str, group: &str) -> Result<(), BoxError> {
        let mut state = self.state()?;
        if !state.groups.contains(group) {
            return Err(BoxError::GroupNotFound(format!(
                "Group {} not found",
                group
            )));
        }
        let user = state.user_mut(username)?;
        if !user.groups.iter().any(|g| g == group) {
            user.groups.push(group.to_string());
        }
        Ok(())
    }

    async fn admin_remove_user_from_group(
        &self,
        username: &str,
        group: &str,
    ) -> Result<(), BoxError> {
        let mut state = self.state()?;
        let user = state.user_mut(username)?;
        user.groups.retain(|g| g != group);
        Ok(())
    }

    async fn admin_update_user_attributes(
        &self,
        username: &str,
        attributes: &[(String, String)],
    ) -> Result<(), BoxError> {
        let mut state = self.state()?;
        let user = state.user_mut(username)?;
        for (name, value) in attributes {
            user.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn admin_delete_user(&self, username: &str) -> Result<(), BoxError> {
        let mut state = self.state()?;
        state.user(username)?;
        state.users.remove(username);
        state.tokens.retain(|_, owner| owner != username);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<AdminUser>, BoxError> {
        let state = self.state()?;
        let mut users: Vec<_> = state
            .users
            .iter()
            .map(|(username, user)| AdminUser {
                username: username.clone(),
                email: user.attributes.get("email").cloned().unwrap_or_default(),
                status: user.status.clone(),
                enabled: user.enabled,
                user_create_date: None,
                last_modified_date: None,
                groups: Vec::new(),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn confirm_forgot_password(
        &self,
        username: &str,
        code: &str,
        password: &str,
    ) -> Result<(), BoxError> {
        let mut state = self.state()?;
        state.user(username)?;
        match state.reset_codes.get(username) {
            Some(expected) if expected == code => {}
            _ => {
                return Err(BoxError::CodeMismatch(
                    "Invalid verification code provided".to_string(),
                ));
            }
        }
        check_password(password)?;

        state.reset_codes.remove(username);
        let user = state.user_mut(username)?;
        user.password = password.to_string();
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<UserProfile, BoxError> {
        let state = self.state()?;
        let username = state
            .tokens
            .get(access_token)
            .ok_or_else(|| BoxError::NotAuthorized("Invalid Access Token".to_string()))?;
        state.profile(username)
    }
}
