use crate::bridge::{command, encode_args, invoke_typed, Bridge};
use crate::cache::CacheCell;
use crate::error::ClientError;
use crate::types::{ProfileSet, ProfileView, ProfilesPatch, RuntimeLogs};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Client-side mirror of the daemon's profile state plus the thin command
/// wrappers that mutate it. Mutations never refresh the mirrors on their
/// own; callers decide when to refetch.
pub struct ProfileStore<B: Bridge> {
    bridge: Arc<B>,
    profiles: CacheCell<ProfileSet>,
    logs: CacheCell<RuntimeLogs>,
}

impl<B: Bridge> ProfileStore<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self {
            bridge,
            profiles: CacheCell::new(command::GET_PROFILES),
            logs: CacheCell::new(command::GET_RUNTIME_LOGS),
        }
    }

    pub async fn profiles(&self) -> Result<ProfileSet, ClientError> {
        self.profiles
            .get_or_fetch(|| invoke_typed(self.bridge.as_ref(), command::GET_PROFILES, JsonValue::Null))
            .await
    }

    pub async fn refresh_profiles(&self) -> Result<ProfileSet, ClientError> {
        self.profiles
            .refresh(|| invoke_typed(self.bridge.as_ref(), command::GET_PROFILES, JsonValue::Null))
            .await
    }

    pub async fn invalidate_profiles(&self) {
        self.profiles.invalidate().await;
    }

    pub async fn view(&self) -> Result<ProfileView, ClientError> {
        Ok(self.profiles().await?.view())
    }

    pub async fn runtime_logs(&self) -> Result<RuntimeLogs, ClientError> {
        self.logs
            .get_or_fetch(|| invoke_typed(self.bridge.as_ref(), command::GET_RUNTIME_LOGS, JsonValue::Null))
            .await
    }

    pub async fn refresh_logs(&self) -> Result<RuntimeLogs, ClientError> {
        self.logs
            .refresh(|| invoke_typed(self.bridge.as_ref(), command::GET_RUNTIME_LOGS, JsonValue::Null))
            .await
    }

    pub async fn invalidate_logs(&self) {
        self.logs.invalidate().await;
    }

    pub async fn patch_profiles(&self, patch: &ProfilesPatch) -> Result<(), ClientError> {
        let args = encode_args(command::PATCH_PROFILES, patch)?;
        self.bridge.invoke(command::PATCH_PROFILES, args).await?;
        Ok(())
    }

    pub async fn import_profile(&self, locator: &str) -> Result<(), ClientError> {
        self.bridge.invoke(command::IMPORT_PROFILE, json!({ "locator": locator })).await?;
        Ok(())
    }

    pub async fn delete_profile(&self, uid: &str) -> Result<(), ClientError> {
        self.bridge.invoke(command::DELETE_PROFILE, json!({ "uid": uid })).await?;
        Ok(())
    }

    pub async fn update_profile(&self, uid: &str) -> Result<(), ClientError> {
        self.bridge.invoke(command::UPDATE_PROFILE, json!({ "uid": uid })).await?;
        Ok(())
    }
}
